//! # list 命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/list.rs` 定义的参数
//! - 使用 `bands/extractor.rs`, `utils/output.rs`

use crate::backend;
use crate::bands::Extractor;
use crate::cli::list::ListArgs;
use crate::config::Config;
use crate::error::Result;
use crate::utils::output;

use std::io;

/// 执行 list 命令
pub fn execute(args: ListArgs, config: Config) -> Result<()> {
    output::print_header("GPAW Checkpoints");

    let extractor = Extractor::new(&args.dir, backend::from_config(&config))?;
    output::print_info(&format!(
        "Directory: {}",
        extractor.listing().root().display()
    ));

    if extractor.listing().is_empty() {
        output::print_warning("No .gpw files found");
        return Ok(());
    }

    extractor.show_files(&mut io::stdout())?;
    output::print_done(&format!("{} file(s)", extractor.listing().len()));

    Ok(())
}
