//! # elements 命令实现
//!
//! 列出结构中出现不止一次的元素，作为分波态密度的候选。
//!
//! ## 依赖关系
//! - 使用 `cli/elements.rs` 定义的参数
//! - 使用 `bands/extractor.rs`, `utils/output.rs`

use super::finish_config;
use crate::backend;
use crate::bands::Extractor;
use crate::cli::elements::ElementsArgs;
use crate::config::Config;
use crate::error::Result;
use crate::utils::output;

/// 执行 elements 命令
pub fn execute(args: ElementsArgs, mut config: Config) -> Result<()> {
    if let Some(kind) = args.backend {
        config.backend = kind;
    }
    let config = finish_config(config, &args.set)?;

    let extractor = Extractor::new(&args.dir, backend::from_config(&config))?;
    let selected = extractor.select(args.index)?;
    output::print_header(&format!("Elements in {}", selected.file_name));

    let elements = extractor.pdos_elements(args.index)?;
    if elements.is_empty() {
        output::print_info("No element occurs more than once");
    } else {
        output::print_success(&format!("Repeated elements: {}", elements.join(", ")));
    }

    Ok(())
}
