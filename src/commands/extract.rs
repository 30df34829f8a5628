//! # extract 命令实现
//!
//! 选择一个检查点，提取能带与态密度，按配置导出。
//!
//! ## 功能
//! - 直接使用检查点中的 k 点，或 `--fixed` 沿指定路径定带计算
//! - 导出 JSON / CSV / 图像，导出失败只警告
//! - 打印结果摘要表
//!
//! ## 依赖关系
//! - 使用 `cli/extract.rs` 定义的参数
//! - 使用 `bands/extractor.rs`, `backend/`
//! - 使用 `utils/output.rs`

use super::finish_config;
use crate::backend;
use crate::bands::labels::plain_label;
use crate::bands::Extractor;
use crate::cli::extract::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::models::{BandsResults, SelectedFile};
use crate::utils::output;

use std::io::{self, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// 摘要表行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Property")]
    property: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 extract 命令
pub fn execute(args: ExtractArgs, config: Config) -> Result<()> {
    let config = finish_config(apply_flags(&args, config), &args.set)?;

    if !args.quiet {
        output::print_header("Band Structure Extraction");
    }

    let extractor = Extractor::new(&args.dir, backend::from_config(&config))?;
    let selected = list_and_select(&extractor, args.index, args.quiet, &mut io::stdout())?;

    if !args.quiet {
        output::print_info(&format!(
            "File [{}]: {} (backend: {})",
            selected.index,
            selected.file_name,
            extractor.backend_name()
        ));
        if args.fixed {
            output::print_info(&format!(
                "Band path: {} with {} points",
                config.bandpath.pattern, config.bandpath.npoints
            ));
        }
    }

    let results = extractor.get_bands(args.index, args.fixed, &config)?;

    if !args.quiet {
        println!("{}", summary_table(&results));
    }

    Ok(())
}

/// 先列出文件表格再按序号选择，序号越界时表格已经输出
fn list_and_select<W: Write>(
    extractor: &Extractor,
    index: usize,
    quiet: bool,
    out: &mut W,
) -> Result<SelectedFile> {
    if !quiet {
        extractor.show_files(out)?;
    }
    extractor.select(index)
}

/// 命令行选项覆盖配置文件
fn apply_flags(args: &ExtractArgs, mut config: Config) -> Config {
    if let Some(kind) = args.backend {
        config.backend = kind;
    }
    if let Some(ref path) = args.path {
        config.bandpath.pattern = path.clone();
    }
    if let Some(npoints) = args.npoints {
        config.bandpath.npoints = npoints;
    }
    if let Some(npts) = args.npts {
        config.dos.npts = npts;
    }
    if args.width.is_some() {
        config.dos.width = args.width;
    }
    if args.json {
        config.export.json = true;
    }
    if args.csv {
        config.export.csv = true;
    }
    if let Some(ref dir) = args.outdir {
        config.export.dir = dir.clone();
    }
    if args.plot.is_some() {
        config.export.plot = args.plot.clone();
    }
    config
}

fn summary_table(results: &BandsResults) -> String {
    let range = match results.energy_range() {
        Some((lo, hi)) => format!("{:.3} .. {:.3} eV", lo, hi),
        None => "-".to_string(),
    };
    let labels = results
        .x_labels
        .iter()
        .map(|l| plain_label(l))
        .collect::<Vec<_>>()
        .join(" ");

    let rows = vec![
        SummaryRow {
            property: "Title",
            value: results.name.clone(),
        },
        SummaryRow {
            property: "Shape (S, K, B)",
            value: format!(
                "({}, {}, {})",
                results.spin_count(),
                results.kpoint_count(),
                results.band_count()
            ),
        },
        SummaryRow {
            property: "E - E_F range",
            value: range,
        },
        SummaryRow {
            property: "Labels",
            value: labels,
        },
        SummaryRow {
            property: "DOS samples",
            value: results.dos.first().map(|c| c.len()).unwrap_or(0).to_string(),
        },
        SummaryRow {
            property: "DOS max (up, down)",
            value: format!("{:.4}, {:.4}", results.dos_max[0], results.dos_max[1]),
        },
    ];

    Table::new(rows).with(Style::rounded()).to_string()
}
