//! # extract 子命令 CLI 定义
//!
//! 未给出的选项取配置文件或默认值。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extract.rs`

use crate::config::BackendKind;
use clap::Args;
use std::path::PathBuf;

/// extract 子命令参数
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory containing .gpw files
    pub dir: PathBuf,

    /// Index of the file in the listing (see `list`)
    #[arg(short, long)]
    pub index: usize,

    /// Recompute bands along a band path with the density held fixed
    #[arg(long, default_value_t = false)]
    pub fixed: bool,

    /// Band path pattern for --fixed, e.g. 'XGX' or 'GXWK,GL' [default: XGX]
    #[arg(long)]
    pub path: Option<String>,

    /// Number of k-points along the band path for --fixed [default: 100]
    #[arg(long)]
    pub npoints: Option<usize>,

    /// Number of DOS energy samples [default: 2001]
    #[arg(long)]
    pub npts: Option<usize>,

    /// Gaussian DOS broadening width in eV [default: 0.1]
    #[arg(long)]
    pub width: Option<f64>,

    /// Write <outdir>/<stem>.json
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Output directory for JSON and CSV files [default: json]
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Write <stem>_bands.csv and <stem>_dos.csv
    #[arg(long, default_value_t = false)]
    pub csv: bool,

    /// Save a band + DOS figure (.png or .svg)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Checkpoint reader [default: native]
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Override a configuration value (repeatable), e.g. --set dos.width=0.05
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Skip the results summary
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}
