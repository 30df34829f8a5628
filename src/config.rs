//! # 配置模块
//!
//! 提取参数的显式类型化配置，分层合并：
//! 默认值 → TOML 配置文件 → 命令行参数 → `--set KEY=VALUE` 覆盖，
//! 最后统一校验一次。
//!
//! ## 配置文件示例
//! ```toml
//! backend = "native"
//!
//! [bandpath]
//! pattern = "XGX1X"
//! npoints = 150
//!
//! [dos]
//! npts = 2001
//! width = 0.1
//!
//! [export]
//! json = true
//! dir = "json"
//!
//! [gpaw]
//! python = "python3"
//! timeout_secs = 3600
//!
//! [special_points]
//! X1 = [0.5, 0.0, 0.0]
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/`, `backend/`, `bands/extractor.rs` 使用
//! - 使用 `toml` + `serde` 解析，`bands/kpath.rs` 校验路径

use crate::bands::kpath::{self, SpecialPoint};
use crate::error::{BandsError, Result};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认定带路径
pub const DEFAULT_PATTERN: &str = "XGX";

/// 默认路径采样点数
pub const DEFAULT_NPOINTS: usize = 100;

/// 默认 GPAW 子进程超时 (s)
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// 求解器后端类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Read .gpw files directly (no fixed-density support)
    #[default]
    Native,
    /// Delegate to the GPAW Python package
    Gpaw,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Gpaw => write!(f, "gpaw"),
        }
    }
}

/// 定带计算的能带路径请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPathRequest {
    pub pattern: String,
    pub npoints: usize,
}

impl BandPathRequest {
    /// 路径各段的点名
    pub fn segments(&self) -> Result<Vec<Vec<String>>> {
        kpath::parse_path(&self.pattern)
    }
}

/// 态密度参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DosOptions {
    pub npts: usize,
    /// 展宽宽度 (eV)，`None` 使用后端默认值
    pub width: Option<f64>,
}

impl Default for DosOptions {
    fn default() -> Self {
        DosOptions {
            npts: crate::bands::dos::DEFAULT_NPTS,
            width: None,
        }
    }
}

/// 导出参数
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub json: bool,
    pub csv: bool,
    /// JSON/CSV 输出目录
    pub dir: PathBuf,
    /// 图像输出路径（.png 或 .svg）
    pub plot: Option<PathBuf>,
}

/// GPAW 子进程参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpawOptions {
    pub python: String,
    pub timeout_secs: Option<u64>,
}

/// 完整配置
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendKind,
    pub bandpath: BandPathRequest,
    pub dos: DosOptions,
    pub export: ExportOptions,
    pub gpaw: GpawOptions,
    pub special_points: BTreeMap<String, [f64; 3]>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::default(),
            bandpath: BandPathRequest {
                pattern: DEFAULT_PATTERN.to_string(),
                npoints: DEFAULT_NPOINTS,
            },
            dos: DosOptions::default(),
            export: ExportOptions {
                json: false,
                csv: false,
                dir: PathBuf::from("json"),
                plot: None,
            },
            gpaw: GpawOptions {
                python: "python3".to_string(),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            },
            special_points: BTreeMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 配置文件
// ─────────────────────────────────────────────────────────────

/// 允许的配置键（`special_points` 下任意点名）
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("bandpath", &["pattern", "npoints"]),
    ("dos", &["npts", "width"]),
    ("export", &["json", "csv", "dir", "plot"]),
    ("gpaw", &["python", "timeout_secs"]),
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    backend: Option<BackendKind>,
    bandpath: BandPathSection,
    dos: DosSection,
    export: ExportSection,
    gpaw: GpawSection,
    special_points: BTreeMap<String, [f64; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BandPathSection {
    pattern: Option<String>,
    npoints: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DosSection {
    npts: Option<usize>,
    width: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportSection {
    json: Option<bool>,
    csv: Option<bool>,
    dir: Option<PathBuf>,
    plot: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GpawSection {
    python: Option<String>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// 读取配置文件并校验
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BandsError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// 解析 TOML 文本：先检查未知键，再按类型反序列化
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse()?;
        check_known_keys(&table)?;

        let file: ConfigFile =
            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| BandsError::InvalidValue {
                    option: "config".to_string(),
                    value: String::new(),
                    reason: e.message().to_string(),
                })?;

        let mut config = Config::default();
        if let Some(backend) = file.backend {
            config.backend = backend;
        }
        if let Some(pattern) = file.bandpath.pattern {
            config.bandpath.pattern = pattern;
        }
        if let Some(npoints) = file.bandpath.npoints {
            config.bandpath.npoints = npoints;
        }
        if let Some(npts) = file.dos.npts {
            config.dos.npts = npts;
        }
        if file.dos.width.is_some() {
            config.dos.width = file.dos.width;
        }
        if let Some(json) = file.export.json {
            config.export.json = json;
        }
        if let Some(csv) = file.export.csv {
            config.export.csv = csv;
        }
        if let Some(dir) = file.export.dir {
            config.export.dir = dir;
        }
        if file.export.plot.is_some() {
            config.export.plot = file.export.plot;
        }
        if let Some(python) = file.gpaw.python {
            config.gpaw.python = python;
        }
        if let Some(timeout) = file.gpaw.timeout_secs {
            config.gpaw.timeout_secs = if timeout == 0 { None } else { Some(timeout) };
        }
        config.special_points = file.special_points;

        config.validate()?;
        Ok(config)
    }

    /// 单项覆盖（`--set KEY=VALUE`），短键名与长键名均可
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key.trim() {
            "backend" => {
                self.backend = BackendKind::from_str(value, true)
                    .map_err(|_| invalid(key, value, "expected 'native' or 'gpaw'"))?;
            }
            "path" | "pattern" | "bandpath.pattern" => self.bandpath.pattern = value.to_string(),
            "npoints" | "bandpath.npoints" => self.bandpath.npoints = parse_count(key, value)?,
            "npts" | "dos.npts" => self.dos.npts = parse_count(key, value)?,
            "width" | "dos.width" => {
                self.dos.width = match value {
                    "none" | "None" | "" => None,
                    v => Some(
                        v.parse::<f64>()
                            .map_err(|_| invalid(key, value, "expected a number"))?,
                    ),
                }
            }
            "json" | "export.json" => self.export.json = parse_bool(key, value)?,
            "csv" | "export.csv" => self.export.csv = parse_bool(key, value)?,
            "dir" | "outdir" | "export.dir" => self.export.dir = PathBuf::from(value),
            "plot" | "export.plot" => self.export.plot = Some(PathBuf::from(value)),
            "python" | "gpaw.python" => self.gpaw.python = value.to_string(),
            "timeout" | "timeout_secs" | "gpaw.timeout_secs" => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| invalid(key, value, "expected a whole number of seconds"))?;
                self.gpaw.timeout_secs = if secs == 0 { None } else { Some(secs) };
            }
            other => return Err(BandsError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// 解析 `KEY=VALUE` 形式的覆盖
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| BandsError::InvalidValue {
            option: assignment.to_string(),
            value: String::new(),
            reason: "expected KEY=VALUE".to_string(),
        })?;
        self.set(key, value)
    }

    /// 统一校验
    pub fn validate(&self) -> Result<()> {
        if self.dos.npts < 2 {
            return Err(invalid(
                "dos.npts",
                &self.dos.npts.to_string(),
                "at least 2 samples are required",
            ));
        }
        if let Some(width) = self.dos.width {
            if !width.is_finite() || width <= 0.0 {
                return Err(invalid(
                    "dos.width",
                    &width.to_string(),
                    "must be a positive number",
                ));
            }
        }
        if self.bandpath.npoints < 2 {
            return Err(invalid(
                "bandpath.npoints",
                &self.bandpath.npoints.to_string(),
                "at least 2 points are required",
            ));
        }
        self.bandpath.segments()?;
        if self.gpaw.python.trim().is_empty() {
            return Err(invalid("gpaw.python", "", "must name an interpreter"));
        }
        for (name, kpt) in &self.special_points {
            if kpath::parse_path(name).map(|s| s.len() != 1 || s[0].len() != 1).unwrap_or(true) {
                return Err(invalid("special_points", name, "not a valid point name"));
            }
            if kpt.iter().any(|x| !x.is_finite()) {
                return Err(invalid(
                    "special_points",
                    name,
                    "coordinates must be finite numbers",
                ));
            }
        }
        Ok(())
    }

    /// 用户定义的高对称点
    pub fn extra_special_points(&self) -> Vec<SpecialPoint> {
        self.special_points
            .iter()
            .map(|(n, k)| (n.clone(), *k))
            .collect()
    }
}

fn check_known_keys(table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        match key.as_str() {
            "backend" | "special_points" => {}
            section => {
                let fields = KNOWN_SECTIONS
                    .iter()
                    .find(|(name, _)| *name == section)
                    .map(|(_, fields)| *fields)
                    .ok_or_else(|| BandsError::UnknownOption(section.to_string()))?;
                if let Some(inner) = value.as_table() {
                    if let Some(unknown) = inner.keys().find(|k| !fields.contains(&k.as_str())) {
                        return Err(BandsError::UnknownOption(format!("{}.{}", section, unknown)));
                    }
                }
            }
        }
    }
    Ok(())
}

fn invalid(option: &str, value: &str, reason: &str) -> BandsError {
    BandsError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| invalid(key, value, "expected a non-negative integer"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}
