//! # 检查点文件列表
//!
//! 扫描目录下的 `.gpw` 文件，按路径排序，按序号选择文件并生成显示标题。
//!
//! ## 依赖关系
//! - 被 `bands/extractor.rs` 和 `commands/` 使用
//! - 使用 `glob` 查找文件，`tabled` 渲染表格

use crate::error::{BandsError, Result};

use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// 检查点文件后缀
pub const CHECKPOINT_SUFFIX: &str = ".gpw";

/// 标题末尾的标记
const TITLE_MARKER: &str = "\\%";

/// 表格行
#[derive(Debug, Clone, Tabled)]
struct FileRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "gpw File")]
    file: String,
}

/// 按序号选中的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub index: usize,
    /// 绝对路径
    pub path: PathBuf,
    /// 文件名（不含目录）
    pub file_name: String,
    /// 由文件名生成的显示标题
    pub display_name: String,
}

impl SelectedFile {
    /// 导出文件使用的基础名，定带模式加 `fixed_` 前缀
    pub fn output_stem(&self, fixed: bool) -> String {
        let stem = self
            .file_name
            .strip_suffix(CHECKPOINT_SUFFIX)
            .unwrap_or(&self.file_name);
        if fixed {
            format!("fixed_{}", stem)
        } else {
            stem.to_string()
        }
    }
}

/// 目录下的检查点文件，构造后顺序固定
#[derive(Debug, Clone)]
pub struct FileListing {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileListing {
    /// 扫描目录，目录不存在时报错
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(BandsError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }

        let root = dir.canonicalize().map_err(|e| BandsError::FileReadError {
            path: dir.display().to_string(),
            source: e,
        })?;

        let pattern = format!(
            "{}/*{}",
            glob::Pattern::escape(&root.to_string_lossy()),
            CHECKPOINT_SUFFIX
        );

        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| BandsError::InvalidValue {
                option: "directory".to_string(),
                value: dir.display().to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        Ok(FileListing { root, files })
    }

    /// 扫描目录的绝对路径
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 绝对路径列表
    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    /// 文件名列表（用于显示）
    pub fn file_names(&self) -> Vec<String> {
        self.paths().iter().map(|p| file_name_of(p)).collect()
    }

    /// 按零基序号选择文件，越界时报错
    pub fn select(&self, index: usize) -> Result<SelectedFile> {
        let path = self
            .files
            .get(index)
            .ok_or(BandsError::IndexOutOfRange {
                index,
                len: self.files.len(),
            })?
            .clone();
        let file_name = file_name_of(&path);
        let display_name = title(&file_name);

        Ok(SelectedFile {
            index,
            path,
            file_name,
            display_name,
        })
    }

    /// 渲染文件表格
    pub fn table(&self) -> String {
        let rows: Vec<FileRow> = self
            .file_names()
            .into_iter()
            .enumerate()
            .map(|(index, file)| FileRow { index, file })
            .collect();

        Table::new(rows).with(Style::markdown()).to_string()
    }
}

/// 由文件名生成标题：截去 `.gpw` 及其后内容，下划线换成空格，末尾加标记
pub fn title(file_name: &str) -> String {
    let stem = file_name
        .split(CHECKPOINT_SUFFIX)
        .next()
        .unwrap_or(file_name);
    format!("{}{}", stem.split('_').collect::<Vec<_>>().join(" "), TITLE_MARKER)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
