//! # ULM 容器解析器
//!
//! ASE 的 ULM 二进制格式（`.gpw` 使用的容器）。
//!
//! ## 格式
//! ```text
//! 0   8 字节  "- of Ulm"
//! 8   16 字节 标签（ASCII，空格填充）
//! 24  int64   版本
//! 32  int64   条目数 nitems
//! 40  int64   偏移表位置 pos0
//! pos0        nitems 个 int64 偏移
//! 偏移处      int64 长度 + JSON 字典
//! ```
//! 字典中以 `.` 结尾的键为子字典；数组以 `{"ndarray": [shape, dtype, offset]}`
//! 引用文件中的原始数据，字节序与文件头一致。
//!
//! ## 依赖关系
//! - 被 `parsers/gpw.rs` 使用
//! - 使用 `serde_json` 解码字典

use crate::error::{BandsError, Result};

use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// 文件标识
pub const MAGIC: &[u8; 8] = b"- of Ulm";

/// 文件头长度
const HEADER_LEN: usize = 48;

/// 合理版本号上限，用于判断字节序
const MAX_VERSION: i64 = 1000;

/// 已解码的数值数组（按 C 顺序展平）
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NdArray {
    /// 二维数组转为定长行
    pub fn rows3(&self) -> Option<Vec<[f64; 3]>> {
        if self.shape.len() != 2 || self.shape[1] != 3 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        )
    }

    /// 三维数组转为嵌套向量
    pub fn nested3(&self) -> Option<Vec<Vec<Vec<f64>>>> {
        if self.shape.len() != 3 {
            return None;
        }
        let (n1, n2) = (self.shape[1], self.shape[2]);
        if n1 == 0 || n2 == 0 {
            return Some(vec![Vec::new(); self.shape[0]]);
        }
        Some(
            self.data
                .chunks_exact(n1 * n2)
                .map(|block| block.chunks_exact(n2).map(|row| row.to_vec()).collect())
                .collect(),
        )
    }
}

/// 打开的 ULM 文件
pub struct UlmFile {
    path: PathBuf,
    reader: BufReader<File>,
    little_endian: bool,
    /// 文件长度，所有偏移与长度都需落在其内
    len: u64,
    tag: String,
    version: i64,
    offsets: Vec<i64>,
}

impl UlmFile {
    /// 打开并解析文件头与偏移表
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BandsError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let len = file
            .metadata()
            .map_err(|e| BandsError::FileReadError {
                path: path.display().to_string(),
                source: e,
            })?
            .len();
        let mut ulm = UlmFile {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            little_endian: true,
            len,
            tag: String::new(),
            version: 0,
            offsets: Vec::new(),
        };
        ulm.read_header()?;
        Ok(ulm)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn item_count(&self) -> usize {
        self.offsets.len()
    }

    /// 读取第 `index` 个条目的字典
    pub fn read_item(&mut self, index: usize) -> Result<Value> {
        let offset = *self
            .offsets
            .get(index)
            .ok_or_else(|| self.corrupt(format!("item {} does not exist", index)))?;
        let offset = u64::try_from(offset)
            .map_err(|_| self.corrupt(format!("negative offset for item {}", index)))?;

        self.ensure_within(offset, 8, &format!("item {} header", index))?;
        self.seek(offset)?;
        let size = self.read_i64()?;
        let size = u64::try_from(size)
            .map_err(|_| self.corrupt(format!("negative size for item {}", index)))?;
        self.ensure_within(offset + 8, size, &format!("item {}", index))?;
        let bytes = self.read_bytes(size as usize)?;

        serde_json::from_slice(&bytes)
            .map_err(|e| self.corrupt(format!("item {} is not valid JSON: {}", index, e)))
    }

    /// 解码数组值：文件引用、内联 `__ndarray__`、嵌套列表或标量
    pub fn read_array(&mut self, value: &Value) -> Result<NdArray> {
        if let Some(spec) = value.get("ndarray") {
            let (shape, dtype, offset) = self.parse_array_ref(spec)?;
            return self.read_raw_array(shape, &dtype, offset);
        }
        if let Some(spec) = value.get("__ndarray__") {
            let parts = spec
                .as_array()
                .filter(|p| p.len() == 3)
                .ok_or_else(|| self.corrupt("malformed inline array".to_string()))?;
            let shape = self.parse_shape(&parts[0])?;
            let data = flatten(&parts[2])
                .ok_or_else(|| self.corrupt("inline array holds non-numeric data".to_string()))?;
            return self.checked(shape, data);
        }
        if value.is_array() {
            let shape = list_shape(value);
            let data = flatten(value)
                .ok_or_else(|| self.corrupt("list holds non-numeric data".to_string()))?;
            return self.checked(shape, data);
        }
        if let Some(x) = value.as_f64() {
            return Ok(NdArray {
                shape: Vec::new(),
                data: vec![x],
            });
        }
        Err(self.corrupt(format!("expected an array, found {}", value)))
    }

    fn read_header(&mut self) -> Result<()> {
        let header = self
            .read_bytes(HEADER_LEN)
            .map_err(|_| self.corrupt("file is shorter than the ULM header".to_string()))?;
        if &header[..8] != MAGIC {
            return Err(self.corrupt("not a ULM file (bad magic)".to_string()));
        }
        self.tag = String::from_utf8_lossy(&header[8..24]).trim_end().to_string();

        let word = |i: usize| -> [u8; 8] {
            let mut w = [0u8; 8];
            w.copy_from_slice(&header[24 + 8 * i..32 + 8 * i]);
            w
        };

        let le_version = i64::from_le_bytes(word(0));
        self.little_endian = (1..=MAX_VERSION).contains(&le_version);
        let decode = |w: [u8; 8], le: bool| {
            if le {
                i64::from_le_bytes(w)
            } else {
                i64::from_be_bytes(w)
            }
        };
        self.version = decode(word(0), self.little_endian);
        if !(1..=MAX_VERSION).contains(&self.version) {
            return Err(self.corrupt(format!("unsupported ULM version {}", self.version)));
        }
        let nitems = decode(word(1), self.little_endian);
        let pos0 = decode(word(2), self.little_endian);

        let nitems = usize::try_from(nitems)
            .map_err(|_| self.corrupt(format!("negative item count {}", nitems)))?;
        let pos0 =
            u64::try_from(pos0).map_err(|_| self.corrupt(format!("negative offset {}", pos0)))?;

        if nitems > 0 {
            let table_len = (nitems as u64)
                .checked_mul(8)
                .ok_or_else(|| self.corrupt(format!("item count {} is too large", nitems)))?;
            self.ensure_within(pos0, table_len, "offset table")?;
            self.seek(pos0)?;
            let mut offsets = Vec::with_capacity(nitems);
            for _ in 0..nitems {
                offsets.push(self.read_i64()?);
            }
            self.offsets = offsets;
        }
        Ok(())
    }

    fn parse_array_ref(&self, spec: &Value) -> Result<(Vec<usize>, String, u64)> {
        let parts = spec
            .as_array()
            .filter(|p| p.len() == 3)
            .ok_or_else(|| self.corrupt("malformed array reference".to_string()))?;
        let shape = self.parse_shape(&parts[0])?;
        let dtype = parts[1]
            .as_str()
            .ok_or_else(|| self.corrupt("array dtype is not a string".to_string()))?
            .to_string();
        let offset = parts[2]
            .as_u64()
            .ok_or_else(|| self.corrupt("array offset is not a non-negative integer".to_string()))?;
        Ok((shape, dtype, offset))
    }

    fn parse_shape(&self, value: &Value) -> Result<Vec<usize>> {
        value
            .as_array()
            .and_then(|dims| {
                dims.iter()
                    .map(|d| d.as_u64().and_then(|n| usize::try_from(n).ok()))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| self.corrupt(format!("malformed array shape {}", value)))
    }

    fn read_raw_array(&mut self, shape: Vec<usize>, dtype: &str, offset: u64) -> Result<NdArray> {
        let itemsize = match dtype {
            "float64" | "int64" => 8,
            "float32" | "int32" => 4,
            other => return Err(self.corrupt(format!("unsupported dtype '{}'", other))),
        };
        let nbytes = self
            .element_count(&shape)
            .and_then(|count| count.checked_mul(itemsize))
            .ok_or_else(|| self.corrupt(format!("array shape {:?} is too large", shape)))?;
        self.ensure_within(offset, nbytes as u64, &format!("array of shape {:?}", shape))?;

        self.seek(offset)?;
        let bytes = self.read_bytes(nbytes)?;
        let le = self.little_endian;

        let data = bytes
            .chunks_exact(itemsize)
            .map(|c| match (dtype, le) {
                ("float64", true) => f64::from_le_bytes(to8(c)),
                ("float64", false) => f64::from_be_bytes(to8(c)),
                ("int64", true) => i64::from_le_bytes(to8(c)) as f64,
                ("int64", false) => i64::from_be_bytes(to8(c)) as f64,
                ("float32", true) => f32::from_le_bytes(to4(c)) as f64,
                ("float32", false) => f32::from_be_bytes(to4(c)) as f64,
                ("int32", true) => i32::from_le_bytes(to4(c)) as f64,
                (_, _) => i32::from_be_bytes(to4(c)) as f64,
            })
            .collect();

        Ok(NdArray { shape, data })
    }

    fn checked(&self, shape: Vec<usize>, data: Vec<f64>) -> Result<NdArray> {
        if self.element_count(&shape) != Some(data.len()) {
            return Err(self.corrupt(format!(
                "array of shape {:?} holds {} values",
                shape,
                data.len()
            )));
        }
        Ok(NdArray { shape, data })
    }

    /// 元素个数，溢出时返回 `None`
    fn element_count(&self, shape: &[usize]) -> Option<usize> {
        shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    /// `[pos, pos + nbytes)` 必须在文件内
    fn ensure_within(&self, pos: u64, nbytes: u64, what: &str) -> Result<()> {
        match pos.checked_add(nbytes) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(self.corrupt(format!(
                "{} ({} bytes at offset {}) runs past the end of the file ({} bytes)",
                what, nbytes, pos, self.len
            ))),
        }
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|e| BandsError::FileReadError {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| BandsError::FileReadError {
                path: self.path.display().to_string(),
                source: e,
            })?;
        Ok(buf)
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        let w = to8(&bytes);
        Ok(if self.little_endian {
            i64::from_le_bytes(w)
        } else {
            i64::from_be_bytes(w)
        })
    }

    fn corrupt(&self, reason: String) -> BandsError {
        BandsError::Checkpoint {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

/// 按路径查找字典中的值，兼容子字典键的 `.` 后缀
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| {
        node.get(format!("{}.", key)).or_else(|| node.get(*key))
    })
}

fn to8(c: &[u8]) -> [u8; 8] {
    let mut w = [0u8; 8];
    w.copy_from_slice(&c[..8]);
    w
}

fn to4(c: &[u8]) -> [u8; 4] {
    let mut w = [0u8; 4];
    w.copy_from_slice(&c[..4]);
    w
}

/// 嵌套列表的形状（按第一个元素推断）
fn list_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut node = value;
    while let Some(items) = node.as_array() {
        shape.push(items.len());
        match items.first() {
            Some(first) => node = first,
            None => break,
        }
    }
    shape
}

/// 展平嵌套数值列表
fn flatten(value: &Value) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    fn walk(v: &Value, out: &mut Vec<f64>) -> bool {
        match v {
            Value::Array(items) => items.iter().all(|item| walk(item, out)),
            Value::Bool(b) => {
                out.push(if *b { 1.0 } else { 0.0 });
                true
            }
            other => match other.as_f64() {
                Some(x) => {
                    out.push(x);
                    true
                }
                None => false,
            },
        }
    }
    if walk(value, &mut out) {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// 最小 ULM 写入器：数组按顺序写入，字典在末尾
    pub(crate) struct UlmBuilder {
        pub big_endian: bool,
        body: Vec<u8>,
    }

    impl UlmBuilder {
        pub(crate) fn new() -> Self {
            UlmBuilder {
                big_endian: false,
                body: Vec::new(),
            }
        }

        fn int(&self, n: i64) -> [u8; 8] {
            if self.big_endian {
                n.to_be_bytes()
            } else {
                n.to_le_bytes()
            }
        }

        /// 写入 float64 数组，返回引用
        pub(crate) fn add_f64(&mut self, shape: &[usize], data: &[f64]) -> Value {
            let offset = HEADER_LEN + 8 + self.body.len();
            for x in data {
                let bytes = if self.big_endian {
                    x.to_be_bytes()
                } else {
                    x.to_le_bytes()
                };
                self.body.extend_from_slice(&bytes);
            }
            json!({ "ndarray": [shape, "float64", offset] })
        }

        /// 写入 int64 数组，返回引用
        pub(crate) fn add_i64(&mut self, shape: &[usize], data: &[i64]) -> Value {
            let offset = HEADER_LEN + 8 + self.body.len();
            for n in data {
                let bytes = self.int(*n);
                self.body.extend_from_slice(&bytes);
            }
            json!({ "ndarray": [shape, "int64", offset] })
        }

        /// 组装文件：头 + 单元素偏移表 + 数组 + 字典
        pub(crate) fn finish(self, root: &Value) -> Vec<u8> {
            let json = serde_json::to_vec(root).unwrap();
            let item_offset = (HEADER_LEN + 8 + self.body.len()) as i64;

            let mut out = Vec::new();
            out.extend_from_slice(MAGIC);
            out.extend_from_slice(format!("{:<16}", "GPAW").as_bytes());
            out.extend_from_slice(&self.int(3));
            out.extend_from_slice(&self.int(1));
            out.extend_from_slice(&self.int(HEADER_LEN as i64));
            out.extend_from_slice(&self.int(item_offset));
            out.extend_from_slice(&self.body);
            out.extend_from_slice(&self.int(json.len() as i64));
            out.extend_from_slice(&json);
            out
        }
    }

    /// 写入临时文件，随返回值一起删除
    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    /// 只有文件头的 ULM 文件
    fn header_only(nitems: i64, pos0: i64) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(format!("{:<16}", "GPAW").as_bytes());
        out.extend_from_slice(&3i64.to_le_bytes());
        out.extend_from_slice(&nitems.to_le_bytes());
        out.extend_from_slice(&pos0.to_le_bytes());
        out
    }

    #[test]
    fn test_read_item_and_arrays() {
        let mut b = UlmBuilder::new();
        let cell = b.add_f64(&[3, 3], &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0]);
        let numbers = b.add_i64(&[2], &[31, 33]);
        let root = json!({
            "version": 3,
            "atoms.": { "cell": cell, "numbers": numbers },
            "occupations.": { "fermilevel": 4.25 }
        });
        let file = write_temp(&b.finish(&root));

        let mut ulm = UlmFile::open(file.path()).unwrap();
        assert_eq!(ulm.tag(), "GPAW");
        assert_eq!(ulm.version(), 3);
        assert_eq!(ulm.item_count(), 1);

        let item = ulm.read_item(0).unwrap();
        let fermi = lookup(&item, &["occupations", "fermilevel"]).unwrap();
        assert_eq!(fermi.as_f64(), Some(4.25));

        let cell = lookup(&item, &["atoms", "cell"]).cloned().unwrap();
        let cell = ulm.read_array(&cell).unwrap();
        assert_eq!(cell.shape, vec![3, 3]);
        assert_eq!(cell.rows3().unwrap()[1], [0.0, 2.0, 0.0]);

        let numbers = lookup(&item, &["atoms", "numbers"]).cloned().unwrap();
        assert_eq!(ulm.read_array(&numbers).unwrap().data, vec![31.0, 33.0]);

        assert!(ulm.read_item(1).is_err());
    }

    #[test]
    fn test_big_endian_file() {
        let mut b = UlmBuilder::new();
        b.big_endian = true;
        let eps = b.add_f64(&[1, 2, 2], &[-1.5, 0.5, -1.0, 1.0]);
        let root = json!({ "wave_functions.": { "eigenvalues": eps } });
        let file = write_temp(&b.finish(&root));

        let mut ulm = UlmFile::open(file.path()).unwrap();
        let item = ulm.read_item(0).unwrap();
        let eps = lookup(&item, &["wave_functions", "eigenvalues"]).cloned().unwrap();
        let eps = ulm.read_array(&eps).unwrap().nested3().unwrap();
        assert_eq!(eps, vec![vec![vec![-1.5, 0.5], vec![-1.0, 1.0]]]);
    }

    #[test]
    fn test_bad_magic() {
        let file = write_temp(&[0u8; 64]);
        let err = UlmFile::open(file.path()).err().unwrap();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }

    #[test]
    fn test_truncated_file() {
        let file = write_temp(b"- of Ulm");
        assert!(UlmFile::open(file.path()).is_err());
    }

    #[test]
    fn test_inline_arrays() {
        let file = write_temp(&UlmBuilder::new().finish(&json!({})));
        let mut ulm = UlmFile::open(file.path()).unwrap();

        let nested = ulm.read_array(&json!([[1, 2, 3], [4, 5, 6]])).unwrap();
        assert_eq!(nested.shape, vec![2, 3]);
        assert_eq!(nested.data[5], 6.0);

        let tagged = ulm
            .read_array(&json!({ "__ndarray__": [[2], "float64", [0.5, 1.5]] }))
            .unwrap();
        assert_eq!(tagged.data, vec![0.5, 1.5]);

        let scalar = ulm.read_array(&json!(2.5)).unwrap();
        assert!(scalar.shape.is_empty());

        assert!(ulm.read_array(&json!({ "__ndarray__": [[3], "float64", [1.0]] })).is_err());
        assert!(ulm.read_array(&json!("text")).is_err());
    }

    #[test]
    fn test_huge_item_count_rejected() {
        let file = write_temp(&header_only(1 << 60, HEADER_LEN as i64));
        let err = UlmFile::open(file.path()).err().unwrap();
        assert!(matches!(err, BandsError::Checkpoint { .. }));

        // 乘以 8 溢出
        let file = write_temp(&header_only(i64::MAX, HEADER_LEN as i64));
        let err = UlmFile::open(file.path()).err().unwrap();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }

    #[test]
    fn test_offset_table_past_end_rejected() {
        let mut bytes = header_only(2, HEADER_LEN as i64);
        bytes.extend_from_slice(&0i64.to_le_bytes());
        let file = write_temp(&bytes);
        let err = UlmFile::open(file.path()).err().unwrap();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }

    #[test]
    fn test_oversized_item_rejected() {
        let mut bytes = header_only(1, HEADER_LEN as i64);
        bytes.extend_from_slice(&((HEADER_LEN + 8) as i64).to_le_bytes());
        bytes.extend_from_slice(&(1i64 << 50).to_le_bytes());
        bytes.extend_from_slice(b"{}");
        let file = write_temp(&bytes);

        let mut ulm = UlmFile::open(file.path()).unwrap();
        let err = ulm.read_item(0).unwrap_err();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }

    #[test]
    fn test_huge_array_shape_rejected() {
        let file = write_temp(&UlmBuilder::new().finish(&json!({})));
        let mut ulm = UlmFile::open(file.path()).unwrap();

        let huge = json!({ "ndarray": [[1u64 << 62, 4], "float64", 0] });
        let err = ulm.read_array(&huge).unwrap_err();
        assert!(matches!(err, BandsError::Checkpoint { .. }));

        // 形状合理但数据越过文件末尾
        let past_end = json!({ "ndarray": [[1000, 3], "float64", HEADER_LEN] });
        let err = ulm.read_array(&past_end).unwrap_err();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }
}
