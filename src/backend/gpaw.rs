//! # GPAW 子进程后端
//!
//! 通过 Python 调用 GPAW 加载检查点（可选做定带计算），
//! 脚本在标准输出打印一个 JSON 快照。
//!
//! ## 协议
//! ```text
//! python -c <SCRIPT> <file.gpw> [<path pattern> <npoints>]
//! → {"fermi_level", "cell", "symbols", "kpts", "weights", "eigenvalues", "special_points"}
//! ```
//!
//! 配置中的自定义高对称点与 GPAW 给出的点表合并，同名覆盖。
//!
//! ## 依赖关系
//! - 使用 `models/snapshot.rs`, `backend/snapshot.rs`, `bands/kpath.rs`
//! - 使用 `serde_json` 解析输出，`tempfile` 承接子进程输出

use crate::backend::{Backend, Calculation};
use crate::bands::kpath::{self, SpecialPoint};
use crate::config::BandPathRequest;
use crate::error::{BandsError, Result};
use crate::models::{Lattice, Snapshot};

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// 轮询子进程状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 在子进程中运行的 Python 脚本
const SCRIPT: &str = r#"
import json, sys
from gpaw import GPAW

calc = GPAW(sys.argv[1], txt=None)
if len(sys.argv) > 3:
    bp = calc.atoms.cell.bandpath(path=sys.argv[2], npoints=int(sys.argv[3]))
    calc = calc.fixed_density(kpts=bp, symmetry='off', txt=None)

kpts = calc.get_ibz_k_points()
nspins = calc.get_number_of_spins()
special = calc.atoms.cell.bandpath(npoints=0).special_points
json.dump({
    'fermi_level': float(calc.get_fermi_level()),
    'cell': calc.atoms.cell[:].tolist(),
    'symbols': calc.atoms.get_chemical_symbols(),
    'kpts': kpts.tolist(),
    'weights': calc.get_k_point_weights().tolist(),
    'eigenvalues': [[calc.get_eigenvalues(kpt=k, spin=s).tolist()
                     for k in range(len(kpts))] for s in range(nspins)],
    'special_points': {name: [float(x) for x in k] for name, k in special.items()},
}, sys.stdout)
"#;

/// GPAW 后端
#[derive(Debug, Clone)]
pub struct GpawBackend {
    python: String,
    script: String,
    timeout: Option<Duration>,
    extra_special_points: Vec<SpecialPoint>,
}

impl GpawBackend {
    pub fn new(
        python: impl Into<String>,
        timeout_secs: Option<u64>,
        extra_special_points: Vec<SpecialPoint>,
    ) -> Self {
        GpawBackend {
            python: python.into(),
            script: SCRIPT.to_string(),
            timeout: timeout_secs.map(Duration::from_secs),
            extra_special_points,
        }
    }

    /// 运行脚本并解析快照
    fn run(&self, path: &Path, extra: &[String]) -> Result<Snapshot> {
        let mut args = vec![
            "-c".to_string(),
            self.script.clone(),
            path.display().to_string(),
        ];
        args.extend_from_slice(extra);

        let stdout = run_with_timeout(&self.python, &args, self.timeout)?;

        let mut snapshot: Snapshot =
            serde_json::from_slice(&stdout).map_err(|e| BandsError::Checkpoint {
                path: path.display().to_string(),
                reason: format!("unexpected output from GPAW: {}", e),
            })?;
        snapshot.validate(path)?;
        self.merge_special_points(&mut snapshot);
        Ok(snapshot)
    }

    /// GPAW 未给出点表时按晶格类型推断，再叠加自定义点
    fn merge_special_points(&self, snapshot: &mut Snapshot) {
        if self.extra_special_points.is_empty() {
            return;
        }
        let mut points: Vec<SpecialPoint> = if snapshot.special_points.is_empty() {
            kpath::special_points(Lattice::from_vectors(snapshot.cell).bravais())
        } else {
            std::mem::take(&mut snapshot.special_points).into_iter().collect()
        };
        kpath::merge_special_points(&mut points, &self.extra_special_points);
        snapshot.special_points = points.into_iter().collect();
    }
}

impl Backend for GpawBackend {
    fn name(&self) -> &'static str {
        "gpaw"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Calculation>> {
        Ok(Box::new(self.run(path, &[])?))
    }

    fn fixed_density(
        &self,
        path: &Path,
        request: &BandPathRequest,
    ) -> Result<Box<dyn Calculation>> {
        request.segments()?;
        let extra = [request.pattern.clone(), request.npoints.to_string()];
        Ok(Box::new(self.run(path, &extra)?))
    }
}

/// 运行外部命令，输出写入临时文件以免管道阻塞；超时则终止子进程
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let out_file = scratch_file()?;
    let err_file = scratch_file()?;

    let result = spawn_and_wait(program, args, timeout, &out_file, &err_file);

    // 临时文件在离开作用域时删除
    let stdout = fs::read(out_file.path()).unwrap_or_default();
    let stderr = fs::read_to_string(err_file.path()).unwrap_or_default();

    match result? {
        true => Ok(stdout),
        false => Err(BandsError::CommandFailed {
            command: program.to_string(),
            stderr: stderr.trim().to_string(),
        }),
    }
}

/// 返回子进程是否成功退出
fn spawn_and_wait(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    out_file: &NamedTempFile,
    err_file: &NamedTempFile,
) -> Result<bool> {
    let create = |f: &NamedTempFile| {
        f.reopen().map_err(|e| BandsError::FileWriteError {
            path: f.path().display().to_string(),
            source: e,
        })
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(create(out_file)?))
        .stderr(Stdio::from(create(err_file)?))
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => BandsError::CommandNotFound {
                command: program.to_string(),
            },
            _ => BandsError::CommandFailed {
                command: program.to_string(),
                stderr: e.to_string(),
            },
        })?;

    let started = Instant::now();
    loop {
        let status = child.try_wait().map_err(|e| BandsError::CommandFailed {
            command: program.to_string(),
            stderr: e.to_string(),
        })?;
        if let Some(status) = status {
            return Ok(status.success());
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                child.kill().ok();
                child.wait().ok();
                return Err(BandsError::Timeout {
                    command: program.to_string(),
                    seconds: limit.as_secs(),
                });
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn scratch_file() -> Result<NamedTempFile> {
    NamedTempFile::new().map_err(|e| BandsError::FileWriteError {
        path: std::env::temp_dir().display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_interpreter() {
        let backend = GpawBackend::new("gpwbands-no-such-python", Some(5), Vec::new());
        let err = backend.load(Path::new("x.gpw")).err().unwrap();
        assert!(matches!(err, BandsError::CommandNotFound { .. }));
    }

    #[test]
    fn test_fixed_density_rejects_bad_path_before_spawning() {
        let backend = GpawBackend::new("gpwbands-no-such-python", Some(5), Vec::new());
        let request = BandPathRequest {
            pattern: "g-x".to_string(),
            npoints: 10,
        };
        let err = backend
            .fixed_density(Path::new("x.gpw"), &request)
            .err()
            .unwrap();
        assert!(matches!(err, BandsError::InvalidBandPath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_captures_output() {
        let args = vec!["-c".to_string(), "printf '{\"a\": 1}'".to_string()];
        let out = run_with_timeout("sh", &args, Some(Duration::from_secs(10))).unwrap();
        assert_eq!(out, br#"{"a": 1}"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_failure_and_timeout() {
        let args = vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()];
        match run_with_timeout("sh", &args, None) {
            Err(BandsError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("expected failure, got {:?}", other),
        }

        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        let err = run_with_timeout("sh", &args, Some(Duration::from_millis(300))).unwrap_err();
        assert!(matches!(err, BandsError::Timeout { .. }));
    }

    /// 伪装成 GPAW 的 shell 脚本：忽略参数，直接打印快照
    #[cfg(unix)]
    fn scripted_backend(json: &str, extra: Vec<SpecialPoint>) -> GpawBackend {
        let mut backend = GpawBackend::new("sh", Some(10), extra);
        backend.script = format!("printf '%s' '{}'", json);
        backend
    }

    #[cfg(unix)]
    const CUBIC_SNAPSHOT: &str = r#"{"fermi_level": 0.5, "cell": [[2,0,0],[0,2,0],[0,0,2]], "symbols": ["Po"], "kpts": [[0,0,0],[0.5,0,0]], "weights": [0.5,0.5], "eigenvalues": [[[-1.0],[1.0]]], "special_points": {"G": [0,0,0], "X": [0.5,0,0]}}"#;

    #[cfg(unix)]
    #[test]
    fn test_load_merges_custom_special_points() {
        let extra = vec![
            ("X".to_string(), [0.0, 0.5, 0.0]),
            ("Q".to_string(), [0.25, 0.25, 0.0]),
        ];
        let backend = scripted_backend(CUBIC_SNAPSHOT, extra);
        let snapshot = backend.run(Path::new("fake.gpw"), &[]).unwrap();

        assert_eq!(snapshot.special_points.len(), 3);
        assert_eq!(snapshot.special_points["G"], [0.0, 0.0, 0.0]);
        assert_eq!(snapshot.special_points["X"], [0.0, 0.5, 0.0]);
        assert_eq!(snapshot.special_points["Q"], [0.25, 0.25, 0.0]);

        let calc = backend.load(Path::new("fake.gpw")).unwrap();
        assert_eq!(calc.fermi_level(), 0.5);
    }

    #[cfg(unix)]
    #[test]
    fn test_custom_points_fill_missing_table() {
        let json = CUBIC_SNAPSHOT.replace(r#""special_points": {"G": [0,0,0], "X": [0.5,0,0]}"#, r#""special_points": {}"#);
        let backend = scripted_backend(&json, vec![("Q".to_string(), [0.25, 0.25, 0.0])]);
        let snapshot = backend.run(Path::new("fake.gpw"), &[]).unwrap();

        // 简单立方表加上 Q
        assert!(snapshot.special_points.contains_key("G"));
        assert!(snapshot.special_points.contains_key("R"));
        assert_eq!(snapshot.special_points["Q"], [0.25, 0.25, 0.0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_without_custom_points_table_is_kept() {
        let backend = scripted_backend(CUBIC_SNAPSHOT, Vec::new());
        let snapshot = backend.run(Path::new("fake.gpw"), &[]).unwrap();
        assert_eq!(snapshot.special_points.len(), 2);
        assert_eq!(snapshot.special_points["X"], [0.5, 0.0, 0.0]);
    }
}
