//! # 会话持久化
//!
//! 将一次表面能工作流的状态保存为单个 JSON 文档：
//!
//! ```text
//! {
//!   "structures": { "bulk": Crystal?, "slab": Crystal? },
//!   "slab_spec":  SlabSpec?,
//!   "supercell":  [nx, ny, nz],
//!   "parameters": QeParameters,
//!   "results":    { "bulk": EnergyRecord?, "slab": EnergyRecord?,
//!                   "surface_energy": SurfaceEnergyResult? }
//! }
//! ```
//!
//! 读取时晶格经 `Lattice` 的反序列化重新校验，其余参数经各自的 `validate()` 校验。
//!
//! ## 依赖关系
//! - 被 `commands/slab.rs`、`commands/energy.rs`、`commands/session.rs` 使用
//! - 使用 `serde_json`
//! - 使用 `models/`、`qe/params.rs`

use crate::error::{QslabError, Result};
use crate::models::{Crystal, EnergyRecord, SlabSpec, SurfaceEnergyResult};
use crate::qe::QeParameters;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 会话中的结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStructures {
    pub bulk: Option<Crystal>,
    pub slab: Option<Crystal>,
}

/// 会话中的计算结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionResults {
    pub bulk: Option<EnergyRecord>,
    pub slab: Option<EnergyRecord>,
    pub surface_energy: Option<SurfaceEnergyResult>,
}

/// 会话文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub structures: SessionStructures,
    pub slab_spec: Option<SlabSpec>,
    /// 显示用超胞倍数
    pub supercell: [usize; 3],
    pub parameters: QeParameters,
    pub results: SessionResults,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            structures: SessionStructures::default(),
            slab_spec: None,
            supercell: [1, 1, 1],
            parameters: QeParameters::default(),
            results: SessionResults::default(),
        }
    }
}

impl Session {
    /// 读取会话文件
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QslabError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| QslabError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// 读取会话文件，不存在时返回空会话
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Session::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let session: Session = serde_json::from_str(content)?;
        session.validate()?;
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 写出会话文件（格式化 JSON）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| QslabError::FileWriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        fs::write(path, self.to_json()?).map_err(|e| QslabError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// 校验读入的参数
    pub fn validate(&self) -> Result<()> {
        if let Some(spec) = &self.slab_spec {
            spec.validate()?;
        }
        if self.supercell.iter().any(|&n| n == 0) {
            return Err(QslabError::InvalidSupercell(self.supercell));
        }
        self.parameters.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice, MillerIndex, SystemTag};
    use tempfile::tempdir;

    fn sample_session() -> Session {
        let lattice = Lattice::new([[3.9, 0.0, 0.0], [0.0, 3.9, 0.0], [0.0, 0.0, 3.9]]).unwrap();
        let bulk = Crystal::new(
            "Pt",
            lattice,
            vec![
                Atom::new("Pt", [0.0, 0.0, 0.0]),
                Atom::new("Pt", [0.5, 0.5, 0.0]).with_label("Pt2"),
            ],
        );

        let mut session = Session::default();
        session.structures.bulk = Some(bulk);
        session.slab_spec = Some(SlabSpec::new(MillerIndex::new(1, 1, 1).unwrap(), 4, 12.5));
        session.supercell = [2, 2, 1];
        session.parameters.ecutwfc = 55.0;
        session.results.bulk = Some(EnergyRecord::new(SystemTag::Bulk, -123.456789, Some(2)));
        session
    }

    #[test]
    fn test_json_round_trip() {
        let session = sample_session();
        let json = session.to_json().unwrap();
        assert!(json.contains("\"structures\""));
        assert!(json.contains("\"slab_spec\""));
        assert!(json.contains("\"supercell\""));

        let restored = Session::from_json(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs").join("session.json");
        let session = sample_session();

        session.save(&path).unwrap();
        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("none.json");
        assert!(matches!(
            Session::load(&path).unwrap_err(),
            QslabError::FileNotFound { .. }
        ));
        assert_eq!(Session::load_or_default(&path).unwrap(), Session::default());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let session = Session::from_json("{}").unwrap();
        assert_eq!(session.supercell, [1, 1, 1]);
        assert!(session.structures.bulk.is_none());
    }

    #[test]
    fn test_degenerate_lattice_rejected_on_load() {
        let json = r#"{
            "structures": {
                "bulk": {
                    "name": "flat",
                    "lattice": { "matrix": [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]] },
                    "atoms": []
                }
            }
        }"#;
        assert!(Session::from_json(json).is_err());
    }

    #[test]
    fn test_invalid_supercell_rejected() {
        let err = Session::from_json(r#"{ "supercell": [1, 0, 1] }"#).unwrap_err();
        assert!(matches!(err, QslabError::InvalidSupercell([1, 0, 1])));
    }
}
