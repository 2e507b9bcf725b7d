//! # 解析器模块
//!
//! 结构文件的读取与写出。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: cif（读写）、poscar（读写）、xyz（只写）

pub mod cif;
pub mod poscar;
pub mod xyz;

use crate::error::{QslabError, Result};
use crate::models::Crystal;
use std::fmt;
use std::fs;
use std::path::Path;

/// 结构输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StructureFormat {
    Cif,
    Poscar,
    Xyz,
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Cif => write!(f, "cif"),
            StructureFormat::Poscar => write!(f, "poscar"),
            StructureFormat::Xyz => write!(f, "xyz"),
        }
    }
}

impl StructureFormat {
    /// 从输出路径推断格式，无法判断时返回 None
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name().and_then(|n| n.to_str())?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "cif" => Some(StructureFormat::Cif),
            "xyz" => Some(StructureFormat::Xyz),
            "vasp" | "poscar" => Some(StructureFormat::Poscar),
            _ if name.starts_with("POSCAR") || name.starts_with("CONTCAR") => {
                Some(StructureFormat::Poscar)
            }
            _ => None,
        }
    }

    /// 格式化结构文本
    pub fn render(&self, crystal: &Crystal) -> String {
        match self {
            StructureFormat::Cif => cif::to_cif_string(crystal),
            StructureFormat::Poscar => poscar::to_poscar_string(crystal),
            StructureFormat::Xyz => xyz::to_xyz_string(crystal),
        }
    }
}

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    if !path.exists() {
        return Err(QslabError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    match StructureFormat::from_path(path) {
        Some(StructureFormat::Cif) => cif::parse_cif_file(path),
        Some(StructureFormat::Poscar) => poscar::parse_poscar_file(path),
        _ => Err(QslabError::UnsupportedFormat(format!(
            "Cannot determine structure format for: {} (expected .cif, .vasp, POSCAR* or CONTCAR*)",
            path.display()
        ))),
    }
}

/// 按格式写出结构文件
pub fn write_structure_file(crystal: &Crystal, path: &Path, format: StructureFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| QslabError::FileWriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    fs::write(path, format.render(crystal)).map_err(|e| QslabError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_slab;
    use crate::models::{Atom, Lattice, MillerIndex, SlabSpec};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_path() {
        let cases = [
            ("bulk.cif", Some(StructureFormat::Cif)),
            ("BULK.CIF", Some(StructureFormat::Cif)),
            ("POSCAR", Some(StructureFormat::Poscar)),
            ("CONTCAR_relaxed", Some(StructureFormat::Poscar)),
            ("slab.vasp", Some(StructureFormat::Poscar)),
            ("view.xyz", Some(StructureFormat::Xyz)),
            ("bulk.res", None),
        ];
        for (name, expected) in cases {
            assert_eq!(StructureFormat::from_path(&PathBuf::from(name)), expected, "{}", name);
        }
    }

    #[test]
    fn test_write_then_parse_poscar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("POSCAR");
        let lattice = Lattice::new([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]).unwrap();
        let crystal = Crystal::new("Po", lattice, vec![Atom::new("Po", [0.0, 0.0, 0.0])]);

        write_structure_file(&crystal, &path, StructureFormat::Poscar).unwrap();
        let parsed = parse_structure_file(&path).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.name, "Po");
    }

    fn assert_same_structure(parsed: &Crystal, original: &Crystal) {
        let (m1, m2) = (parsed.lattice.matrix(), original.lattice.matrix());
        for i in 0..3 {
            for j in 0..3 {
                assert!((m1[i][j] - m2[i][j]).abs() < 1e-6, "lattice {:?} vs {:?}", m1, m2);
            }
        }
        assert_eq!(parsed.len(), original.len());
        for (a, b) in parsed.atoms.iter().zip(&original.atoms) {
            assert_eq!(a.element, b.element);
            for i in 0..3 {
                let d = a.position[i] - b.position[i];
                assert!((d - d.round()).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_generated_slab_survives_export() {
        let lattice = Lattice::from_parameters(3.3, 4.4, 5.5, 75.0, 100.0, 115.0).unwrap();
        let bulk = Crystal::new(
            "tri",
            lattice,
            vec![Atom::new("Ti", [0.1, 0.2, 0.3]), Atom::new("O", [0.6, 0.5, 0.9])],
        );
        let spec = SlabSpec::new(MillerIndex::new(1, 1, 1).unwrap(), 2, 10.0);
        let slab = build_slab(&bulk, spec).unwrap();

        let from_cif = cif::parse_cif_content(&cif::to_cif_string(&slab.crystal), "slab.cif").unwrap();
        assert_same_structure(&from_cif, &slab.crystal);

        let from_poscar =
            poscar::parse_poscar_content(&poscar::to_poscar_string(&slab.crystal), "POSCAR").unwrap();
        assert_same_structure(&from_poscar, &slab.crystal);
    }

    #[test]
    fn test_unsupported_and_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bulk.res");
        fs::write(&path, "TITL x").unwrap();
        assert!(matches!(
            parse_structure_file(&path).unwrap_err(),
            QslabError::UnsupportedFormat(_)
        ));
        assert!(matches!(
            parse_structure_file(&dir.path().join("none.cif")).unwrap_err(),
            QslabError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_xyz_is_write_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("view.xyz");
        fs::write(&path, "0\n\n").unwrap();
        assert!(matches!(
            parse_structure_file(&path).unwrap_err(),
            QslabError::UnsupportedFormat(_)
        ));
    }
}
