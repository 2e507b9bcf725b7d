//! # VASP POSCAR 格式解析器
//!
//! 解析与写出 VASP POSCAR/CONTCAR 文件格式。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor (负值表示目标体积)
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! 写出时按连续物种段分组，原子顺序与输入一致，
//! 因此同一元素可能在元素行中出现多次。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QslabError, Result};
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QslabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();
    let parse_error = |reason: String| QslabError::ParseError {
        format: "poscar".to_string(),
        path: default_name.to_string(),
        reason,
    };

    if lines.len() < 8 {
        return Err(parse_error("File too short".to_string()));
    }

    // Line 0: Comment/name
    let name = lines[0].trim().to_string();
    let name = if name.is_empty() {
        default_name.to_string()
    } else {
        name
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| parse_error(format!("Invalid scaling factor '{}'", lines[1].trim())))?;

    // Lines 2-4: Lattice vectors
    let mut raw = [[0.0; 3]; 3];
    for (i, row) in raw.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .take(3)
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(parse_error(format!(
                "Invalid lattice vector at line {}",
                3 + i
            )));
        }
        *row = [parts[0], parts[1], parts[2]];
    }

    // 负缩放因子表示目标体积
    let scale = if scale < 0.0 {
        let volume = Lattice::new(raw)?.volume();
        (scale.abs() / volume).cbrt()
    } else {
        scale
    };
    let lattice = Lattice::new(raw.map(|row| row.map(|x| x * scale)))?;

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5_parts: Vec<&str> = lines[5].split_whitespace().collect();
    if line5_parts.is_empty() {
        return Err(parse_error("Missing element or count line".to_string()));
    }
    let (elements, counts, atom_line_start) = if line5_parts[0].parse::<usize>().is_ok() {
        // VASP 4 format: no element line, only counts
        let counts: Vec<usize> = line5_parts.iter().filter_map(|s| s.parse().ok()).collect();
        let elements: Vec<String> = (0..counts.len()).map(|i| format!("X{}", i + 1)).collect();
        (elements, counts, 6)
    } else {
        // VASP 5+ format: element symbols on line 5, counts on line 6
        let elements: Vec<String> = line5_parts
            .iter()
            .map(|s| s.split('/').next().unwrap_or(s).to_string())
            .collect();
        let counts: Vec<usize> = lines[6]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        (elements, counts, 7)
    };

    if elements.len() != counts.len() {
        return Err(parse_error(format!(
            "{} element symbols but {} atom counts",
            elements.len(),
            counts.len()
        )));
    }

    // Check for "Selective dynamics" line
    let mut coord_line = atom_line_start;
    if lines.len() > coord_line
        && lines[coord_line]
            .trim()
            .to_lowercase()
            .starts_with('s')
    {
        coord_line += 1;
    }

    if lines.len() <= coord_line {
        return Err(parse_error("Missing coordinate type line".to_string()));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    // Parse atom positions
    let total: usize = counts.iter().sum();
    let mut atoms: Vec<Atom> = Vec::with_capacity(total);
    let mut line_idx = coord_line + 1;

    for (elem, &count) in elements.iter().zip(counts.iter()) {
        for _ in 0..count {
            let parts: Vec<f64> = lines
                .get(line_idx)
                .map(|l| {
                    l.split_whitespace()
                        .take(3)
                        .filter_map(|s| s.parse().ok())
                        .collect()
                })
                .unwrap_or_default();

            if parts.len() < 3 {
                return Err(parse_error(format!(
                    "Expected {} atom positions, invalid or missing line {}",
                    total,
                    line_idx + 1
                )));
            }

            let position = if is_cartesian {
                lattice.to_fractional([parts[0] * scale, parts[1] * scale, parts[2] * scale])
            } else {
                [parts[0], parts[1], parts[2]]
            };
            atoms.push(Atom::new(elem.clone(), position));
            line_idx += 1;
        }
    }

    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("poscar".to_string());

    Ok(crystal)
}

/// 连续物种段：[(元素, 个数)]
fn species_runs(crystal: &Crystal) -> Vec<(&str, usize)> {
    let mut runs: Vec<(&str, usize)> = Vec::new();
    for atom in &crystal.atoms {
        match runs.last_mut() {
            Some((element, count)) if *element == atom.element => *count += 1,
            _ => runs.push((&atom.element, 1)),
        }
    }
    runs
}

/// 将 Crystal 转换为 POSCAR 格式字符串
pub fn to_poscar_string(crystal: &Crystal) -> String {
    let runs = species_runs(crystal);

    let mut result = String::new();

    // Line 0: Comment
    result.push_str(&format!("{}\n", crystal.name));

    // Line 1: Scale
    result.push_str("1.0\n");

    // Lines 2-4: Lattice
    for row in crystal.lattice.matrix() {
        result.push_str(&format!(
            "  {:20.12}  {:20.12}  {:20.12}\n",
            row[0], row[1], row[2]
        ));
    }

    // Line 5: Elements
    let elements: Vec<&str> = runs.iter().map(|(e, _)| *e).collect();
    result.push_str(&format!("   {}\n", elements.join("   ")));

    // Line 6: Counts
    let counts: Vec<String> = runs.iter().map(|(_, n)| n.to_string()).collect();
    result.push_str(&format!("   {}\n", counts.join("   ")));

    // Coordinate type
    result.push_str("Direct\n");

    // Atom positions
    for atom in &crystal.atoms {
        let pos = atom.position;
        result.push_str(&format!(
            "  {:18.12}  {:18.12}  {:18.12}\n",
            pos[0], pos[1], pos[2]
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poscar_vasp5() {
        let content = r#"NaCl
1.0
5.64 0.0 0.0
0.0 5.64 0.0
0.0 0.0 5.64
Na Cl
4 4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
0.5 0.0 0.0
0.0 0.5 0.0
0.0 0.0 0.5
0.5 0.5 0.5
"#;
        let crystal = parse_poscar_content(content, "NaCl").unwrap();
        assert_eq!(crystal.name, "NaCl");
        assert_eq!(crystal.atoms.len(), 8);
        assert_eq!(crystal.composition()["Na"], 4);
        assert_eq!(crystal.composition()["Cl"], 4);
        assert_eq!(crystal.source_format.as_deref(), Some("poscar"));
    }

    #[test]
    fn test_parse_poscar_with_scale() {
        let content = r#"Si
2.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Si
2
Direct
0.0 0.0 0.0
0.5 0.5 0.5
"#;
        let crystal = parse_poscar_content(content, "Si").unwrap();
        let (a, _, _, _, _, _) = crystal.lattice.parameters();

        // 2.0 * 2.0 = 4.0
        assert!((a - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_scale_is_volume() {
        let content = "cube\n-27.0\n1 0 0\n0 1 0\n0 0 1\nCu\n1\nDirect\n0 0 0\n";
        let crystal = parse_poscar_content(content, "x").unwrap();
        assert!((crystal.volume() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_cartesian_positions_converted() {
        let content = r#"Fe
1.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 4.0
Fe
1
Cartesian
1.0 0.5 1.0
"#;
        let crystal = parse_poscar_content(content, "Fe").unwrap();
        let p = crystal.atoms[0].position;
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.25).abs() < 1e-12);
        assert!((p[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let lattice = Lattice::new([[4.0, 0.0, 0.0], [1.0, 4.5, 0.0], [0.3, 0.2, 12.0]]).unwrap();
        let atoms = vec![
            Atom::new("O", [0.1, 0.2, 0.0]),
            Atom::new("Ti", [0.0, 0.0, 0.1234567]),
            Atom::new("O", [0.5, 0.5, 0.25]),
            Atom::new("O", [0.5, 0.0, 0.75]),
        ];
        let crystal = Crystal::new("TiO2_slab", lattice, atoms);

        let text = to_poscar_string(&crystal);
        assert!(text.contains("O   Ti   O\n"));
        assert!(text.contains("1   1   2\n"));

        let parsed = parse_poscar_content(&text, "round_trip").unwrap();
        assert_eq!(parsed.name, "TiO2_slab");
        assert_eq!(parsed.atoms.len(), 4);
        for (a, b) in parsed.atoms.iter().zip(&crystal.atoms) {
            assert_eq!(a.element, b.element);
            for i in 0..3 {
                assert!((a.position[i] - b.position[i]).abs() < 1e-6);
            }
        }
        for (ra, rb) in parsed.lattice.matrix().iter().zip(crystal.lattice.matrix()) {
            for i in 0..3 {
                assert!((ra[i] - rb[i]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_parse_poscar_selective_dynamics() {
        let content = r#"Fe with selective
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe
2
Selective dynamics
Direct
0.0 0.0 0.0 T T T
0.5 0.5 0.5 F F F
"#;
        let crystal = parse_poscar_content(content, "Fe").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
    }

    #[test]
    fn test_truncated_positions_rejected() {
        let content = "Fe\n1.0\n2 0 0\n0 2 0\n0 0 2\nFe\n3\nDirect\n0 0 0\n0.5 0.5 0.5\n";
        let err = parse_poscar_content(content, "Fe").unwrap_err();
        assert!(matches!(err, QslabError::ParseError { .. }));
    }

    #[test]
    fn test_degenerate_lattice_rejected() {
        let content = "bad\n1.0\n1 0 0\n2 0 0\n0 0 1\nCu\n1\nDirect\n0 0 0\n";
        let err = parse_poscar_content(content, "bad").unwrap_err();
        assert!(matches!(err, QslabError::DegenerateLattice { .. }));
    }
}
