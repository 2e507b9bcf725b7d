//! # pw.x 输入文件生成
//!
//! 由结构与类型化参数生成 pw.x 输入文本。
//!
//! ## 输出结构
//! ```text
//! &CONTROL     calculation, prefix, outdir, pseudo_dir
//! &SYSTEM      ibrav = 0, nat, ntyp, ecutwfc, ecutrho, [nspin], [nbnd],
//!              occupations, [smearing, degauss], [starting_magnetization(i)]
//! &ELECTRONS   conv_thr
//! ATOMIC_SPECIES
//! CELL_PARAMETERS angstrom
//! ATOMIC_POSITIONS angstrom
//! K_POINTS automatic
//! ```
//!
//! ## 省略规则
//! - nspin 仅在为 2 时写出
//! - nbnd 仅在设置且 > 0 时写出
//! - smearing/degauss 仅在 occupations = smearing 时写出
//! - starting_magnetization(i) 仅在 nspin = 2、i <= ntyp 且 |值| > 1e-12 时写出
//!
//! 输入结构按原样写出，不做超胞扩展。
//!
//! ## 依赖关系
//! - 被 `commands/input.rs` 调用
//! - 使用 `qe/params.rs`、`qe/masses.rs`、`qe/pseudo.rs`

use crate::error::{QslabError, Result};
use crate::models::{Crystal, SystemTag};
use crate::qe::params::{Occupations, QeParameters};
use crate::qe::{masses, pseudo};

use std::collections::BTreeMap;
use std::fmt::Write;

/// 磁化阈值，低于此值不写出
const MAGNETIZATION_EPS: f64 = 1e-12;

/// Fortran namelist 实数格式
fn real(x: f64) -> String {
    if x != 0.0 && (x.abs() < 1e-4 || x.abs() >= 1e6) {
        format!("{:e}", x)
    } else {
        format!("{}", x)
    }
}

/// 生成 pw.x 输入文本
///
/// `pseudos` 为物种标签 -> 赝势文件名（不含目录）。
pub fn compose_input(
    crystal: &Crystal,
    params: &QeParameters,
    system: SystemTag,
    pseudos: &BTreeMap<String, String>,
) -> Result<String> {
    params.validate()?;
    if crystal.is_empty() {
        return Err(QslabError::InvalidArgument(format!(
            "structure '{}' has no atoms",
            crystal.name
        )));
    }

    let species = crystal.species();
    let mut species_lines = Vec::with_capacity(species.len());
    for label in &species {
        let mass = masses::atomic_mass(label).ok_or_else(|| {
            QslabError::InvalidParameter(format!("unknown atomic mass for species '{}'", label))
        })?;
        let pseudo_file = pseudos
            .get(label)
            .ok_or_else(|| QslabError::PseudoNotFound {
                element: label.clone(),
            })?;
        species_lines.push(format!("{} {:.6} {}", label, mass, pseudo_file));
    }

    let mut out = String::new();
    render_deck(&mut out, crystal, params, system, &species_lines)
        .map_err(|e| QslabError::Other(format!("failed to format input deck: {}", e)))?;
    Ok(out)
}

fn render_deck(
    out: &mut String,
    crystal: &Crystal,
    params: &QeParameters,
    system: SystemTag,
    species_lines: &[String],
) -> std::fmt::Result {
    write_namelists(out, crystal, params, species_lines.len())?;

    writeln!(out, "ATOMIC_SPECIES")?;
    for line in species_lines {
        writeln!(out, "{}", line)?;
    }

    writeln!(out, "\nCELL_PARAMETERS angstrom")?;
    for row in crystal.lattice.matrix() {
        writeln!(out, "{:.8} {:.8} {:.8}", row[0], row[1], row[2])?;
    }

    writeln!(out, "\nATOMIC_POSITIONS angstrom")?;
    for (atom, pos) in crystal.atoms.iter().zip(crystal.cartesian_positions()) {
        writeln!(out, "{} {:.8} {:.8} {:.8}", atom.element, pos[0], pos[1], pos[2])?;
    }

    let [kx, ky, kz] = params.kpoints_for(system);
    writeln!(out, "\nK_POINTS automatic")?;
    writeln!(out, "{} {} {} 0 0 0", kx, ky, kz)
}

fn write_namelists(
    out: &mut String,
    crystal: &Crystal,
    params: &QeParameters,
    ntyp: usize,
) -> std::fmt::Result {
    writeln!(out, "&CONTROL")?;
    writeln!(out, "  calculation = '{}',", params.calculation)?;
    writeln!(out, "  prefix = '{}',", params.prefix)?;
    writeln!(out, "  outdir = '{}',", params.outdir)?;
    writeln!(
        out,
        "  pseudo_dir = '{}',",
        pseudo::pseudo_dir_for_input(&params.pseudo_dir)
    )?;
    writeln!(out, "/")?;

    writeln!(out, "&SYSTEM")?;
    writeln!(out, "  ibrav = 0,")?;
    writeln!(out, "  nat = {},", crystal.len())?;
    writeln!(out, "  ntyp = {},", ntyp)?;
    writeln!(out, "  ecutwfc = {},", real(params.ecutwfc))?;
    writeln!(out, "  ecutrho = {},", real(params.ecutrho))?;
    if params.nspin == 2 {
        writeln!(out, "  nspin = 2,")?;
    }
    if let Some(nbnd) = params.nbnd.filter(|&n| n > 0) {
        writeln!(out, "  nbnd = {},", nbnd)?;
    }
    writeln!(out, "  occupations = '{}',", params.occupations)?;
    if params.occupations == Occupations::Smearing {
        writeln!(out, "  smearing = '{}',", params.smearing)?;
        writeln!(out, "  degauss = {},", real(params.degauss))?;
    }
    if params.nspin == 2 {
        for (i, &m) in params.starting_magnetization.iter().take(ntyp).enumerate() {
            if m.abs() > MAGNETIZATION_EPS {
                writeln!(out, "  starting_magnetization({}) = {},", i + 1, real(m))?;
            }
        }
    }
    writeln!(out, "/")?;

    writeln!(out, "&ELECTRONS")?;
    writeln!(out, "  conv_thr = {},", real(params.conv_thr))?;
    writeln!(out, "/")?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::qe::params::Smearing;

    fn tio2() -> Crystal {
        let lattice = Lattice::from_parameters(4.6, 4.6, 2.96, 90.0, 90.0, 90.0).unwrap();
        Crystal::new(
            "TiO2",
            lattice,
            vec![
                Atom::new("Ti", [0.0, 0.0, 0.0]),
                Atom::new("O", [0.3, 0.3, 0.0]),
                Atom::new("O", [0.7, 0.7, 0.0]),
                Atom::new("Ti", [0.5, 0.5, 0.5]),
            ],
        )
    }

    fn pseudos() -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("Ti".to_string(), "Ti.pbe.UPF".to_string());
        m.insert("O".to_string(), "O.pbe.UPF".to_string());
        m
    }

    #[test]
    fn test_default_deck_omissions() {
        let deck = compose_input(&tio2(), &QeParameters::default(), SystemTag::Bulk, &pseudos())
            .unwrap();

        assert!(deck.contains("calculation = 'scf',"));
        assert!(deck.contains("pseudo_dir = './pseudo',"));
        assert!(deck.contains("nat = 4,"));
        assert!(deck.contains("ntyp = 2,"));
        assert!(deck.contains("ecutwfc = 40,"));
        assert!(deck.contains("conv_thr = 1e-8,"));
        assert!(deck.contains("occupations = 'fixed',"));
        assert!(!deck.contains("nspin"));
        assert!(!deck.contains("nbnd"));
        assert!(!deck.contains("smearing"));
        assert!(!deck.contains("degauss"));
        assert!(!deck.contains("starting_magnetization"));
        assert!(deck.contains("K_POINTS automatic\n4 4 1 0 0 0\n"));
    }

    #[test]
    fn test_deck_section_order() {
        let deck = compose_input(&tio2(), &QeParameters::default(), SystemTag::Bulk, &pseudos())
            .unwrap();
        let sections = [
            "&CONTROL",
            "&SYSTEM",
            "&ELECTRONS",
            "ATOMIC_SPECIES",
            "CELL_PARAMETERS angstrom",
            "ATOMIC_POSITIONS angstrom",
            "K_POINTS automatic",
        ];
        let positions: Vec<usize> = sections.iter().map(|s| deck.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(deck.contains("4.60000000 0.00000000 0.00000000\n"));
        assert!(deck.ends_with("4 4 1 0 0 0\n"));
    }

    #[test]
    fn test_species_in_first_appearance_order() {
        let deck = compose_input(&tio2(), &QeParameters::default(), SystemTag::Bulk, &pseudos())
            .unwrap();
        let ti = deck.find("Ti 47.867000 Ti.pbe.UPF").unwrap();
        let o = deck.find("O 15.999000 O.pbe.UPF").unwrap();
        assert!(ti < o);
        assert!(deck.contains("O 1.38000000 1.38000000 0.00000000"));
    }

    #[test]
    fn test_only_nonzero_magnetization_emitted() {
        let mut params = QeParameters::default();
        params.nspin = 2;
        params.starting_magnetization = vec![0.0, 0.5, 0.0];

        let deck = compose_input(&tio2(), &params, SystemTag::Bulk, &pseudos()).unwrap();
        assert!(deck.contains("nspin = 2,"));
        assert!(deck.contains("starting_magnetization(2) = 0.5,"));
        assert!(!deck.contains("starting_magnetization(1)"));
        assert!(!deck.contains("starting_magnetization(3)"));
    }

    #[test]
    fn test_magnetization_ignored_without_spin() {
        let mut params = QeParameters::default();
        params.starting_magnetization = vec![1.0, 0.5];
        let deck = compose_input(&tio2(), &params, SystemTag::Bulk, &pseudos()).unwrap();
        assert!(!deck.contains("starting_magnetization"));
    }

    #[test]
    fn test_smearing_block_and_nbnd() {
        let mut params = QeParameters::default();
        params.occupations = Occupations::Smearing;
        params.smearing = Smearing::MethfesselPaxton;
        params.degauss = 0.02;
        params.nbnd = Some(32);

        let deck = compose_input(&tio2(), &params, SystemTag::Bulk, &pseudos()).unwrap();
        assert!(deck.contains("occupations = 'smearing',"));
        assert!(deck.contains("smearing = 'methfessel-paxton',"));
        assert!(deck.contains("degauss = 0.02,"));
        assert!(deck.contains("nbnd = 32,"));

        params.nbnd = Some(0);
        let deck = compose_input(&tio2(), &params, SystemTag::Bulk, &pseudos()).unwrap();
        assert!(!deck.contains("nbnd"));
    }

    #[test]
    fn test_slab_kpoints() {
        let mut params = QeParameters::default();
        params.kpoints = [8, 8, 1];
        let deck = compose_input(&tio2(), &params, SystemTag::Slab, &pseudos()).unwrap();
        assert!(deck.contains("K_POINTS automatic\n1 1 1 0 0 0\n"));

        params.custom_slab_kpoints = true;
        let deck = compose_input(&tio2(), &params, SystemTag::Slab, &pseudos()).unwrap();
        assert!(deck.contains("K_POINTS automatic\n8 8 1 0 0 0\n"));
    }

    #[test]
    fn test_missing_pseudo_or_mass() {
        let mut partial = pseudos();
        partial.remove("O");
        let err = compose_input(&tio2(), &QeParameters::default(), SystemTag::Bulk, &partial)
            .unwrap_err();
        assert!(matches!(err, QslabError::PseudoNotFound { ref element } if element == "O"));

        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        let unknown = Crystal::new("Xx", lattice, vec![Atom::new("Qq", [0.0; 3])]);
        let err = compose_input(&unknown, &QeParameters::default(), SystemTag::Bulk, &pseudos())
            .unwrap_err();
        assert!(matches!(err, QslabError::InvalidParameter(_)));
    }
}
