//! # input 命令实现
//!
//! 生成 pw.x 输入文件。
//!
//! ## 功能
//! - 读取结构与 TOML 参数文件
//! - 查找赝势（搜索目录 + 显式指定）
//! - 可选复制赝势到 pseudo_dir（复用相同文件，冲突时重命名）
//! - 写出输入文件
//!
//! ## 依赖关系
//! - 使用 `cli/input.rs` 定义的参数
//! - 使用 `qe/`, `parsers/`
//! - 使用 `utils/output.rs`

use crate::cli::input::InputArgs;
use crate::error::{QslabError, Result};
use crate::models::SystemTag;
use crate::parsers;
use crate::qe::pseudo::{self, CopyAction};
use crate::qe::{compose_input, QeParameters};
use crate::utils::output;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 执行 input 命令
pub fn execute(args: InputArgs) -> Result<()> {
    output::print_header("Composing pw.x Input");

    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "'{}' exists (use --overwrite to replace it)",
            args.output.display()
        ));
        return Ok(());
    }

    let mut params = match args.params {
        Some(ref path) => {
            let params = QeParameters::load_toml(path)?;
            output::print_info(&format!("Parameters loaded from '{}'", path.display()));
            params
        }
        None => QeParameters::default(),
    };
    params.custom_slab_kpoints |= args.custom_kpoints;
    params.copy_pseudos |= args.copy_pseudos;
    params.validate()?;

    let system = SystemTag::from(args.system);
    let crystal = parsers::parse_structure_file(&args.structure)?;
    super::print_structure_summary(&crystal, &args.structure);

    // 赝势查找
    let search_dir = args
        .pseudo_search
        .clone()
        .or_else(|| params.pseudo_search_dir.clone());
    let overrides: BTreeMap<String, PathBuf> = args.pseudos.iter().cloned().collect();
    let species = crystal.species();
    let found = pseudo::find_pseudos(&species, search_dir.as_deref(), &overrides)?;
    for (label, path) in &found {
        output::print_kv(&format!("Pseudo {}", label), &path.display().to_string());
    }

    let file_names = if params.copy_pseudos {
        copy_into_pseudo_dir(&found, &args.output, &params.pseudo_dir)?
    } else {
        pseudo::file_names(&found)
    };

    let deck = compose_input(&crystal, &params, system, &file_names)?;
    write_deck(&args.output, &deck)?;

    let [kx, ky, kz] = params.kpoints_for(system);
    output::print_kv("Calculation", &params.calculation.to_string());
    output::print_kv("System", &system.to_string());
    output::print_kv("K-points", &format!("{} {} {}", kx, ky, kz));
    output::print_kv(
        "pseudo_dir",
        &pseudo::pseudo_dir_for_input(&params.pseudo_dir),
    );
    output::print_done(&format!(
        "Input for {} atoms ({} species) written to '{}'",
        crystal.len(),
        species.len(),
        args.output.display()
    ));
    Ok(())
}

/// 复制赝势到输入文件旁的 pseudo_dir，返回 物种 -> 文件名
fn copy_into_pseudo_dir(
    found: &BTreeMap<String, PathBuf>,
    output_path: &Path,
    pseudo_dir: &str,
) -> Result<BTreeMap<String, String>> {
    let input_dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let dest = pseudo::pseudo_dest_dir(input_dir, pseudo_dir);

    let copies = pseudo::copy_pseudos(found, &dest)?;
    for copy in &copies {
        let target = dest.join(&copy.file_name);
        match copy.action {
            CopyAction::Copied => output::print_conversion(
                &copy.source.display().to_string(),
                &target.display().to_string(),
            ),
            CopyAction::Reused => output::print_skip(&format!(
                "Identical pseudo already present: {}",
                target.display()
            )),
            CopyAction::Renamed => output::print_warning(&format!(
                "Name conflict, copied {} as {}",
                copy.source.display(),
                target.display()
            )),
        }
    }

    Ok(copies
        .into_iter()
        .map(|c| (c.species, c.file_name))
        .collect())
}

fn write_deck(path: &Path, deck: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| QslabError::FileWriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    fs::write(path, deck).map_err(|e| QslabError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
