//! # 赝势文件查找与复制
//!
//! ## 查找规则
//! - 文件名中含元素符号，且符号两侧不是字母（不区分大小写）
//!   例如 `Pt.pbe-n-rrkjus.UPF` 匹配 Pt，`Ptx.upf` 不匹配
//! - 多个候选时按扩展名优先级排序，然后选文件名较短者
//! - 显式指定 (`El=path`) 优先于搜索结果
//!
//! ## 复制规则
//! - 目标已存在且内容相同：直接复用
//! - 目标已存在但内容不同：重命名为 `name_1.ext`、`name_2.ext` ...
//!
//! ## 依赖关系
//! - 被 `commands/input.rs` 调用
//! - 使用 `batch/collector.rs` 列出搜索目录
//! - 使用 `qe/masses.rs` 由物种标签推断元素

use crate::batch::FileCollector;
use crate::error::{QslabError, Result};
use crate::qe::masses;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 扩展名优先级（越靠前越优先）
pub const EXTENSION_PREFERENCE: [&str; 10] = [
    "upf", "UPF", "psp", "PSP", "psf", "PSF", "pseudo", "PSEUDO", "dat", "DAT",
];

/// 复制结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyAction {
    Copied,
    Reused,
    Renamed,
}

/// 单个赝势的复制记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoCopy {
    pub species: String,
    pub source: PathBuf,
    pub file_name: String,
    pub action: CopyAction,
}

/// 文件名中是否包含以非字母为边界的元素符号
pub fn element_in_filename(element: &str, file_name: &str) -> bool {
    if element.is_empty() {
        return false;
    }
    let name = file_name.to_ascii_lowercase();
    let symbol = element.to_ascii_lowercase();
    let bytes = name.as_bytes();

    name.match_indices(&symbol).any(|(start, _)| {
        let end = start + symbol.len();
        let before = start == 0 || !bytes[start - 1].is_ascii_alphabetic();
        let after = end >= bytes.len() || !bytes[end].is_ascii_alphabetic();
        before && after
    })
}

/// 候选文件排序键: (扩展名优先级, 文件名长度)
fn preference(path: &Path) -> (usize, usize) {
    let rank = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| EXTENSION_PREFERENCE.iter().position(|p| *p == ext))
        .unwrap_or(EXTENSION_PREFERENCE.len());
    let len = path.file_name().map(|n| n.len()).unwrap_or(usize::MAX);
    (rank, len)
}

/// 在候选文件中为元素选择最佳赝势
pub fn select_pseudo(element: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    let mut found: Vec<&PathBuf> = candidates
        .iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| element_in_filename(element, n))
                .unwrap_or(false)
        })
        .collect();
    found.sort_by(|a, b| preference(a).cmp(&preference(b)).then_with(|| a.cmp(b)));
    found.first().map(|p| (*p).clone())
}

/// 为每个物种查找赝势文件
///
/// `overrides` 以物种标签为键；未覆盖的物种在 `search_dir` 中查找。
pub fn find_pseudos(
    species: &[String],
    search_dir: Option<&Path>,
    overrides: &BTreeMap<String, PathBuf>,
) -> Result<BTreeMap<String, PathBuf>> {
    let candidates: Vec<PathBuf> = match search_dir {
        Some(dir) if dir.is_dir() => FileCollector::new(dir.to_path_buf()).collect()?,
        Some(dir) => {
            return Err(QslabError::DirectoryNotFound {
                path: dir.display().to_string(),
            })
        }
        None => Vec::new(),
    };

    let mut result = BTreeMap::new();
    for label in species {
        if let Some(path) = overrides.get(label) {
            if !path.is_file() {
                return Err(QslabError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            result.insert(label.clone(), path.clone());
            continue;
        }

        let element = masses::element_symbol(label).unwrap_or(label.as_str());
        let path = select_pseudo(element, &candidates).ok_or_else(|| {
            QslabError::PseudoNotFound {
                element: label.clone(),
            }
        })?;
        result.insert(label.clone(), path);
    }
    Ok(result)
}

/// 物种 -> 文件名（不复制时使用）
pub fn file_names(pseudos: &BTreeMap<String, PathBuf>) -> BTreeMap<String, String> {
    pseudos
        .iter()
        .map(|(species, path)| (species.clone(), file_name_of(path)))
        .collect()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 将赝势复制到目标目录，处理重名冲突
pub fn copy_pseudos(
    pseudos: &BTreeMap<String, PathBuf>,
    dest_dir: &Path,
) -> Result<Vec<PseudoCopy>> {
    fs::create_dir_all(dest_dir).map_err(|e| QslabError::FileWriteError {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    let mut copies = Vec::with_capacity(pseudos.len());
    for (species, source) in pseudos {
        let name = file_name_of(source);
        let dest = dest_dir.join(&name);

        let (file_name, action) = if !dest.exists() {
            copy_file(source, &dest)?;
            (name, CopyAction::Copied)
        } else if same_content(source, &dest)? {
            (name, CopyAction::Reused)
        } else {
            let renamed = next_free_name(dest_dir, &name);
            copy_file(source, &dest_dir.join(&renamed))?;
            (renamed, CopyAction::Renamed)
        };

        copies.push(PseudoCopy {
            species: species.clone(),
            source: source.clone(),
            file_name,
            action,
        });
    }
    Ok(copies)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| QslabError::FileWriteError {
        path: to.display().to_string(),
        source: e,
    })?;
    Ok(())
}

fn same_content(a: &Path, b: &Path) -> Result<bool> {
    let read = |p: &Path| {
        fs::read(p).map_err(|e| QslabError::FileReadError {
            path: p.display().to_string(),
            source: e,
        })
    };
    Ok(read(a)? == read(b)?)
}

/// `name.ext` -> 第一个不存在的 `name_N.ext`
fn next_free_name(dir: &Path, name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut idx = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, idx, ext);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        idx += 1;
    }
}

/// 写入输入文件的 pseudo_dir 字符串
///
/// 绝对路径与 `./`、`../` 开头的相对路径原样保留，其余相对路径加 `./` 前缀。
pub fn pseudo_dir_for_input(pseudo_dir: &str) -> String {
    let dir = pseudo_dir.trim();
    let dir = if dir.is_empty() { "./pseudo" } else { dir };

    if Path::new(dir).is_absolute()
        || dir.starts_with('/')
        || dir.starts_with("./")
        || dir.starts_with("../")
    {
        dir.to_string()
    } else {
        format!("./{}", dir)
    }
}

/// 赝势复制的目标目录（相对路径以输入文件所在目录为基准）
pub fn pseudo_dest_dir(input_dir: &Path, pseudo_dir: &str) -> PathBuf {
    let dir = Path::new(pseudo_dir.trim());
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        input_dir.join(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_element_boundaries() {
        assert!(element_in_filename("Pt", "Pt.pbe-n-rrkjus.UPF"));
        assert!(element_in_filename("O", "o_pbe_v1.2.uspp.F.UPF"));
        assert!(element_in_filename("Fe", "pseudo-fe.upf"));
        assert!(!element_in_filename("O", "Os.pbe.UPF"));
        assert!(!element_in_filename("S", "Si.pz-vbc.UPF"));
        assert!(!element_in_filename("Pt", "Ptx.upf"));
    }

    #[test]
    fn test_extension_and_length_preference() {
        let candidates = vec![
            PathBuf::from("Pt.dat"),
            PathBuf::from("Pt.pbe-long-name.UPF"),
            PathBuf::from("Pt.pz.upf"),
            PathBuf::from("Pt.upf"),
            PathBuf::from("Pt.psf"),
        ];
        assert_eq!(select_pseudo("Pt", &candidates), Some(PathBuf::from("Pt.upf")));

        let candidates = vec![PathBuf::from("Pt.dat"), PathBuf::from("Pt.psf")];
        assert_eq!(select_pseudo("Pt", &candidates), Some(PathBuf::from("Pt.psf")));
        assert_eq!(select_pseudo("Au", &candidates), None);
    }

    #[test]
    fn test_find_pseudos_with_overrides() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "Ti.pbe-spn-rrkjus.UPF", "ti");
        touch(dir.path(), "O.pbe-n-kjpaw.UPF", "o");
        let custom = touch(dir.path(), "my_oxygen.pseudo", "custom");

        let species = vec!["Ti".to_string(), "O".to_string()];
        let found = find_pseudos(&species, Some(dir.path()), &BTreeMap::new()).unwrap();
        assert_eq!(found["O"].file_name().unwrap(), "O.pbe-n-kjpaw.UPF");

        let mut overrides = BTreeMap::new();
        overrides.insert("O".to_string(), custom.clone());
        let found = find_pseudos(&species, Some(dir.path()), &overrides).unwrap();
        assert_eq!(found["O"], custom);

        let err = find_pseudos(&["Pt".to_string()], Some(dir.path()), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, QslabError::PseudoNotFound { ref element } if element == "Pt"));
    }

    #[test]
    fn test_copy_reuse_and_rename() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let pt = touch(src.path(), "Pt.upf", "platinum");
        let o = touch(src.path(), "O.upf", "oxygen");

        touch(dest.path(), "Pt.upf", "platinum");
        touch(dest.path(), "O.upf", "something else");
        touch(dest.path(), "O_1.upf", "taken");

        let mut pseudos = BTreeMap::new();
        pseudos.insert("Pt".to_string(), pt);
        pseudos.insert("O".to_string(), o);

        let copies = copy_pseudos(&pseudos, dest.path()).unwrap();
        let by_species: BTreeMap<_, _> =
            copies.iter().map(|c| (c.species.as_str(), c)).collect();

        assert_eq!(by_species["Pt"].action, CopyAction::Reused);
        assert_eq!(by_species["Pt"].file_name, "Pt.upf");
        assert_eq!(by_species["O"].action, CopyAction::Renamed);
        assert_eq!(by_species["O"].file_name, "O_2.upf");
        assert_eq!(fs::read_to_string(dest.path().join("O_2.upf")).unwrap(), "oxygen");
    }

    #[test]
    fn test_copy_into_new_directory() {
        let src = tempdir().unwrap();
        let root = tempdir().unwrap();
        let pt = touch(src.path(), "Pt.upf", "platinum");
        let dest = root.path().join("pseudo");

        let mut pseudos = BTreeMap::new();
        pseudos.insert("Pt".to_string(), pt);
        let copies = copy_pseudos(&pseudos, &dest).unwrap();

        assert_eq!(copies[0].action, CopyAction::Copied);
        assert!(dest.join("Pt.upf").is_file());
    }

    #[test]
    fn test_pseudo_dir_for_input() {
        assert_eq!(pseudo_dir_for_input("/opt/pseudo"), "/opt/pseudo");
        assert_eq!(pseudo_dir_for_input("./pseudo"), "./pseudo");
        assert_eq!(pseudo_dir_for_input("../shared/pp"), "../shared/pp");
        assert_eq!(pseudo_dir_for_input("pseudo"), "./pseudo");
        assert_eq!(pseudo_dir_for_input(""), "./pseudo");
        assert_eq!(
            pseudo_dest_dir(Path::new("/work/calc"), "pseudo"),
            PathBuf::from("/work/calc/pseudo")
        );
    }
}
