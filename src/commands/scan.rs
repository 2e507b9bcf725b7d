//! # scan 命令实现
//!
//! 对 max |index| <= N 的全部互质 Miller 指数并行构建切片并汇总。
//!
//! ## 功能
//! - 枚举 Miller 指数（不做对称约化）
//! - 基于 `BatchRunner` 并行构建
//! - 终端表格 (tabled) 与 CSV 导出
//! - 可选将每个切片写入输出目录
//!
//! ## 依赖关系
//! - 使用 `cli/slab.rs` 定义的 ScanArgs
//! - 使用 `batch/`, `builder/`, `parsers/`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, ProcessResult};
use crate::builder::SlabGenerator;
use crate::cli::slab::ScanArgs;
use crate::error::{QslabError, Result};
use crate::models::slab::MAX_MILLER_INDEX;
use crate::models::{Crystal, MillerIndex, Slab, SlabSpec};
use crate::parsers::{self, StructureFormat};
use crate::utils::output;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 扫描结果行
#[derive(Debug, Clone, Tabled)]
struct ScanRow {
    #[tabled(rename = "hkl")]
    hkl: String,
    #[tabled(rename = "Atoms")]
    atoms: usize,
    #[tabled(rename = "Planes")]
    planes: usize,
    #[tabled(rename = "Area (Å²)")]
    area: String,
    #[tabled(rename = "|a'| (Å)")]
    a: String,
    #[tabled(rename = "|b'| (Å)")]
    b: String,
    #[tabled(rename = "γ' (°)")]
    gamma: String,
    #[tabled(rename = "d (Å)")]
    d: String,
}

/// CSV 导出记录
#[derive(Debug, Clone, Serialize)]
struct ScanRecord {
    h: i32,
    k: i32,
    l: i32,
    atoms: usize,
    planes: usize,
    area: f64,
    a: f64,
    b: f64,
    gamma: f64,
    repeat_distance: f64,
    file: Option<String>,
}

impl ScanRecord {
    fn from_slab(slab: &Slab, file: Option<&Path>) -> Self {
        let (a, b, _, _, _, gamma) = slab.crystal.lattice.parameters();
        let m = slab.spec.miller;
        ScanRecord {
            h: m.h,
            k: m.k,
            l: m.l,
            atoms: slab.atom_count,
            planes: slab.plane_count,
            area: slab.area,
            a,
            b,
            gamma,
            repeat_distance: slab.repeat_distance,
            file: file.map(|p| p.display().to_string()),
        }
    }

    fn to_row(&self) -> ScanRow {
        ScanRow {
            hkl: format!("({} {} {})", self.h, self.k, self.l),
            atoms: self.atoms,
            planes: self.planes,
            area: format!("{:.4}", self.area),
            a: format!("{:.4}", self.a),
            b: format!("{:.4}", self.b),
            gamma: format!("{:.3}", self.gamma),
            d: format!("{:.4}", self.repeat_distance),
        }
    }
}

/// 单个切片任务的共享配置
struct ScanConfig<'a> {
    bulk: &'a Crystal,
    layers: usize,
    vacuum: f64,
    output_dir: Option<&'a Path>,
    format: StructureFormat,
    overwrite: bool,
}

/// 执行 scan 命令
pub fn execute(args: ScanArgs) -> Result<()> {
    output::print_header("Scanning Surface Orientations");

    if !(1..=MAX_MILLER_INDEX).contains(&args.max_index) {
        return Err(QslabError::InvalidArgument(format!(
            "--max-index must be in 1..={}, got {}",
            MAX_MILLER_INDEX, args.max_index
        )));
    }
    // 公共参数先校验一次
    SlabSpec::new(MillerIndex { h: 0, k: 0, l: 1 }, args.layers, args.vacuum).validate()?;

    let bulk = parsers::parse_structure_file(&args.input)?;
    super::print_structure_summary(&bulk, &args.input);

    if let Some(ref dir) = args.output {
        fs::create_dir_all(dir).map_err(|e| QslabError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
    }

    let indices = MillerIndex::enumerate(args.max_index);
    output::print_info(&format!(
        "Building {} orientations with max |index| = {}",
        indices.len(),
        args.max_index
    ));

    let config = ScanConfig {
        bulk: &bulk,
        layers: args.layers,
        vacuum: args.vacuum,
        output_dir: args.output.as_deref(),
        format: args.format,
        overwrite: args.overwrite,
    };

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));
    let result = runner.run(&indices, "Building slabs", |m| process_index(*m, &config))?;

    if !result.outputs.is_empty() {
        let rows: Vec<ScanRow> = result.outputs.iter().map(ScanRecord::to_row).collect();
        println!("{}", Table::new(&rows));
    }

    if let Some(ref csv_path) = args.csv {
        save_scan_csv(&result.outputs, csv_path)?;
        output::print_success(&format!("Scan table saved to '{}'", csv_path.display()));
    }

    output::print_separator();
    output::print_done(&format!(
        "Scan complete: {} built, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed orientations:");
        for (hkl, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", hkl, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 构建单个取向，可选写出
fn process_index(miller: MillerIndex, config: &ScanConfig) -> ProcessResult<ScanRecord> {
    let spec = SlabSpec::new(miller, config.layers, config.vacuum);
    let slab = match SlabGenerator::new(spec).generate(config.bulk) {
        Ok(slab) => slab,
        Err(e) => return ProcessResult::Failed(miller.to_string(), e.to_string()),
    };

    let Some(dir) = config.output_dir else {
        return ProcessResult::Success(ScanRecord::from_slab(&slab, None));
    };

    let path = slab_path(dir, &slab, config.format);
    if path.exists() && !config.overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", path.display()));
    }
    match parsers::write_structure_file(&slab.crystal, &path, config.format) {
        Ok(()) => ProcessResult::Success(ScanRecord::from_slab(&slab, Some(&path))),
        Err(e) => ProcessResult::Failed(miller.to_string(), e.to_string()),
    }
}

/// 切片输出路径：POSCAR 用 `POSCAR_<name>`，其余用 `<name>.<ext>`
fn slab_path(dir: &Path, slab: &Slab, format: StructureFormat) -> PathBuf {
    let name = slab.crystal.name.replace('-', "m");
    match format {
        StructureFormat::Poscar => dir.join(format!("POSCAR_{}", name)),
        StructureFormat::Cif => dir.join(format!("{}.cif", name)),
        StructureFormat::Xyz => dir.join(format!("{}.xyz", name)),
    }
}

/// 保存扫描结果到 CSV
fn save_scan_csv(records: &[ScanRecord], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(|e| QslabError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use tempfile::tempdir;

    fn simple_cubic() -> Crystal {
        let lattice = Lattice::new([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]).unwrap();
        Crystal::new("Po", lattice, vec![Atom::new("Po", [0.0, 0.0, 0.0])])
    }

    #[test]
    fn test_process_index_writes_and_skips() {
        let dir = tempdir().unwrap();
        let bulk = simple_cubic();
        let config = ScanConfig {
            bulk: &bulk,
            layers: 2,
            vacuum: 5.0,
            output_dir: Some(dir.path()),
            format: StructureFormat::Cif,
            overwrite: false,
        };
        let miller = MillerIndex::new(1, -1, 0).unwrap();

        match process_index(miller, &config) {
            ProcessResult::Success(record) => {
                assert_eq!(record.atoms, 2);
                assert_eq!((record.h, record.k, record.l), (1, -1, 0));
                let file = PathBuf::from(record.file.unwrap());
                assert!(file.exists());
                assert!(!file.file_name().unwrap().to_str().unwrap().contains('-'));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            process_index(miller, &config),
            ProcessResult::Skipped(_)
        ));
    }

    #[test]
    fn test_max_index_bounds() {
        for max_index in [0, MAX_MILLER_INDEX + 1] {
            let args = ScanArgs {
                input: PathBuf::from("missing.cif"),
                max_index,
                layers: 2,
                vacuum: 5.0,
                output: None,
                format: StructureFormat::Cif,
                csv: None,
                jobs: 1,
                overwrite: false,
            };
            assert!(matches!(
                execute(args),
                Err(QslabError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_csv_export() {
        let dir = tempdir().unwrap();
        let bulk = simple_cubic();
        let slab = SlabGenerator::new(SlabSpec::new(MillerIndex::new(0, 0, 1).unwrap(), 3, 10.0))
            .generate(&bulk)
            .unwrap();
        let path = dir.path().join("scan.csv");

        save_scan_csv(&[ScanRecord::from_slab(&slab, None)], &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "h,k,l,atoms,planes,area,a,b,gamma,repeat_distance,file"
        );
        assert!(lines.next().unwrap().starts_with("0,0,1,3,3,9.0"));
    }
}
