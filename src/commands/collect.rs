//! # collect 命令实现
//!
//! 并行解析一批 pw.x 输出，汇总总能量。
//!
//! ## 功能
//! - 按 glob 模式收集输出文件（可递归）
//! - 基于 `BatchRunner` 并行解析
//! - 按 E/atom 升序的终端表格与 CSV 导出
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `batch/`, `qe/output.rs`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::collect::CollectArgs;
use crate::error::{QslabError, Result};
use crate::models::{EnergyRecord, SystemTag};
use crate::qe::parse_pw_output_file;
use crate::utils::output;

use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// 终端表格行
#[derive(Debug, Clone, Tabled)]
struct CollectRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Atoms")]
    atoms: String,
    #[tabled(rename = "E (Ry)")]
    energy_ry: String,
    #[tabled(rename = "E/atom (eV)")]
    per_atom: String,
    #[tabled(rename = "Done")]
    converged: String,
}

/// CSV 导出记录
#[derive(Debug, Clone, Serialize)]
struct CollectRecord {
    file: String,
    system: SystemTag,
    atoms: Option<usize>,
    energy_ry: f64,
    energy_ev: f64,
    energy_per_atom_ev: Option<f64>,
    converged: bool,
}

impl CollectRecord {
    fn new(path: &Path, record: &EnergyRecord) -> Self {
        CollectRecord {
            file: path.display().to_string(),
            system: record.system,
            atoms: record.atom_count,
            energy_ry: record.energy_ry,
            energy_ev: record.energy_ev(),
            energy_per_atom_ev: record.energy_per_atom_ev(),
            converged: record.converged,
        }
    }
}

/// 执行 collect 命令
pub fn execute(args: CollectArgs) -> Result<()> {
    output::print_header("Collecting pw.x Energies");

    if !args.input.exists() {
        return Err(QslabError::DirectoryNotFound {
            path: args.input.display().to_string(),
        });
    }

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive);
    if collector.is_directory() {
        output::print_info(&format!(
            "Scanning '{}' for '{}'{}",
            args.input.display(),
            args.pattern,
            if args.recursive { " (recursive)" } else { "" }
        ));
    }
    let files = collector.collect()?;

    if files.is_empty() {
        return Err(QslabError::NoFilesFound {
            pattern: format!("{} in {}", args.pattern, args.input.display()),
        });
    }
    output::print_info(&format!("Found {} output files", files.len()));

    let system = SystemTag::from(args.system);
    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));
    let result = runner.run(&files, "Parsing", |path| parse_one(path, system))?;

    let mut records = result.outputs;
    sort_records(&mut records);

    if !records.is_empty() {
        let rows: Vec<CollectRow> = records
            .iter()
            .enumerate()
            .map(|(i, r)| CollectRow {
                rank: i + 1,
                file: r.file.clone(),
                atoms: r.atoms.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                energy_ry: format!("{:.8}", r.energy_ry),
                per_atom: r
                    .energy_per_atom_ev
                    .map(|e| format!("{:.6}", e))
                    .unwrap_or_else(|| "-".to_string()),
                converged: if r.converged { "yes" } else { "no" }.to_string(),
            })
            .collect();
        println!("{}", Table::new(&rows));
    }

    if let Some(ref csv_path) = args.csv {
        save_records_csv(&records, csv_path)?;
        output::print_success(&format!("Energies saved to '{}'", csv_path.display()));
    }

    output::print_separator();
    output::print_done(&format!(
        "Collected {} energies ({} failed)",
        result.success, result.failed
    ));
    for (path, err) in result.failures.iter().take(10) {
        output::print_error(&format!("  {}: {}", path, err));
    }
    if result.failures.len() > 10 {
        output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
    }

    Ok(())
}

fn parse_one(path: &Path, system: SystemTag) -> ProcessResult<CollectRecord> {
    match parse_pw_output_file(path, system) {
        Ok(record) => ProcessResult::Success(CollectRecord::new(path, &record)),
        Err(e) => ProcessResult::Failed(path.display().to_string(), e.to_string()),
    }
}

/// 按每原子能量升序，缺原子数的排在最后（按总能量）
fn sort_records(records: &mut [CollectRecord]) {
    records.sort_by(|a, b| match (a.energy_per_atom_ev, b.energy_per_atom_ev) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.energy_ry.total_cmp(&b.energy_ry),
    });
}

/// 保存结果到 CSV
fn save_records_csv(records: &[CollectRecord], output_path: &Path) -> Result<()> {
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
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_output(dir: &Path, name: &str, natoms: usize, energy: f64) -> PathBuf {
        let path = dir.join(name);
        let text = format!(
            "     number of atoms/cell      =  {}\n!    total energy              =  {} Ry\n     JOB DONE.\n",
            natoms, energy
        );
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_parse_and_rank() {
        let dir = tempdir().unwrap();
        let a = write_output(dir.path(), "a.out", 2, -20.0);
        let b = write_output(dir.path(), "b.out", 4, -44.0);
        let bad = dir.path().join("bad.out");
        fs::write(&bad, "crashed\n").unwrap();

        let mut records = Vec::new();
        for path in [&a, &b] {
            match parse_one(path, SystemTag::Bulk) {
                ProcessResult::Success(r) => records.push(r),
                other => panic!("unexpected: {:?}", other),
            }
        }
        assert!(matches!(
            parse_one(&bad, SystemTag::Bulk),
            ProcessResult::Failed(_, _)
        ));

        sort_records(&mut records);
        // -11 Ry/atom 低于 -10 Ry/atom
        assert!(records[0].file.ends_with("b.out"));
        assert!(records[0].converged);
    }

    #[test]
    fn test_csv_export() {
        let dir = tempdir().unwrap();
        let path = write_output(dir.path(), "bulk.out", 1, -1.0);
        let record = match parse_one(&path, SystemTag::Bulk) {
            ProcessResult::Success(r) => r,
            other => panic!("unexpected: {:?}", other),
        };

        let csv_path = dir.path().join("energies.csv");
        save_records_csv(&[record], &csv_path).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with(
            "file,system,atoms,energy_ry,energy_ev,energy_per_atom_ev,converged\n"
        ));
        assert!(text.contains(",bulk,1,-1.0,"));
    }
}
