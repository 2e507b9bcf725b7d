//! # pw.x 输出解析器
//!
//! 从 Quantum ESPRESSO pw.x 输出文本中提取总能量与原子数。
//!
//! ## 提取规则
//! - 总能量：最后一条同时含 `!` 与 `total energy` 的行，取 `=` 后的数值 (Ry)。
//!   relax 输出含多条此类行，取最后一次 SCF 的能量而非第一条
//! - 原子数：`number of atoms/cell = N`（不区分大小写）；
//!   缺失时统计第一个 `ATOMIC_POSITIONS` 块的坐标行
//! - 组分：`site n.` 表中的 `tau(` 行
//! - 完成标志：`convergence has been achieved` 或 `JOB DONE`
//!
//! 找不到能量时报错，不使用任何默认值。
//!
//! ## 依赖关系
//! - 被 `commands/energy.rs`、`commands/collect.rs` 调用
//! - 使用 `regex`
//! - 使用 `models/calculation.rs`

use crate::error::{QslabError, Result};
use crate::models::{EnergyRecord, SystemTag};

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENERGY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\s*([+-]?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)").expect("valid energy regex")
});

static NATOMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)number of atoms\s*/\s*cell\s*=\s*(\d+)").expect("valid natoms regex")
});

static TAU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\s+(\S+)\s+tau\(\s*\d+\s*\)").expect("valid tau regex")
});

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z _0-9()-]+:$").expect("valid section regex"));

/// 解析 pw.x 输出文件
pub fn parse_pw_output_file(path: &Path, system: SystemTag) -> Result<EnergyRecord> {
    let bytes = fs::read(path).map_err(|e| QslabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    parse_pw_output_named(&content, system, &path.display().to_string())
}

/// 解析 pw.x 输出文本
pub fn parse_pw_output(text: &str, system: SystemTag) -> Result<EnergyRecord> {
    parse_pw_output_named(text, system, "<text>")
}

fn parse_pw_output_named(text: &str, system: SystemTag, name: &str) -> Result<EnergyRecord> {
    let lines: Vec<&str> = text.lines().collect();

    let energy_ry = find_total_energy(&lines).ok_or_else(|| QslabError::ParseError {
        format: "pw.x output".to_string(),
        path: name.to_string(),
        reason: "no '!    total energy' line found".to_string(),
    })?;

    let atom_count = find_atom_count(&lines).or_else(|| count_atomic_positions(&lines));

    let mut record = EnergyRecord::new(system, energy_ry, atom_count);
    if let Some(composition) = find_composition(&lines) {
        record = record.with_composition(composition);
    }
    record.converged = lines
        .iter()
        .any(|l| l.contains("convergence has been achieved") || l.contains("JOB DONE"));

    Ok(record)
}

/// 最后一次 SCF 的总能量 (Ry)
fn find_total_energy(lines: &[&str]) -> Option<f64> {
    lines
        .iter()
        .rev()
        .filter(|l| l.contains('!') && l.to_lowercase().contains("total energy"))
        .find_map(|l| ENERGY_RE.captures(l).and_then(|c| c[1].parse().ok()))
}

fn find_atom_count(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .find_map(|l| NATOMS_RE.captures(l).and_then(|c| c[1].parse().ok()))
}

/// 统计第一个 ATOMIC_POSITIONS 块中的坐标行
fn count_atomic_positions(lines: &[&str]) -> Option<usize> {
    for (i, line) in lines.iter().enumerate() {
        if !line.to_uppercase().contains("ATOMIC_POSITIONS") {
            continue;
        }
        let count = lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .take_while(|l| !l.is_empty() && !SECTION_RE.is_match(l))
            .filter(|l| l.split_whitespace().count() >= 4)
            .count();
        if count > 0 {
            return Some(count);
        }
    }
    None
}

/// 从初始坐标表读取物种组成
fn find_composition(lines: &[&str]) -> Option<BTreeMap<String, usize>> {
    let start = lines.iter().position(|l| TAU_RE.is_match(l))?;

    let mut counts = BTreeMap::new();
    for line in &lines[start..] {
        match TAU_RE.captures(line) {
            Some(c) => *counts.entry(c[1].to_string()).or_insert(0) += 1,
            None => break,
        }
    }
    Some(counts)
}
