//! # CIF 格式解析器
//!
//! 解析晶体学信息文件 (Crystallographic Information File)。
//!
//! ## 支持内容
//! - `_cell_length_*` / `_cell_angle_*`（去除不确定度后缀，如 `5.640(2)`）
//! - `_atom_site_*` 循环：`type_symbol` 或 `label`，分数坐标
//! - 对称操作：`_symmetry_equiv_pos_as_xyz` 或
//!   `_space_group_symop_operation_xyz`，展开后按 1e-4 分数坐标容差去重
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QslabError, Result};
use crate::models::{Atom, Crystal, Lattice};
use crate::qe::masses;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 对称展开去重容差（分数坐标）
pub const SYMMETRY_TOLERANCE: f64 = 1e-4;

const SYMOP_TAGS: [&str; 2] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
];

/// 仿射对称操作 r' = R r + t
#[derive(Debug, Clone, PartialEq)]
pub struct SymOp {
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl SymOp {
    pub fn identity() -> Self {
        SymOp {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    /// 解析 "x, y+1/2, -z" 形式的操作
    pub fn parse(expr: &str) -> Option<Self> {
        let parts: Vec<&str> = expr.split(',').map(|s| s.trim()).collect();
        if parts.len() != 3 {
            return None;
        }
        let mut op = SymOp {
            rotation: [[0.0; 3]; 3],
            translation: [0.0; 3],
        };
        for (i, part) in parts.iter().enumerate() {
            let (row, t) = parse_component(part)?;
            op.rotation[i] = row;
            op.translation[i] = t;
        }
        Some(op)
    }

    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let mut out = self.translation;
        for (i, row) in self.rotation.iter().enumerate() {
            out[i] += row[0] * p[0] + row[1] * p[1] + row[2] * p[2];
        }
        out
    }
}

/// 解析单个分量，如 "-x+1/2" -> ([-1, 0, 0], 0.5)
fn parse_component(expr: &str) -> Option<([f64; 3], f64)> {
    let expr: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let expr = expr.to_ascii_lowercase();
    if expr.is_empty() {
        return None;
    }

    let mut row = [0.0; 3];
    let mut translation = 0.0;

    // 按 +/- 切分为带符号的项
    let mut terms: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in expr.chars() {
        if (c == '+' || c == '-') && !current.is_empty() && !current.ends_with(|c| matches!(c, 'e' | '/' | '*')) {
            terms.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    terms.push(current);

    for term in terms {
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(&term)),
        };
        if body.is_empty() {
            return None;
        }

        let axis = body.chars().last().and_then(|c| match c {
            'x' => Some(0),
            'y' => Some(1),
            'z' => Some(2),
            _ => None,
        });

        match axis {
            Some(idx) => {
                let coeff = body[..body.len() - 1].trim_end_matches('*');
                let value = if coeff.is_empty() {
                    1.0
                } else {
                    parse_number(coeff)?
                };
                row[idx] += sign * value;
            }
            None => translation += sign * parse_number(body)?,
        }
    }
    Some((row, translation))
}

/// 解析数字或分数，如 "0.5"、"1/2"
fn parse_number(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(num.parse::<f64>().ok()? / den)
        }
        None => s.parse().ok(),
    }
}

/// 去除 CIF 数值的不确定度后缀，`?` 与 `.` 视为缺失
pub fn parse_cif_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value == "?" || value == "." {
        return None;
    }
    let value = match value.find('(') {
        Some(idx) => &value[..idx],
        None => value,
    };
    value.parse().ok()
}

/// 一行 CIF 文本的分词（保留引号内空白，忽略注释）
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            // 引号仅在其后为空白或行尾时结束
            let mut j = i + 1;
            while j < chars.len() && !(chars[j] == c && (j + 1 == chars.len() || chars[j + 1].is_whitespace())) {
                j += 1;
            }
            tokens.push(chars[i + 1..j.min(chars.len())].iter().collect());
            i = j + 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }
    tokens
}

/// 解析后的数据块
#[derive(Debug, Default)]
struct CifBlock {
    name: Option<String>,
    items: HashMap<String, String>,
    loops: Vec<CifLoop>,
}

#[derive(Debug, Default)]
struct CifLoop {
    tags: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

/// 读取第一个数据块
///
/// 循环数据个数不是列数整数倍时（末行被截断）返回 `ParseError`。
fn read_block(content: &str, name: &str) -> Result<CifBlock> {
    let mut block = CifBlock::default();
    let mut current_loop: Option<CifLoop> = None;
    let mut in_header = false;
    let mut pending: Vec<String> = Vec::new();
    let mut pending_tag: Option<String> = None;
    let mut text_field: Option<String> = None;

    let finish_loop = |lp: Option<CifLoop>,
                       pending: &mut Vec<String>,
                       block: &mut CifBlock|
     -> Result<()> {
        if let Some(mut lp) = lp {
            let width = lp.tags.len();
            if width > 0 {
                if pending.len() % width != 0 {
                    return Err(QslabError::ParseError {
                        format: "cif".to_string(),
                        path: name.to_string(),
                        reason: format!(
                            "loop starting with '{}' has {} values, not a multiple of {} columns",
                            lp.tags[0],
                            pending.len(),
                            width
                        ),
                    });
                }
                for chunk in pending.chunks(width) {
                    lp.rows.push(chunk.to_vec());
                }
            }
            pending.clear();
            block.loops.push(lp);
        }
        Ok(())
    };

    for raw in content.lines() {
        // 分号文本字段
        if let Some(ref mut text) = text_field {
            if raw.starts_with(';') {
                let value = std::mem::take(text);
                text_field = None;
                if let Some(tag) = pending_tag.take() {
                    block.items.insert(tag, value);
                } else if current_loop.is_some() {
                    pending.push(value);
                }
            } else {
                text.push_str(raw);
                text.push('\n');
            }
            continue;
        }
        if raw.starts_with(';') {
            text_field = Some(raw[1..].to_string());
            continue;
        }

        let tokens = tokenize(raw);
        if tokens.is_empty() {
            continue;
        }
        let first = tokens[0].to_ascii_lowercase();

        if first.starts_with("data_") {
            if block.name.is_some() {
                break;
            }
            block.name = Some(tokens[0][5..].to_string());
            continue;
        }

        if first == "loop_" {
            finish_loop(current_loop.take(), &mut pending, &mut block)?;
            current_loop = Some(CifLoop::default());
            in_header = true;
            continue;
        }

        if first.starts_with('_') {
            if in_header {
                if let Some(ref mut lp) = current_loop {
                    lp.tags.push(first);
                    continue;
                }
            }
            finish_loop(current_loop.take(), &mut pending, &mut block)?;
            in_header = false;
            match tokens.get(1) {
                Some(value) => {
                    block.items.insert(first, value.clone());
                }
                None => pending_tag = Some(first),
            }
            continue;
        }

        if let Some(tag) = pending_tag.take() {
            block.items.insert(tag, tokens.join(" "));
            continue;
        }

        if current_loop.is_some() {
            in_header = false;
            pending.extend(tokens);
        }
    }
    finish_loop(current_loop.take(), &mut pending, &mut block)?;
    Ok(block)
}

/// 从 CIF 物种字段得到元素符号，如 "Ti4+" -> "Ti"、"o1" -> "O"
fn clean_symbol(raw: &str) -> String {
    let letters: String = raw.chars().take_while(|c| c.is_ascii_alphabetic()).take(2).collect();
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.collect::<String>().to_ascii_lowercase();
            let symbol = format!("{}{}", first.to_ascii_uppercase(), rest);
            // 两字母不是已知元素时退回单字母
            if symbol.len() == 2 && !masses::ATOMIC_MASSES.contains_key(symbol.as_str()) {
                symbol[..1].to_string()
            } else {
                symbol
            }
        }
        None => raw.to_string(),
    }
}

/// 周期性距离判断
fn same_site(a: &[f64; 3], b: &[f64; 3]) -> bool {
    (0..3).all(|i| {
        let d = a[i] - b[i];
        (d - d.round()).abs() < SYMMETRY_TOLERANCE
    })
}

fn wrap_unit(x: f64) -> f64 {
    let y = x - x.floor();
    if 1.0 - y < SYMMETRY_TOLERANCE {
        0.0
    } else {
        y
    }
}

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QslabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 CIF 格式
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let parse_error = |reason: String| QslabError::ParseError {
        format: "cif".to_string(),
        path: default_name.to_string(),
        reason,
    };

    let block = read_block(content, default_name)?;

    let cell_value = |tag: &str| {
        block
            .items
            .get(tag)
            .and_then(|v| parse_cif_number(v))
            .ok_or_else(|| parse_error(format!("missing or invalid {}", tag)))
    };
    let lattice = Lattice::from_parameters(
        cell_value("_cell_length_a")?,
        cell_value("_cell_length_b")?,
        cell_value("_cell_length_c")?,
        cell_value("_cell_angle_alpha")?,
        cell_value("_cell_angle_beta")?,
        cell_value("_cell_angle_gamma")?,
    )?;

    // 对称操作
    let mut ops: Vec<SymOp> = Vec::new();
    for lp in &block.loops {
        if let Some(col) = SYMOP_TAGS.iter().find_map(|t| lp.column(t)) {
            for row in &lp.rows {
                let op = SymOp::parse(&row[col])
                    .ok_or_else(|| parse_error(format!("invalid symmetry operation '{}'", row[col])))?;
                ops.push(op);
            }
        }
    }
    if ops.is_empty() {
        for tag in SYMOP_TAGS {
            if let Some(expr) = block.items.get(tag) {
                ops.push(
                    SymOp::parse(expr)
                        .ok_or_else(|| parse_error(format!("invalid symmetry operation '{}'", expr)))?,
                );
            }
        }
    }
    if ops.is_empty() {
        ops.push(SymOp::identity());
    }

    // 原子位置
    let sites = block
        .loops
        .iter()
        .find(|lp| lp.column("_atom_site_fract_x").is_some())
        .ok_or_else(|| parse_error("missing _atom_site_fract_* loop".to_string()))?;

    let col = |tag: &str| {
        sites
            .column(tag)
            .ok_or_else(|| parse_error(format!("missing {}", tag)))
    };
    let (cx, cy, cz) = (
        col("_atom_site_fract_x")?,
        col("_atom_site_fract_y")?,
        col("_atom_site_fract_z")?,
    );
    let c_symbol = sites.column("_atom_site_type_symbol");
    let c_label = sites.column("_atom_site_label");
    if c_symbol.is_none() && c_label.is_none() {
        return Err(parse_error(
            "atom sites need _atom_site_type_symbol or _atom_site_label".to_string(),
        ));
    }

    let mut atoms: Vec<Atom> = Vec::new();
    for row in &sites.rows {
        let coord = |c: usize| {
            parse_cif_number(&row[c])
                .ok_or_else(|| parse_error(format!("invalid coordinate '{}'", row[c])))
        };
        let position = [coord(cx)?, coord(cy)?, coord(cz)?];
        let label = c_label.map(|c| row[c].clone());
        let element = clean_symbol(&row[c_symbol.or(c_label).unwrap_or(0)]);

        for op in &ops {
            let p = op.apply(position).map(wrap_unit);
            let duplicate = atoms
                .iter()
                .any(|a| a.element == element && same_site(&a.position, &p));
            if !duplicate {
                let mut atom = Atom::new(element.clone(), p);
                atom.label = label.clone();
                atoms.push(atom);
            }
        }
    }

    let name = block
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_name.to_string());
    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("cif".to_string());
    Ok(crystal)
}

/// 将 Crystal 转换为 CIF 格式字符串 (P1)
pub fn to_cif_string(crystal: &Crystal) -> String {
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();

    let mut result = String::new();
    result.push_str(&format!("data_{}\n", crystal.name.replace(' ', "_")));
    result.push_str("_symmetry_space_group_name_H-M    'P 1'\n");
    result.push_str("_symmetry_Int_Tables_number       1\n\n");

    result.push_str(&format!("_cell_length_a    {:.8}\n", a));
    result.push_str(&format!("_cell_length_b    {:.8}\n", b));
    result.push_str(&format!("_cell_length_c    {:.8}\n", c));
    result.push_str(&format!("_cell_angle_alpha {:.6}\n", alpha));
    result.push_str(&format!("_cell_angle_beta  {:.6}\n", beta));
    result.push_str(&format!("_cell_angle_gamma {:.6}\n\n", gamma));

    result.push_str("loop_\n");
    result.push_str("_symmetry_equiv_pos_as_xyz\n");
    result.push_str("'x, y, z'\n\n");

    result.push_str("loop_\n");
    result.push_str("_atom_site_label\n");
    result.push_str("_atom_site_type_symbol\n");
    result.push_str("_atom_site_fract_x\n");
    result.push_str("_atom_site_fract_y\n");
    result.push_str("_atom_site_fract_z\n");
    result.push_str("_atom_site_occupancy\n");

    for (i, atom) in crystal.atoms.iter().enumerate() {
        let label = atom
            .label
            .clone()
            .unwrap_or_else(|| format!("{}{}", atom.element, i + 1));
        result.push_str(&format!(
            "{} {} {:.10} {:.10} {:.10} 1.0\n",
            label, atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }

    result
}
