//! # pw.x 计算参数
//!
//! 类型化的参数集合，取代自由形式的键值字典。可从 TOML 文件加载，
//! 缺省字段使用默认值，未知字段报错。
//!
//! ## TOML 示例
//! ```toml
//! calculation = "relax"
//! ecutwfc = 50.0
//! kpoints = [6, 6, 1]
//! occupations = "smearing"
//! smearing = "marzari-vanderbilt"
//! nspin = 2
//! starting_magnetization = [0.0, 0.5]
//! ```
//!
//! ## 依赖关系
//! - 被 `qe/input.rs`、`session.rs`、`commands/input.rs` 使用
//! - 使用 `serde` + `toml`

use crate::error::{QslabError, Result};
use crate::models::SystemTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// 计算类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calculation {
    #[default]
    Scf,
    Relax,
    Nscf,
}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calculation::Scf => write!(f, "scf"),
            Calculation::Relax => write!(f, "relax"),
            Calculation::Nscf => write!(f, "nscf"),
        }
    }
}

/// 占据方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occupations {
    #[default]
    Fixed,
    Smearing,
    Tetrahedra,
}

impl fmt::Display for Occupations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occupations::Fixed => write!(f, "fixed"),
            Occupations::Smearing => write!(f, "smearing"),
            Occupations::Tetrahedra => write!(f, "tetrahedra"),
        }
    }
}

/// 展宽函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Smearing {
    #[default]
    Gaussian,
    MethfesselPaxton,
    MarzariVanderbilt,
}

impl fmt::Display for Smearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Smearing::Gaussian => write!(f, "gaussian"),
            Smearing::MethfesselPaxton => write!(f, "methfessel-paxton"),
            Smearing::MarzariVanderbilt => write!(f, "marzari-vanderbilt"),
        }
    }
}

/// pw.x 输入参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QeParameters {
    pub calculation: Calculation,

    /// 波函数截断能 (Ry)
    pub ecutwfc: f64,

    /// 电荷密度截断能 (Ry)
    pub ecutrho: f64,

    /// Monkhorst-Pack 网格
    pub kpoints: [u32; 3],

    /// 切片也使用 `kpoints`（否则为 1 1 1）
    pub custom_slab_kpoints: bool,

    pub prefix: String,
    pub outdir: String,

    /// 写入输入文件的 pseudo_dir
    pub pseudo_dir: String,

    /// 赝势搜索目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pseudo_search_dir: Option<PathBuf>,

    /// 是否将赝势复制到 pseudo_dir
    pub copy_pseudos: bool,

    pub conv_thr: f64,
    pub occupations: Occupations,
    pub smearing: Smearing,
    pub degauss: f64,

    /// 1 或 2
    pub nspin: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbnd: Option<u32>,

    /// 按物种顺序的初始磁化
    pub starting_magnetization: Vec<f64>,
}

impl Default for QeParameters {
    fn default() -> Self {
        Self {
            calculation: Calculation::Scf,
            ecutwfc: 40.0,
            ecutrho: 400.0,
            kpoints: [4, 4, 1],
            custom_slab_kpoints: false,
            prefix: "qe_calc".to_string(),
            outdir: "./out".to_string(),
            pseudo_dir: "./pseudo".to_string(),
            pseudo_search_dir: None,
            copy_pseudos: false,
            conv_thr: 1e-8,
            occupations: Occupations::Fixed,
            smearing: Smearing::Gaussian,
            degauss: 0.01,
            nspin: 1,
            nbnd: None,
            starting_magnetization: vec![0.0, 0.0, 0.0],
        }
    }
}

impl QeParameters {
    /// 从 TOML 文件加载并校验
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| QslabError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, name: &str) -> Result<Self> {
        let params: QeParameters = toml::from_str(content).map_err(|e| QslabError::Toml {
            path: name.to_string(),
            source: e,
        })?;
        params.validate()?;
        Ok(params)
    }

    /// 校验参数范围
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(QslabError::InvalidParameter(msg));

        if self.nspin != 1 && self.nspin != 2 {
            return invalid(format!("nspin must be 1 or 2, got {}", self.nspin));
        }
        if !(self.ecutwfc.is_finite() && self.ecutwfc > 0.0) {
            return invalid(format!("ecutwfc must be positive, got {}", self.ecutwfc));
        }
        if !(self.ecutrho.is_finite() && self.ecutrho > 0.0) {
            return invalid(format!("ecutrho must be positive, got {}", self.ecutrho));
        }
        if self.kpoints.iter().any(|&k| k < 1) {
            return invalid(format!("k-point grid must be >= 1, got {:?}", self.kpoints));
        }
        if !(self.conv_thr.is_finite() && self.conv_thr > 0.0) {
            return invalid(format!("conv_thr must be positive, got {}", self.conv_thr));
        }
        if !(self.degauss.is_finite() && self.degauss >= 0.0) {
            return invalid(format!("degauss must be non-negative, got {}", self.degauss));
        }
        if self.prefix.trim().is_empty() {
            return invalid("prefix must not be empty".to_string());
        }
        if let Some(m) = self
            .starting_magnetization
            .iter()
            .find(|m| !m.is_finite() || m.abs() > 10.0)
        {
            return invalid(format!("starting_magnetization {} out of range [-10, 10]", m));
        }
        Ok(())
    }

    /// 指定体系使用的 k 点网格
    pub fn kpoints_for(&self, system: SystemTag) -> [u32; 3] {
        match system {
            SystemTag::Bulk => self.kpoints,
            SystemTag::Slab if self.custom_slab_kpoints => self.kpoints,
            SystemTag::Slab => [1, 1, 1],
        }
    }
}
