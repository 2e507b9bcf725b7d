//! # 统一错误处理模块
//!
//! 定义 qslab 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - I/O: 文件读写
//! - Parse: 结构文件、QE 输出、JSON/TOML/CSV 格式错误
//! - Validation: 计算前拒绝的非法输入
//! - Computation: 核心计算内部失败（从不静默给默认值）
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Validation,
    Computation,
}

/// qslab 统一错误类型
#[derive(Error, Debug)]
pub enum QslabError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 验证错误
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Invalid Miller index ({h} {k} {l}): indices must not all be zero and |index| <= {max}",
        max = crate::models::slab::MAX_MILLER_INDEX
    )]
    InvalidMillerIndex { h: i32, k: i32, l: i32 },

    #[error("Invalid layer count {0}: at least one layer is required")]
    InvalidLayerCount(usize),

    #[error("Invalid vacuum thickness {0} Å: must be finite and non-negative")]
    InvalidVacuum(f64),

    #[error("Degenerate lattice: determinant {determinant:.3e} is (near) zero")]
    DegenerateLattice { determinant: f64 },

    #[error("Invalid supercell multiplier {0:?}: every multiplier must be >= 1")]
    InvalidSupercell([usize; 3]),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 计算错误
    // ─────────────────────────────────────────────────────────────
    #[error("Cannot divide by reference atom count: {system} atom count is missing or zero")]
    MissingAtomCount { system: String },

    #[error("No in-plane basis found for ({h} {k} {l}): {reason}")]
    BasisSearchFailed {
        h: i32,
        k: i32,
        l: i32,
        reason: String,
    },

    #[error("No pseudopotential found for element '{element}'")]
    PseudoNotFound { element: String },

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl QslabError {
    /// 错误所属类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            QslabError::FileReadError { .. }
            | QslabError::FileWriteError { .. }
            | QslabError::DirectoryNotFound { .. }
            | QslabError::FileNotFound { .. }
            | QslabError::NoFilesFound { .. }
            | QslabError::Other(_) => ErrorKind::Io,

            QslabError::ParseError { .. }
            | QslabError::UnsupportedFormat(_)
            | QslabError::Json(_)
            | QslabError::Toml { .. }
            | QslabError::CsvError(_) => ErrorKind::Parse,

            QslabError::InvalidMillerIndex { .. }
            | QslabError::InvalidLayerCount(_)
            | QslabError::InvalidVacuum(_)
            | QslabError::DegenerateLattice { .. }
            | QslabError::InvalidSupercell(_)
            | QslabError::InvalidParameter(_)
            | QslabError::InvalidArgument(_) => ErrorKind::Validation,

            QslabError::MissingAtomCount { .. }
            | QslabError::BasisSearchFailed { .. }
            | QslabError::PseudoNotFound { .. } => ErrorKind::Computation,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QslabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            QslabError::InvalidMillerIndex { h: 0, k: 0, l: 0 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(QslabError::InvalidLayerCount(0).kind(), ErrorKind::Validation);
        assert_eq!(
            QslabError::MissingAtomCount {
                system: "bulk".to_string()
            }
            .kind(),
            ErrorKind::Computation
        );
        assert_eq!(
            QslabError::FileNotFound {
                path: "x.cif".to_string()
            }
            .kind(),
            ErrorKind::Io
        );
        assert_eq!(
            QslabError::UnsupportedFormat("res".to_string()).kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn test_layer_count_message() {
        let msg = QslabError::InvalidLayerCount(0).to_string();
        assert!(msg.contains("layer count 0"));
    }
}
