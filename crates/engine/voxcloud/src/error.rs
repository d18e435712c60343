use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by a conversion.
///
/// Messages are stored rendered so the error stays `Clone`: the batch driver
/// reports one failed shared label table on every task that referenced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoxelizeError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("parse error in {}{}: {message}", .path.display(), line_suffix(.line))]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    #[error("mesh has no vertices or faces: {}", .path.display())]
    EmptyMesh { path: PathBuf },

    #[error("invalid grid specification: {0}")]
    InvalidGridSpec(String),

    #[error("io error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("conversion task panicked: {0}")]
    TaskPanicked(String),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl VoxelizeError {
    /// Classify an I/O failure on `path`.
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VoxelizeError::NotFound {
                path: path.to_path_buf(),
            },
            // read_to_string reports non-UTF-8 text as InvalidData
            io::ErrorKind::InvalidData => VoxelizeError::Parse {
                path: path.to_path_buf(),
                line: None,
                message: err.to_string(),
            },
            _ => VoxelizeError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        }
    }

    pub(crate) fn parse(path: &Path, line: Option<usize>, message: impl Into<String>) -> Self {
        VoxelizeError::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VoxelizeError::NotFound { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, VoxelizeError::Parse { .. })
    }

    pub fn is_invalid_grid(&self) -> bool {
        matches!(self, VoxelizeError::InvalidGridSpec(_))
    }
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, VoxelizeError>;
