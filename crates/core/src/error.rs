use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("projects directory not found: {} (has Claude Code been used on this machine?)", .0.display())]
    ProjectsDirMissing(PathBuf),
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize transcript")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid TODO theme '{0}' (valid themes: grid, lines, graph, dots, clean)")]
    InvalidTheme(String),
    #[error("no conversation matches '{0}'")]
    SessionNotFound(String),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
