use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("permission denied: {}", path.display())]
    FileAccessDenied { path: PathBuf },
    #[error("no `{marker}...</style>` region found in {}", path.display())]
    NoStyleRegionFound { path: PathBuf, marker: String },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid style marker attribute: {0:?}")]
    InvalidMarker(String),
}

impl Error {
    /// Classify an io error raised while touching `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound { path },
            io::ErrorKind::PermissionDenied => Error::FileAccessDenied { path },
            _ => Error::Io { path, source },
        }
    }
}
