//! Shape lookup for scanned codes.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Why a scanned shape could not be loaded.
#[derive(Error, Debug)]
pub enum ShapeFetchError {
    #[error("no shape with id '{0}'")]
    NotFound(String),

    #[error("shape server unreachable: {0}")]
    Unreachable(String),

    #[error("shape server returned {0}")]
    Status(u16),

    #[error("{kind}: {message}")]
    Other { kind: String, message: String },
}

impl ShapeFetchError {
    /// Short text shown to the user in place of the scanner title.
    pub fn status_message(&self) -> String {
        match self {
            Self::NotFound(_) => "Bad QR code".to_string(),
            Self::Unreachable(_) => "No connection to server".to_string(),
            Self::Status(code) => format!("Server returned {}", code),
            Self::Other { kind, .. } => format!("Load failed with {}", kind),
        }
    }
}

impl From<io::Error> for ShapeFetchError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable => Self::Unreachable(err.to_string()),
            kind => Self::Other {
                kind: format!("{:?}", kind),
                message: err.to_string(),
            },
        }
    }
}

/// Resolves a scanned id to SVG text.
#[async_trait]
pub trait ShapeFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<String, ShapeFetchError>;
}

/// Reads `<dir>/<id>.svg`.
#[derive(Debug, Clone)]
pub struct FileShapeFetcher {
    dir: PathBuf,
}

impl FileShapeFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ShapeFetcher for FileShapeFetcher {
    async fn fetch(&self, id: &str) -> Result<String, ShapeFetchError> {
        let id = id.trim();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ShapeFetchError::NotFound(id.to_string()));
        }
        let path = self.dir.join(format!("{}.svg", id));
        tracing::debug!("Loading shape {}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}
