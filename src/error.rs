use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting a palette.
#[derive(Debug, Error)]
pub enum PaletteError {
    /// Malformed command-line input
    #[error("usage error: {0}")]
    Usage(String),

    /// The image could not be opened or decoded
    #[error("cannot read image {origin}")]
    ImageRead {
        origin: String,
        #[source]
        source: image::ImageError,
    },

    /// A numeric argument is outside its accepted range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The report could not be written to its destination
    #[error("cannot write {}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize palette")]
    Serialize(#[from] serde_json::Error),
}

impl PaletteError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            PaletteError::Usage(_) => 2,
            PaletteError::ImageRead { .. } => 3,
            PaletteError::InvalidArgument(_) => 4,
            PaletteError::FileWrite { .. } => 5,
            PaletteError::Serialize(_) => 1,
        }
    }

    /// The message followed by every underlying cause, on one line.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}
