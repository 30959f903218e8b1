//! Error types for kicad-qr operations

use thiserror::Error;

/// Result type alias using kicad-qr's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit code used when the requested textbox is absent.
pub const EXIT_NOT_FOUND: u8 = 1;

/// Process exit code used for every other failure.
pub const EXIT_FAILURE: u8 = 2;

/// Main error type for kicad-qr operations
#[derive(Error, Debug)]
pub enum Error {
    /// No textbox on the board carries the requested identifier
    #[error("Textbox '{0}' not found on the PCB")]
    TextboxNotFound(String),

    /// The board file is not well-formed s-expression text
    #[error("Parse error at byte {offset}: {message}")]
    Parse {
        /// Byte offset into the source where parsing failed
        offset: usize,
        /// Description of the problem
        message: String,
    },

    /// The board parsed but does not look like a KiCad PCB
    #[error("Invalid KiCad board: {0}")]
    InvalidBoard(String),

    /// QR code encoding failed
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// The rendered QR code did not decode back to the input data
    #[error("QR self-check failed: {0}")]
    QrVerify(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Exit code the CLI reports for this error.
    ///
    /// A missing placeholder gets its own code so build pipelines can tell it
    /// apart from I/O and parse failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::TextboxNotFound(_) => EXIT_NOT_FOUND,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<atomicwrites::Error<std::io::Error>> for Error {
    fn from(e: atomicwrites::Error<std::io::Error>) -> Self {
        match e {
            atomicwrites::Error::Internal(err) | atomicwrites::Error::User(err) => Error::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::TextboxNotFound("QR".to_string()).exit_code(),
            EXIT_NOT_FOUND
        );
        assert_eq!(Error::QrEncode("too long".to_string()).exit_code(), EXIT_FAILURE);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Error::from(io).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::TextboxNotFound("BATCH".to_string());
        assert_eq!(err.to_string(), "Textbox 'BATCH' not found on the PCB");
    }
}
