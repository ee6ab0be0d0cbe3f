//! Error types for svcaudit core.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::loader::LoadError;

/// Error type for svcaudit core operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The service directory handed to an inspection does not exist.
    #[error("service directory {} does not exist", .0.display())]
    ServiceNotFound(PathBuf),
    /// The rules file is absent.
    #[error("rules file not found at {}", .0.display())]
    RulesNotFound(PathBuf),
    /// A template could not be loaded.
    #[error("template error: {0}")]
    Template(#[from] LoadError),
    /// A catch-all error with a message.
    #[error("{0}")]
    Other(String),
}

/// Convenience result type for svcaudit core.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::AuditError;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn io_error_formats_message() {
        let error = AuditError::Io(io::Error::other("boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn service_not_found_names_directory() {
        let error = AuditError::ServiceNotFound(PathBuf::from("/srv/missing"));
        assert_eq!(
            format!("{error}"),
            "service directory /srv/missing does not exist"
        );
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: AuditError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            AuditError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io variant, got {other:?}"),
        }
    }
}
