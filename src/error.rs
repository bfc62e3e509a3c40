use thiserror::Error;

/// Failure classes. Each maps to a stable process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flag combination or value.
    Usage,
    /// Missing or malformed source file.
    Input,
    /// A label with no instrument catalog entry.
    Mapping,
    /// The external fitting tool failed.
    External,
    /// A directory or output file could not be created or written.
    Filesystem,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => 1,
            ErrorKind::Input => 2,
            ErrorKind::Mapping => 3,
            ErrorKind::External => 4,
            ErrorKind::Filesystem => 5,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mapping, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::External, message)
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Filesystem, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}
