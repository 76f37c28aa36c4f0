use std::fmt;

/// Broad category of a failure, used by callers to branch and by the binary to
/// pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dataset or configuration does not have the required shape.
    InvalidInput,
    /// The model does not expose a usable predictive capability.
    InvalidModel,
    /// Standard errors were requested from a model that cannot estimate them.
    UnsupportedOperation,
    /// A trial failed while sampling or predicting.
    WorkerFailure,
    /// File or serialization failure outside the core engine.
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput => 2,
            ErrorKind::InvalidModel => 3,
            ErrorKind::UnsupportedOperation => 4,
            ErrorKind::WorkerFailure => 5,
            ErrorKind::Io => 6,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::InvalidModel => "invalid model",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::WorkerFailure => "worker failure",
            ErrorKind::Io => "i/o error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Box<AppError>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidModel, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedOperation, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// Wrap the error raised inside a single trial.
    pub fn worker_failure(trial: usize, cause: AppError) -> Self {
        Self {
            kind: ErrorKind::WorkerFailure,
            message: format!("trial {trial} failed: {}", cause.message),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Kind of the innermost error (the trial's own failure for `WorkerFailure`).
    pub fn root_kind(&self) -> ErrorKind {
        match &self.cause {
            Some(inner) => inner.root_kind(),
            None => self.kind,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}
