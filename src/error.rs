use thiserror::Error;


/// Coarse classification of a failed detect or render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataFormat,
    TemplateCompile,
    TemplateExecution,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DataFormat => "DataFormatError",
            ErrorKind::TemplateCompile => "TemplateCompileError",
            ErrorKind::TemplateExecution => "TemplateExecutionError",
        }
    }

    /// Reason string front ends report next to the message.
    pub fn reason(&self) -> &'static str {
        match self {
            ErrorKind::DataFormat => "DataUnmarshallingError",
            ErrorKind::TemplateCompile => "TemplateError",
            ErrorKind::TemplateExecution => "TemplateRenderingError",
        }
    }
}


#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    DataFormat(String),
    #[error("{0}")]
    TemplateCompile(String),
    #[error("{0}")]
    TemplateExecution(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DataFormat(_) => ErrorKind::DataFormat,
            Error::TemplateCompile(_) => ErrorKind::TemplateCompile,
            Error::TemplateExecution(_) => ErrorKind::TemplateExecution,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::DataFormat(message)
            | Error::TemplateCompile(message)
            | Error::TemplateExecution(message) => message,
        }
    }

    pub(crate) fn data_format(message: impl Into<String>) -> Self {
        Error::DataFormat(message.into())
    }
}


/// Failure raised by a template function; the engine folds it into
/// [`Error::TemplateExecution`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuncError {
    #[error("wrong number of args for {name}: want {want} got {got}")]
    Arity {
        name: &'static str,
        want: String,
        got: usize,
    },
    #[error("wrong type for value; expected {expected}; got {got}")]
    Type {
        expected: &'static str,
        got: &'static str,
    },
    #[error("{0}")]
    Message(String),
}

impl FuncError {
    pub fn message(message: impl Into<String>) -> Self {
        FuncError::Message(message.into())
    }
}


#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}
