use std::time::Duration;

/// Failures raised by the engine connection and the parameter catalogue.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no response to '{command}' within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("server disconnected")]
    Disconnected,
    #[error("malformed parameter definition '{line}': {reason}")]
    MalformedParameter { line: String, reason: String },
    #[error("unsupported parameter type '{kind}' in '{line}'")]
    UnsupportedParameterType { line: String, kind: String },
}

impl Error {
    /// Errors that end the interactive session rather than becoming a status message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Disconnected | Error::Connect { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
