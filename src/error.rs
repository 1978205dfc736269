use thiserror::Error;

/// Type alias for Result with CounterError
pub type Result<T> = std::result::Result<T, CounterError>;

/// Errors that abort a ticket-counting run, plus the ambient failures around it.
///
/// Per-message validation problems are not represented here; they travel in
/// [`crate::models::InvalidSale::errors`] and never stop a run.
#[derive(Error, Debug)]
pub enum CounterError {
    /// No label in the mailbox carries the configured name
    #[error("No Gmail label found with name '{0}'")]
    LabelNotFound(String),

    /// The first listing page for a label returned no messages
    #[error("No messages found for label ID '{0}'")]
    EmptyResult(String),

    /// A caller passed an empty or missing argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Any failure talking to the Gmail API
    #[error("{}", transport_display(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The notification sink rejected or failed to receive a report
    #[error("Notification error: {0}")]
    NotificationError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn transport_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Gmail API transport error (HTTP {}): {}", code, message),
        None => format!("Gmail API transport error: {}", message),
    }
}

impl CounterError {
    /// Build a transport error that carries no HTTP status
    pub fn transport(message: impl Into<String>) -> Self {
        CounterError::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error belongs to the run-aborting taxonomy of the pipeline
    pub fn is_fatal_run_error(&self) -> bool {
        matches!(
            self,
            CounterError::LabelNotFound(_)
                | CounterError::EmptyResult(_)
                | CounterError::InvalidArgument(_)
                | CounterError::Transport { .. }
        )
    }
}

impl From<google_gmail1::Error> for CounterError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                CounterError::Transport {
                    status: Some(status.as_u16()),
                    message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => CounterError::Transport {
                status: Some(400),
                message: err.to_string(),
            },
            google_gmail1::Error::HttpError(ref err) => {
                CounterError::transport(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => CounterError::transport(err.to_string()),
            _ => CounterError::transport(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_run_errors() {
        assert!(CounterError::LabelNotFound("Sales".to_string()).is_fatal_run_error());
        assert!(CounterError::EmptyResult("Label_1".to_string()).is_fatal_run_error());
        assert!(CounterError::InvalidArgument("empty id".to_string()).is_fatal_run_error());
        assert!(CounterError::transport("reset").is_fatal_run_error());
    }

    #[test]
    fn test_ambient_errors_are_not_run_errors() {
        assert!(!CounterError::ConfigError("missing".to_string()).is_fatal_run_error());
        assert!(!CounterError::NotificationError("404".to_string()).is_fatal_run_error());
        assert!(!CounterError::AuthError("bad token".to_string()).is_fatal_run_error());
    }

    #[test]
    fn test_error_display() {
        let error = CounterError::LabelNotFound("Ticket Sales".to_string());
        assert_eq!(
            error.to_string(),
            "No Gmail label found with name 'Ticket Sales'"
        );

        let error = CounterError::Transport {
            status: Some(503),
            message: "Service Unavailable".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("HTTP 503"));
        assert!(display.contains("Service Unavailable"));

        let error = CounterError::transport("connection reset");
        assert_eq!(
            error.to_string(),
            "Gmail API transport error: connection reset"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "token.json");
        let error: CounterError = io.into();
        assert!(matches!(error, CounterError::IoError(_)));
    }
}
