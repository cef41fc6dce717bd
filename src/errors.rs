// Error types for pitwall

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PitwallError {
    // Errors talking to the Pitwall API
    #[snafu(display("Unable to reach the Pitwall API at {path}"))]
    HttpTransport { path: String, source: reqwest::Error },
    #[snafu(display("API error: {status} for {path}"))]
    HttpStatus { status: u16, path: String },
    #[snafu(display("Unexpected response body for {path}"))]
    HttpDecode { path: String, source: reqwest::Error },

    // Account registration errors, the message is shown to the user as-is
    #[snafu(display("{message}"))]
    RegistrationRejected { message: String },
    #[snafu(display("Unable to connect to server. Please try again later."))]
    RegistrationUnavailable,

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Device-local storage errors
    #[snafu(display("Error accessing local storage: {operation}"))]
    StorageIOError { operation: String, source: io::Error },
    #[snafu(display("Error serializing local storage value for key {key}"))]
    StorageSerializeError {
        key: String,
        source: serde_json::Error,
    },

    // Errors for the recording writer
    #[snafu(display("Error writing recording file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error loading recording file"))]
    RecordingLoaderError { source: io::Error },

    // Live view errors
    #[snafu(display("The live event view has shut down"))]
    ViewClosed,
    #[snafu(display("Could not set Ctrl-C handler"))]
    InterruptHandlerError { source: ctrlc::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl PitwallError {
    /// True for failures caused by the network or the backend rather than by local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            PitwallError::HttpTransport { .. }
                | PitwallError::HttpStatus { .. }
                | PitwallError::HttpDecode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = PitwallError::HttpStatus {
            status: 404,
            path: "/api/events/monza".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 404 for /api/events/monza");
        assert!(err.is_remote());
    }

    #[test]
    fn test_registration_message_is_verbatim() {
        let err = PitwallError::RegistrationRejected {
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.to_string(), "Email already registered");
        assert!(!err.is_remote());
    }
}
