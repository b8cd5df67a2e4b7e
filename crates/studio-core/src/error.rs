use std::io;

use thiserror::Error;

/// Errors raised while planning or running a processing job.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),
    #[error("invalid value for {name}: {message}")]
    InvalidParameter { name: String, message: String },
    #[error("FFmpeg error: {stderr}")]
    ToolFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StudioError {
    pub fn invalid<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        StudioError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// True when the failure was caused by caller input rather than the tool or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StudioError::MissingInput(_) | StudioError::InvalidParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failure_message_carries_stderr() {
        let err = StudioError::ToolFailed {
            program: "ffmpeg".to_string(),
            status: Some(1),
            stderr: "No such file or directory".to_string(),
        };
        assert_eq!(err.to_string(), "FFmpeg error: No such file or directory");
        assert!(!err.is_client_error());
    }

    #[test]
    fn parameter_errors_are_client_errors() {
        assert!(StudioError::MissingInput("input").is_client_error());
        assert!(StudioError::invalid("crf", "out of range").is_client_error());
        assert_eq!(
            StudioError::invalid("crf", "out of range").to_string(),
            "invalid value for crf: out of range"
        );
    }
}
