// SPDX-License-Identifier: MPL-2.0

//! Error types for the control panel

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture process errors
    Supervisor(SupervisorError),
    /// Persisted configuration errors
    Config(ConfigError),
    /// Lens focus device errors
    Focus(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors from running the external capture tools
#[derive(Debug, Clone)]
pub enum SupervisorError {
    /// A job is already running; the caller must stop it first
    AlreadyRunning,
    /// The tool could not be launched at all
    SpawnFailed { program: String, reason: String },
    /// Delivering a signal to the job failed
    SignalFailed(String),
    /// The job ran but the expected output never appeared
    OutputTimeout { expected: PathBuf, waited: Duration },
    /// The tool exited unsuccessfully
    ExitedWithError { code: Option<i32>, stderr: String },
    /// The user stopped the job
    Cancelled,
}

/// Persisted configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing failed
    Io(String),
    /// A line is not an integer
    Parse { line: usize, value: String },
    /// Settings file is not valid JSON
    Json(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Supervisor(e) => write!(f, "Capture error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Focus(msg) => write!(f, "Focus error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorError::AlreadyRunning => write!(f, "A capture job is already running"),
            SupervisorError::SpawnFailed { program, reason } => {
                write!(f, "Failed to start {}: {}", program, reason)
            }
            SupervisorError::SignalFailed(msg) => write!(f, "Failed to signal job: {}", msg),
            SupervisorError::OutputTimeout { expected, waited } => write!(
                f,
                "No output at {} after {:.1}s",
                expected.display(),
                waited.as_secs_f64()
            ),
            SupervisorError::ExitedWithError { code, stderr } => {
                match code {
                    Some(code) => write!(f, "Capture tool exited with status {}", code)?,
                    None => write!(f, "Capture tool was killed by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            SupervisorError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "{}", msg),
            ConfigError::Parse { line, value } => {
                write!(f, "line {} is not an integer: {:?}", line, value)
            }
            ConfigError::Json(msg) => write!(f, "invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SupervisorError {}
impl std::error::Error for ConfigError {}

impl From<SupervisorError> for AppError {
    fn from(err: SupervisorError) -> Self {
        AppError::Supervisor(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_error_carries_stderr() {
        let err = SupervisorError::ExitedWithError {
            code: Some(255),
            stderr: "ERROR: *** unrecognised option '--bogus' ***".to_string(),
        };
        let msg = AppError::from(err).to_string();
        assert!(msg.contains("255"));
        assert!(msg.contains("--bogus"));
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = ConfigError::Parse {
            line: 3,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "line 3 is not an integer: \"abc\"");
    }
}
