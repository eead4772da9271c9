use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Contract case '{case}' failed: {message}")]
    ContractViolation { case: String, message: String },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Contract,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MockError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MockError::ApiError(_) => ErrorCategory::Network,
            MockError::ConfigValidationError { .. }
            | MockError::InvalidConfigValueError { .. }
            | MockError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MockError::ContractViolation { .. } => ErrorCategory::Contract,
            MockError::IoError(_)
            | MockError::SerializationError(_)
            | MockError::ServerError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Contract => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the mock server is running and the base URL is reachable",
            ErrorCategory::Configuration => "Fix the configuration file or command line arguments and retry",
            ErrorCategory::Contract => "Compare the server's route table with the expected contract",
            ErrorCategory::System => "Check file permissions and that the bind address is free",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MockError::ApiError(e) if e.is_timeout() => "The server did not answer in time".to_string(),
            MockError::ApiError(e) if e.is_connect() => "Could not connect to the server".to_string(),
            MockError::MissingConfigError { field } => format!("Please provide '{}'", field),
            other => other.to_string(),
        }
    }

    pub(crate) fn contract(case: &str, message: impl Into<String>) -> Self {
        MockError::ContractViolation {
            case: case.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MockError>;
