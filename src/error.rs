use thiserror::Error;

/// Main error type for the planner core
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Whether the failure was caused by the caller's input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlannerError::InvalidRequest(_) | PlannerError::Validation(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::Provider(_) => "PROVIDER_ERROR",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::Validation(_) => "VALIDATION_ERROR",
            PlannerError::InvalidRequest(_) => "INVALID_REQUEST",
            PlannerError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            PlannerError::NotFound(_) => "NOT_FOUND",
            PlannerError::Timeout(_) => "TIMEOUT_ERROR",
            PlannerError::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status the surrounding server should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            PlannerError::InvalidRequest(_) | PlannerError::Validation(_) => 400,
            PlannerError::NotFound(_) => 404,
            PlannerError::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Convert to the uniform failure envelope
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "code": self.error_code()
        })
    }
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlannerError::Timeout(format!("HTTP request timed out: {err}"))
        } else {
            PlannerError::Provider(format!("HTTP request failed: {err}"))
        }
    }
}
