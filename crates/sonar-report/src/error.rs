use sonar_report_core::config::ConfigError;
use sonar_report_core::uncovered::LocationError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Authentication failed: check that your token is valid and not expired.")]
    Authentication,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Unexpected response {status} from {url}: {body}")]
    Server {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    CallerContract(#[from] LocationError),

    #[error("IO error on '{path}': {message}")]
    Io { path: String, message: String },
}

/// Transport failures, as opposed to well-formed error statuses
#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("Request timed out after {seconds}s while contacting '{url}'")]
    Timeout { seconds: f64, url: String },

    #[error("Unable to reach SonarQube server at '{base_url}'")]
    Unreachable { base_url: String },
}

impl Error {
    /// Prefix shown in front of the message when the command fails
    pub fn label(&self) -> &'static str {
        match self {
            Error::Authentication => "Authentication error",
            Error::NotFound(_) => "Not found",
            Error::Network(_) => "Network error",
            Error::Server { .. } | Error::Decode { .. } => "SonarQube error",
            Error::Config(ConfigError::ProjectNotFound { .. }) => "Project error",
            Error::Config(_) => "Configuration error",
            Error::CallerContract(_) => "Usage error",
            Error::Client(_) | Error::Io { .. } => "Error",
        }
    }
}
