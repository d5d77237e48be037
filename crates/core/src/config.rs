//! Configuration parsing, validation and project alias resolution
//!
//! Pure functions over the YAML text of `sonar-config.yaml`. Reading the file
//! and the environment is left to the shell, which passes the overrides in.

use serde::Deserialize;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "sonar-config.yaml";

/// Environment variable overriding `server.url`
pub const URL_ENV: &str = "SONAR_URL";

/// Environment variable overriding `server.token`
pub const TOKEN_ENV: &str = "SONAR_TOKEN";

/// Written by `sonar-report init`
pub const CONFIG_TEMPLATE: &str = r#"server:
  url: "https://sonar.example.com"
  token: "squ_xxxxxxxxxxxx"       # Generate at: <your-sonar-url>/account/security

projects:
  # Human-readable alias: SonarQube project key
  my-project: "com.example.my-project"
  another:    "com.example.another-service"
"#;

/// Error type for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: '{0}'\nRun `sonar-report init` to generate a template.")]
    NotFound(String),

    #[error("Failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("'{0}' must be a YAML mapping at the top level.")]
    NotAMapping(String),

    #[error("Invalid configuration:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("Project '{name}' not found. Available aliases: {available}")]
    ProjectNotFound { name: String, available: String },

    #[error("'{0}' already exists. Remove it first or choose a different path.")]
    AlreadyExists(String),

    #[error("IO error on '{path}': {message}")]
    Io { path: String, message: String },
}

/// Values taken from the environment, applied over the file
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub token: String,
    /// Alias → SonarQube project key, in file order
    pub projects: Vec<(String, String)>,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: Option<RawServer>,
    #[serde(default)]
    projects: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Deserialize, Default)]
struct RawServer {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl Config {
    /// Return the SonarQube project key for an alias
    ///
    /// A raw project key that appears among the configured values is accepted
    /// as-is.
    pub fn resolve_project(&self, name: &str) -> Result<String, ConfigError> {
        if let Some((_, key)) = self.projects.iter().find(|(alias, _)| alias == name) {
            return Ok(key.clone());
        }
        if self.projects.iter().any(|(_, key)| key == name) {
            return Ok(name.to_string());
        }

        let available = if self.projects.is_empty() {
            "(none configured)".to_string()
        } else {
            self.projects
                .iter()
                .map(|(alias, _)| alias.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        Err(ConfigError::ProjectNotFound {
            name: name.to_string(),
            available,
        })
    }
}

/// Parse and validate configuration text
///
/// `source` names the file in error messages. Non-empty environment values
/// win over the file.
pub fn parse_config(text: &str, source: &str, env: &EnvOverrides) -> Result<Config, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
        path: source.to_string(),
        message: e.to_string(),
    })?;

    if !value.is_mapping() {
        return Err(ConfigError::NotAMapping(source.to_string()));
    }

    let raw: RawConfig = serde_yaml::from_value(value).map_err(|e| ConfigError::Parse {
        path: source.to_string(),
        message: e.to_string(),
    })?;

    let server = raw.server.unwrap_or_default();
    let pick = |env_value: &Option<String>, file_value: Option<String>| {
        env_value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or(file_value)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let config = Config {
        url: pick(&env.url, server.url),
        token: pick(&env.token, server.token),
        projects: project_aliases(raw.projects.unwrap_or_default(), source)?,
    };

    validate(&config)?;
    Ok(config)
}

/// Alias pairs of the `projects` mapping; both sides must be strings
fn project_aliases(
    mapping: serde_yaml::Mapping,
    source: &str,
) -> Result<Vec<(String, String)>, ConfigError> {
    mapping
        .into_iter()
        .map(|(alias, key)| match (alias.as_str(), key.as_str()) {
            (Some(alias), Some(key)) => Ok((alias.to_string(), key.to_string())),
            _ => Err(ConfigError::Parse {
                path: source.to_string(),
                message: "'projects' entries must map a string alias to a string key".to_string(),
            }),
        })
        .collect()
}

/// Collect every problem with the configuration at once
fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.url.is_empty() {
        errors.push(format!(
            "  - 'server.url' is missing (or set the {URL_ENV} environment variable)"
        ));
    }
    if config.token.is_empty() {
        errors.push(format!(
            "  - 'server.token' is missing (or set the {TOKEN_ENV} environment variable)"
        ));
    }
    if config.projects.is_empty() {
        errors.push("  - 'projects' mapping is empty, add at least one project alias".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}
