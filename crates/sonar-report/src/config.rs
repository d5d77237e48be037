use crate::client::SonarClient;
use crate::prelude::{println, *};
use sonar_report_core::config::{
    parse_config, Config, ConfigError, EnvOverrides, CONFIG_TEMPLATE, DEFAULT_CONFIG_PATH,
    TOKEN_ENV, URL_ENV,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for the `init` command
#[derive(Debug, clap::Args, Clone)]
pub struct InitOptions {
    /// Path where the template config file will be written
    #[clap(value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub path: PathBuf,
}

/// A loaded configuration and a client connected with it
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub client: SonarClient,
}

impl Session {
    /// Resolve a project alias or raw key against the configuration
    pub fn resolve_project(&self, name: &str) -> Result<String, Error> {
        Ok(self.config.resolve_project(name)?)
    }
}

/// Read `SONAR_URL` and `SONAR_TOKEN`
pub fn env_overrides() -> EnvOverrides {
    EnvOverrides {
        url: std::env::var(URL_ENV).ok(),
        token: std::env::var(TOKEN_ENV).ok(),
    }
}

/// Load and validate the configuration file, applying `env` over it
pub fn load(path: &Path, env: &EnvOverrides) -> Result<Config, ConfigError> {
    let source = path.display().to_string();

    if !path.exists() {
        return Err(ConfigError::NotFound(source));
    }

    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: source.clone(),
        message: e.to_string(),
    })?;

    parse_config(&text, &source, env)
}

/// Write the configuration template, refusing to overwrite an existing file
pub fn generate_template(path: &Path) -> Result<(), ConfigError> {
    let source = path.display().to_string();

    if path.exists() {
        return Err(ConfigError::AlreadyExists(source));
    }

    fs::write(path, CONFIG_TEMPLATE).map_err(|e| ConfigError::Io {
        path: source,
        message: e.to_string(),
    })
}

/// Load the configuration named by the global options and build a client
pub fn connect(global: &crate::Global) -> Result<Session, Error> {
    let config = load(&global.config_path, &env_overrides())?;

    log::info!("Connecting to {}", config.url);

    let client = SonarClient::new(
        &config.url,
        &config.token,
        Duration::from_secs(global.timeout),
    )?;

    Ok(Session { config, client })
}

/// Handle the `init` command
pub async fn init_handler(options: InitOptions) -> Result<()> {
    generate_template(&options.path).map_err(Error::from)?;

    println!("Template written to '{}'.", options.path.display());
    println!("Edit it with your server URL, token and project key mappings.");

    Ok(())
}
