//! Configuration for one verification run
//!
//! Settings are an explicit immutable value threaded into every component
//! constructor; there are no process-wide singletons. Loaded from
//! `Settings.toml` plus environment-variable overrides, with an optional
//! `.env` file for local development.

use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmokeSettings {
    pub logging: LoggingSettings,
    pub uaa: UaaSettings,
    pub federated: FederatedSettings,
}

/// Primary identity-provider settings: token endpoint, directory API, and
/// the scripted direct login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UaaSettings {
    /// Base URL of the OAuth2/SCIM server, e.g. `https://uaa.example.com`.
    pub auth_domain: String,
    pub client_id: String,
    pub client_secret: String,
    /// Credentials and email of the throwaway user provisioned per run.
    pub smoke_username: String,
    pub smoke_password: String,
    pub smoke_email: String,
    /// Display name of the group the throwaway user is added to.
    pub scope_group: String,
    /// Protected resource that triggers the direct authorization-code
    /// redirect chain.
    pub resource_url: String,
    /// When true, a missing scope group fails the membership step locally
    /// instead of attempting the call with an empty group id.
    pub require_scope_group: bool,
}

/// Federated identity-provider settings for the SAML-handoff login.
///
/// Independent of [`UaaSettings`]: the two providers never share
/// configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedSettings {
    pub username: String,
    pub password: String,
    /// Protected resource that triggers the federated authorization-code
    /// redirect chain.
    pub resource_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for UaaSettings {
    fn default() -> Self {
        Self {
            auth_domain: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            smoke_username: "smokeuser".to_string(),
            smoke_password: "smokepassword".to_string(),
            smoke_email: "smokeuser@smoke.example".to_string(),
            scope_group: "smoketest.extinguish".to_string(),
            resource_url: String::new(),
            require_scope_group: false,
        }
    }
}

impl Default for FederatedSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            resource_url: String::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl UaaSettings {
    /// Token endpoint derived from the auth domain.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.auth_domain.trim_end_matches('/'))
    }
}

impl SmokeSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment initialization fails
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Initialize environment and logging
        Self::initialize_environment()?;

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment and logging
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> Result<(), Box<dyn std::error::Error>> {
        Self::load_env_file();
        env_logger::try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `SMOKETEST_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        // 1. Start with default settings
        let mut settings = Self::default();

        // 2. Try to load from Settings.toml in current directory (lower priority)
        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        // 3. If SMOKETEST_SECRETS_DIR is set and contains Settings.toml, override with those settings (higher priority)
        if let Ok(secrets_dir) = std::env::var("SMOKETEST_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let secrets_toml_content = fs::read_to_string(&secrets_path)?;
                let secrets_settings: Self = basic_toml::from_str(&secrets_toml_content)?;

                println!("✓ Overriding settings from {}", secrets_path.display());

                settings = secrets_settings;
            } else {
                println!(
                    "ℹ SMOKETEST_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_uaa_env_overrides(&mut settings.uaa);
        Self::apply_federated_env_overrides(&mut settings.federated);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for the primary provider
    fn apply_uaa_env_overrides(uaa_settings: &mut UaaSettings) {
        Self::apply_string_env_override("SMOKE_AUTH_DOMAIN", &mut uaa_settings.auth_domain);
        Self::apply_string_env_override("SMOKE_CLIENT_ID", &mut uaa_settings.client_id);
        Self::apply_string_env_override("SMOKE_CLIENT_SECRET", &mut uaa_settings.client_secret);
        Self::apply_string_env_override("SMOKE_USERNAME", &mut uaa_settings.smoke_username);
        Self::apply_string_env_override("SMOKE_PASSWORD", &mut uaa_settings.smoke_password);
        Self::apply_string_env_override("SMOKE_EMAIL", &mut uaa_settings.smoke_email);
        Self::apply_string_env_override("SMOKE_SCOPE_GROUP", &mut uaa_settings.scope_group);
        Self::apply_string_env_override("SMOKE_UAA_RESOURCE_URL", &mut uaa_settings.resource_url);
        if let Ok(require_str) = std::env::var("SMOKE_REQUIRE_SCOPE_GROUP") {
            if let Ok(require) = require_str.parse::<bool>() {
                uaa_settings.require_scope_group = require;
            }
        }
    }

    /// Apply environment overrides for the federated provider
    fn apply_federated_env_overrides(federated_settings: &mut FederatedSettings) {
        Self::apply_string_env_override("SMOKE_ADFS_USERNAME", &mut federated_settings.username);
        Self::apply_string_env_override("SMOKE_ADFS_PASSWORD", &mut federated_settings.password);
        Self::apply_string_env_override(
            "SMOKE_ADFS_RESOURCE_URL",
            &mut federated_settings.resource_url,
        );
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply string environment variable overrides
    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            *target = value;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }
}
