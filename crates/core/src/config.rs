//! Configuration file handling for bmm.
//!
//! This module resolves the configuration file path, reads and writes the
//! YAML configuration, and picks the bearer token to use.
//!
//! # Example configuration
//!
//! ```yaml
//! api:
//!   base: https://bmm.example.com
//!   org: my-org
//!   name: carbide
//! auth:
//!   oidc:
//!     token_url: https://idp.example.com/token
//!     client_id: bmm
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default path for the configuration file
const DEFAULT_CONFIG_PATH: &str = "~/.bmm/config.yaml";
/// Directory searched for alternative configuration files
const DEFAULT_CONFIG_DIR: &str = "~/.bmm";

/// API path segment used when `api.name` is not set
pub const DEFAULT_API_NAME: &str = "carbide";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<OidcConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeyConfig>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct OidcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ApiKeyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authn_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Where a freshly obtained token gets stored.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoginMethod {
    Oidc,
    ApiKey,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Resolves the configuration file path.
///
/// If a custom path is provided, uses that path. Otherwise, uses the default
/// configuration path. Shell expansions like `~` are resolved.
///
/// # Arguments
///
/// * `config_path_arg` - Optional custom configuration file path
///
/// # Returns
///
/// The resolved absolute path to the configuration file
///
/// # Examples
///
/// ```
/// use bmm_core::config::get_config_path;
///
/// let default_path = get_config_path(&None);
/// assert!(default_path.ends_with(".bmm/config.yaml"));
///
/// let custom_path = get_config_path(&Some("/path/to/config.yaml".to_string()));
/// assert_eq!(custom_path, "/path/to/config.yaml");
/// ```
pub fn get_config_path(config_path_arg: &Option<String>) -> String {
    let config_path = match config_path_arg {
        Some(config_path) => config_path,
        None => DEFAULT_CONFIG_PATH,
    };

    shellexpand::tilde(config_path).to_string()
}

/// The directory holding the default configuration file, `~` expanded.
pub fn get_config_dir() -> String {
    shellexpand::tilde(DEFAULT_CONFIG_DIR).to_string()
}

/// `path` for display, with the home directory shown as `~`.
pub fn display_path(path: &Path) -> String {
    let shown = path.display().to_string();
    let home = shellexpand::tilde("~").to_string();
    if home == "~" || home.is_empty() {
        return shown;
    }
    match shown.strip_prefix(&home) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{rest}"),
        _ => shown,
    }
}

/// Lists `config*.yaml`/`config*.yml` files in `dir`.
///
/// `config.yaml` and `config.yml` sort first, the rest by file name. A
/// missing directory yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn config_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        Error::io_error(
            "config directory".to_string(),
            dir.display().to_string(),
            e,
        )
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| {
                    name.starts_with("config")
                        && (name.ends_with(".yaml") || name.ends_with(".yml"))
                })
        })
        .collect();

    candidates.sort_by_key(|path| {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let is_default = name == "config.yaml" || name == "config.yml";
        (!is_default, name)
    });

    Ok(candidates)
}

impl ConfigFile {
    /// Reads the configuration at `path`.
    ///
    /// A missing file is an empty configuration rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            debug!("No config at `{path}`, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| Error::io_error("config".to_string(), path.to_string(), e))?;

        serde_yaml::from_str(&contents).map_err(|e| {
            Error::yaml_error(
                "reading".to_string(),
                "config".to_string(),
                path.to_string(),
                e,
            )
        })
    }

    /// Writes the configuration to `path`.
    ///
    /// Keys already present in the file that this structure does not model
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &str) -> Result<()> {
        let yaml_error = |action: &str, e| {
            Error::yaml_error(action.to_string(), "config".to_string(), path.to_string(), e)
        };

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::io_error(
                        "config directory".to_string(),
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
        }

        let mut merged = match fs::read_to_string(path) {
            Ok(existing) => serde_yaml::from_str(&existing)
                .unwrap_or(serde_yaml::Value::Mapping(serde_yaml::Mapping::new())),
            Err(_) => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        };
        let structured = serde_yaml::to_value(self).map_err(|e| yaml_error("encoding", e))?;
        merge_yaml(&mut merged, structured);

        let contents = serde_yaml::to_string(&merged).map_err(|e| yaml_error("writing", e))?;
        fs::write(path, contents)
            .map_err(|e| Error::io_error("config".to_string(), path.to_string(), e))
    }

    /// Best available bearer token.
    ///
    /// Priority is `auth.token`, then `auth.oidc.token`, then
    /// `auth.api_key.token`.
    pub fn auth_token(&self) -> Option<&str> {
        non_empty(self.auth.token.as_ref())
            .or_else(|| {
                self.auth
                    .oidc
                    .as_ref()
                    .and_then(|o| non_empty(o.token.as_ref()))
            })
            .or_else(|| {
                self.auth
                    .api_key
                    .as_ref()
                    .and_then(|k| non_empty(k.token.as_ref()))
            })
    }

    pub fn has_oidc(&self) -> bool {
        self.auth.oidc.as_ref().is_some_and(|o| {
            non_empty(o.token_url.as_ref()).is_some() && non_empty(o.client_id.as_ref()).is_some()
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.auth.api_key.as_ref().is_some_and(|k| {
            non_empty(k.authn_url.as_ref()).is_some() && non_empty(k.key.as_ref()).is_some()
        })
    }

    /// The login method to use, preferring OIDC when both are configured.
    pub fn login_method(&self) -> Option<LoginMethod> {
        if self.has_oidc() {
            Some(LoginMethod::Oidc)
        } else if self.has_api_key() {
            Some(LoginMethod::ApiKey)
        } else {
            None
        }
    }

    pub fn api_name(&self) -> &str {
        non_empty(self.api.name.as_ref()).unwrap_or(DEFAULT_API_NAME)
    }

    pub fn set_token(&mut self, method: LoginMethod, token: &str) {
        match method {
            LoginMethod::Oidc => {
                self.auth.oidc.get_or_insert_with(OidcConfig::default).token =
                    Some(token.to_string());
            }
            LoginMethod::ApiKey => {
                self.auth
                    .api_key
                    .get_or_insert_with(ApiKeyConfig::default)
                    .token = Some(token.to_string());
            }
        }
    }
}

/// Re-reads the file at `path`, stores `token` for `method` and writes it back.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written.
pub fn save_token(path: &str, method: LoginMethod, token: &str) -> Result<()> {
    let mut config = ConfigFile::load(path)?;
    config.set_token(method, token);
    config.save(path)
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
