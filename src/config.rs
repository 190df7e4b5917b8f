//! qrest configuration.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [[apis]]
//! name = "petstore"
//! spec_url = "https://petstore.swagger.io/v2/swagger.json"
//!
//! [apis.auth]
//! type = "bearer"
//! token = "${PETSTORE_TOKEN}"
//! ```

use crate::error::{QrestError, QrestResult};
use crate::executor::{Auth, ExecutorOptions, PaginationPolicy};
use crate::grammar::GrammarOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name looked up in each search directory.
pub const CONFIG_FILE: &str = "qrest.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub apis: Vec<ApiConfig>,
    pub defaults: Defaults,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allow_headers: vec!["content-type".to_string(), "authorization".to_string()],
        }
    }
}

/// One REST API to expose as tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL or file path of the OpenAPI/Swagger description.
    pub spec_url: String,
    /// Overrides the address declared in the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl ApiConfig {
    pub fn auth(&self) -> QrestResult<Auth> {
        Auth::from_scheme(
            &self.auth.auth_type,
            &self.auth.token,
            self.auth.header.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `none`, `bearer`, `apikey` or `basic`.
    #[serde(rename = "type")]
    pub auth_type: String,
    pub token: String,
    /// Header name for `apikey`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_type: "none".to_string(),
            token: String::new(),
            header: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub max_limit: usize,
    pub default_limit: usize,
    pub timeout: String,
    pub pagination: PaginationPolicy,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            default_limit: 100,
            timeout: "30s".to_string(),
            pagination: PaginationPolicy::Omit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the first file on the search path.
    ///
    /// With no explicit path and no file found, defaults are returned.
    pub fn load(path: Option<&Path>) -> QrestResult<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => search_paths().into_iter().find(|p| p.is_file()),
        };
        match path {
            Some(p) => {
                debug!("Loading config from {}", p.display());
                let text = std::fs::read_to_string(&p).map_err(|e| {
                    QrestError::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                Self::from_toml(&text)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse, expand environment references, and validate.
    pub fn from_toml(text: &str) -> QrestResult<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| QrestError::Config(e.to_string()))?;
        config.expand_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Single-API configuration named `cli` built from command-line flags.
    pub fn from_cli(
        spec: &str,
        base_url: Option<&str>,
        auth_type: Option<&str>,
        token: Option<&str>,
    ) -> Self {
        let auth = AuthConfig {
            auth_type: auth_type.unwrap_or("none").to_string(),
            token: token.unwrap_or_default().to_string(),
            header: None,
        };
        Self {
            apis: vec![ApiConfig {
                name: "cli".to_string(),
                spec_url: spec.to_string(),
                base_url: base_url.map(str::to_string),
                auth,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Expand `${VAR}`/`$VAR` in auth tokens and the log file path.
    pub fn expand_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for api in &mut self.apis {
            api.auth.token = expand_vars(&api.auth.token, &lookup);
        }
        if let Some(file) = self.logging.file.take() {
            self.logging.file = Some(expand_vars(&file, &lookup));
        }
    }

    pub fn validate(&self) -> QrestResult<()> {
        if self.server.port == 0 {
            return Err(QrestError::Config("server.port must be between 1 and 65535".into()));
        }

        let mut names = HashSet::new();
        for api in &self.apis {
            if api.name.trim().is_empty() {
                return Err(QrestError::Config("every [[apis]] entry needs a name".into()));
            }
            if !names.insert(api.name.as_str()) {
                return Err(QrestError::Config(format!("duplicate API name '{}'", api.name)));
            }
            if api.spec_url.trim().is_empty() {
                return Err(QrestError::Config(format!("api '{}': spec_url is required", api.name)));
            }
            let auth = match api.auth() {
                Ok(auth) => auth,
                Err(QrestError::Config(message)) => {
                    return Err(QrestError::Config(format!("api '{}': {}", api.name, message)));
                }
                Err(e) => return Err(e),
            };
            if auth != Auth::None && api.auth.token.is_empty() {
                return Err(QrestError::Config(format!(
                    "api '{}': auth type '{}' requires a token",
                    api.name, api.auth.auth_type
                )));
            }
            if let Some(timeout) = &api.timeout {
                parse_duration(timeout)?;
            }
        }

        let d = &self.defaults;
        if d.max_limit == 0 || d.default_limit == 0 {
            return Err(QrestError::Config("limits must be positive".into()));
        }
        if d.default_limit > d.max_limit {
            return Err(QrestError::Config(format!(
                "default_limit ({}) exceeds max_limit ({})",
                d.default_limit, d.max_limit
            )));
        }
        parse_duration(&d.timeout)?;

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(QrestError::Config(format!(
                "invalid log level '{}'",
                self.logging.level
            )));
        }
        if !["text", "json"].contains(&self.logging.format.as_str()) {
            return Err(QrestError::Config(format!(
                "invalid log format '{}' (expected text or json)",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn api(&self, name: &str) -> Option<&ApiConfig> {
        self.apis.iter().find(|a| a.name == name)
    }

    pub fn grammar_options(&self) -> GrammarOptions {
        GrammarOptions {
            max_limit: self.defaults.max_limit,
            default_limit: self.defaults.default_limit,
        }
    }

    /// Executor settings for one API; its own timeout wins over the default.
    pub fn executor_options(&self, api: &ApiConfig) -> QrestResult<ExecutorOptions> {
        let timeout = api.timeout.as_deref().unwrap_or(&self.defaults.timeout);
        Ok(ExecutorOptions {
            timeout: parse_duration(timeout)?,
            pagination: self.defaults.pagination,
            ..Default::default()
        })
    }

    /// Copy safe to show: tokens are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for api in &mut copy.apis {
            if !api.auth.token.is_empty() {
                api.auth.token = "***".to_string();
            }
        }
        copy
    }
}

/// Candidate config files, most specific first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("qrest").join(CONFIG_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".qrest").join(CONFIG_FILE));
    }
    paths.push(PathBuf::from("/etc/qrest").join(CONFIG_FILE));
    paths
}

/// Replace `${VAR}` and `$VAR`; unset variables become empty.
pub fn expand_vars(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(body) = after.strip_prefix('{') {
            if let Some(end) = body.find('}') {
                out.push_str(&lookup(&body[..end]).unwrap_or_default());
                rest = &body[end + 1..];
                continue;
            }
        }

        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..len]).unwrap_or_default());
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Parse `<n><unit>` with unit `ms`, `s`, `m` or `h`.
pub fn parse_duration(text: &str) -> QrestResult<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let invalid = || {
        QrestError::Config(format!(
            "invalid duration '{}' (expected e.g. 500ms, 30s, 5m, 1h)",
            text
        ))
    };
    let n: u64 = number.parse().map_err(|_| invalid())?;
    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(n)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(invalid()),
    };
    n.checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

/// Commented starting point written by `qrest init`.
pub const SAMPLE_CONFIG: &str = r#"# qrest configuration

[server]
host = "127.0.0.1"
port = 8080

[server.cors]
allow_origins = ["*"]
allow_methods = ["GET", "POST", "OPTIONS"]
allow_headers = ["content-type", "authorization"]

# One [[apis]] block per REST API. With more than one API every table
# is prefixed with the API name (petstore_pet, ...).
[[apis]]
name = "petstore"
description = "Swagger sample pet store"
spec_url = "https://petstore.swagger.io/v2/swagger.json"
# base_url = "https://petstore.swagger.io/v2"   # default: taken from the description
timeout = "30s"

[apis.auth]
type = "none"          # none | bearer | apikey | basic
# token = "${PETSTORE_TOKEN}"
# header = "X-API-Key" # apikey only

[defaults]
max_limit = 1000
default_limit = 100
timeout = "30s"
pagination = "omit"    # omit | reject

[logging]
level = "info"         # trace | debug | info | warn | error
format = "text"        # text | json
# file = "${HOME}/.qrest/qrest.log"
"#;

/// Write [`SAMPLE_CONFIG`] to `path`, refusing to overwrite.
pub fn write_sample(path: &Path) -> QrestResult<()> {
    if path.exists() {
        return Err(QrestError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, SAMPLE_CONFIG)?;
    Ok(())
}
