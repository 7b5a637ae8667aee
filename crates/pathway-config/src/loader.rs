//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, PathwayConfig};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file, then the process environment
///
/// # Example
///
/// ```no_run
/// use pathway_config::ConfigLoader;
///
/// # fn main() -> Result<(), pathway_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("pathway.toml")?
///     .with_dotenv()
///     .with_env_prefix("PATHWAY")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: PathwayConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PathwayConfig::default(),
            env_prefix: None,
            file_loaded: false,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is what `new()` does already; chain it for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = PathwayConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use pathway_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = PathwayConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = PathwayConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// has an unsupported extension, or does not parse (unknown fields
    /// included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.config = Self::parse(&content, format)?;
        self.file_loaded = true;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but fails to load.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use pathway_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     http_addr = "127.0.0.1:3000"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, format)?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `PATHWAY__SERVER__HTTP_ADDR=0.0.0.0:8000` or
    /// `PATHWAY__CORS__ALLOWED_ORIGINS=["https://pathway.dev"]`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if there is one.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();
        self
    }

    /// Returns true if a configuration file was loaded.
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment overrides (if a prefix was set) and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not fit the schema or
    /// validation fails.
    ///
    /// # Example
    ///
    /// ```
    /// use pathway_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.server.static_dir, "public/build");
    /// ```
    pub fn load(mut self) -> Result<PathwayConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    pub fn load_unvalidated(self) -> PathwayConfig {
        self.config
    }

    fn parse(content: &str, format: &str) -> Result<PathwayConfig, ConfigError> {
        match format.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Overlays every `PREFIX__…` variable onto the current configuration.
    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        if overrides.is_empty() {
            return Ok(());
        }
        overrides.sort();

        let base = serde_json::to_value(&self.config)?;
        let mut keys = Vec::with_capacity(overrides.len());
        for (key, _) in &overrides {
            let path: Vec<String> = key[marker.len()..]
                .split("__")
                .map(str::to_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                return Err(ConfigError::env_parse_error(key, "empty path segment"));
            }
            keys.push(path);
        }

        let overlay = |untyped: Coercion| -> Result<Value, ConfigError> {
            let mut tree = base.clone();
            for ((key, value), path) in overrides.iter().zip(&keys) {
                set_path(&mut tree, path, value, untyped)
                    .map_err(|reason| ConfigError::env_parse_error(key, reason))?;
            }
            Ok(tree)
        };

        // Keys under an absent optional section have no current value to
        // take a type from; if reading them as JSON fails, read them as text.
        let config = match serde_json::from_value(overlay(Coercion::Json)?) {
            Ok(config) => config,
            Err(_) => serde_json::from_value(overlay(Coercion::Text)?).map_err(|e| {
                let vars: Vec<&str> = overrides.iter().map(|(k, _)| k.as_str()).collect();
                ConfigError::env_parse_error(vars.join(", "), e.to_string())
            })?,
        };
        self.config = config;
        Ok(())
    }
}

/// How to read a value whose target has no current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    Json,
    Text,
}

/// Writes `raw` at `path` inside `tree`.
///
/// Where the current value is a string the raw text is kept verbatim and
/// where it is any other value `raw` is parsed as JSON, falling back to a
/// string. Absent or null targets follow `untyped`.
fn set_path(tree: &mut Value, path: &[String], raw: &str, untyped: Coercion) -> Result<(), String> {
    let Some((last, parents)) = path.split_last() else {
        return Err("missing key".to_string());
    };

    let mut node = tree;
    for segment in parents {
        let object = as_object(node, segment)?;
        node = object
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
    }

    let object = as_object(node, last)?;
    let text = || Value::String(raw.to_string());
    let value = match (object.get(last), untyped) {
        (Some(Value::String(_)), _) | (None | Some(Value::Null), Coercion::Text) => text(),
        _ => serde_json::from_str(raw).unwrap_or_else(|_| text()),
    };
    object.insert(last.clone(), value);
    Ok(())
}

fn as_object<'a>(node: &'a mut Value, segment: &str) -> Result<&'a mut Map<String, Value>, String> {
    node.as_object_mut()
        .ok_or_else(|| format!("`{segment}` is nested under a value that is not a section"))
}
