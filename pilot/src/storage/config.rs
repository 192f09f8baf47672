//! Layered configuration store
//!
//! The persisted document is deep-merged over the built-in defaults.
//! Keys the typed [`Settings`] view does not know about are preserved,
//! so `config set` can store arbitrary values under any dotted path.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::filesys::file::File;
use crate::storage::settings::Settings;

/// Configuration document plus its typed view
#[derive(Debug, Clone)]
pub struct ConfigStore {
    file: File,
    document: Value,
    settings: Settings,
}

impl ConfigStore {
    /// Load the configuration file, creating it with defaults when absent.
    ///
    /// A file that cannot be parsed, or whose values do not fit the typed
    /// settings, is left untouched and the defaults are used instead.
    pub async fn load(file: File) -> Result<Self, AppError> {
        let mut document = default_document()?;

        if file.exists().await {
            match file.read_json::<Value>().await {
                Ok(persisted) => {
                    debug!("Loaded configuration from {}", file.path().display());
                    deep_merge(&mut document, persisted);
                }
                Err(e) => {
                    warn!(
                        "Could not load config file {}: {}. Using defaults",
                        file.path().display(),
                        e
                    );
                }
            }
        } else {
            info!("Creating default configuration at {}", file.path().display());
            file.write_json_atomic(&document).await?;
        }

        match parse_settings(&document) {
            Ok(settings) => Ok(Self {
                file,
                document,
                settings,
            }),
            Err(e) => {
                warn!(
                    "Config file {} does not fit the expected settings: {}. Using defaults",
                    file.path().display(),
                    e
                );
                Self::with_defaults(file)
            }
        }
    }

    /// Build a store from an already merged document
    pub fn from_document(file: File, document: Value) -> Result<Self, AppError> {
        let settings = parse_settings(&document)?;
        Ok(Self {
            file,
            document,
            settings,
        })
    }

    /// In-memory store over the defaults, never persisted unless `save`
    /// is called
    pub fn with_defaults(file: File) -> Result<Self, AppError> {
        Self::from_document(file, default_document()?)
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Value at a dotted path such as `deployment.max_retries`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.document;
        for key in split_path(path).ok()? {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Set the value at a dotted path and persist the document.
    ///
    /// Missing or non-object intermediate keys are replaced by objects.
    /// Returns the previous value. The change is rejected when the
    /// resulting document no longer fits the typed settings.
    pub async fn set(&mut self, path: &str, value: Value) -> Result<Option<Value>, AppError> {
        let keys = split_path(path)?;
        let mut document = self.document.clone();

        let mut current = &mut document;
        for key in &keys[..keys.len() - 1] {
            let map = ensure_object(current)?;
            current = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        let last = keys[keys.len() - 1].to_string();
        let previous = ensure_object(current)?.insert(last, value);

        let settings = parse_settings(&document)
            .map_err(|e| AppError::ConfigError(format!("Invalid value for {}: {}", path, e)))?;

        self.file.write_json_atomic(&document).await?;
        self.document = document;
        self.settings = settings;
        Ok(previous)
    }

}

/// The built-in defaults as a JSON document
pub fn default_document() -> Result<Value, AppError> {
    Ok(serde_json::to_value(Settings::default())?)
}

/// Recursively merge `update` into `base`. Objects merge key by key;
/// any other value replaces what was there.
pub fn deep_merge(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, update) => *base = update,
    }
}

/// Interpret a command-line value: JSON when it parses, a string otherwise
pub fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_settings(document: &Value) -> Result<Settings, AppError> {
    serde_json::from_value(document.clone())
        .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))
}

fn split_path(path: &str) -> Result<Vec<&str>, AppError> {
    let keys: Vec<&str> = path.split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(AppError::ConfigError(format!(
            "Invalid configuration key: '{}'",
            path
        )));
    }
    Ok(keys)
}

fn ensure_object(value: &mut Value) -> Result<&mut Map<String, Value>, AppError> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .ok_or_else(|| AppError::Internal("configuration node is not an object".to_string()))
}
