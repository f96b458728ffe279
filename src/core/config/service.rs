use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_settings;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 5] = ["api_key", "secret", "password", "_token", "credential"];

const SENSITIVE_WHITELIST: [&str; 1] = ["max_tokens"];

/// Environment variable -> dotted settings path.
const ENV_STRING_OVERRIDES: [(&str, &[&str]); 8] = [
    ("OPENAI_API_KEY", &["openai", "api_key"]),
    ("OPENAI_BASE_URL", &["openai", "base_url"]),
    ("OPENAI_MODEL", &["openai", "chat_model"]),
    ("OPENAI_EMBEDDING_MODEL", &["openai", "embedding_model"]),
    ("OPENAI_ERROR", &["openai", "error"]),
    ("OPENWEATHER_API_KEY", &["weather", "api_key"]),
    ("OPENWEATHER_UNITS", &["weather", "units"]),
    ("LANGCHAIN_PROJECT", &["app", "project"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("PAPERWEATHER_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.project_root.join("paperweather.yml")
    }

    /// Load `.env` from the project root into the process environment.
    ///
    /// Variables already set in the environment win over the file.
    pub fn load_env_file(&self) -> bool {
        let env_path = self.paths.env_file();
        if !env_path.exists() {
            return false;
        }
        match dotenvy::from_path(&env_path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", env_path.display(), err);
                false
            }
        }
    }

    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        let file_config = load_yaml_file(&self.config_path());
        let overrides = env_overrides(|key| env::var(key).ok());
        resolve_settings(&file_config, &overrides)
    }

    pub fn redacted(&self, settings: &Settings) -> Value {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        redact_sensitive_values(&value)
    }
}

pub fn resolve_settings(file_config: &Value, overrides: &Value) -> Result<Settings, ApiError> {
    let merged = deep_merge(file_config, overrides);
    let settings: Settings = serde_json::from_value(merged)
        .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

pub fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = Value::Object(Map::new());

    for (key, path) in ENV_STRING_OVERRIDES {
        if let Some(value) = lookup(key) {
            ensure_object_path(&mut overrides, path, Value::String(value));
        }
    }

    if let Some(flag) = lookup("PAPERWEATHER_OFFLINE") {
        ensure_object_path(&mut overrides, &["app", "offline"], json!(parse_flag(&flag)));
    }
    if let Some(host) = lookup("HOST") {
        ensure_object_path(&mut overrides, &["server", "host"], Value::String(host));
    }
    if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        ensure_object_path(&mut overrides, &["server", "port"], json!(port));
    }

    overrides
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                let has_secret = val.as_str().map(|s| !s.is_empty()).unwrap_or(!val.is_null());
                if is_sensitive_key(key) && has_secret {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
        });
        let override_value = json!({
            "b": { "c": 99 },
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(merged, json!({ "a": 1, "b": { "c": 99, "d": 3 }, "e": "x" }));
    }

    #[test]
    fn env_overrides_map_credentials_and_flags() {
        let overrides = env_overrides(lookup_from(&[
            ("OPENAI_API_KEY", "sk-live"),
            ("OPENWEATHER_API_KEY", "ow-key"),
            ("PAPERWEATHER_OFFLINE", "TRUE"),
            ("PORT", "9000"),
        ]));

        assert_eq!(overrides["openai"]["api_key"], "sk-live");
        assert_eq!(overrides["weather"]["api_key"], "ow-key");
        assert_eq!(overrides["app"]["offline"], true);
        assert_eq!(overrides["server"]["port"], 9000);
    }

    #[test]
    fn unparsable_port_is_ignored() {
        let overrides = env_overrides(lookup_from(&[("PORT", "not-a-port")]));
        assert!(overrides.get("server").is_none());
    }

    #[test]
    fn env_wins_over_file_config() {
        let file = json!({
            "openai": { "api_key": "from-file", "chat_model": "gpt-4o-mini" },
            "rag": { "top_k": 5 }
        });
        let overrides = env_overrides(lookup_from(&[("OPENAI_API_KEY", "from-env")]));

        let settings = resolve_settings(&file, &overrides).unwrap();

        assert_eq!(settings.openai.api_key, "from-env");
        assert_eq!(settings.openai.chat_model, "gpt-4o-mini");
        assert_eq!(settings.rag.top_k, 5);
        assert_eq!(settings.rag.chunk_size, 1000);
    }

    #[test]
    fn invalid_file_config_is_rejected() {
        let file = json!({ "rag": { "chunk_size": 100, "chunk_overlap": 200 } });
        assert!(resolve_settings(&file, &json!({})).is_err());
    }

    #[test]
    fn yaml_file_is_loaded_when_present() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("paperweather.yml");
        fs::write(&path, "weather:\n  units: imperial\n").unwrap();

        let value = load_yaml_file(&path);
        assert_eq!(value["weather"]["units"], "imperial");
        assert_eq!(load_yaml_file(&temp.path().join("missing.yml")), json!({}));
    }

    #[test]
    fn redaction_hides_only_populated_keys() {
        let mut settings = Settings::default();
        settings.openai.api_key = "sk-secret".to_string();
        let value = serde_json::to_value(&settings).unwrap();

        let redacted = redact_sensitive_values(&value);

        assert_eq!(redacted["openai"]["api_key"], "****");
        assert_eq!(redacted["weather"]["api_key"], "");
        assert_eq!(redacted["rag"]["top_k"], 3);
    }
}
