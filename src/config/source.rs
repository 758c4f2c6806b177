//! Hierarchical configuration sources.
//!
//! Keys are `:`-separated paths such as `CorsPolicy:Origins`, matched without
//! regard to ASCII case.

use super::error::ConfigError;
use figment::{
    providers::{Env, Format, Json},
    value::{Dict, Map, Value},
    Figment, Metadata, Profile, Provider,
};
use std::collections::HashMap;
use std::path::Path;

/// A read-only lookup of string values by hierarchical key.
pub trait ConfigSource {
    /// Look up the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// In-memory configuration, mostly useful for tests and explicit wiring.
///
/// ```rust
/// use pipeline_defaults::{ConfigSource, MapConfig};
///
/// let config = MapConfig::new().with("CorsPolicy:Methods", "GET,POST");
/// assert_eq!(config.get("corspolicy:methods").as_deref(), Some("GET,POST"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (key, value) in iter {
            config.set(key, value);
        }
        config
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&key.to_ascii_lowercase()).cloned()
    }
}

/// Layered configuration built on [`figment`].
///
/// Providers merge in call order, so later ones override earlier ones. Keys
/// are lowercased on the way in. That lets `CORSPOLICY__ORIGINS` from the
/// environment override `"CorsPolicy": { "Origins": .. }` from a settings
/// file.
///
/// ```rust
/// use pipeline_defaults::{ConfigSource, FigmentConfig};
///
/// let config = FigmentConfig::new()
///     .merge_json(r#"{ "CorsPolicy": { "Origins": "https://app.example" } }"#);
/// assert_eq!(config.get("CorsPolicy:Origins").as_deref(), Some("https://app.example"));
/// ```
#[derive(Clone, Debug)]
pub struct FigmentConfig {
    figment: Figment,
}

impl FigmentConfig {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
        }
    }

    /// Settings file in the `{ "Section": { "Key": .. } }` shape. A missing
    /// file contributes nothing.
    pub fn merge_json_file(self, path: impl AsRef<Path>) -> Self {
        self.merge(Json::file(path))
    }

    /// Inline JSON document.
    pub fn merge_json(self, json: &str) -> Self {
        self.merge(Json::string(json))
    }

    /// Every environment variable, `Section__Key` naming `Section:Key`.
    pub fn merge_env(self) -> Self {
        self.merge(Env::raw().split("__"))
    }

    /// Environment variables starting with `prefix` (matched without regard
    /// to case), with the prefix stripped.
    pub fn merge_env_prefixed(self, prefix: &str) -> Self {
        self.merge(Env::prefixed(prefix).split("__"))
    }

    /// Merge any other figment provider.
    pub fn merge<P: Provider>(self, provider: P) -> Self {
        Self {
            figment: self.figment.merge(Lowercased(provider)),
        }
    }

    /// Shorthand for `FigmentConfig::new().merge_env()`.
    pub fn from_env() -> Self {
        Self::new().merge_env()
    }

    /// Load every provider, surfacing unreadable files and malformed JSON.
    ///
    /// Lookups through [`ConfigSource::get`] treat such failures as missing
    /// values, so call this once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.figment.extract::<Dict>()?;
        Ok(())
    }

    pub fn figment(&self) -> &Figment {
        &self.figment
    }
}

impl Default for FigmentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Figment> for FigmentConfig {
    /// Wrap a prebuilt figment. Its keys are looked up as-is after
    /// lowercasing, so providers merged outside [`FigmentConfig::merge`]
    /// should use lowercase keys.
    fn from(figment: Figment) -> Self {
        Self { figment }
    }
}

impl ConfigSource for FigmentConfig {
    fn get(&self, key: &str) -> Option<String> {
        let path = key
            .split(':')
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        let value = self.figment.find_value(&path).ok()?;

        // Env values arrive typed (`1.0` is a number, `*` a char), so
        // scalars go back to text through their serialized form.
        match serde_json::to_value(&value).ok()? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Provider adapter that lowercases every dictionary key.
struct Lowercased<P>(P);

impl<P: Provider> Provider for Lowercased<P> {
    fn metadata(&self) -> Metadata {
        self.0.metadata()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Ok(self
            .0
            .data()?
            .into_iter()
            .map(|(profile, dict)| (profile, lowercase_dict(dict)))
            .collect())
    }

    fn profile(&self) -> Option<Profile> {
        self.0.profile()
    }
}

fn lowercase_dict(dict: Dict) -> Dict {
    dict.into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), lowercase_value(value)))
        .collect()
}

fn lowercase_value(value: Value) -> Value {
    match value {
        Value::Dict(tag, dict) => Value::Dict(tag, lowercase_dict(dict)),
        Value::Array(tag, items) => {
            Value::Array(tag, items.into_iter().map(lowercase_value).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn map_keys_are_case_insensitive() {
        let config = MapConfig::new().with("CorsPolicy:Origins", "https://a.example");
        assert_eq!(
            config.get("CORSPOLICY:ORIGINS").as_deref(),
            Some("https://a.example")
        );
        assert!(config.get("CorsPolicy:Methods").is_none());
    }

    #[test]
    fn map_from_iterator() {
        let config: MapConfig = [("A:B", "1"), ("C", "2")].into_iter().collect();
        assert_eq!(config.get("a:b").as_deref(), Some("1"));
        assert_eq!(config.get("c").as_deref(), Some("2"));
    }

    #[test]
    fn json_nested_keys_are_case_insensitive() {
        let config = FigmentConfig::new().merge_json(
            r#"{
                "CorsPolicy": { "Origins": "https://a.example;https://b.example", "Methods": null },
                "Limits": { "Max": 10, "Enabled": true, "Hosts": ["one", "two"] }
            }"#,
        );
        config.validate().unwrap();

        assert_eq!(
            config.get("corspolicy:origins").as_deref(),
            Some("https://a.example;https://b.example")
        );
        assert!(config.get("CorsPolicy:Methods").is_none());
        assert_eq!(config.get("Limits:Max").as_deref(), Some("10"));
        assert_eq!(config.get("LIMITS:ENABLED").as_deref(), Some("true"));
        assert!(config.get("Limits:Hosts").is_none());
        assert!(config.get("Limits").is_none());
        assert!(config.get("Limits:Max:Deeper").is_none());
    }

    #[test]
    fn env_double_underscore_names_nested_key() {
        Jail::expect_with(|jail| {
            jail.set_env("PDTEST_CorsPolicy__Origins", "https://env.example");
            jail.set_env("PDTEST_CORSPOLICY__METHODS", "GET, POST");
            jail.set_env("PDTEST_Versioning__Default", "1.0");

            let config = FigmentConfig::new().merge_env_prefixed("PDTEST_");
            assert_eq!(
                config.get("CorsPolicy:Origins").as_deref(),
                Some("https://env.example")
            );
            assert_eq!(config.get("CorsPolicy:Methods").as_deref(), Some("GET, POST"));
            assert_eq!(config.get("Versioning:Default").as_deref(), Some("1.0"));
            assert!(config.get("Missing:Key").is_none());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_settings_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{ "CorsPolicy": { "Origins": "https://file.example", "Methods": "GET" } }"#,
            )?;
            jail.set_env("PDTEST_CORSPOLICY__ORIGINS", "https://env.example");

            let config = FigmentConfig::new()
                .merge_json_file("settings.json")
                .merge_env_prefixed("PDTEST_");
            config.validate().unwrap();

            assert_eq!(
                config.get("CorsPolicy:Origins").as_deref(),
                Some("https://env.example")
            );
            assert_eq!(config.get("CorsPolicy:Methods").as_deref(), Some("GET"));
            Ok(())
        });
    }

    #[test]
    fn later_json_wins() {
        let config = FigmentConfig::new()
            .merge_json(r#"{ "A": "base", "B": "base" }"#)
            .merge_json(r#"{ "b": "override" }"#);

        assert_eq!(config.get("A").as_deref(), Some("base"));
        assert_eq!(config.get("B").as_deref(), Some("override"));
        assert!(config.get("C").is_none());
    }

    #[test]
    fn missing_file_contributes_nothing() {
        let config = FigmentConfig::new().merge_json_file("/does/not/exist.json");
        config.validate().unwrap();
        assert!(config.get("CorsPolicy:Origins").is_none());
    }

    #[test]
    fn malformed_json_fails_validation() {
        let config = FigmentConfig::new().merge_json("{ not json");
        assert!(matches!(config.validate(), Err(ConfigError::Load(_))));
        assert!(config.get("CorsPolicy:Origins").is_none());
    }
}
