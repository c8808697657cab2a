//! Localized string resources.
//!
//! Strings are addressed by dot-separated keys (`tools.query_results`) and may
//! contain `{name}` placeholders. Lookups fall back from the requested language
//! to `en_US`, and finally to the key itself.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Language used when a key is missing from the requested language.
pub const FALLBACK_LANGUAGE: &str = "en_US";

/// Language resources compiled into the binary.
const EMBEDDED: &[(&str, &str)] = &[
    ("en_US", include_str!("../../i18n/en_US.json")),
    ("pt_BR", include_str!("../../i18n/pt_BR.json")),
];

/// Source of localized text.
pub trait StringStore: Send + Sync {
    /// Resolve `key`, substituting each `{name}` placeholder from `params`.
    fn get(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// JSON-backed string catalog with fallback.
pub struct Catalog {
    language: String,
    strings: Value,
    fallback: Value,
    dir: Option<PathBuf>,
    missing: Mutex<BTreeSet<String>>,
}

/// Translation coverage of the active language against the fallback.
#[derive(Debug, Clone, Serialize)]
pub struct Completeness {
    pub status: &'static str,
    pub missing_keys: Vec<String>,
    pub completion_percentage: f64,
}

impl Catalog {
    /// Load `language`, preferring files in `dir` over the embedded resources.
    pub fn load(language: impl Into<String>, dir: Option<&Path>) -> Self {
        let language = language.into();
        let strings = load_language(&language, dir).unwrap_or_else(|| {
            warn!(language = %language, "Language resources not found, using fallback");
            Value::Null
        });
        let fallback = if language == FALLBACK_LANGUAGE {
            strings.clone()
        } else {
            load_language(FALLBACK_LANGUAGE, dir).unwrap_or(Value::Null)
        };

        Self {
            language,
            strings,
            fallback,
            dir: dir.map(Path::to_path_buf),
            missing: Mutex::new(BTreeSet::new()),
        }
    }

    /// Catalog backed only by the embedded resources.
    pub fn embedded(language: impl Into<String>) -> Self {
        Self::load(language, None)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn fallback_language(&self) -> &str {
        FALLBACK_LANGUAGE
    }

    pub fn has_fallback(&self) -> bool {
        !self.fallback.is_null()
    }

    /// Number of distinct keys that resolved to nothing so far.
    pub fn missing_key_count(&self) -> usize {
        self.missing.lock().len()
    }

    /// Languages available either embedded or in the resource directory.
    pub fn available_languages(&self) -> Vec<String> {
        let mut languages: BTreeSet<String> =
            EMBEDDED.iter().map(|(lang, _)| lang.to_string()).collect();

        if let Some(dir) = &self.dir
            && let Ok(entries) = std::fs::read_dir(dir)
        {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                {
                    languages.insert(stem.to_string());
                }
            }
        }

        languages.into_iter().collect()
    }

    /// Compare the active language against the fallback.
    pub fn completeness(&self) -> Completeness {
        if self.fallback.is_null() {
            return Completeness {
                status: "no_fallback",
                missing_keys: Vec::new(),
                completion_percentage: 100.0,
            };
        }

        let mut missing_keys = Vec::new();
        compare(&self.fallback, &self.strings, "", &mut missing_keys);
        let total = count_leaves(&self.fallback);
        let completion_percentage = if total == 0 {
            100.0
        } else {
            let ratio = (total - missing_keys.len().min(total)) as f64 / total as f64;
            (ratio * 10_000.0).round() / 100.0
        };

        Completeness {
            status: if missing_keys.is_empty() {
                "complete"
            } else {
                "incomplete"
            },
            missing_keys,
            completion_percentage,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        resolve(&self.strings, key).or_else(|| resolve(&self.fallback, key))
    }
}

impl StringStore for Catalog {
    fn get(&self, key: &str, params: &[(&str, &str)]) -> String {
        match self.lookup(key) {
            Some(template) => interpolate(template, params),
            None => {
                if self.missing.lock().insert(key.to_string()) {
                    warn!(key, "Missing translation key");
                }
                key.to_string()
            }
        }
    }
}

fn load_language(language: &str, dir: Option<&Path>) -> Option<Value> {
    if let Some(dir) = dir {
        let path = dir.join(format!("{}.json", language));
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => {
                    debug!(path = %path.display(), "Loaded language file");
                    return Some(value);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Invalid JSON in language file"),
            },
            Err(e) => debug!(path = %path.display(), error = %e, "Language file not readable"),
        }
    }

    let (_, text) = EMBEDDED.iter().find(|(lang, _)| *lang == language)?;
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(language, error = %e, "Embedded language resources are invalid");
            None
        }
    }
}

fn resolve<'a>(root: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(root, |node, part| node.get(part))
        .and_then(Value::as_str)
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex: placeholder"));

/// Fill `{name}` placeholders in one pass. Substituted values are never
/// rescanned, and unknown placeholders are left as written.
fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            params
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

fn compare(reference: &Value, target: &Value, prefix: &str, missing: &mut Vec<String>) {
    let Some(map) = reference.as_object() else {
        return;
    };
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match target.get(key) {
            None => missing.push(path),
            Some(child) if value.is_object() => compare(value, child, &path, missing),
            Some(_) => {}
        }
    }
}

fn count_leaves(value: &Value) -> usize {
    match value.as_object() {
        Some(map) => map.values().map(count_leaves).sum(),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_lookup() {
        let catalog = Catalog::embedded("en_US");
        assert_eq!(catalog.get("tools.query_results", &[]), "Query Results");
    }

    #[test]
    fn test_interpolation() {
        let catalog = Catalog::embedded("en_US");
        let text = catalog.get("table_schema.header", &[("table_name", "CUSTOMERS")]);
        assert_eq!(text, "# Table Schema: CUSTOMERS");
    }

    #[test]
    fn test_interpolation_does_not_rescan_values() {
        let text = interpolate(
            "{database} as {user} {missing}",
            &[("database", "/data/{user}.fdb"), ("user", "SYSDBA")],
        );
        assert_eq!(text, "/data/{user}.fdb as SYSDBA {missing}");
    }

    #[test]
    fn test_portuguese_strings() {
        let catalog = Catalog::embedded("pt_BR");
        let text = catalog.get("table_schema.header", &[("table_name", "TESTE")]);
        assert_eq!(text, "# Schema da Tabela: TESTE");
        assert_eq!(catalog.completeness().status, "complete");
    }

    #[test]
    fn test_missing_key_returns_key() {
        let catalog = Catalog::embedded("en_US");
        assert_eq!(catalog.get("no.such.key", &[]), "no.such.key");
        assert_eq!(catalog.get("no.such.key", &[]), "no.such.key");
        assert_eq!(catalog.missing_key_count(), 1);
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let catalog = Catalog::embedded("de_DE");
        assert_eq!(catalog.get("tools.unknown_tool", &[]), "Unknown tool");
    }

    #[test]
    fn test_directory_override_and_partial_language() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("es_ES.json"),
            r#"{"tools": {"unknown_tool": "Herramienta desconocida"}}"#,
        )
        .unwrap();

        let catalog = Catalog::load("es_ES", Some(dir.path()));
        assert_eq!(catalog.get("tools.unknown_tool", &[]), "Herramienta desconocida");
        assert_eq!(catalog.get("tools.query_results", &[]), "Query Results");
        assert!(catalog.available_languages().contains(&"es_ES".to_string()));

        let completeness = catalog.completeness();
        assert_eq!(completeness.status, "incomplete");
        assert!(completeness.completion_percentage < 100.0);
        assert!(completeness.missing_keys.contains(&"connection".to_string()));
    }
}
