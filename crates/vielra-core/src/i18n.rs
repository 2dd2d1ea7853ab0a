//! # Resource Aggregator
//!
//! Merges every feature module's message dictionaries into one flat,
//! language-keyed [`TranslationBundle`]. The bundle is built once at startup
//! and is read-only afterwards; switching language is a lookup.
//!
//! ## Lookup Order
//! ```text
//! translate(lang, key)
//!   1. bundle[lang][key]
//!   2. bundle[default][key]
//!   3. key itself
//! ```
//!
//! Two modules defining the same key for the same language is a
//! configuration error. Every collision is logged before the build fails.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigurationError, CoreError};

// =============================================================================
// Language Code
// =============================================================================

/// Supported interface languages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    En,
    Id,
    Vi,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 3] = [LanguageCode::En, LanguageCode::Id, LanguageCode::Vi];

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Id => "id",
            LanguageCode::Vi => "vi",
        }
    }

    /// Name of the language in that language.
    pub fn native_name(&self) -> &'static str {
        match self {
            LanguageCode::En => "English",
            LanguageCode::Id => "Bahasa Indonesia",
            LanguageCode::Vi => "Tiếng Việt",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LanguageCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(LanguageCode::En),
            "id" => Ok(LanguageCode::Id),
            "vi" => Ok(LanguageCode::Vi),
            other => Err(CoreError::UnknownLanguage(other.to_string())),
        }
    }
}

// =============================================================================
// Message Module
// =============================================================================

/// One feature module's dictionaries, per language.
#[derive(Debug, Clone)]
pub struct MessageModule {
    name: String,
    dictionaries: BTreeMap<LanguageCode, Vec<(String, String)>>,
}

impl MessageModule {
    pub fn new(name: impl Into<String>) -> Self {
        MessageModule {
            name: name.into(),
            dictionaries: BTreeMap::new(),
        }
    }

    /// Adds messages for a language.
    pub fn language<K, V>(mut self, language: LanguageCode, messages: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionaries
            .entry(language)
            .or_default()
            .extend(messages.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Builder that validates and merges message modules.
#[derive(Debug, Clone)]
pub struct ResourceAggregator {
    default_language: LanguageCode,
    modules: Vec<MessageModule>,
}

impl ResourceAggregator {
    pub fn new(default_language: LanguageCode) -> Self {
        ResourceAggregator {
            default_language,
            modules: Vec::new(),
        }
    }

    /// Adds a feature module. Order only affects diagnostics.
    pub fn module(mut self, module: MessageModule) -> Self {
        self.modules.push(module);
        self
    }

    /// Merges every module into a bundle.
    ///
    /// ## Errors
    /// - `DuplicateModule` if two modules share a name
    /// - `DuplicateTranslationKey` if one module repeats a key
    /// - `TranslationKeyCollision` if two modules share a key
    ///
    /// Only the first problem is returned; all of them are logged.
    pub fn build(self) -> Result<TranslationBundle, ConfigurationError> {
        let mut seen_modules: Vec<&str> = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            if seen_modules.contains(&module.name.as_str()) {
                return Err(ConfigurationError::DuplicateModule(module.name.clone()));
            }
            seen_modules.push(&module.name);
        }

        let mut messages: HashMap<LanguageCode, HashMap<String, String>> = HashMap::new();
        let mut origin: HashMap<(LanguageCode, String), String> = HashMap::new();
        let mut first_collision: Option<ConfigurationError> = None;

        for module in &self.modules {
            for (language, entries) in &module.dictionaries {
                let table = messages.entry(*language).or_default();
                for (key, value) in entries {
                    match origin.get(&(*language, key.clone())) {
                        Some(first) if *first == module.name => {
                            warn!(
                                language = %language,
                                key = %key,
                                module = %module.name,
                                "Translation key defined twice by one module"
                            );
                            first_collision.get_or_insert_with(|| {
                                ConfigurationError::DuplicateTranslationKey {
                                    module: module.name.clone(),
                                    language: language.code().to_string(),
                                    key: key.clone(),
                                }
                            });
                        }
                        Some(first) => {
                            warn!(
                                language = %language,
                                key = %key,
                                first = %first,
                                second = %module.name,
                                "Translation key defined by more than one module"
                            );
                            first_collision.get_or_insert_with(|| {
                                ConfigurationError::TranslationKeyCollision {
                                    language: language.code().to_string(),
                                    key: key.clone(),
                                    first: first.clone(),
                                    second: module.name.clone(),
                                }
                            });
                        }
                        None => {
                            origin.insert((*language, key.clone()), module.name.clone());
                            table.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        if let Some(err) = first_collision {
            return Err(err);
        }

        let bundle = TranslationBundle {
            default_language: self.default_language,
            messages,
        };

        for language in bundle.languages() {
            debug!(
                language = %language,
                keys = bundle.len(language),
                missing = bundle.missing_keys(language).len(),
                "Translation bundle language ready"
            );
        }

        Ok(bundle)
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// Read-only merged translations.
#[derive(Debug, Clone)]
pub struct TranslationBundle {
    default_language: LanguageCode,
    messages: HashMap<LanguageCode, HashMap<String, String>>,
}

impl TranslationBundle {
    pub fn default_language(&self) -> LanguageCode {
        self.default_language
    }

    /// Languages with at least one message, in code order.
    pub fn languages(&self) -> Vec<LanguageCode> {
        let mut languages: Vec<_> = self.messages.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Number of messages for a language.
    pub fn len(&self, language: LanguageCode) -> usize {
        self.messages.get(&language).map_or(0, HashMap::len)
    }

    /// Returns true if no messages exist at all.
    pub fn is_empty(&self) -> bool {
        self.messages.values().all(HashMap::is_empty)
    }

    /// Returns true if `language` itself defines `key`.
    pub fn contains(&self, language: LanguageCode, key: &str) -> bool {
        self.messages
            .get(&language)
            .is_some_and(|m| m.contains_key(key))
    }

    /// Looks up a message with default-language and raw-key fallback.
    pub fn translate<'a>(&'a self, language: LanguageCode, key: &'a str) -> &'a str {
        self.lookup(language, key)
            .or_else(|| self.lookup(self.default_language, key))
            .unwrap_or(key)
    }

    /// Like [`translate`](Self::translate), then fills `{{name}}` placeholders.
    ///
    /// Placeholders without a matching argument are left as written.
    pub fn translate_with(&self, language: LanguageCode, key: &str, args: &[(&str, &str)]) -> String {
        interpolate(self.translate(language, key), args)
    }

    /// Keys the default language defines but `language` does not.
    pub fn missing_keys(&self, language: LanguageCode) -> Vec<&str> {
        let Some(defaults) = self.messages.get(&self.default_language) else {
            return Vec::new();
        };
        let mut missing: Vec<&str> = defaults
            .keys()
            .filter(|key| !self.contains(language, key))
            .map(String::as_str)
            .collect();
        missing.sort_unstable();
        missing
    }

    fn lookup(&self, language: LanguageCode, key: &str) -> Option<&str> {
        self.messages
            .get(&language)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
