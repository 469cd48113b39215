//! Localization string lookup.
//!
//! Languages are flat JSON dictionaries under the locale directory, one file
//! per language code. Lookup is deliberately forgiving: a missing dictionary
//! falls back to English, and a missing key echoes the key itself so the UI
//! never shows an empty label.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct Translator {
    language: String,
    locale_dir: PathBuf,
    strings: HashMap<String, String>,
}

impl Translator {
    pub fn new(locale_dir: &Path, language: &str) -> Self {
        let mut translator = Translator {
            language: String::new(),
            locale_dir: locale_dir.to_path_buf(),
            strings: HashMap::new(),
        };
        translator.set_language(language);
        translator
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Switch to another language, falling back to English if its dictionary
    /// cannot be read.
    pub fn set_language(&mut self, language: &str) {
        match load_dictionary(&self.locale_dir, language) {
            Some(strings) => {
                info!(%language, entries = strings.len(), "Loaded locale");
                self.language = language.to_string();
                self.strings = strings;
            }
            None if language != FALLBACK_LANGUAGE => {
                warn!(%language, "Locale not found; falling back to English");
                self.set_language(FALLBACK_LANGUAGE);
            }
            None => {
                warn!("English locale missing; keys will be shown verbatim");
                self.language = FALLBACK_LANGUAGE.to_string();
                self.strings = HashMap::new();
            }
        }
    }

    /// Translated string for `key`, or the key itself when untranslated.
    pub fn text(&self, key: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

fn load_dictionary(locale_dir: &Path, language: &str) -> Option<HashMap<String, String>> {
    let path = locale_dir.join(format!("{language}.json"));
    let data = fs::read_to_string(&path).ok()?;
    let parsed: Value = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), "Invalid locale JSON: {err}");
            return None;
        }
    };
    let object = parsed.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    fn locale_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("epub-swift-locale-{tag}-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("en.json"),
            r#"{"settings_title": "Settings", "language": "Language"}"#,
        )
        .unwrap();
        fs::write(
            dir.join("fa.json"),
            r#"{"settings_title": "تنظیمات", "language": "زبان"}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn looks_up_translated_strings() {
        let translator = Translator::new(&locale_dir("basic"), "fa");
        assert_eq!(translator.language(), "fa");
        assert_eq!(translator.text("settings_title"), "تنظیمات");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let translator = Translator::new(&locale_dir("fallback"), "xx");
        assert_eq!(translator.language(), "en");
        assert_eq!(translator.text("settings_title"), "Settings");
    }

    #[test]
    fn unknown_key_echoes_the_key() {
        let translator = Translator::new(&locale_dir("echo"), "en");
        assert_eq!(translator.text("does_not_exist"), "does_not_exist");
    }
}
