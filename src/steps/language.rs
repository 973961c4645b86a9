use tracing::debug;

/// Source language sentinel: the backend detects the spoken language itself
pub const AUTO_DETECT: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Target languages offered by the language step
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "ru", name: "Russian" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "zh-CN", name: "Chinese (Simplified)" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "ar", name: "Arabic" },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(code))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

/// Language step
#[derive(Debug)]
pub struct LanguageView {
    source: String,
    target: String,
}

impl Default for LanguageView {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageView {
    pub fn new() -> Self {
        Self {
            source: AUTO_DETECT.to_string(),
            target: String::new(),
        }
    }

    pub fn languages(&self) -> &'static [Language] {
        SUPPORTED_LANGUAGES
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Select a target by code. Unknown codes clear the selection.
    pub fn select_target(&mut self, code: &str) -> bool {
        match find_language(code) {
            Some(lang) => {
                debug!("Target language selected: {} ({})", lang.name, lang.code);
                self.target = lang.code.to_string();
                true
            }
            None => {
                self.target.clear();
                false
            }
        }
    }

    /// Whether the proceed action is enabled
    pub fn can_proceed(&self) -> bool {
        !self.source.is_empty() && !self.target.is_empty()
    }

    pub fn proceed(&self) -> Option<LanguagePair> {
        if !self.can_proceed() {
            return None;
        }
        Some(LanguagePair {
            source: self.source.clone(),
            target: self.target.clone(),
        })
    }
}
