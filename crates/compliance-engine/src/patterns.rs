//! Keyword vocabulary for the built-in clause catalog and phrase matching

use regex::Regex;

/// Data subject / privacy rights keywords
pub const PRIVACY_RIGHTS_KEYWORDS: &[&str] = &[
    "data privacy",
    "data protection",
    "data subject rights",
    "privacy rights",
    "right to erasure",
    "right to access",
];

/// Breach notification keywords
pub const BREACH_NOTIFICATION_KEYWORDS: &[&str] = &[
    "breach",
    "security breach",
    "notify",
    "notification",
    "data breach",
    "breach notification",
];

/// Data processing agreement keywords
pub const PROCESSING_AGREEMENT_KEYWORDS: &[&str] = &[
    "data processing agreement",
    "dpa",
    "data processor",
    "data controller",
];

/// Sub-processor authorization keywords
pub const SUB_PROCESSOR_KEYWORDS: &[&str] = &[
    "sub-processor",
    "subprocessor",
    "sub processor",
    "sub-processor authorization",
];

/// Permitted uses and disclosures keywords
pub const PERMITTED_USES_KEYWORDS: &[&str] = &[
    "permitted use",
    "permitted uses",
    "disclosures",
    "permitted disclosures",
];

/// EU GDPR keywords (shares processor/controller vocabulary with the DPA clause)
pub const GDPR_KEYWORDS: &[&str] = &[
    "gdpr",
    "general data protection regulation",
    "data controller",
    "data processor",
];

/// US HIPAA keywords
pub const HIPAA_KEYWORDS: &[&str] = &[
    "hipaa",
    "protected health information",
    "phi",
    "health information",
];

/// Lowercase form used for all comparisons
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// A keyword phrase that must appear as a standalone token or phrase
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    phrase: String,
    pattern: Regex,
}

impl KeywordMatcher {
    /// Compile a phrase into a word-boundary pattern.
    ///
    /// The phrase is trimmed and lowercased; regex metacharacters in it are
    /// matched literally.
    pub fn new(phrase: &str) -> Result<Self, regex::Error> {
        let phrase = normalize(phrase.trim());
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&phrase)))?;
        Ok(Self { phrase, pattern })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Test against text that has already been through [`normalize`]
    pub fn is_match(&self, normalized_text: &str) -> bool {
        self.pattern.is_match(normalized_text)
    }
}
