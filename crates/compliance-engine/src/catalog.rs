//! Clause catalog
//!
//! The catalog is the only place clause vocabulary lives: names, keyword
//! phrases, severities and template text. It is built once (from the built-in
//! definitions or a JSON file) and shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::patterns::{
    KeywordMatcher, BREACH_NOTIFICATION_KEYWORDS, GDPR_KEYWORDS, HIPAA_KEYWORDS,
    PERMITTED_USES_KEYWORDS, PRIVACY_RIGHTS_KEYWORDS, PROCESSING_AGREEMENT_KEYWORDS,
    SUB_PROCESSOR_KEYWORDS,
};

/// Highest severity a clause may carry
pub const MAX_SEVERITY: u32 = 100;

/// Errors raised while building a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog contains no clauses")]
    Empty,

    #[error("Clause name must not be blank")]
    BlankName,

    #[error("Duplicate clause name: {0}")]
    DuplicateClause(String),

    #[error("Clause '{name}' has severity {severity}, must be 0-100")]
    SeverityOutOfRange { name: String, severity: u32 },

    #[error("Clause '{0}' has no keywords")]
    NoKeywords(String),

    #[error("Clause '{0}' has a blank keyword")]
    BlankKeyword(String),

    #[error("Clause '{name}' keyword '{keyword}' failed to compile: {source}")]
    Pattern {
        name: String,
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

/// Serializable form of a clause type, as written in catalog files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseDefinition {
    pub name: String,
    pub keywords: Vec<String>,
    pub severity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Top-level shape of a catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub clauses: Vec<ClauseDefinition>,
}

/// A validated clause type with compiled keyword matchers
#[derive(Debug, Clone)]
pub struct ClauseType {
    name: String,
    keywords: Vec<KeywordMatcher>,
    severity: u8,
    template: Option<String>,
}

impl ClauseType {
    fn from_definition(def: ClauseDefinition) -> Result<Self, CatalogError> {
        let name = def.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::BlankName);
        }
        if def.severity > MAX_SEVERITY {
            return Err(CatalogError::SeverityOutOfRange {
                name,
                severity: def.severity,
            });
        }
        if def.keywords.is_empty() {
            return Err(CatalogError::NoKeywords(name));
        }

        // Ordered set: first occurrence wins
        let mut keywords: Vec<KeywordMatcher> = Vec::with_capacity(def.keywords.len());
        for keyword in &def.keywords {
            if keyword.trim().is_empty() {
                return Err(CatalogError::BlankKeyword(name));
            }
            let matcher = KeywordMatcher::new(keyword).map_err(|source| CatalogError::Pattern {
                name: name.clone(),
                keyword: keyword.clone(),
                source,
            })?;
            if keywords.iter().all(|k| k.phrase() != matcher.phrase()) {
                keywords.push(matcher);
            }
        }

        Ok(Self {
            name,
            keywords,
            severity: def.severity as u8,
            template: def.template,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Keyword phrases in catalog order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.phrase())
    }

    /// First keyword found in already-normalized text, if any
    pub fn first_match(&self, normalized_text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| k.is_match(normalized_text))
            .map(|k| k.phrase())
    }

    /// Back to the serializable form
    pub fn to_definition(&self) -> ClauseDefinition {
        ClauseDefinition {
            name: self.name.clone(),
            keywords: self.keywords().map(String::from).collect(),
            severity: u32::from(self.severity),
            template: self.template.clone(),
        }
    }
}

/// Immutable, ordered registry of clause types
#[derive(Debug, Clone)]
pub struct ClauseCatalog {
    clauses: Vec<ClauseType>,
    index: HashMap<String, usize>,
}

// Validity is covered by test_builtin_catalog_shape
lazy_static! {
    static ref BUILTIN_CATALOG: Arc<ClauseCatalog> = Arc::new(
        ClauseCatalog::from_definitions(builtin_definitions())
            .expect("built-in clause catalog must be valid")
    );
}

impl ClauseCatalog {
    /// Validate definitions and compile their keywords
    pub fn from_definitions(definitions: Vec<ClauseDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut clauses = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());
        for def in definitions {
            let clause = ClauseType::from_definition(def)?;
            if index.contains_key(clause.name()) {
                return Err(CatalogError::DuplicateClause(clause.name().to_string()));
            }
            index.insert(clause.name().to_string(), clauses.len());
            clauses.push(clause);
        }

        Ok(Self { clauses, index })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_definitions(file.clauses)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Shared handle to the built-in catalog
    pub fn builtin() -> Arc<ClauseCatalog> {
        Arc::clone(&BUILTIN_CATALOG)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClauseType> {
        self.clauses.iter()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ClauseType> {
        self.index.get(name).map(|&i| &self.clauses[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.clauses.iter().map(|c| c.name()).collect()
    }

    pub fn max_severity(&self) -> u8 {
        self.clauses.iter().map(|c| c.severity()).max().unwrap_or(0)
    }
}

fn definition(name: &str, keywords: &[&str], severity: u32, template: &str) -> ClauseDefinition {
    ClauseDefinition {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        severity,
        template: Some(template.to_string()),
    }
}

/// The default data-protection clause set
pub fn builtin_definitions() -> Vec<ClauseDefinition> {
    vec![
        definition(
            "Data Privacy Protection Right",
            PRIVACY_RIGHTS_KEYWORDS,
            95,
            "Data Privacy Protection Right: The Processor shall implement appropriate technical and organizational measures to protect personal data and respect data subject rights including access, rectification, erasure and portability.",
        ),
        definition(
            "Breach Notification",
            BREACH_NOTIFICATION_KEYWORDS,
            90,
            "Breach Notification: The Processor shall notify the Controller without undue delay and no later than 72 hours after becoming aware of any personal data breach, providing details and remediation steps.",
        ),
        definition(
            "Data Processing Agreement",
            PROCESSING_AGREEMENT_KEYWORDS,
            85,
            "Data Processing Agreement: The parties agree the Processor processes personal data on behalf of the Controller and will follow documented instructions and safeguards.",
        ),
        definition(
            "Sub-Processor Authorization",
            SUB_PROCESSOR_KEYWORDS,
            70,
            "Sub-Processor Authorization: The Processor will obtain prior written authorization before engaging sub-processors and remain liable for their compliance.",
        ),
        definition(
            "Permitted Uses and Disclosures",
            PERMITTED_USES_KEYWORDS,
            60,
            "Permitted Uses and Disclosures: The Processor may only process data for agreed purposes and will not disclose to third parties except as permitted hereunder.",
        ),
        definition(
            "GDPR Compliance",
            GDPR_KEYWORDS,
            80,
            "GDPR Compliance: The parties will comply with EU GDPR requirements where applicable, implement appropriate technical and organizational measures, and assist with data subject rights.",
        ),
        definition(
            "HIPAA",
            HIPAA_KEYWORDS,
            75,
            "HIPAA: The parties shall implement safeguards to protect PHI and comply with applicable HIPAA rules.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = ClauseCatalog::builtin();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.max_severity(), 95);
        assert!(catalog.iter().all(|c| (60..=95).contains(&c.severity())));
        assert!(catalog.iter().all(|c| c.template().is_some()));
        assert_eq!(
            catalog.names(),
            vec![
                "Data Privacy Protection Right",
                "Breach Notification",
                "Data Processing Agreement",
                "Sub-Processor Authorization",
                "Permitted Uses and Disclosures",
                "GDPR Compliance",
                "HIPAA",
            ]
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = ClauseCatalog::builtin();
        assert_eq!(catalog.get("Breach Notification").unwrap().severity(), 90);
        assert!(catalog.get("breach notification").is_none());
    }

    #[test]
    fn test_loads_from_json() {
        let catalog = ClauseCatalog::from_json_str(
            r#"{"clauses": [
                {"name": "Governing Law", "keywords": ["governing law", "Jurisdiction"], "severity": 50},
                {"name": "Termination", "keywords": ["terminate"], "severity": 65, "template": "Either party may terminate..."}
            ]}"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let law = catalog.get("Governing Law").unwrap();
        assert_eq!(law.keywords().collect::<Vec<_>>(), vec!["governing law", "jurisdiction"]);
        assert!(law.template().is_none());
        assert!(catalog.get("Termination").unwrap().template().is_some());
    }

    #[test]
    fn test_duplicate_keywords_collapse() {
        let catalog = ClauseCatalog::from_json_str(
            r#"{"clauses": [{"name": "A", "keywords": ["notice", "Notice", "notify"], "severity": 10}]}"#,
        )
        .unwrap();
        assert_eq!(
            catalog.get("A").unwrap().keywords().collect::<Vec<_>>(),
            vec!["notice", "notify"]
        );
    }

    #[test]
    fn test_rejects_invalid_catalogs() {
        assert!(matches!(
            ClauseCatalog::from_json_str(r#"{"clauses": []}"#),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            ClauseCatalog::from_json_str(
                r#"{"clauses": [{"name": "A", "keywords": ["a"], "severity": 101}]}"#
            ),
            Err(CatalogError::SeverityOutOfRange { severity: 101, .. })
        ));
        assert!(matches!(
            ClauseCatalog::from_json_str(
                r#"{"clauses": [{"name": "A", "keywords": [], "severity": 10}]}"#
            ),
            Err(CatalogError::NoKeywords(_))
        ));
        assert!(matches!(
            ClauseCatalog::from_json_str(
                r#"{"clauses": [{"name": "A", "keywords": ["  "], "severity": 10}]}"#
            ),
            Err(CatalogError::BlankKeyword(_))
        ));
        assert!(matches!(
            ClauseCatalog::from_json_str(
                r#"{"clauses": [
                    {"name": "A", "keywords": ["a"], "severity": 10},
                    {"name": "A", "keywords": ["b"], "severity": 20}
                ]}"#
            ),
            Err(CatalogError::DuplicateClause(_))
        ));
        assert!(matches!(
            ClauseCatalog::from_json_str("not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ClauseCatalog::from_path("/nonexistent/catalog.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.json"));
    }

    #[test]
    fn test_definition_roundtrip_preserves_order() {
        let catalog = ClauseCatalog::builtin();
        let defs: Vec<ClauseDefinition> = catalog.iter().map(|c| c.to_definition()).collect();
        let rebuilt = ClauseCatalog::from_definitions(defs).unwrap();
        assert_eq!(rebuilt.names(), catalog.names());
    }
}
