//! # compliance-engine
//!
//! Clause detection and risk scoring for contract text, plus clause text
//! suggestions for filling the gaps.
//!
//! ```rust,ignore
//! use compliance_engine::ComplianceEngine;
//!
//! let engine = ComplianceEngine::default();
//! let result = engine.analyze("We will notify you of any breach within 72 hours.");
//! println!("{} missing, {}", result.missing_clauses.len(), result.risk_summary);
//! ```

pub mod catalog;
pub mod detector;
pub mod patterns;
pub mod scoring;
pub mod suggest;

use std::sync::Arc;

use shared_types::AnalysisResult;
use tracing::info;

pub use catalog::{CatalogError, ClauseCatalog, ClauseDefinition, ClauseType};
pub use detector::ClauseDetector;
pub use scoring::BASELINE_RISK;
pub use suggest::{
    ClauseGenerator, ClauseTextProvider, GenerationError, GenerationPolicy, GeneratorConfig,
    OpenAiGenerator, SuggestionCache,
};

/// ComplianceEngine entry point
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    catalog: Arc<ClauseCatalog>,
    detector: ClauseDetector,
}

impl ComplianceEngine {
    pub fn new(catalog: Arc<ClauseCatalog>) -> Self {
        let detector = ClauseDetector::new(Arc::clone(&catalog));
        Self { catalog, detector }
    }

    pub fn catalog(&self) -> &Arc<ClauseCatalog> {
        &self.catalog
    }

    /// Detect clauses in `text` and score the gaps. Never fails.
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let details = self.detector.detect(text);
        let assessment = scoring::score(&details);
        let result = AnalysisResult::new(details, assessment);

        info!(
            present = result.present_clauses.len(),
            missing = result.missing_clauses.len(),
            risk_score = result.risk_score,
            risk_level = %result.risk_level,
            "Clause analysis complete"
        );

        result
    }

    /// Absent text is analyzed as empty text
    pub fn analyze_optional(&self, text: Option<&str>) -> AnalysisResult {
        self.analyze(text.unwrap_or(""))
    }

    /// Analyze raw document bytes as UTF-8, skipping invalid sequences
    pub fn analyze_bytes(&self, bytes: &[u8]) -> AnalysisResult {
        self.analyze(&decode_utf8_ignoring_invalid(bytes))
    }
}

/// Decode UTF-8, dropping invalid byte sequences rather than replacing them
fn decode_utf8_ignoring_invalid(mut bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                return text;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                // A truncated sequence at the end has no error length
                let skip = err.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new(ClauseCatalog::builtin())
    }
}
