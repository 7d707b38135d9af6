use std::sync::Arc;

use shared_types::ClauseVerdict;
use tracing::debug;

use crate::catalog::ClauseCatalog;
use crate::patterns::normalize;

/// Scans document text for each catalog clause
#[derive(Debug, Clone)]
pub struct ClauseDetector {
    catalog: Arc<ClauseCatalog>,
}

impl ClauseDetector {
    pub fn new(catalog: Arc<ClauseCatalog>) -> Self {
        Self { catalog }
    }

    /// One verdict per clause type, in catalog order.
    ///
    /// Clauses are tested independently, so a phrase shared between two
    /// clause vocabularies marks both present.
    pub fn detect(&self, text: &str) -> Vec<ClauseVerdict> {
        let normalized = normalize(text);

        self.catalog
            .iter()
            .map(|clause| match clause.first_match(&normalized) {
                Some(keyword) => {
                    debug!(clause = clause.name(), keyword, "Clause present");
                    ClauseVerdict::present(clause.name(), clause.severity())
                }
                None => ClauseVerdict::missing(clause.name(), clause.severity()),
            })
            .collect()
    }
}
