//! Risk aggregation
//!
//! The score is the highest severity among missing clauses: one critical gap
//! dominates regardless of how many minor clauses are present. Full coverage
//! still carries a small residual score.

use shared_types::{ClauseVerdict, RiskAssessment};

/// Score reported when no clause is missing
pub const BASELINE_RISK: u8 = 10;

/// Aggregate verdicts into a score, level and summary.
///
/// Order-independent and deterministic.
pub fn score(verdicts: &[ClauseVerdict]) -> RiskAssessment {
    let risk_score = verdicts
        .iter()
        .filter(|v| v.is_missing())
        .map(|v| v.severity)
        .max()
        .unwrap_or(BASELINE_RISK);

    RiskAssessment::from_score(risk_score)
}
