use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the `low` risk band
pub const LOW_RISK_CEILING: u8 = 40;

/// Upper bound (inclusive) of the `medium` risk band
pub const MEDIUM_RISK_CEILING: u8 = 70;

/// Whether a clause type was found in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseStatus {
    Present,
    Missing,
}

/// Detection result for one clause type against one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseVerdict {
    pub clause: String,
    pub status: ClauseStatus,
    pub severity: u8, // Copied from the catalog at evaluation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>, // Only set when missing
}

impl ClauseVerdict {
    pub fn present(clause: &str, severity: u8) -> Self {
        Self {
            clause: clause.to_string(),
            status: ClauseStatus::Present,
            severity,
            advice: None,
        }
    }

    pub fn missing(clause: &str, severity: u8) -> Self {
        Self {
            clause: clause.to_string(),
            status: ClauseStatus::Missing,
            severity,
            advice: Some(format!(
                "Clause '{}' missing. Recommended severity {}.",
                clause, severity
            )),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.status == ClauseStatus::Missing
    }
}

/// Qualitative risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a score: <= 40 low, 41-70 medium, >= 71 high
    pub fn from_score(score: u8) -> Self {
        if score <= LOW_RISK_CEILING {
            RiskLevel::Low
        } else if score <= MEDIUM_RISK_CEILING {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate risk derived from a set of verdicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub risk_summary: String,
    pub high_risk: bool,
}

impl RiskAssessment {
    /// Build the assessment for a score; level, summary and flag all follow from it.
    pub fn from_score(score: u8) -> Self {
        let risk_score = score.min(100);
        let risk_level = RiskLevel::from_score(risk_score);
        Self {
            risk_score,
            risk_level,
            risk_summary: format!("Risk score {} ({})", risk_score, risk_level),
            high_risk: risk_level == RiskLevel::High,
        }
    }
}

/// Output of one document analysis.
///
/// Field names and shapes are consumed as-is by report rendering,
/// history persistence and notification collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub present_clauses: Vec<String>,
    pub missing_clauses: Vec<String>,
    pub details: Vec<ClauseVerdict>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub risk_summary: String,
    pub high_risk: bool,
}

impl AnalysisResult {
    /// Assemble a result from verdicts in catalog order and their assessment
    pub fn new(details: Vec<ClauseVerdict>, assessment: RiskAssessment) -> Self {
        let (present, missing): (Vec<&ClauseVerdict>, Vec<&ClauseVerdict>) =
            details.iter().partition(|v| !v.is_missing());

        Self {
            present_clauses: present.into_iter().map(|v| v.clause.clone()).collect(),
            missing_clauses: missing.into_iter().map(|v| v.clause.clone()).collect(),
            details,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            risk_summary: assessment.risk_summary,
            high_risk: assessment.high_risk,
        }
    }
}

/// Where a piece of suggested clause text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// Produced by the external generation service
    Generated,
    /// Static template from the clause catalog
    Template,
    /// Generic text for a clause with no template
    Placeholder,
}

/// Clause text returned by the clause text provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub clause: String,
    pub text: String,
    pub source: SuggestionSource,
    pub cached: bool,
}
