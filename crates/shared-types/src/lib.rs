pub mod types;

pub use types::{
    AnalysisResult, ClauseStatus, ClauseVerdict, RiskAssessment, RiskLevel, Suggestion,
    SuggestionSource,
};
