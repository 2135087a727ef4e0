//! Aggregated analysis output

use serde::{Deserialize, Serialize};

use super::{ClinicalTrial, DrugRecommendation, VariantRecord};

/// The sole object returned for an analysis request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub drugs: Vec<DrugRecommendation>,
    pub trials: Vec<ClinicalTrial>,
    pub variants: Vec<VariantRecord>,
    pub file_name: String,
    pub num_variants: usize,

    /// Wall-clock milliseconds since the request started
    pub processing_time: u64,

    /// Set when drugs or variants came from fallback data instead of the annotator
    #[serde(default)]
    pub degraded: bool,

    /// Narrative report from the report agent, when one is configured and answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}
