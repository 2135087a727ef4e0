//! Variant record produced by extraction

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub chromosome: String,

    /// 1-based position; 0 when unknown
    #[serde(default)]
    pub position: u64,

    #[serde(default)]
    pub reference: String,

    #[serde(default)]
    pub alternate: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,

    /// Free-text impact annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

/// Impact texts for records derived from the annotator's matcher output
impl VariantRecord {
    pub const GENE_ANALYZED: &'static str = "Pharmacogenomic gene analyzed";
    pub const DETECTED: &'static str = "Pharmacogenomic variant detected";
    pub const OF_INTEREST: &'static str = "Variant of interest";
}
