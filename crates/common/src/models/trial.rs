//! Clinical trial registry result

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTrial {
    pub title: String,
    pub phase: String,
    pub city: String,
    pub state: String,

    /// Not computed yet; always 0
    pub distance: f64,
    pub condition: String,
    pub intervention: String,

    /// Overall status exactly as reported by the registry
    pub status: String,

    /// Registry identifier (NCT number). The dashboard reads it as `nxtId`.
    #[serde(rename = "nxtId")]
    pub nct_id: String,
    pub contact_info: String,
    pub is_recruiting: bool,
}
