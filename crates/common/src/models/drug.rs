//! Gene-drug recommendation

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRecommendation {
    pub gene: String,
    pub drug: String,
    pub recommendation: String,
    pub dosage: String,

    /// Guideline source label, e.g. "CPIC Guideline" or "PharmCAT/CPIC"
    pub guideline: String,
    pub citation: String,

    /// Reference URL for the gene or guideline
    pub cpic_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_url_wire_name() {
        let drug = DrugRecommendation {
            gene: "CYP2C19".into(),
            drug: "clopidogrel".into(),
            recommendation: "Phenotype: Normal Metabolizer".into(),
            dosage: "Consult prescribing information".into(),
            guideline: "PharmCAT/CPIC".into(),
            citation: "See PharmCAT report".into(),
            cpic_url: "https://cpicpgx.org/genes/cyp2c19/".into(),
        };
        let json = serde_json::to_value(&drug).unwrap();
        assert_eq!(json["cpicUrl"], "https://cpicpgx.org/genes/cyp2c19/");
    }
}
