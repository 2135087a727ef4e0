//! Matcher output normalization
//!
//! Converts the annotator's `<label>.match.json` into variant records,
//! one or more per analyzed gene.

use omnyla_common::VariantRecord;
use serde::Deserialize;
use serde_json::Value;

const UNKNOWN_CHROMOSOME: &str = "Unknown";

/// Top level of `<label>.match.json`
#[derive(Debug, Default, Deserialize)]
pub struct MatcherOutput {
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneCall {
    #[serde(default)]
    gene: Option<String>,
    #[serde(default)]
    chromosome: Option<String>,
    #[serde(default)]
    variants: Vec<MatchedVariant>,
    #[serde(default)]
    variants_of_interest: Vec<MatchedVariant>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchedVariant {
    #[serde(default)]
    chromosome: Option<String>,
    #[serde(default)]
    position: Option<u64>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default, rename = "alt")]
    alternate: Option<String>,
}

/// Parse the matcher artifact
pub fn parse_matcher(text: &str) -> serde_json::Result<MatcherOutput> {
    serde_json::from_str(text)
}

/// Records for every gene call: confirmed variants, else variants of
/// interest, else a single "gene analyzed" placeholder
pub fn variants_from_matcher(output: &MatcherOutput) -> Vec<VariantRecord> {
    let mut records = Vec::new();

    for entry in &output.results {
        let call: GeneCall = match serde_json::from_value(entry.clone()) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed matcher result");
                continue;
            }
        };

        let gene_chromosome = non_empty(call.chromosome.as_deref());

        let (detected, impact) = if !call.variants.is_empty() {
            (&call.variants, VariantRecord::DETECTED)
        } else if !call.variants_of_interest.is_empty() {
            (&call.variants_of_interest, VariantRecord::OF_INTEREST)
        } else {
            records.push(VariantRecord {
                chromosome: gene_chromosome.unwrap_or(UNKNOWN_CHROMOSOME).to_string(),
                position: 0,
                reference: String::new(),
                alternate: String::new(),
                gene: call.gene.clone(),
                impact: Some(VariantRecord::GENE_ANALYZED.to_string()),
            });
            continue;
        };

        for variant in detected {
            let chromosome = non_empty(variant.chromosome.as_deref())
                .or(gene_chromosome)
                .unwrap_or(UNKNOWN_CHROMOSOME);

            records.push(VariantRecord {
                chromosome: chromosome.to_string(),
                position: variant.position.unwrap_or(0),
                reference: variant.reference.clone().unwrap_or_default(),
                alternate: variant.alternate.clone().unwrap_or_default(),
                gene: call.gene.clone(),
                impact: Some(impact.to_string()),
            });
        }
    }

    records
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
