//! Drug/phenotype mapping
//!
//! Turns the annotator's recommendation report into `DrugRecommendation`s and
//! owns the static fallback table used whenever that yields nothing.

use omnyla_common::DrugRecommendation;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Upper bound on recommendations returned from a real report
pub const MAX_RECOMMENDATIONS: usize = 25;

const UNKNOWN_PHENOTYPE: &str = "Unknown phenotype";
const GENERIC_DOSAGE: &str = "Consult prescribing information";
const REPORT_CITATION: &str = "See PharmCAT report";
const GENE_URL_BASE: &str = "https://cpicpgx.org/genes";

struct FallbackEntry {
    gene: &'static str,
    drug: &'static str,
    recommendation: &'static str,
    dosage: &'static str,
    guideline: &'static str,
    citation: &'static str,
    url: &'static str,
}

/// The two-entry table served whenever no real recommendations exist
static FALLBACK_TABLE: [FallbackEntry; 2] = [
    FallbackEntry {
        gene: "CYP2D6",
        drug: "Codeine",
        recommendation: "Avoid use",
        dosage: "N/A",
        guideline: "CPIC Guideline",
        citation: "PMID: 27997040",
        url: "https://cpicpgx.org/guidelines/guideline-for-codeine-and-cyp2d6/",
    },
    FallbackEntry {
        gene: "SLCO1B1",
        drug: "Simvastatin",
        recommendation: "Consider alternative",
        dosage: "Reduce dose by 50%",
        guideline: "CPIC Guideline",
        citation: "PMID: 24918167",
        url: "https://cpicpgx.org/guidelines/guideline-for-simvastatin-and-slco1b1/",
    },
];

pub fn fallback_recommendations() -> Vec<DrugRecommendation> {
    FALLBACK_TABLE
        .iter()
        .map(|entry| DrugRecommendation {
            gene: entry.gene.to_string(),
            drug: entry.drug.to_string(),
            recommendation: entry.recommendation.to_string(),
            dosage: entry.dosage.to_string(),
            guideline: entry.guideline.to_string(),
            citation: entry.citation.to_string(),
            cpic_url: entry.url.to_string(),
        })
        .collect()
}

/// Top level of `<label>.report.json`
#[derive(Debug, Default, Deserialize)]
pub struct ReporterOutput {
    /// guideline source -> gene -> recommendation data
    #[serde(default)]
    pub genes: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneReport {
    #[serde(default)]
    related_drugs: Vec<RelatedDrug>,
    #[serde(default)]
    recommendation_diplotypes: Vec<Diplotype>,
}

#[derive(Debug, Deserialize)]
struct RelatedDrug {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Diplotype {
    #[serde(default)]
    phenotypes: Vec<String>,
    #[serde(default)]
    label: Option<String>,
}

impl Diplotype {
    fn phenotype(&self) -> Option<&str> {
        self.phenotypes
            .first()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .or_else(|| self.label.as_deref().filter(|l| !l.is_empty()))
    }
}

/// Parse the reporter artifact
pub fn parse_report(text: &str) -> serde_json::Result<ReporterOutput> {
    serde_json::from_str(text)
}

/// One recommendation per (guideline source, gene, related drug)
pub fn recommendations_from_report(report: &ReporterOutput) -> Vec<DrugRecommendation> {
    let mut recommendations = Vec::new();

    for (source, section) in &report.genes {
        let Value::Object(genes) = section else {
            continue;
        };

        for (gene, data) in genes {
            let gene_report: GeneReport = match serde_json::from_value(data.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(source = %source, gene = %gene, error = %e, "Skipping malformed gene entry");
                    continue;
                }
            };

            let phenotype = gene_report
                .recommendation_diplotypes
                .first()
                .and_then(Diplotype::phenotype)
                .unwrap_or(UNKNOWN_PHENOTYPE);

            for drug in &gene_report.related_drugs {
                let Some(name) = drug.name.as_deref().filter(|n| !n.is_empty()) else {
                    continue;
                };

                recommendations.push(DrugRecommendation {
                    gene: gene.clone(),
                    drug: name.to_string(),
                    recommendation: format!("Phenotype: {}", phenotype),
                    dosage: GENERIC_DOSAGE.to_string(),
                    guideline: format!("PharmCAT/{}", source),
                    citation: REPORT_CITATION.to_string(),
                    cpic_url: gene_reference_url(gene),
                });
            }
        }
    }

    recommendations
}

/// Reference page for a gene
pub fn gene_reference_url(gene: &str) -> String {
    format!("{}/{}/", GENE_URL_BASE, gene.to_lowercase())
}

/// Final drug list for a response
#[derive(Debug, Clone, PartialEq)]
pub struct DrugMapping {
    pub drugs: Vec<DrugRecommendation>,
    pub used_fallback: bool,
}

/// Sort by gene and cap, or substitute the fallback table when empty
pub fn finalize(mut recommendations: Vec<DrugRecommendation>) -> DrugMapping {
    if recommendations.is_empty() {
        return DrugMapping {
            drugs: fallback_recommendations(),
            used_fallback: true,
        };
    }

    recommendations.sort_by(|a, b| a.gene.cmp(&b.gene));
    recommendations.truncate(MAX_RECOMMENDATIONS);

    DrugMapping {
        drugs: recommendations,
        used_fallback: false,
    }
}

/// Mapping for paths that never produced a report
pub fn fallback_mapping() -> DrugMapping {
    finalize(Vec::new())
}
