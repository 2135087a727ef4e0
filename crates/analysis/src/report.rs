//! Markdown report rendering

use omnyla_common::{AnalysisResult, ClinicalTrial, DrugRecommendation};
use std::fmt;

/// Render a downloadable Markdown report. Pure string construction.
pub fn render_markdown(result: &AnalysisResult) -> String {
    MarkdownReport(result).to_string().trim().to_string()
}

/// Display adapter that writes the report section by section
struct MarkdownReport<'a>(&'a AnalysisResult);

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;

        writeln!(f, "# Pharmacogenomics Report\n")?;
        writeln!(f, "**Patient File:** {}", result.file_name)?;
        writeln!(f, "**Variants Analyzed:** {}", result.num_variants)?;
        writeln!(f, "**Processing Time:** {}ms", result.processing_time)?;

        writeln!(f, "\n## Drug Recommendations")?;
        for drug in &result.drugs {
            write_drug(f, drug)?;
        }

        writeln!(f, "\n## Clinical Trials")?;
        for trial in &result.trials {
            write_trial(f, trial)?;
        }
        Ok(())
    }
}

fn write_drug(f: &mut fmt::Formatter<'_>, drug: &DrugRecommendation) -> fmt::Result {
    writeln!(f, "\n### {} - {}", drug.gene, drug.drug)?;
    writeln!(f, "- **Recommendation:** {}", drug.recommendation)?;
    writeln!(f, "- **Dosage:** {}", drug.dosage)?;
    writeln!(f, "- **Guideline:** {}", drug.guideline)?;
    writeln!(f, "- **Citation:** {}", drug.citation)
}

fn write_trial(f: &mut fmt::Formatter<'_>, trial: &ClinicalTrial) -> fmt::Result {
    writeln!(f, "\n### {}", trial.title)?;
    writeln!(f, "- **Phase:** {}", trial.phase)?;
    writeln!(
        f,
        "- **Location:** {}, {} ({}km away)",
        trial.city, trial.state, trial.distance
    )?;
    writeln!(f, "- **Condition:** {}", trial.condition)?;
    writeln!(f, "- **Intervention:** {}", trial.intervention)?;
    writeln!(f, "- **Status:** {}", trial.status)?;
    writeln!(f, "- **NCT ID:** {}", trial.nct_id)
}
