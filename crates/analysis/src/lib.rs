//! Omnyla analysis pipeline
//!
//! VCF upload to pharmacogenomic recommendations:
//! - Intake validation and size routing
//! - Variant extraction via an external annotator, with an opt-in fallback scan
//! - Drug/phenotype mapping with a static fallback table
//! - Clinical-trials enrichment
//! - Markdown report rendering

pub mod agent;
pub mod annotator;
pub mod extraction;
pub mod intake;
pub mod mapping;
pub mod pipeline;
pub mod report;
pub mod trials;
pub mod vcf;

pub use annotator::{create_annotator, Annotation, AnnotatorError, VariantAnnotator};
pub use intake::{UploadLimits, UploadedFile};
pub use pipeline::{AnalysisPath, AnalysisPipeline};
pub use report::render_markdown;
pub use trials::TrialRegistry;
