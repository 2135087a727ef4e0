//! Analysis data model
//!
//! Wire types of the VCF analysis contract. Every entity is created and owned
//! by a single request; nothing here is persisted.

mod variant;
mod drug;
mod trial;
mod analysis;

pub use variant::VariantRecord;
pub use drug::DrugRecommendation;
pub use trial::ClinicalTrial;
pub use analysis::AnalysisResult;
