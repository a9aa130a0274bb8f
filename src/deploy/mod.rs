pub mod error;
pub mod integrity;
pub mod orchestrator;
pub mod preflight;
pub mod report;
pub mod transcript;

pub use error::*;
pub use orchestrator::{DeploymentOrchestrator, OrchestratorOptions};
pub use preflight::{ArtifactPlan, DeploymentPlan};
pub use report::RunReport;
pub use transcript::{Transcript, TranscriptAction, TranscriptEntry};
