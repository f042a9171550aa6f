pub mod backend;
pub mod batch;
pub mod fetcher;
pub mod orchestrator;
pub mod technical;

pub use backend::{BackendSelector, ScoringBackend};
pub use batch::{BatchReport, BatchRunner};
pub use fetcher::{HttpPageFetcher, PageFetcher, RequestContext};
pub use orchestrator::AnalysisOrchestrator;
pub use technical::TechnicalAnalyzer;
