pub mod analyzer;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod pipeline;
pub mod recommend;
pub mod types;

pub use analyzer::{LanguageAnalyzer, ParsedFile};
pub use cache::AnalysisCache;
pub use config::Config;
pub use error::DiscoveryError;
pub use graph::DependencyGraph;
pub use metrics::{AnalysisReport, PerformanceProfile, ProjectMetrics};
pub use pipeline::{AnalysisPipeline, BatchProgress, ProjectAnalysis};
pub use recommend::RiskAssessment;
pub use types::*;
