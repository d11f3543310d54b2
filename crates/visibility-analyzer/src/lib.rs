//! Orchestration for the website visibility report: runs the analyzers from
//! `visibility-plugins` concurrently under a deadline and folds their results
//! into weighted SEO and AEO composites.

pub mod analyzer;
pub mod config;
pub mod security;

pub use analyzer::{
    analyze_with_registry, calculate_final_scores, run_analyzers, AeoBreakdown, Analyzer,
    AnalyzerError, Breakdown, FinalScore, SeoBreakdown, AEO_WEIGHTS, SEO_WEIGHTS,
};
pub use config::{AnalysisOptions, AnalyzerConfig};
pub use security::{validate_public_url, UrlValidationError};
pub use visibility_plugins::{AnalysisInput, AnalyzerId, AnalyzerResult};
