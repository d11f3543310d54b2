//! Analyzers behind the website visibility report.
//!
//! Each analyzer implements [`AnalyzerPlugin`] and turns one website into an
//! [`AnalyzerResult`]. Analyzers never fail outward: fetch, parse and API
//! errors are reported inside the result so a caller can keep going with
//! whatever else succeeded.

pub mod plugins;
pub mod utils;

pub use plugins::{
    content::{ContentDetails, ContentPlugin},
    llm_mentions::{LlmMentionDetails, LlmMentionsPlugin},
    page_speed::{PageSpeedDetails, PageSpeedFailureDetails, PageSpeedPlugin},
    premium::PremiumPlugin,
    schema::{SchemaDetails, SchemaPlugin},
    schema_generator::GeneratedSchema,
};
pub use utils::{
    completion::{CompletionClient, CompletionError, OpenAiClient},
    config::{
        AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, FailureDetails, InputError,
        NoteDetails, ScoreCategory,
    },
    credentials::Credentials,
    page::{FetchOptions, FromUrl, Page, PageError},
    page_plugin::AnalyzerPlugin,
    registry::PluginRegistry,
};
