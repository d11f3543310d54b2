// Shared result contract for every analyzer
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::page::FromUrl;
use crate::plugins::content::ContentDetails;
use crate::plugins::llm_mentions::LlmMentionDetails;
use crate::plugins::page_speed::{PageSpeedDetails, PageSpeedFailureDetails};
use crate::plugins::schema::SchemaDetails;

pub const DEFAULT_INDUSTRY: &str = "services";

/// Identity of an analyzer. The serialized form is the key used in
/// `rawResults` and in the orchestrator's weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnalyzerId {
    #[serde(rename = "schema")]
    Schema,
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "pageSpeed")]
    PageSpeed,
    #[serde(rename = "openai")]
    LlmMentions,
    #[serde(rename = "searchConsole")]
    SearchConsole,
    #[serde(rename = "ahrefs")]
    Ahrefs,
    #[serde(rename = "semrush")]
    Semrush,
    #[serde(rename = "perplexity")]
    Perplexity,
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "moz")]
    Moz,
}

impl AnalyzerId {
    pub const ALL: [AnalyzerId; 10] = [
        AnalyzerId::Schema,
        AnalyzerId::Content,
        AnalyzerId::PageSpeed,
        AnalyzerId::LlmMentions,
        AnalyzerId::SearchConsole,
        AnalyzerId::Ahrefs,
        AnalyzerId::Semrush,
        AnalyzerId::Perplexity,
        AnalyzerId::Claude,
        AnalyzerId::Moz,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            AnalyzerId::Schema => "schema",
            AnalyzerId::Content => "content",
            AnalyzerId::PageSpeed => "pageSpeed",
            AnalyzerId::LlmMentions => "openai",
            AnalyzerId::SearchConsole => "searchConsole",
            AnalyzerId::Ahrefs => "ahrefs",
            AnalyzerId::Semrush => "semrush",
            AnalyzerId::Perplexity => "perplexity",
            AnalyzerId::Claude => "claude",
            AnalyzerId::Moz => "moz",
        }
    }

    pub fn category(&self) -> ScoreCategory {
        match self {
            AnalyzerId::PageSpeed
            | AnalyzerId::SearchConsole
            | AnalyzerId::Ahrefs
            | AnalyzerId::Semrush
            | AnalyzerId::Moz => ScoreCategory::Seo,
            AnalyzerId::Schema
            | AnalyzerId::Content
            | AnalyzerId::LlmMentions
            | AnalyzerId::Perplexity
            | AnalyzerId::Claude => ScoreCategory::Aeo,
        }
    }
}

impl fmt::Display for AnalyzerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which composite a result feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Seo,
    Aeo,
}

/// Analyzer-specific diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnalyzerDetails {
    Schema(SchemaDetails),
    Content(ContentDetails),
    PageSpeed(PageSpeedDetails),
    PageSpeedFailure(PageSpeedFailureDetails),
    LlmMentions(LlmMentionDetails),
    Failure(FailureDetails),
    Note(NoteDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FailureDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FailureDetails {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteDetails {
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_setup: Option<bool>,
}

impl NoteDetails {
    pub fn new(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            requires_setup: None,
        }
    }
}

/// The uniform contract every analyzer returns.
///
/// `enabled == false` means the analyzer did not run. A populated `error`
/// means it ran and could not produce a meaningful score. Neither kind is
/// weighted by the orchestrator, but both survive into `rawResults` so the
/// presentation layer can tell "could not run" apart from "ran and found
/// nothing".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
    pub analyzer: AnalyzerId,
    #[serde(rename = "type")]
    pub category: ScoreCategory,
    pub score: u8,
    pub details: AnalyzerDetails,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerResult {
    pub fn scored(analyzer: AnalyzerId, score: f64, details: AnalyzerDetails) -> Self {
        Self {
            analyzer,
            category: analyzer.category(),
            score: clamp_score(score),
            details,
            enabled: true,
            error: None,
        }
    }

    /// Ran, failed: score 0 with the cause recorded.
    pub fn failed(analyzer: AnalyzerId, error: impl Into<String>, details: AnalyzerDetails) -> Self {
        Self {
            analyzer,
            category: analyzer.category(),
            score: 0,
            details,
            enabled: true,
            error: Some(error.into()),
        }
    }

    /// Did not run at all.
    pub fn disabled(analyzer: AnalyzerId, details: AnalyzerDetails) -> Self {
        Self {
            analyzer,
            category: analyzer.category(),
            score: 0,
            details,
            enabled: false,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether this result may contribute weight to a composite.
    pub fn is_weighted(&self) -> bool {
        self.enabled && self.error.is_none()
    }
}

/// Rounds into `0..=100`; NaN becomes 0.
pub fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// One analysis run's target. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    website_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl AnalysisInput {
    pub fn new<T: FromUrl>(website_url: T) -> Result<Self, InputError> {
        let website_url = website_url
            .to_url()
            .map_err(|e| InputError::InvalidUrl(e.to_string()))?;
        Self::check_url(&website_url)?;
        Ok(Self {
            website_url,
            business_name: None,
            industry: None,
            location: None,
        })
    }

    /// Re-checks the shape invariants, e.g. after deserializing.
    pub fn validate(&self) -> Result<(), InputError> {
        Self::check_url(&self.website_url)
    }

    fn check_url(url: &Url) -> Result<(), InputError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(InputError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(InputError::MissingHost(url.to_string()));
        }
        Ok(())
    }

    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = non_empty(name.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = non_empty(industry.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_empty(location.into());
        self
    }

    pub fn website_url(&self) -> &Url {
        &self.website_url
    }

    /// The supplied name, or one derived from the domain (`www.acme-co.com`
    /// becomes `Acme-Co`).
    pub fn business_name(&self) -> String {
        if let Some(name) = &self.business_name {
            return name.clone();
        }
        let host = self.website_url.host_str().unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(host);
        match host.split('.').next() {
            Some(label) if !label.is_empty() => capitalize_words(label),
            _ => "the business".to_string(),
        }
    }

    pub fn industry(&self) -> &str {
        self.industry.as_deref().unwrap_or(DEFAULT_INDUSTRY)
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Upper-cases the first character of every word (`[A-Za-z0-9_]` run).
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_word = false;
    for ch in text.chars() {
        let is_word = ch.is_ascii_alphanumeric() || ch == '_';
        if is_word && !previous_is_word {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        previous_is_word = is_word;
    }
    out
}
