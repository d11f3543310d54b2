use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::{
    config::{AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult},
    page_plugin::AnalyzerPlugin,
};

pub const DEFAULT_PAGESPEED_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
/// Just under the orchestrator's default deadline so a slow audit is
/// reported as a timeout instead of silently going missing.
pub const PAGESPEED_TIMEOUT: Duration = Duration::from_secs(55);
const STRATEGY: &str = "mobile";
const CATEGORIES: [&str; 4] = ["performance", "seo", "accessibility", "best-practices"];
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageSpeedDetails {
    pub performance_score: u8,
    pub seo_score: u8,
    pub accessibility_score: u8,
    pub best_practices_score: u8,
    /// Milliseconds.
    pub first_contentful_paint: f64,
    pub largest_contentful_paint: f64,
    pub speed_index: f64,
    pub total_blocking_time: f64,
    /// Unitless.
    pub cumulative_layout_shift: f64,
    pub time_to_interactive: f64,
}

/// Why a page-speed run produced no score. Each cause maps to different
/// remediation advice for the site owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCause {
    Timeout,
    RateLimited,
    NoCredential,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageSpeedFailureDetails {
    pub error: String,
    pub note: String,
    pub cause: FailureCause,
    pub has_api_key: bool,
}

#[derive(Debug, Error)]
enum PageSpeedError {
    #[error("PageSpeed API request timed out")]
    Timeout,
    #[error("PageSpeed API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("PageSpeed API request failed: {0}")]
    Request(String),
    #[error("PageSpeed API returned no lighthouse data")]
    MissingLighthouse,
}

impl From<reqwest::Error> for PageSpeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PageSpeedError::Timeout
        } else {
            PageSpeedError::Request(e.to_string())
        }
    }
}

impl PageSpeedError {
    fn cause(&self, has_api_key: bool) -> FailureCause {
        match self {
            PageSpeedError::Timeout => FailureCause::Timeout,
            PageSpeedError::Status { status, body }
                if *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || body.contains("Quota") =>
            {
                FailureCause::RateLimited
            }
            _ if !has_api_key => FailureCause::NoCredential,
            _ => FailureCause::Unavailable,
        }
    }
}

fn failure_note(cause: FailureCause, has_api_key: bool) -> &'static str {
    match cause {
        FailureCause::Timeout => {
            "PageSpeed API timed out. The site may be slow or the API is overloaded. \
             Try again in a few minutes."
        }
        FailureCause::RateLimited if has_api_key => {
            "PageSpeed API rate limit reached. Please try again later."
        }
        FailureCause::RateLimited => {
            "PageSpeed API rate limit reached. Add a FREE API key to increase limits."
        }
        FailureCause::NoCredential => {
            "Consider adding a FREE GOOGLE_PAGESPEED_API_KEY for better reliability."
        }
        FailureCause::Unavailable => "Unable to fetch PageSpeed data",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSpeedResponse {
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Default, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: HashMap<String, LighthouseCategory>,
    #[serde(default)]
    audits: HashMap<String, LighthouseAudit>,
}

#[derive(Debug, Deserialize)]
struct LighthouseCategory {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LighthouseAudit {
    numeric_value: Option<f64>,
}

impl LighthouseResult {
    fn category(&self, name: &str) -> u8 {
        let score = self
            .categories
            .get(name)
            .and_then(|c| c.score)
            .unwrap_or(0.0);
        (score * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn audit(&self, name: &str) -> f64 {
        self.audits
            .get(name)
            .and_then(|a| a.numeric_value)
            .unwrap_or(0.0)
    }

    fn details(&self) -> PageSpeedDetails {
        PageSpeedDetails {
            performance_score: self.category("performance"),
            seo_score: self.category("seo"),
            accessibility_score: self.category("accessibility"),
            best_practices_score: self.category("best-practices"),
            first_contentful_paint: self.audit("first-contentful-paint"),
            largest_contentful_paint: self.audit("largest-contentful-paint"),
            speed_index: self.audit("speed-index"),
            total_blocking_time: self.audit("total-blocking-time"),
            cumulative_layout_shift: self.audit("cumulative-layout-shift"),
            time_to_interactive: self.audit("interactive"),
        }
    }
}

// PageSpeed Plugin
pub struct PageSpeedPlugin {
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl Default for PageSpeedPlugin {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PageSpeedPlugin {
    /// The key is optional: the service accepts anonymous requests at a lower
    /// quota.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: DEFAULT_PAGESPEED_ENDPOINT.to_string(),
            timeout: PAGESPEED_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, input: &AnalysisInput) -> Result<PageSpeedDetails, PageSpeedError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PageSpeedError::Request(e.to_string()))?;

        let mut query: Vec<(&str, &str)> = vec![
            ("url", input.website_url().as_str()),
            ("strategy", STRATEGY),
        ];
        query.extend(CATEGORIES.iter().map(|c| ("category", *c)));
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        info!(url = %input.website_url(), has_api_key = self.api_key.is_some(), "requesting PageSpeed audit");
        let response = client.get(&self.endpoint).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PageSpeedError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let response: PageSpeedResponse = response.json().await?;
        let lighthouse = response
            .lighthouse_result
            .ok_or(PageSpeedError::MissingLighthouse)?;
        Ok(lighthouse.details())
    }
}

#[async_trait::async_trait]
impl AnalyzerPlugin for PageSpeedPlugin {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::PageSpeed
    }

    fn name(&self) -> &str {
        "PageSpeed"
    }

    fn description(&self) -> &str {
        "Runs a mobile Lighthouse audit and blends its category scores with Core Web Vitals."
    }

    async fn analyze(&self, input: &AnalysisInput) -> AnalyzerResult {
        match self.run(input).await {
            Ok(details) => {
                let score = page_speed_score(&details);
                debug!(
                    score,
                    performance = details.performance_score,
                    seo = details.seo_score,
                    "PageSpeed audit complete"
                );
                AnalyzerResult::scored(self.id(), score, AnalyzerDetails::PageSpeed(details))
            }
            Err(e) => {
                let has_api_key = self.api_key.is_some();
                let cause = e.cause(has_api_key);
                warn!(error = %e, ?cause, "PageSpeed audit failed");

                let error = e.to_string();
                let details = PageSpeedFailureDetails {
                    error: error.clone(),
                    note: failure_note(cause, has_api_key).to_string(),
                    cause,
                    has_api_key,
                };
                AnalyzerResult::failed(self.id(), error, AnalyzerDetails::PageSpeedFailure(details))
            }
        }
    }
}

/// Weighted category blend plus a Core Web Vitals adjustment.
pub fn page_speed_score(details: &PageSpeedDetails) -> f64 {
    let weighted = f64::from(details.performance_score) * 0.35
        + f64::from(details.seo_score) * 0.40
        + f64::from(details.accessibility_score) * 0.15
        + f64::from(details.best_practices_score) * 0.10;

    let vitals = vital_adjustment(details.largest_contentful_paint, 2500.0, 4000.0, 5.0)
        + vital_adjustment(details.first_contentful_paint, 1800.0, 3000.0, 3.0)
        + vital_adjustment(details.cumulative_layout_shift, 0.1, 0.25, 5.0)
        + vital_adjustment(details.total_blocking_time, 200.0, 600.0, 3.0);

    (weighted + vitals).round().clamp(0.0, 100.0)
}

fn vital_adjustment(value: f64, good: f64, poor: f64, points: f64) -> f64 {
    if value < good {
        points
    } else if value > poor {
        -points
    } else {
        0.0
    }
}
