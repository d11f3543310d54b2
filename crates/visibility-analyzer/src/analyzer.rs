use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use visibility_plugins::{
    AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, CompletionClient, ContentPlugin,
    FailureDetails, InputError, LlmMentionsPlugin, OpenAiClient, PageSpeedPlugin, PluginRegistry,
    PremiumPlugin, SchemaPlugin, ScoreCategory,
};

use visibility_plugins::utils::config::clamp_score;

use crate::config::{AnalysisOptions, AnalyzerConfig};

/// Relative weight of each SEO analyzer. Ids not listed carry no weight.
pub const SEO_WEIGHTS: [(AnalyzerId, f64); 5] = [
    (AnalyzerId::PageSpeed, 0.60),
    (AnalyzerId::SearchConsole, 0.25),
    (AnalyzerId::Ahrefs, 0.10),
    (AnalyzerId::Semrush, 0.05),
    (AnalyzerId::Moz, 0.05),
];

/// Relative weight of each AEO analyzer. Ids not listed carry no weight.
pub const AEO_WEIGHTS: [(AnalyzerId, f64); 5] = [
    (AnalyzerId::Schema, 0.30),
    (AnalyzerId::Content, 0.25),
    (AnalyzerId::LlmMentions, 0.25),
    (AnalyzerId::Perplexity, 0.10),
    (AnalyzerId::Claude, 0.10),
];

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error("No analyzers enabled")]
    NoAnalyzers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeoBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_speed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_console: Option<u8>,
    /// Same value as `page_speed`, under the name the report UI uses.
    #[serde(rename = "technicalSEO", default, skip_serializing_if = "Option::is_none")]
    pub technical_seo: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ahrefs: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semrush: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moz: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AeoBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_mentions: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Breakdown {
    pub seo: SeoBreakdown,
    pub aeo: AeoBreakdown,
}

/// The two composites plus everything that fed them. `raw_results` is what
/// gets stored with a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalScore {
    pub seo_score: u8,
    pub aeo_score: u8,
    pub breakdown: Breakdown,
    pub raw_results: BTreeMap<AnalyzerId, AnalyzerResult>,
}

pub struct Analyzer {
    config: AnalyzerConfig,
    completion: Option<Arc<dyn CompletionClient>>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let completion = config.credentials.openai.as_ref().map(|key| {
            let client = OpenAiClient::new(key.clone())
                .with_base_url(config.openai_base_url.clone())
                .with_model(config.openai_model.clone());
            debug!(model = client.model(), "AI mention testing enabled");
            Arc::new(client) as Arc<dyn CompletionClient>
        });

        Self { config, completion }
    }

    pub fn from_env() -> Self {
        Self::new(AnalyzerConfig::from_env())
    }

    /// Replaces the completion backend used by the AI mention analyzer.
    pub fn with_completion_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.completion = Some(client);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The analyzers one run with `options` would launch. Structured data and
    /// content always run.
    pub fn registry_for(&self, options: &AnalysisOptions) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register(SchemaPlugin::new().with_fetch_options(self.config.fetch.clone()));
        registry.register(ContentPlugin::new().with_fetch_options(self.config.fetch.clone()));

        if options.enable_llm {
            registry.register(LlmMentionsPlugin::new(self.completion.clone()));
        }

        if options.enable_performance {
            registry.register(
                PageSpeedPlugin::new(self.config.credentials.pagespeed.clone())
                    .with_endpoint(self.config.pagespeed_endpoint.clone())
                    .with_timeout(self.config.pagespeed_timeout),
            );
        }

        if options.enable_premium {
            for plugin in PremiumPlugin::all(&self.config.credentials) {
                registry.register(plugin);
            }
        }

        registry
    }

    pub async fn analyze(
        &self,
        input: AnalysisInput,
        options: &AnalysisOptions,
    ) -> Result<FinalScore, AnalyzerError> {
        let registry = self.registry_for(options);
        analyze_with_registry(&registry, input, options.timeout()).await
    }

    /// Skips the paid AI mention test.
    pub async fn analyze_free_only(&self, input: AnalysisInput) -> Result<FinalScore, AnalyzerError> {
        self.analyze(input, &AnalysisOptions::free_only()).await
    }

    /// Runs everything, premium providers included.
    pub async fn analyze_complete(&self, input: AnalysisInput) -> Result<FinalScore, AnalyzerError> {
        self.analyze(input, &AnalysisOptions::complete()).await
    }
}

/// Runs every analyzer in `registry` and scores whatever finishes within
/// `timeout`.
pub async fn analyze_with_registry(
    registry: &PluginRegistry,
    input: AnalysisInput,
    timeout: Duration,
) -> Result<FinalScore, AnalyzerError> {
    input.validate()?;
    if registry.is_empty() {
        return Err(AnalyzerError::NoAnalyzers);
    }

    let started = Instant::now();
    info!(
        url = %input.website_url(),
        analyzers = ?registry.ids(),
        timeout_ms = timeout.as_millis() as u64,
        "starting analysis"
    );

    let results = run_analyzers(registry, Arc::new(input), timeout).await;
    let score = calculate_final_scores(results);

    info!(
        seo = score.seo_score,
        aeo = score.aeo_score,
        completed = score.raw_results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis finished"
    );
    Ok(score)
}

/// Fans out one task per analyzer and collects results until all are done or
/// the deadline passes. Analyzers still running at the deadline are aborted
/// and left out of the returned map.
pub async fn run_analyzers(
    registry: &PluginRegistry,
    input: Arc<AnalysisInput>,
    timeout: Duration,
) -> BTreeMap<AnalyzerId, AnalyzerResult> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut abort_handles = Vec::with_capacity(registry.len());
    let mut pending = FuturesUnordered::new();

    for plugin in registry.plugins() {
        let plugin = Arc::clone(plugin);
        let input = Arc::clone(&input);
        let id = plugin.id();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            debug!(analyzer = %id, "analyzer started");
            let result = plugin.analyze(&input).await;
            debug!(
                analyzer = %id,
                score = result.score,
                enabled = result.enabled,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "analyzer finished"
            );
            result
        });
        abort_handles.push(handle.abort_handle());
        pending.push(async move { (id, handle.await) });
    }

    let mut results = BTreeMap::new();
    loop {
        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some((id, Ok(result)))) => {
                results.insert(id, result);
            }
            Ok(Some((id, Err(e)))) => {
                warn!(analyzer = %id, error = %e, "analyzer task failed");
                let error = format!("Analyzer task failed: {}", e);
                results.insert(
                    id,
                    AnalyzerResult::failed(
                        id,
                        error.clone(),
                        AnalyzerDetails::Failure(FailureDetails::new(error)),
                    ),
                );
            }
            Ok(None) => break,
            Err(_) => {
                let unfinished: Vec<AnalyzerId> = registry
                    .ids()
                    .into_iter()
                    .filter(|id| !results.contains_key(id))
                    .collect();
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    unfinished = ?unfinished,
                    "analysis deadline reached, continuing with completed results"
                );
                break;
            }
        }
    }

    for handle in abort_handles {
        handle.abort();
    }

    results
}

/// Builds the composites and breakdown from one run's results. Pure: the same
/// map always yields the same score.
pub fn calculate_final_scores(results: BTreeMap<AnalyzerId, AnalyzerResult>) -> FinalScore {
    let seo = weighted_score(&results, ScoreCategory::Seo, &SEO_WEIGHTS);
    let aeo = weighted_score(&results, ScoreCategory::Aeo, &AEO_WEIGHTS);

    FinalScore {
        seo_score: clamp_score(seo),
        aeo_score: clamp_score(aeo),
        breakdown: build_breakdown(&results),
        raw_results: results,
    }
}

/// Weighted mean over the results of `category` that ran and did not error.
/// The denominator only counts weights that are present, so a missing
/// analyzer does not pull the mean toward zero.
pub fn weighted_score(
    results: &BTreeMap<AnalyzerId, AnalyzerResult>,
    category: ScoreCategory,
    weights: &[(AnalyzerId, f64)],
) -> f64 {
    let mut total = 0.0;
    let mut total_weight = 0.0;

    for result in results
        .values()
        .filter(|r| r.category == category && r.is_weighted())
    {
        let weight = weight_of(weights, result.analyzer);
        total += f64::from(result.score) * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        total / total_weight
    } else {
        0.0
    }
}

fn weight_of(weights: &[(AnalyzerId, f64)], id: AnalyzerId) -> f64 {
    weights
        .iter()
        .find(|(key, _)| *key == id)
        .map_or(0.0, |(_, weight)| *weight)
}

pub fn build_breakdown(results: &BTreeMap<AnalyzerId, AnalyzerResult>) -> Breakdown {
    let score = |id: AnalyzerId| results.get(&id).map(|r| r.score);

    Breakdown {
        seo: SeoBreakdown {
            page_speed: score(AnalyzerId::PageSpeed),
            search_console: score(AnalyzerId::SearchConsole),
            technical_seo: score(AnalyzerId::PageSpeed),
            ahrefs: score(AnalyzerId::Ahrefs),
            semrush: score(AnalyzerId::Semrush),
            moz: score(AnalyzerId::Moz),
        },
        aeo: AeoBreakdown {
            schema_quality: score(AnalyzerId::Schema),
            content_quality: score(AnalyzerId::Content),
            ai_mentions: score(AnalyzerId::LlmMentions),
            perplexity: score(AnalyzerId::Perplexity),
            claude: score(AnalyzerId::Claude),
        },
    }
}
