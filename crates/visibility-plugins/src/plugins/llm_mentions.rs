use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::utils::{
    completion::CompletionClient,
    config::{AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, FailureDetails},
    page_plugin::AnalyzerPlugin,
};

/// Characters of context kept on each side of a mention.
const SNIPPET_CONTEXT: usize = 100;

const POSITIVE_WORDS: [&str; 11] = [
    "recommend",
    "best",
    "top",
    "leading",
    "excellent",
    "great",
    "trusted",
    "reliable",
    "professional",
    "quality",
    "expert",
];
const NEGATIVE_WORDS: [&str; 6] = ["avoid", "poor", "bad", "worst", "unreliable", "unprofessional"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    General,
    Local,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestQuery {
    pub text: String,
    pub kind: QueryKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryOutcome {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub mentioned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LlmMentionDetails {
    pub tested: bool,
    pub mentioned_in_general: bool,
    pub mentioned_in_local: bool,
    pub mentioned_in_comparison: bool,
    pub positive_context: bool,
    pub queries: Vec<QueryOutcome>,
    pub total_mentions: usize,
}

impl LlmMentionDetails {
    fn record(&mut self, outcome: QueryOutcome) {
        if outcome.mentioned {
            self.total_mentions += 1;
            match outcome.kind {
                QueryKind::General => self.mentioned_in_general = true,
                QueryKind::Local => self.mentioned_in_local = true,
                QueryKind::Comparison => self.mentioned_in_comparison = true,
            }
            if outcome.sentiment == Some(Sentiment::Positive) {
                self.positive_context = true;
            }
        }
        self.queries.push(outcome);
    }
}

// LLM Mentions Plugin
pub struct LlmMentionsPlugin {
    client: Option<Arc<dyn CompletionClient>>,
}

impl LlmMentionsPlugin {
    /// Without a client the plugin reports itself as not configured and never
    /// touches the network.
    pub fn new(client: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { client }
    }

    pub fn unconfigured() -> Self {
        Self { client: None }
    }
}

#[async_trait::async_trait]
impl AnalyzerPlugin for LlmMentionsPlugin {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::LlmMentions
    }

    fn name(&self) -> &str {
        "AI Mentions"
    }

    fn description(&self) -> &str {
        "Asks a chat model for industry recommendations and checks whether the business comes up."
    }

    async fn analyze(&self, input: &AnalysisInput) -> AnalyzerResult {
        let Some(client) = &self.client else {
            debug!("no completion client configured, skipping AI mention test");
            return AnalyzerResult::disabled(
                self.id(),
                AnalyzerDetails::Failure(
                    FailureDetails::new("OPENAI_API_KEY not configured")
                        .with_note("Add an OpenAI API key to enable AI mention testing"),
                ),
            );
        };

        let business = input.business_name();
        let queries = test_queries(input.industry(), input.location());
        info!(business = %business, queries = queries.len(), "testing AI mentions");

        let mut details = LlmMentionDetails {
            tested: true,
            ..Default::default()
        };

        // One prompt at a time; a failing prompt is recorded and the batch goes on.
        for query in queries {
            let outcome = match client.complete(&query.text).await {
                Ok(response) => inspect_response(&query, &response, &business),
                Err(e) => {
                    warn!(query = %query.text, error = %e, "completion request failed");
                    QueryOutcome {
                        query: query.text,
                        kind: query.kind,
                        mentioned: false,
                        snippet: None,
                        sentiment: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            details.record(outcome);
        }

        let score = mention_score(&details);
        debug!(score, mentions = details.total_mentions, "AI mention test complete");
        AnalyzerResult::scored(self.id(), score, AnalyzerDetails::LlmMentions(details))
    }
}

pub fn test_queries(industry: &str, location: Option<&str>) -> Vec<TestQuery> {
    let mut queries = vec![TestQuery {
        text: format!("What are the top companies for {}? List 5 recommendations.", industry),
        kind: QueryKind::General,
    }];

    if let Some(location) = location {
        queries.push(TestQuery {
            text: format!(
                "What are the best {} companies in {}? Give me 5 options.",
                industry, location
            ),
            kind: QueryKind::Local,
        });
    }

    queries.push(TestQuery {
        text: format!("Compare the leading {} providers. Who would you recommend?", industry),
        kind: QueryKind::Comparison,
    });
    queries.push(TestQuery {
        text: format!("I need help with {}. Which company should I choose?", industry),
        kind: QueryKind::General,
    });

    queries
}

fn inspect_response(query: &TestQuery, response: &str, business: &str) -> QueryOutcome {
    match find_ignore_case(response, business) {
        Some(range) => {
            let snippet = mention_snippet(response, range);
            let sentiment = classify_sentiment(&snippet);
            QueryOutcome {
                query: query.text.clone(),
                kind: query.kind,
                mentioned: true,
                snippet: Some(snippet),
                sentiment: Some(sentiment),
                error: None,
            }
        }
        None => QueryOutcome {
            query: query.text.clone(),
            kind: query.kind,
            mentioned: false,
            snippet: None,
            sentiment: None,
            error: None,
        },
    }
}

/// Byte range of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }

    for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].char_indices();
        let mut end = start;
        let matched = needle.chars().all(|n| match rest.next() {
            Some((offset, h)) if h.to_lowercase().eq(n.to_lowercase()) => {
                end = start + offset + h.len_utf8();
                true
            }
            _ => false,
        });
        if matched {
            return Some(start..end);
        }
    }
    None
}

/// The mention plus up to [`SNIPPET_CONTEXT`] characters either side, with
/// `...` marking each truncated end.
pub fn mention_snippet(text: &str, mention: Range<usize>) -> String {
    let before = &text[..mention.start];
    let after = &text[mention.end..];

    let skip = before.chars().count().saturating_sub(SNIPPET_CONTEXT);
    let lead: String = before.chars().skip(skip).collect();
    let trail: String = after.chars().take(SNIPPET_CONTEXT).collect();

    let mut snippet = format!("{}{}{}", lead, &text[mention], trail)
        .trim()
        .to_string();
    if skip > 0 {
        snippet.insert_str(0, "...");
    }
    if after.chars().count() > SNIPPET_CONTEXT {
        snippet.push_str("...");
    }
    snippet
}

pub fn classify_sentiment(snippet: &str) -> Sentiment {
    let lower = snippet.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

pub fn mention_score(details: &LlmMentionDetails) -> f64 {
    let mut score = 0.0;
    if details.tested {
        score += 10.0;
    }
    if details.mentioned_in_general {
        score += 30.0;
    }
    if details.mentioned_in_local {
        score += 25.0;
    }
    if details.mentioned_in_comparison {
        score += 20.0;
    }
    if details.positive_context {
        score += 15.0;
    }
    score += match details.total_mentions {
        0 => 0.0,
        1 => 5.0,
        2 => 10.0,
        _ => 20.0,
    };
    f64::min(score, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::completion::CompletionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies from a script, one entry per call; `None` simulates a failure.
    struct ScriptedClient {
        replies: Vec<Option<&'static str>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(call).copied().flatten() {
                Some(reply) => Ok(reply.to_string()),
                None => Err(CompletionError::Timeout),
            }
        }
    }

    fn input() -> AnalysisInput {
        AnalysisInput::new("https://acme.com")
            .unwrap()
            .with_business_name("Acme Plumbing")
            .with_industry("plumbing")
            .with_location("Springfield")
    }

    #[test]
    fn test_queries_include_local_only_with_location() {
        let queries = test_queries("plumbing", None);
        assert_eq!(queries.len(), 3);
        assert_eq!(
            queries[0].text,
            "What are the top companies for plumbing? List 5 recommendations."
        );

        let queries = test_queries("plumbing", Some("Springfield"));
        let kinds: Vec<_> = queries.iter().map(|q| q.kind).collect();
        assert_eq!(
            kinds,
            vec![
                QueryKind::General,
                QueryKind::Local,
                QueryKind::Comparison,
                QueryKind::General
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_client_is_disabled() {
        let result = LlmMentionsPlugin::unconfigured().analyze(&input()).await;
        assert!(!result.enabled);
        assert_eq!(result.score, 0);
        assert!(result.error.is_none());
        assert!(!result.is_weighted());
    }

    #[tokio::test]
    async fn test_mentions_are_tallied_and_failures_isolated() {
        let client = ScriptedClient::new(vec![
            Some("1. ACME PLUMBING is a trusted, reliable choice."),
            None,
            Some("Roto-Rooter and Mr. Rooter lead the market."),
            Some("Acme Plumbing comes up often, though some say avoid the weekend rates."),
        ]);
        let shared: Arc<dyn CompletionClient> = client.clone();
        let plugin = LlmMentionsPlugin::new(Some(shared));
        let result = plugin.analyze(&input()).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
        let AnalyzerDetails::LlmMentions(details) = &result.details else {
            panic!("unexpected details: {:?}", result.details);
        };

        assert!(details.tested);
        assert!(details.mentioned_in_general);
        assert!(!details.mentioned_in_local);
        assert!(!details.mentioned_in_comparison);
        assert!(details.positive_context);
        assert_eq!(details.total_mentions, 2);
        assert_eq!(details.queries[1].error.as_deref(), Some("Request timed out"));
        assert!(!details.queries[1].mentioned);
        assert_eq!(details.queries[3].sentiment, Some(Sentiment::Negative));

        // 10 + 30 + 15 + 10
        assert_eq!(result.score, 65);
        assert!(result.is_weighted());
    }

    #[test]
    fn test_snippet_window() {
        let text = format!("{}Acme{}", "a".repeat(150), "b".repeat(30));
        let start = 150;
        let snippet = mention_snippet(&text, start..start + 4);
        assert!(snippet.starts_with("..."));
        assert!(!snippet.ends_with("..."));
        assert_eq!(snippet.len(), 3 + 100 + 4 + 30);

        let short = mention_snippet("Try Acme today", 4..8);
        assert_eq!(short, "Try Acme today");
    }

    #[test]
    fn test_find_ignore_case_handles_multibyte() {
        let text = "Café Zoë recommends ACME";
        let range = find_ignore_case(text, "acme").unwrap();
        assert_eq!(&text[range], "ACME");
        assert_eq!(find_ignore_case(text, "zoë").map(|r| &text[r]), Some("Zoë"));
        assert_eq!(find_ignore_case(text, "globex"), None);
    }

    #[test]
    fn test_sentiment() {
        assert_eq!(classify_sentiment("The best and most trusted"), Sentiment::Positive);
        assert_eq!(classify_sentiment("Poor service, avoid"), Sentiment::Negative);
        assert_eq!(classify_sentiment("A company in town"), Sentiment::Neutral);
    }

    #[test]
    fn test_score_caps_at_100() {
        let details = LlmMentionDetails {
            tested: true,
            mentioned_in_general: true,
            mentioned_in_local: true,
            mentioned_in_comparison: true,
            positive_context: true,
            total_mentions: 4,
            ..Default::default()
        };
        assert_eq!(mention_score(&details), 100.0);
    }
}
