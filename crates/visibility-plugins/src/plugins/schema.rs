use std::collections::BTreeSet;

use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::schema_generator::{generate_schema, GeneratedSchema};
use crate::utils::{
    config::{AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, FailureDetails},
    page::{extract_structured_data, FetchOptions, Page},
    page_plugin::AnalyzerPlugin,
};

/// What the structured-data pass found on the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaDetails {
    pub has_schema: bool,
    pub schema_count: usize,
    pub schema_types: Vec<String>,
    pub has_organization: bool,
    #[serde(rename = "hasFAQ")]
    pub has_faq: bool,
    pub has_local_business: bool,
    pub has_article: bool,
    pub has_product: bool,
    pub has_review: bool,
    pub completeness_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_schemas: Option<GeneratedSchema>,
}

// Schema Plugin
pub struct SchemaPlugin {
    fetch: FetchOptions,
}

impl Default for SchemaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaPlugin {
    pub fn new() -> Self {
        Self {
            fetch: FetchOptions::default(),
        }
    }

    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }
}

#[async_trait::async_trait]
impl AnalyzerPlugin for SchemaPlugin {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Schema
    }

    fn name(&self) -> &str {
        "Structured Data"
    }

    fn description(&self) -> &str {
        "Checks the page's JSON-LD structured data for the types answer engines rely on \
         and drafts the ones that are missing."
    }

    async fn analyze(&self, input: &AnalysisInput) -> AnalyzerResult {
        let page = match Page::fetch_with(input.website_url(), &self.fetch).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %input.website_url(), error = %e, "structured data fetch failed");
                return AnalyzerResult::failed(
                    self.id(),
                    e.to_string(),
                    AnalyzerDetails::Failure(FailureDetails::new(e.to_string())),
                );
            }
        };

        let html = page.get_html().unwrap_or_default();
        let details = inspect_html(input, html);
        let score = schema_score(&details);
        debug!(score, types = ?details.schema_types, "structured data analyzed");

        AnalyzerResult::scored(self.id(), score, AnalyzerDetails::Schema(details))
    }
}

/// Classifies the page's structured data and drafts replacements for the
/// missing canonical types.
pub fn inspect_html(input: &AnalysisInput, html: &str) -> SchemaDetails {
    let document = Html::parse_document(html);
    let blocks = extract_structured_data(&document);

    let mut types = BTreeSet::new();
    for block in &blocks {
        types.extend(declared_types(block));
    }

    let has = |name: &str| types.contains(name);
    let mut details = SchemaDetails {
        has_schema: !blocks.is_empty(),
        schema_count: blocks.len(),
        schema_types: types.iter().cloned().collect(),
        has_organization: has("Organization"),
        has_faq: has("FAQPage"),
        has_local_business: has("LocalBusiness"),
        has_article: has("Article") || has("BlogPosting"),
        has_product: has("Product"),
        has_review: has("Review") || blocks.iter().any(|b| is_truthy(b.get("aggregateRating"))),
        completeness_score: completeness(&blocks),
        generated_schemas: None,
    };

    details.generated_schemas = Some(generate_schema(input, html, &document, &types));
    details
}

pub fn schema_score(details: &SchemaDetails) -> f64 {
    // A page cannot have structured data with no blocks.
    if details.has_schema && details.schema_count == 0 {
        return 0.0;
    }

    let mut score = 0.0;
    if details.has_schema {
        score += 25.0;
    }
    if details.has_organization {
        score += 20.0;
    }
    if details.has_faq {
        score += 20.0;
    }
    if details.has_local_business {
        score += 15.0;
    }
    if details.has_article {
        score += 10.0;
    }
    if details.has_product {
        score += 10.0;
    }
    if details.has_review {
        score += 10.0;
    }
    if details.schema_types.len() >= 3 {
        score += 10.0;
    }
    score += f64::from(details.completeness_score) / 100.0 * 15.0;

    score.round().min(100.0)
}

/// Every string in a block's `@type`, which may be a string or an array.
fn declared_types(block: &Value) -> Vec<String> {
    match block.get("@type") {
        Some(Value::String(t)) => vec![t.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// The type used to look up required fields: the string, or the first entry
/// of an array.
fn primary_type(block: &Value) -> Option<&str> {
    match block.get("@type")? {
        Value::String(t) => Some(t),
        Value::Array(items) => items.first()?.as_str(),
        _ => None,
    }
}

fn required_fields(schema_type: &str) -> &'static [&'static str] {
    match schema_type {
        "Organization" => &["name", "url", "logo"],
        "LocalBusiness" => &["name", "address", "telephone"],
        "FAQPage" => &["mainEntity"],
        "Article" | "BlogPosting" => &["headline", "author", "datePublished"],
        "Product" => &["name", "description", "offers"],
        "Review" => &["itemReviewed", "reviewRating", "author"],
        _ => &[],
    }
}

/// Average percentage of required fields filled across blocks with a known
/// field set; 0 when no block qualifies.
fn completeness(blocks: &[Value]) -> u8 {
    let ratios: Vec<f64> = blocks
        .iter()
        .filter_map(|block| {
            let fields = required_fields(primary_type(block)?);
            if fields.is_empty() {
                return None;
            }
            let filled = fields
                .iter()
                .filter(|field| is_truthy(block.get(**field)))
                .count();
            Some(filled as f64 / fields.len() as f64 * 100.0)
        })
        .collect();

    if ratios.is_empty() {
        return 0;
    }
    (ratios.iter().sum::<f64>() / ratios.len() as f64).round() as u8
}

/// Empty strings, zero, `false` and `null` count as missing.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{start_test_server, Route};

    fn input() -> AnalysisInput {
        AnalysisInput::new("https://acme.com").unwrap()
    }

    fn page_with(scripts: &[&str]) -> String {
        let blocks: String = scripts
            .iter()
            .map(|s| format!(r#"<script type="application/ld+json">{}</script>"#, s))
            .collect();
        format!("<html><head>{}</head><body></body></html>", blocks)
    }

    #[test]
    fn test_complete_organization_and_faq() {
        let html = page_with(&[
            r#"{"@type":"Organization","name":"Acme","url":"https://acme.com","logo":"https://acme.com/l.png"}"#,
            r#"{"@type":"FAQPage","mainEntity":[{"@type":"Question","name":"Why?"}]}"#,
            r#"{"@type":"WebSite","name":"Acme"}"#,
        ]);
        let details = inspect_html(&input(), &html);

        assert!(details.has_organization);
        assert!(details.has_faq);
        assert_eq!(details.schema_count, 3);
        assert_eq!(details.completeness_score, 100);
        // 25 + 20 + 20 + 10 (types) + 15 (completeness)
        assert_eq!(schema_score(&details), 90.0);

        let generated = details.generated_schemas.unwrap();
        assert!(generated.organization.is_none());
        assert!(generated.faq_page.is_none());
        assert!(generated.breadcrumb_list.is_some());
    }

    #[test]
    fn test_no_structured_data() {
        let details = inspect_html(&input(), "<html><body><p>Hi</p></body></html>");
        assert!(!details.has_schema);
        assert_eq!(details.completeness_score, 0);
        assert_eq!(schema_score(&details), 0.0);
        assert!(details.generated_schemas.unwrap().organization.is_some());
    }

    #[test]
    fn test_bad_block_is_skipped() {
        let html = page_with(&[
            "{ not json",
            r#"[{"@type":"Product","name":"Widget","description":"","offers":{}},{"@type":["Review","Thing"],"itemReviewed":"Widget"}]"#,
        ]);
        let details = inspect_html(&input(), &html);

        assert_eq!(details.schema_count, 2);
        assert!(details.has_product);
        assert!(details.has_review);
        assert_eq!(details.schema_types, vec!["Product", "Review", "Thing"]);
        // Product 2/3, Review 1/3 -> 50
        assert_eq!(details.completeness_score, 50);
        // 25 + 10 + 10 + 10 + 7.5
        assert_eq!(schema_score(&details), 63.0);
    }

    #[test]
    fn test_aggregate_rating_counts_as_review() {
        let html = page_with(&[r#"{"@type":"Product","aggregateRating":{"ratingValue":4.8}}"#]);
        let details = inspect_html(&input(), &html);
        assert!(details.has_review);
    }

    #[test]
    fn test_contradiction_scores_zero() {
        let details = SchemaDetails {
            has_schema: true,
            schema_count: 0,
            has_organization: true,
            ..Default::default()
        };
        assert_eq!(schema_score(&details), 0.0);
    }

    #[test]
    fn test_details_serialize_with_faq_acronym() {
        let json = serde_json::to_value(SchemaDetails::default()).unwrap();
        assert_eq!(json["hasFAQ"], false);
        assert_eq!(json["completenessScore"], 0);
        assert!(json.get("generatedSchemas").is_none());
    }

    #[tokio::test]
    async fn test_analyze_fetch_failure() {
        let addr = start_test_server(vec![("/", Route::status(500, "down"))]).await;
        let input = AnalysisInput::new(format!("http://{}/", addr)).unwrap();

        let result = SchemaPlugin::new().analyze(&input).await;
        assert!(result.enabled);
        assert_eq!(result.score, 0);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_analyze_scores_page() {
        let html = page_with(&[r#"{"@type":"Organization","name":"Acme","url":"https://acme.com"}"#]);
        let addr = start_test_server(vec![("/", Route::ok(html))]).await;
        let input = AnalysisInput::new(format!("http://{}/", addr)).unwrap();

        let result = SchemaPlugin::new().analyze(&input).await;
        assert!(result.is_weighted());
        // 25 + 20 + round(67 * 0.15)
        assert_eq!(result.score, 55);
        assert!(matches!(result.details, AnalyzerDetails::Schema(_)));
    }
}
