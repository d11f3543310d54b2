use std::collections::{BTreeSet, HashSet};

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::{
    config::{AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, FailureDetails},
    page::{body_text, element_text, select, FetchOptions, Page},
    page_plugin::AnalyzerPlugin,
};

const NON_CONTENT_SELECTOR: &str = "script, style, nav, footer, header";
const FAQ_ELEMENT_SELECTOR: &str = r#"h2, h3, h4, dt, .faq-question, [class*="faq"], [id*="faq"]"#;
const MAIN_CONTENT_SELECTOR: &str = r#"main, article, .content, [role="main"]"#;

const FAQ_KEYWORDS: [&str; 4] = [
    "faq",
    "frequently asked questions",
    "common questions",
    "questions and answers",
];
const AUTHOR_KEYWORDS: [&str; 4] = ["author", "written by", "by ", "about the author"];
const CONTACT_KEYWORDS: [&str; 5] = ["contact", "email", "phone", "address", "reach us"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentDetails {
    #[serde(rename = "hasFAQSection")]
    pub has_faq_section: bool,
    pub faq_count: usize,
    pub has_headings: bool,
    /// Tag names in document order, e.g. `["H1", "H2", "H2"]`.
    pub heading_structure: Vec<String>,
    pub has_author_info: bool,
    pub has_clear_answers: bool,
    pub word_count: usize,
    pub has_contact_info: bool,
    pub readability_score: u8,
    pub structure_score: u8,
}

impl ContentDetails {
    fn count_level(&self, level: &str) -> usize {
        self.heading_structure.iter().filter(|h| *h == level).count()
    }
}

// Content Plugin
pub struct ContentPlugin {
    fetch: FetchOptions,
}

impl Default for ContentPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentPlugin {
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
impl AnalyzerPlugin for ContentPlugin {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Content
    }

    fn name(&self) -> &str {
        "Content Quality"
    }

    fn description(&self) -> &str {
        "Looks for answer-friendly content: FAQ sections, a clean heading outline, \
         author and contact signals, short direct answers and readable prose."
    }

    async fn analyze(&self, input: &AnalysisInput) -> AnalyzerResult {
        let page = match Page::fetch_with(input.website_url(), &self.fetch).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %input.website_url(), error = %e, "content fetch failed");
                return AnalyzerResult::failed(
                    self.id(),
                    e.to_string(),
                    AnalyzerDetails::Failure(FailureDetails::new(e.to_string())),
                );
            }
        };

        let details = analyze_html(page.get_html().unwrap_or_default());
        let score = content_score(&details);
        debug!(score, words = details.word_count, "content analyzed");

        AnalyzerResult::scored(self.id(), score, AnalyzerDetails::Content(details))
    }
}

pub fn analyze_html(html: &str) -> ContentDetails {
    let mut document = Html::parse_document(html);
    strip_non_content(&mut document);

    let text = body_text(&document).to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    let heading_structure: Vec<String> = select(&document, "h1, h2, h3, h4, h5, h6")
        .into_iter()
        .map(|h| h.value().name().to_uppercase())
        .collect();

    let has_author_info = contains_any(&AUTHOR_KEYWORDS)
        || !select(&document, r#"meta[name="author"], [rel="author"]"#).is_empty();

    let short_paragraphs = select(&document, "p")
        .into_iter()
        .filter(|p| (20..=300).contains(&element_text(p).chars().count()))
        .count();

    let has_contact_info = contains_any(&CONTACT_KEYWORDS)
        || !select(&document, r#"a[href^="mailto:"], a[href^="tel:"]"#).is_empty();

    let main_text = main_content_text(&document);

    let mut details = ContentDetails {
        has_faq_section: contains_any(&FAQ_KEYWORDS),
        faq_count: select(&document, FAQ_ELEMENT_SELECTOR).len(),
        has_headings: !heading_structure.is_empty(),
        heading_structure,
        has_author_info,
        has_clear_answers: short_paragraphs >= 3,
        word_count: main_text.split_whitespace().count(),
        has_contact_info,
        readability_score: readability(&main_text),
        structure_score: 0,
    };
    details.structure_score = structure_score(&details);
    details
}

/// Drops elements whose text is not page content, so keyword checks and
/// word counts only see the body copy.
fn strip_non_content(document: &mut Html) {
    let ids: Vec<_> = select(document, NON_CONTENT_SELECTOR)
        .into_iter()
        .map(|el| el.id())
        .collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Text of the semantic main-content containers, outermost only so nested
/// matches are not counted twice. Falls back to the body.
fn main_content_text(document: &Html) -> String {
    let containers = select(document, MAIN_CONTENT_SELECTOR);
    let ids: HashSet<_> = containers.iter().map(|el| el.id()).collect();

    let text: String = containers
        .iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .flat_map(|el| el.text())
        .collect();

    if text.trim().is_empty() {
        body_text(document)
    } else {
        text
    }
}

/// Simplified Flesch reading ease, clamped to `0..=100`.
pub fn readability(text: &str) -> u8 {
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let words: Vec<&str> = text.split_whitespace().collect();

    if sentences == 0 || words.is_empty() {
        return 0;
    }

    let syllables: usize = words.iter().map(|w| estimate_syllables(w)).sum();
    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;

    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    score.round().clamp(0.0, 100.0) as u8
}

fn estimate_syllables(word: &str) -> usize {
    let word: String = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if word.len() <= 3 {
        return 1;
    }

    let mut count = 0usize;
    let mut previous_was_vowel = false;
    for c in word.chars() {
        let is_vowel = "aeiouy".contains(c);
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }

    // silent e
    if word.ends_with('e') {
        count = count.saturating_sub(1);
    }

    count.max(1)
}

pub fn structure_score(details: &ContentDetails) -> u8 {
    let mut score = 0u32;

    match details.count_level("H1") {
        1 => score += 30,
        0 => {}
        _ => score += 15,
    }

    let levels: BTreeSet<&String> = details.heading_structure.iter().collect();
    if levels.len() >= 3 {
        score += 30;
    } else if levels.len() >= 2 {
        score += 20;
    }

    let total = details.heading_structure.len();
    if total >= 10 {
        score += 20;
    } else if total >= 5 {
        score += 15;
    } else if total >= 3 {
        score += 10;
    }

    if details.has_faq_section {
        score += 20;
    }

    score.min(100) as u8
}

pub fn content_score(details: &ContentDetails) -> f64 {
    let mut score = 0.0;

    if details.has_faq_section {
        score += 25.0;
    } else if details.faq_count >= 5 {
        score += 15.0;
    }

    if details.has_headings {
        let has_h1 = details.count_level("H1") > 0;
        let has_h2 = details.count_level("H2") > 0;
        let total = details.heading_structure.len();

        if has_h1 && has_h2 && total >= 5 {
            score += 20.0;
        } else if has_h1 && has_h2 {
            score += 15.0;
        } else if total >= 3 {
            score += 10.0;
        }
    }

    if details.has_author_info {
        score += 15.0;
    }
    if details.has_clear_answers {
        score += 15.0;
    }

    if details.word_count >= 500 {
        score += 10.0;
    } else if details.word_count >= 300 {
        score += 5.0;
    }

    if details.has_contact_info {
        score += 10.0;
    }

    if details.readability_score >= 70 {
        score += 10.0;
    } else if details.readability_score >= 50 {
        score += 5.0;
    }

    if details.structure_score >= 80 {
        score += 10.0;
    } else if details.structure_score >= 60 {
        score += 5.0;
    }

    f64::min(score, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{start_test_server, Route};

    const WELL_STRUCTURED: &str = r#"
        <html><head><meta name="author" content="Jane Doe"></head>
        <body>
            <header><h1>Site banner FAQ</h1></header>
            <nav><a href="/contact">Contact</a></nav>
            <main>
                <h1>Drain cleaning in Springfield</h1>
                <h2>What does drain cleaning cost?</h2>
                <p>Most residential jobs cost between one and two hundred dollars.</p>
                <h2>How long does it take?</h2>
                <p>A typical visit takes about an hour from start to finish.</p>
                <h3>Do you offer weekend visits?</h3>
                <p>Yes, we run a weekend crew for urgent calls every week.</p>
                <h3>Read our frequently asked questions</h3>
            </main>
            <footer>Call us: <a href="tel:5551234567">555-123-4567</a></footer>
            <script>var faq = "contact";</script>
        </body></html>"#;

    #[test]
    fn test_well_structured_page() {
        let details = analyze_html(WELL_STRUCTURED);

        // Header/footer/nav/script are stripped before inspection.
        assert_eq!(details.heading_structure, vec!["H1", "H2", "H2", "H3", "H3"]);
        assert!(details.has_faq_section);
        assert!(details.has_author_info);
        assert!(details.has_clear_answers);
        assert!(!details.has_contact_info);
        assert_eq!(details.faq_count, 4);
        // 30 (one H1) + 30 (three levels) + 15 (five headings) + 20 (FAQ)
        assert_eq!(details.structure_score, 95);

        // 25 + 20 + 15 + 15 + 10 (structure) + readability tier
        let score = content_score(&details);
        assert!(score >= 85.0, "score was {}", score);
    }

    #[test]
    fn test_signals_inside_page_chrome_are_ignored() {
        let html = r#"<html><body>
            <header><h1>Acme Plumbing</h1><p>Thirty characters of banner text</p></header>
            <nav><h2>Menu</h2><a href="mailto:hi@acme.com">Write</a></nav>
            <main><p>Pipes get cleaned.</p></main>
            <footer>
                <h3>Links</h3>
                <p>Thirty characters of footer one</p>
                <p>Thirty characters of footer two</p>
                <a rel="author" href="/me">Me</a>
            </footer>
        </body></html>"#;
        let details = analyze_html(html);

        assert!(details.heading_structure.is_empty());
        assert!(!details.has_headings);
        assert!(!details.has_contact_info);
        assert!(!details.has_clear_answers);
        assert!(!details.has_author_info);
        assert_eq!(details.faq_count, 0);
        assert_eq!(details.word_count, 3);
        assert_eq!(details.structure_score, 0);
        // Only the readability tier can contribute.
        assert!(content_score(&details) <= 10.0);
    }

    #[test]
    fn test_empty_page_is_safe() {
        let details = analyze_html("");
        assert_eq!(details.word_count, 0);
        assert_eq!(details.readability_score, 0);
        assert_eq!(details.structure_score, 0);
        assert!(!details.has_headings);
        assert_eq!(content_score(&details), 0.0);
    }

    #[test]
    fn test_readability_degenerate_input() {
        assert_eq!(readability(""), 0);
        assert_eq!(readability("..."), 0);
        assert_eq!(readability("Go."), 100);
        assert_eq!(
            readability(
                "Notwithstanding institutionalization, multidisciplinary \
                 internationalization characteristically overcomplicates"
            ),
            0
        );
    }

    #[test]
    fn test_syllable_estimate() {
        assert_eq!(estimate_syllables("the"), 1);
        assert_eq!(estimate_syllables("make"), 1);
        assert_eq!(estimate_syllables("reading"), 2);
        assert_eq!(estimate_syllables("Beautiful!"), 3);
    }

    #[test]
    fn test_faq_like_elements_fallback() {
        let html = r#"<html><body>
            <dl><dt>One</dt><dt>Two</dt><dt>Three</dt></dl>
            <div class="faq-item">A</div><div id="faq-list">B</div>
        </body></html>"#;
        let details = analyze_html(html);
        assert!(!details.has_faq_section);
        assert_eq!(details.faq_count, 5);
        assert_eq!(content_score(&details), 15.0);
    }

    #[test]
    fn test_contact_links_and_main_fallback() {
        let html = r#"<html><body>
            <p>Reach the team <a href="mailto:hi@acme.com">here</a> any time.</p>
        </body></html>"#;
        let details = analyze_html(html);
        assert!(details.has_contact_info);
        assert_eq!(details.word_count, 6);
    }

    #[tokio::test]
    async fn test_analyze_over_http() {
        let addr = start_test_server(vec![("/", Route::ok(WELL_STRUCTURED))]).await;
        let input = AnalysisInput::new(format!("http://{}/", addr)).unwrap();

        let result = ContentPlugin::new().analyze(&input).await;
        assert!(result.is_weighted());
        assert!(result.score >= 85);

        let missing = AnalysisInput::new(format!("http://{}/missing", addr)).unwrap();
        let result = ContentPlugin::new().analyze(&missing).await;
        assert_eq!(result.error.as_deref(), Some("HTTP 404"));
        assert_eq!(result.score, 0);
    }
}
