//! Best-effort structured-data synthesis for the types a page is missing.
//!
//! Everything produced here is a starting point: logo paths, social profiles
//! and opening hours are placeholders the site owner has to replace.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::utils::config::{capitalize_words, AnalysisInput};
use crate::utils::page::{element_text, extract_meta_tags, select, select_within};

const MAX_FAQ_QUESTIONS: usize = 5;
const MAX_ANSWER_CHARS: usize = 500;
const PLACEHOLDER_ANSWER: &str = "Please update this answer with your actual content.";
const PLACEHOLDER_OPENING_HOURS: &str = "Mo-Fr 09:00-17:00";
const QUESTION_PREFIXES: [&str; 5] = ["what", "how", "why", "when", "where"];
const IGNORED_EMAIL_FRAGMENTS: [&str; 4] = ["example.com", "sentry", "google", "facebook"];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email pattern")
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?1?\s*\(?[0-9]{3}\)?[\s.-]?[0-9]{3}[\s.-]?[0-9]{4})")
        .expect("valid phone pattern")
});

const IMPLEMENTATION_CHECKLIST: &str = "<!--
IMPORTANT: Customize the following before publishing:
1. Replace placeholder social media URLs with your actual profiles
2. Update logo URL with your actual logo path
3. Fill in complete address details for LocalBusiness
4. Verify all phone numbers and email addresses
5. Update FAQ answers with your actual content
6. Add opening hours for LocalBusiness if applicable
-->";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratedSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_business: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_page: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb_list: Option<Value>,
    pub recommendations: Vec<String>,
    pub implementation_code: String,
}

impl GeneratedSchema {
    /// Generated objects in emission order.
    pub fn objects(&self) -> Vec<&Value> {
        [
            &self.organization,
            &self.local_business,
            &self.faq_page,
            &self.breadcrumb_list,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Signals scraped from the page that feed the generated objects.
struct PageSignals {
    name: String,
    url: String,
    description: String,
    email: Option<String>,
    telephone: Option<String>,
    address: Option<String>,
}

/// Synthesizes the canonical types absent from `existing_types`, using the
/// already-parsed page. Never emits a type the page already declares.
pub fn generate_schema(
    input: &AnalysisInput,
    html: &str,
    document: &Html,
    existing_types: &BTreeSet<String>,
) -> GeneratedSchema {
    let meta = extract_meta_tags(document);
    let description = meta
        .description
        .filter(|d| !d.is_empty())
        .or(meta.title)
        .unwrap_or_default();

    let signals = PageSignals {
        name: input.business_name(),
        url: input.website_url().to_string(),
        description,
        email: extract_email(html),
        telephone: extract_phone(html),
        address: extract_address(document),
    };

    let mut result = GeneratedSchema::default();

    if !existing_types.contains("Organization") {
        result.organization = Some(organization_schema(&signals));
        result
            .recommendations
            .push("Add Organization schema to establish your brand identity for AI engines".into());
    }

    if !existing_types.contains("LocalBusiness")
        && (signals.telephone.is_some() || signals.address.is_some())
    {
        result.local_business = Some(local_business_schema(&signals));
        result
            .recommendations
            .push("Add LocalBusiness schema to improve local search visibility".into());
    }

    let questions = question_headings(document);
    if !existing_types.contains("FAQPage") && questions.len() >= 2 {
        result.faq_page = Some(faq_schema(&questions));
        result
            .recommendations
            .push("Add FAQ schema - AI engines love direct question-answer formats".into());
    }

    if !existing_types.contains("BreadcrumbList") {
        result.breadcrumb_list = Some(breadcrumb_schema(input.website_url()));
        result
            .recommendations
            .push("Add Breadcrumb schema to help AI understand your site structure".into());
    }

    result.implementation_code = implementation_code(&result);
    result
}

fn organization_schema(signals: &PageSignals) -> Value {
    let mut schema = base_object("Organization", signals);
    if let Some(email) = &signals.email {
        schema.insert("email".into(), json!(email));
    }
    if let Some(telephone) = &signals.telephone {
        schema.insert("telephone".into(), json!(telephone));
    }

    let logo_url = format!("{}/logo.png", signals.url.trim_end_matches('/'));
    schema.insert(
        "logo".into(),
        json!({ "@type": "ImageObject", "url": logo_url }),
    );

    let lowered = signals.name.to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    let squashed: String = lowered.split_whitespace().collect();
    schema.insert(
        "sameAs".into(),
        json!([
            format!("https://www.linkedin.com/company/{}", hyphenated),
            format!("https://twitter.com/{}", squashed),
            format!("https://www.facebook.com/{}", squashed),
        ]),
    );

    Value::Object(schema)
}

fn local_business_schema(signals: &PageSignals) -> Value {
    let mut schema = base_object("LocalBusiness", signals);
    if let Some(telephone) = &signals.telephone {
        schema.insert("telephone".into(), json!(telephone));
    }
    if let Some(address) = &signals.address {
        schema.insert(
            "address".into(),
            json!({ "@type": "PostalAddress", "streetAddress": address }),
        );
    }
    if let Some(email) = &signals.email {
        schema.insert("email".into(), json!(email));
    }
    schema.insert("openingHours".into(), json!(PLACEHOLDER_OPENING_HOURS));

    Value::Object(schema)
}

fn base_object(schema_type: &str, signals: &PageSignals) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("@context".into(), json!("https://schema.org"));
    schema.insert("@type".into(), json!(schema_type));
    schema.insert("name".into(), json!(signals.name));
    schema.insert("url".into(), json!(signals.url));
    schema.insert("description".into(), json!(signals.description));
    schema
}

/// H2 headings that read like questions, paired with a candidate answer.
fn question_headings(document: &Html) -> Vec<(String, String)> {
    select(document, "h2")
        .into_iter()
        .filter_map(|h2| {
            let text = element_text(&h2);
            is_question(&text).then(|| {
                let answer = candidate_answer(h2);
                (text, answer)
            })
        })
        .collect()
}

fn is_question(text: &str) -> bool {
    let lowered = text.to_lowercase();
    text.contains('?') || QUESTION_PREFIXES.iter().any(|p| lowered.starts_with(p))
}

/// The paragraph right after the heading, else the first paragraph of the
/// heading's parent, else a placeholder.
fn candidate_answer(heading: ElementRef) -> String {
    let next_paragraph = heading
        .next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty());

    let answer = next_paragraph.or_else(|| {
        heading
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| select_within(parent, "p").into_iter().next())
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
    });

    match answer {
        Some(text) => text.chars().take(MAX_ANSWER_CHARS).collect(),
        None => PLACEHOLDER_ANSWER.to_string(),
    }
}

fn faq_schema(questions: &[(String, String)]) -> Value {
    let main_entity: Vec<Value> = questions
        .iter()
        .take(MAX_FAQ_QUESTIONS)
        .map(|(question, answer)| {
            json!({
                "@type": "Question",
                "name": question,
                "acceptedAnswer": { "@type": "Answer", "text": answer },
            })
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": main_entity,
    })
}

fn breadcrumb_schema(url: &Url) -> Value {
    let origin = url.origin().ascii_serialization();
    let parts: Vec<&str> = url
        .path()
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();

    let mut items = vec![json!({
        "@type": "ListItem",
        "position": 1,
        "name": "Home",
        "item": origin,
    })];

    for (index, part) in parts.iter().enumerate() {
        items.push(json!({
            "@type": "ListItem",
            "position": index + 2,
            "name": capitalize_words(&part.replace('-', " ")),
            "item": format!("{}/{}", origin, parts[..=index].join("/")),
        }));
    }

    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items,
    })
}

fn implementation_code(schema: &GeneratedSchema) -> String {
    let objects = schema.objects();
    if objects.is_empty() {
        return String::new();
    }

    let body = serde_json::to_string_pretty(&objects).unwrap_or_default();
    format!(
        "<!-- Add this script tag to the <head> section of your website -->\n\
         <script type=\"application/ld+json\">\n{}\n</script>\n\n{}",
        body, IMPLEMENTATION_CHECKLIST
    )
}

fn extract_email(html: &str) -> Option<String> {
    EMAIL_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|email| !IGNORED_EMAIL_FRAGMENTS.iter().any(|f| email.contains(f)))
        .map(str::to_string)
}

fn extract_phone(html: &str) -> Option<String> {
    PHONE_RE.find(html).map(|m| m.as_str().trim().to_string())
}

fn extract_address(document: &Html) -> Option<String> {
    select(document, r#"[itemtype*="PostalAddress"], .address, #address"#)
        .into_iter()
        .map(|el| element_text(&el))
        .find(|text| {
            let len = text.chars().count();
            len > 10 && len < 200
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(url: &str, html: &str, existing: &[&str]) -> GeneratedSchema {
        let input = AnalysisInput::new(url).unwrap();
        let document = Html::parse_document(html);
        let existing = existing.iter().map(|s| s.to_string()).collect();
        generate_schema(&input, html, &document, &existing)
    }

    #[test]
    fn test_generates_missing_types_from_page_signals() {
        let html = r#"<html><head>
            <title>Acme Plumbing</title>
            <meta name="description" content="Emergency plumbing in Springfield">
        </head><body>
            <p>Call (555) 123-4567 or write to hello@acmeplumbing.com</p>
            <div class="address">742 Evergreen Terrace, Springfield</div>
            <section>
                <h2>What areas do you serve?</h2>
                <p>All of Springfield and Shelbyville.</p>
                <h2>How fast can you arrive?</h2>
                <p>Usually within the hour.</p>
            </section>
        </body></html>"#;

        let generated = generate("https://www.acme.com/services/drain-cleaning", html, &[]);

        let org = generated.organization.as_ref().unwrap();
        assert_eq!(org["name"], "Acme");
        assert_eq!(org["description"], "Emergency plumbing in Springfield");
        assert_eq!(org["email"], "hello@acmeplumbing.com");
        assert_eq!(org["telephone"], "(555) 123-4567");
        assert_eq!(
            org["logo"]["url"],
            "https://www.acme.com/services/drain-cleaning/logo.png"
        );
        assert_eq!(org["sameAs"][0], "https://www.linkedin.com/company/acme");

        let local = generated.local_business.as_ref().unwrap();
        assert_eq!(
            local["address"]["streetAddress"],
            "742 Evergreen Terrace, Springfield"
        );
        assert_eq!(local["openingHours"], "Mo-Fr 09:00-17:00");

        let faq = generated.faq_page.as_ref().unwrap();
        assert_eq!(faq["mainEntity"].as_array().unwrap().len(), 2);
        assert_eq!(
            faq["mainEntity"][1]["acceptedAnswer"]["text"],
            "Usually within the hour."
        );

        let crumbs = generated.breadcrumb_list.as_ref().unwrap();
        let items = crumbs["itemListElement"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["item"], "https://www.acme.com");
        assert_eq!(items[2]["name"], "Drain Cleaning");
        assert_eq!(items[2]["item"], "https://www.acme.com/services/drain-cleaning");

        assert_eq!(generated.recommendations.len(), 4);
        assert!(generated
            .implementation_code
            .contains(r#"<script type="application/ld+json">"#));
    }

    #[test]
    fn test_never_regenerates_existing_types() {
        let html = r#"<html><body><p>Call 555-123-4567</p>
            <h2>Why us?</h2><h2>When do you open?</h2></body></html>"#;
        let generated = generate(
            "https://acme.com",
            html,
            &["Organization", "LocalBusiness", "FAQPage", "BreadcrumbList"],
        );

        assert!(generated.objects().is_empty());
        assert!(generated.recommendations.is_empty());
        assert_eq!(generated.implementation_code, "");
    }

    #[test]
    fn test_local_business_needs_contact_signal() {
        let html = "<html><body><p>No contact details here.</p></body></html>";
        let generated = generate("https://acme.com", html, &[]);
        assert!(generated.local_business.is_none());
        assert!(generated.organization.is_some());
    }

    #[test]
    fn test_faq_answer_placeholder_and_truncation() {
        let long = "x".repeat(800);
        let html = format!(
            "<html><body><div><h2>What is it?</h2></div><h2>How does it work?</h2><p>{}</p></body></html>",
            long
        );
        let generated = generate("https://acme.com", &html, &[]);
        let faq = generated.faq_page.unwrap();
        assert_eq!(faq["mainEntity"][0]["acceptedAnswer"]["text"], PLACEHOLDER_ANSWER);
        assert_eq!(
            faq["mainEntity"][1]["acceptedAnswer"]["text"]
                .as_str()
                .unwrap()
                .len(),
            MAX_ANSWER_CHARS
        );
    }

    #[test]
    fn test_ignores_vendor_emails() {
        assert_eq!(
            extract_email("errors@sentry.io then sales@acme.com"),
            Some("sales@acme.com".to_string())
        );
        assert_eq!(extract_email("nobody@example.com"), None);
    }
}
