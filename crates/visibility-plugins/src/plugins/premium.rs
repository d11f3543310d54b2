//! Placeholders for paid data providers. They take part in orchestration and
//! serialization like any other analyzer but never contribute weight until
//! a real integration replaces them.

use tracing::debug;

use crate::utils::{
    config::{AnalysisInput, AnalyzerDetails, AnalyzerId, AnalyzerResult, NoteDetails},
    credentials::Credentials,
    page_plugin::AnalyzerPlugin,
};

pub const NOT_IMPLEMENTED: &str = "Not yet implemented";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setup {
    /// Needs an OAuth service-account setup before any integration can run.
    Manual,
    Configured,
    Missing(&'static str),
}

// Premium Plugin
#[derive(Debug, Clone)]
pub struct PremiumPlugin {
    id: AnalyzerId,
    provider: &'static str,
    setup: Setup,
}

impl PremiumPlugin {
    fn keyed(id: AnalyzerId, provider: &'static str, configured: bool, missing: &'static str) -> Self {
        Self {
            id,
            provider,
            setup: if configured {
                Setup::Configured
            } else {
                Setup::Missing(missing)
            },
        }
    }

    pub fn search_console(credentials: &Credentials) -> Self {
        Self {
            id: AnalyzerId::SearchConsole,
            provider: "Google Search Console",
            setup: if credentials.search_console.is_some() {
                Setup::Configured
            } else {
                Setup::Manual
            },
        }
    }

    pub fn ahrefs(credentials: &Credentials) -> Self {
        Self::keyed(
            AnalyzerId::Ahrefs,
            "Ahrefs",
            credentials.ahrefs.is_some(),
            "Ahrefs API key not configured (Premium feature)",
        )
    }

    pub fn semrush(credentials: &Credentials) -> Self {
        Self::keyed(
            AnalyzerId::Semrush,
            "SEMrush",
            credentials.semrush.is_some(),
            "SEMrush API key not configured (Premium feature)",
        )
    }

    pub fn perplexity(credentials: &Credentials) -> Self {
        Self::keyed(
            AnalyzerId::Perplexity,
            "Perplexity",
            credentials.perplexity.is_some(),
            "Perplexity API key not configured",
        )
    }

    pub fn claude(credentials: &Credentials) -> Self {
        Self::keyed(
            AnalyzerId::Claude,
            "Claude",
            credentials.anthropic.is_some(),
            "Anthropic API key not configured",
        )
    }

    pub fn moz(credentials: &Credentials) -> Self {
        Self::keyed(
            AnalyzerId::Moz,
            "Moz",
            credentials.has_moz(),
            "Moz API credentials not configured (has FREE tier!)",
        )
    }

    /// Every premium provider, in weight-table order.
    pub fn all(credentials: &Credentials) -> Vec<Self> {
        vec![
            Self::search_console(credentials),
            Self::ahrefs(credentials),
            Self::semrush(credentials),
            Self::moz(credentials),
            Self::perplexity(credentials),
            Self::claude(credentials),
        ]
    }

    fn placeholder(&self) -> AnalyzerResult {
        match self.setup {
            Setup::Manual => {
                let note = NoteDetails {
                    note: format!("{} integration coming soon", self.provider),
                    requires_setup: Some(true),
                };
                AnalyzerResult::disabled(self.id, AnalyzerDetails::Note(note))
                    .with_error(NOT_IMPLEMENTED)
            }
            Setup::Configured => AnalyzerResult::disabled(
                self.id,
                AnalyzerDetails::Note(NoteDetails::new(format!(
                    "{} integration coming soon",
                    self.provider
                ))),
            )
            .with_error(NOT_IMPLEMENTED),
            Setup::Missing(note) => {
                AnalyzerResult::disabled(self.id, AnalyzerDetails::Note(NoteDetails::new(note)))
            }
        }
    }
}

#[async_trait::async_trait]
impl AnalyzerPlugin for PremiumPlugin {
    fn id(&self) -> AnalyzerId {
        self.id
    }

    fn name(&self) -> &str {
        self.provider
    }

    fn description(&self) -> &str {
        "Premium data provider placeholder."
    }

    async fn analyze(&self, _input: &AnalysisInput) -> AnalyzerResult {
        debug!(analyzer = %self.id, "premium analyzer not available");
        self.placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::ScoreCategory;

    fn note(result: &AnalyzerResult) -> &NoteDetails {
        match &result.details {
            AnalyzerDetails::Note(note) => note,
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_console_needs_setup() {
        let input = AnalysisInput::new("https://acme.com").unwrap();
        let result = PremiumPlugin::search_console(&Credentials::default())
            .analyze(&input)
            .await;

        assert!(!result.enabled);
        assert_eq!(result.category, ScoreCategory::Seo);
        assert_eq!(result.error.as_deref(), Some(NOT_IMPLEMENTED));
        assert_eq!(note(&result).requires_setup, Some(true));

        let credentials = Credentials {
            search_console: Some("{}".to_string()),
            ..Default::default()
        };
        let result = PremiumPlugin::search_console(&credentials)
            .analyze(&input)
            .await;
        assert!(!result.enabled);
        assert_eq!(result.error.as_deref(), Some(NOT_IMPLEMENTED));
        assert_eq!(note(&result).requires_setup, None);
        assert_eq!(note(&result).note, "Google Search Console integration coming soon");
    }

    #[tokio::test]
    async fn test_keyed_stub_depends_on_credential() {
        let input = AnalysisInput::new("https://acme.com").unwrap();

        let result = PremiumPlugin::ahrefs(&Credentials::default())
            .analyze(&input)
            .await;
        assert!(!result.enabled);
        assert!(result.error.is_none());
        assert_eq!(note(&result).note, "Ahrefs API key not configured (Premium feature)");

        let credentials = Credentials {
            anthropic: Some("key".to_string()),
            ..Default::default()
        };
        let result = PremiumPlugin::claude(&credentials).analyze(&input).await;
        assert!(!result.enabled);
        assert_eq!(result.category, ScoreCategory::Aeo);
        assert_eq!(result.error.as_deref(), Some(NOT_IMPLEMENTED));
        assert_eq!(note(&result).note, "Claude integration coming soon");
    }

    #[test]
    fn test_moz_needs_both_halves() {
        let credentials = Credentials {
            moz_access_id: Some("id".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PremiumPlugin::moz(&credentials).setup,
            Setup::Missing(_)
        ));
        assert_eq!(PremiumPlugin::all(&credentials).len(), 6);
    }
}
