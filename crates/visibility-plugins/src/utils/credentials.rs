use std::fmt;

/// API keys for the analyzers that talk to third-party services. A missing
/// key disables the matching analyzer rather than failing the run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub pagespeed: Option<String>,
    pub openai: Option<String>,
    pub ahrefs: Option<String>,
    pub semrush: Option<String>,
    pub perplexity: Option<String>,
    pub anthropic: Option<String>,
    pub moz_access_id: Option<String>,
    pub moz_secret_key: Option<String>,
    pub search_console: Option<String>,
}

pub const PAGESPEED_API_KEY: &str = "GOOGLE_PAGESPEED_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const AHREFS_API_KEY: &str = "AHREFS_API_KEY";
pub const SEMRUSH_API_KEY: &str = "SEMRUSH_API_KEY";
pub const PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const MOZ_ACCESS_ID: &str = "MOZ_ACCESS_ID";
pub const MOZ_SECRET_KEY: &str = "MOZ_SECRET_KEY";
pub const SEARCH_CONSOLE_CREDENTIALS: &str = "GOOGLE_SEARCH_CONSOLE_CREDENTIALS";

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds credentials from any name -> value source. Whitespace (including
    /// stray newlines from copy-pasted keys) is removed and blank values count
    /// as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.chars().filter(|c| !c.is_whitespace()).collect::<String>())
                .filter(|value| !value.is_empty())
        };

        Self {
            pagespeed: get(PAGESPEED_API_KEY),
            openai: get(OPENAI_API_KEY),
            ahrefs: get(AHREFS_API_KEY),
            semrush: get(SEMRUSH_API_KEY),
            perplexity: get(PERPLEXITY_API_KEY),
            anthropic: get(ANTHROPIC_API_KEY),
            moz_access_id: get(MOZ_ACCESS_ID),
            moz_secret_key: get(MOZ_SECRET_KEY),
            search_console: get(SEARCH_CONSOLE_CREDENTIALS),
        }
    }

    /// Moz needs both halves of its key pair.
    pub fn has_moz(&self) -> bool {
        self.moz_access_id.is_some() && self.moz_secret_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("Credentials")
            .field("pagespeed", &mask(&self.pagespeed))
            .field("openai", &mask(&self.openai))
            .field("ahrefs", &mask(&self.ahrefs))
            .field("semrush", &mask(&self.semrush))
            .field("perplexity", &mask(&self.perplexity))
            .field("anthropic", &mask(&self.anthropic))
            .field("moz_access_id", &mask(&self.moz_access_id))
            .field("moz_secret_key", &mask(&self.moz_secret_key))
            .field("search_console", &mask(&self.search_console))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blank_values_are_absent() {
        let vars: HashMap<&str, &str> = [
            (OPENAI_API_KEY, "  sk-te\nst  "),
            (PAGESPEED_API_KEY, "   "),
            (MOZ_ACCESS_ID, "id"),
        ]
        .into_iter()
        .collect();
        let credentials = Credentials::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(credentials.openai.as_deref(), Some("sk-test"));
        assert_eq!(credentials.pagespeed, None);
        assert!(!credentials.has_moz());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials = Credentials {
            openai: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("openai: \"<set>\""));
    }
}
