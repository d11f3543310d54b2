//! Command-line front end: analyze one website and print the report as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;
use visibility_analyzer::{
    validate_public_url, AnalysisInput, AnalysisOptions, Analyzer, AnalyzerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "visibility")]
#[command(about = "Score a website's search (SEO) and answer-engine (AEO) visibility")]
struct Args {
    /// Website to analyze
    url: String,

    /// Business name to look for in AI answers (default: derived from the domain)
    #[arg(long = "business-name")]
    business_name: Option<String>,

    /// Industry used in AI test prompts
    #[arg(long = "industry")]
    industry: Option<String>,

    /// Location used for the local AI test prompt
    #[arg(long = "location")]
    location: Option<String>,

    /// Skip the AI mention test
    #[arg(long = "no-llm")]
    no_llm: bool,

    /// Skip the PageSpeed audit
    #[arg(long = "no-performance")]
    no_performance: bool,

    /// Include premium provider analyzers
    #[arg(long = "premium")]
    premium: bool,

    /// Overall deadline in milliseconds
    #[arg(long = "timeout-ms", default_value_t = visibility_analyzer::config::DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Print only the per-analyzer results
    #[arg(long = "raw")]
    raw: bool,

    /// Allow analyzing localhost and private network addresses
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,
}

impl Args {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            enable_llm: !self.no_llm,
            enable_performance: !self.no_performance,
            enable_premium: self.premium,
            timeout_ms: self.timeout_ms,
        }
    }

    fn input(&self) -> Result<AnalysisInput> {
        let url = if self.allow_private_networks {
            Url::parse(&self.url).context("invalid URL")?
        } else {
            validate_public_url(&self.url).with_context(|| format!("refusing to analyze {}", self.url))?
        };

        let mut input = AnalysisInput::new(url)?;
        if let Some(name) = &self.business_name {
            input = input.with_business_name(name.as_str());
        }
        if let Some(industry) = &self.industry {
            input = input.with_industry(industry.as_str());
        }
        if let Some(location) = &self.location {
            input = input.with_location(location.as_str());
        }
        Ok(input)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = args.input()?;
    let options = args.options();

    let config = AnalyzerConfig::from_env();
    info!(credentials = ?config.credentials, "loaded configuration");

    let analyzer = Analyzer::new(config);
    let score = analyzer.analyze(input, &options).await?;

    let output = if args.raw {
        serde_json::to_string_pretty(&score.raw_results)?
    } else {
        serde_json::to_string_pretty(&score)?
    };
    println!("{}", output);
    Ok(())
}
