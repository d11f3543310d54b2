use super::config::{AnalysisInput, AnalyzerId, AnalyzerResult, ScoreCategory};

// Main plugin trait
//
// `analyze` never fails: network and parse errors are folded into the
// returned result's `error` field.
#[async_trait::async_trait]
pub trait AnalyzerPlugin: Send + Sync + 'static {
    fn id(&self) -> AnalyzerId;
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    fn category(&self) -> ScoreCategory {
        self.id().category()
    }

    async fn analyze(&self, input: &AnalysisInput) -> AnalyzerResult;
}
