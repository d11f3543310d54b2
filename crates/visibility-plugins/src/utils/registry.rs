use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::config::AnalyzerId;
use super::page_plugin::AnalyzerPlugin;

/// The set of analyzers enabled for one run, keyed by identity so a run can
/// hold at most one analyzer per id.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<AnalyzerId, Arc<dyn AnalyzerPlugin>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins.keys()).finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin`, returning whatever it replaced.
    pub fn register<P: AnalyzerPlugin>(&mut self, plugin: P) -> Option<Arc<dyn AnalyzerPlugin>> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(
        &mut self,
        plugin: Arc<dyn AnalyzerPlugin>,
    ) -> Option<Arc<dyn AnalyzerPlugin>> {
        self.plugins.insert(plugin.id(), plugin)
    }

    pub fn get(&self, id: AnalyzerId) -> Option<&Arc<dyn AnalyzerPlugin>> {
        self.plugins.get(&id)
    }

    pub fn ids(&self) -> Vec<AnalyzerId> {
        self.plugins.keys().copied().collect()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn AnalyzerPlugin>> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
