use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::function::RuntimeFunction;
use super::plugin::Plugin;
use super::types::{PluginError, PluginResult};

/// Shared collection of plugins, keyed by plugin name.
///
/// Clones share the same underlying map, so a collection handed to a pipeline
/// observes registrations made later through any other clone.
#[derive(Clone, Default)]
pub struct PluginCollection {
    plugins: Arc<DashMap<String, Plugin>>,
}

impl PluginCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, merging into an existing plugin of the same name.
    ///
    /// Merging is all-or-nothing: one colliding function name rejects the
    /// whole batch and leaves the existing plugin untouched.
    #[tracing::instrument(level = "debug", skip(self, plugin))]
    pub fn add_plugin(&self, plugin: Plugin) -> PluginResult<()> {
        match self.plugins.entry(plugin.name().to_string()) {
            Entry::Occupied(mut existing) => {
                debug!("merging into existing plugin: {}", existing.key());
                existing.get_mut().extend(plugin.functions())
            }
            Entry::Vacant(slot) => {
                slot.insert(plugin);
                Ok(())
            }
        }
    }

    /// Registers a single function under its own plugin name, synthesizing
    /// the plugin when it does not exist yet.
    pub fn add_function(&self, function: Arc<dyn RuntimeFunction>) -> PluginResult<()> {
        let plugin_name = function.plugin_name().to_string();
        self.plugins
            .entry(plugin_name.clone())
            .or_insert_with(|| Plugin::new(plugin_name))
            .add_function(function)
    }

    pub fn get(
        &self,
        plugin_name: &str,
        function_name: &str,
    ) -> PluginResult<Arc<dyn RuntimeFunction>> {
        let plugin = self
            .plugins
            .get(plugin_name)
            .ok_or_else(|| PluginError::PluginNotFound(plugin_name.to_string()))?;
        plugin.get(function_name)
    }

    pub fn get_plugin(&self, plugin_name: &str) -> PluginResult<Plugin> {
        self.plugins
            .get(plugin_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PluginError::PluginNotFound(plugin_name.to_string()))
    }

    pub fn contains(&self, plugin_name: &str) -> bool {
        self.plugins.contains_key(plugin_name)
    }

    /// Plugin names, sorted for stable listings.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
