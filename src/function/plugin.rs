use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::function::RuntimeFunction;
use super::types::{PluginError, PluginResult};

/// A named group of functions. Function names are unique within a plugin;
/// registration that would shadow an existing name is rejected.
#[derive(Clone, Default)]
pub struct Plugin {
    name: String,
    description: Option<String>,
    functions: HashMap<String, Arc<dyn RuntimeFunction>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            functions: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_functions(
        mut self,
        functions: Vec<Arc<dyn RuntimeFunction>>,
    ) -> PluginResult<Self> {
        self.extend(functions)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn add_function(&mut self, function: Arc<dyn RuntimeFunction>) -> PluginResult<()> {
        let name = function.name().to_string();
        if self.functions.contains_key(&name) {
            return Err(PluginError::DuplicateFunctionName {
                plugin_name: self.name.clone(),
                function_name: name,
            });
        }
        self.functions.insert(name, function);
        Ok(())
    }

    /// Adds every function or none: the whole batch is validated against the
    /// existing names (and against itself) before anything is inserted.
    pub fn extend(&mut self, functions: Vec<Arc<dyn RuntimeFunction>>) -> PluginResult<()> {
        let mut incoming: HashSet<String> = HashSet::new();
        for function in &functions {
            let name = function.name().to_string();
            if self.functions.contains_key(&name) || !incoming.insert(name) {
                return Err(PluginError::DuplicateFunctionName {
                    plugin_name: self.name.clone(),
                    function_name: function.name().to_string(),
                });
            }
        }
        for function in functions {
            self.functions.insert(function.name().to_string(), function);
        }
        Ok(())
    }

    pub fn get(&self, function_name: &str) -> PluginResult<Arc<dyn RuntimeFunction>> {
        self.functions
            .get(function_name)
            .cloned()
            .ok_or_else(|| PluginError::FunctionNotFound {
                plugin_name: self.name.clone(),
                function_name: function_name.to_string(),
            })
    }

    pub fn contains(&self, function_name: &str) -> bool {
        self.functions.contains_key(function_name)
    }

    /// Function names, sorted for stable listings.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// All functions, ordered by name.
    pub fn functions(&self) -> Vec<Arc<dyn RuntimeFunction>> {
        let mut entries: Vec<_> = self.functions.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, f)| Arc::clone(f)).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
