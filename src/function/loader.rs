use std::fs;
use std::path::Path;
use std::sync::Arc;

use glob::glob;
use tracing::debug;

use crate::config::PromptConfig;

use super::plugin::Plugin;
use super::prompt::PromptFunction;
use super::types::{PluginError, PluginResult};

/// File holding the prompt text of one function directory.
pub const PROMPT_FILE: &str = "prompt.txt";
/// Optional per-function configuration beside the prompt.
pub const CONFIG_FILE: &str = "config.json";

/// Loads a plugin from `<parent_directory>/<plugin_name>`.
///
/// Each immediate subdirectory containing a `prompt.txt` becomes one prompt
/// function named after the subdirectory. Subdirectories without a prompt
/// file are skipped. `config.json` is optional but must parse when present.
#[tracing::instrument(level = "debug", skip(parent_directory))]
pub fn plugin_from_directory(parent_directory: &Path, plugin_name: &str) -> PluginResult<Plugin> {
    let plugin_directory = parent_directory.join(plugin_name);
    if !plugin_directory.is_dir() {
        return Err(PluginError::PluginDirectoryNotFound(
            plugin_directory.display().to_string(),
        ));
    }

    let pattern = plugin_directory.join("*").to_string_lossy().into_owned();
    let entries = glob(&pattern).map_err(|e| PluginError::PluginLoad {
        path: plugin_directory.display().to_string(),
        message: e.to_string(),
    })?;

    let mut plugin = Plugin::new(plugin_name);
    for entry in entries {
        let function_directory = match entry {
            Ok(path) if path.is_dir() => path,
            Ok(_) => continue,
            Err(e) => {
                return Err(PluginError::PluginLoad {
                    path: plugin_directory.display().to_string(),
                    message: e.to_string(),
                })
            }
        };
        let function_name = match function_directory.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };

        let prompt_path = function_directory.join(PROMPT_FILE);
        if !prompt_path.exists() {
            debug!(
                "no {} in {}, skipping",
                PROMPT_FILE,
                function_directory.display()
            );
            continue;
        }
        let prompt = fs::read_to_string(&prompt_path).map_err(|e| PluginError::PluginLoad {
            path: prompt_path.display().to_string(),
            message: e.to_string(),
        })?;

        let config_path = function_directory.join(CONFIG_FILE);
        let config: PromptConfig = if config_path.exists() {
            let raw = fs::read_to_string(&config_path).map_err(|e| PluginError::PluginLoad {
                path: config_path.display().to_string(),
                message: e.to_string(),
            })?;
            serde_json::from_str(&raw).map_err(|e| PluginError::PluginLoad {
                path: config_path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            PromptConfig::default()
        };

        debug!("loaded function: {}.{}", plugin_name, function_name);
        plugin.add_function(Arc::new(PromptFunction::from_config(
            plugin_name,
            function_name,
            prompt,
            &config,
        )))?;
    }

    Ok(plugin)
}
