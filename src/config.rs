//! Layered configuration for the index tooling.
//!
//! Sources, later ones winning:
//! - built-in defaults
//! - `.vicinity/settings.toml`, found by walking ancestor directories
//! - environment variables prefixed `VICINITY_`
//!
//! Environment variables use double underscores to separate nested levels:
//! - `VICINITY_INDEX__DIMENSIONS=768` sets `index.dimensions`
//! - `VICINITY_SEARCH__LIMIT=25` sets `search.limit`
//! - `VICINITY_DEBUG=true` sets `debug`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tree::SearchOptions;

/// Directory holding the settings file and, by default, the index file.
pub const CONFIG_DIR: &str = ".vicinity";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the index file
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Index creation settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Dimension count for newly created indexes. Must match the embedding
    /// provider; existing files carry their own count in the header.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Default maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Default distance ceiling; absent means unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,
}

fn default_version() -> u32 {
    1
}

fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index.vec")
}

fn default_false() -> bool {
    false
}

fn default_dimensions() -> usize {
    384
}

fn default_limit() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            debug: false,
            index: IndexConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            max_distance: None,
        }
    }
}

impl SearchConfig {
    /// Translates the configured defaults into search options.
    #[must_use]
    pub fn to_options(&self) -> SearchOptions {
        SearchOptions::default()
            .with_limit(self.limit)
            .with_max_distance(self.max_distance.unwrap_or(f32::INFINITY))
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores
            // stay part of the field name.
            .merge(Env::prefixed("VICINITY_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("VICINITY_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace settings file by walking from the current directory
    /// up to the filesystem root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = if let Some(path) = Self::find_workspace_config() {
            path
        } else {
            PathBuf::from(CONFIG_DIR).join("settings.toml")
        };

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'vicinity init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# Vicinity Configuration File

# Version of the configuration schema
version = 1

# Path to the index file (relative to the workspace root)
index_path = ".vicinity/index.vec"

# Global debug mode
debug = false

[index]
# Dimension count for newly created indexes.
# Must match the embedding provider feeding the index.
dimensions = 384

[search]
# Default maximum number of results
limit = 10

# Default distance ceiling; remove to search unbounded
# max_distance = 1.5
"#;

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        println!("\n=== TEST: Default Settings ===");

        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from(".vicinity/index.vec"));
        assert!(!settings.debug);
        assert_eq!(settings.index.dimensions, 384);
        assert_eq!(settings.search.limit, 10);
        assert_eq!(settings.search.max_distance, None);

        println!(
            "  ✓ Defaults: dimensions={}, limit={}",
            settings.index.dimensions, settings.search.limit
        );
        println!("=== TEST PASSED ===");
    }

    #[test]
    fn test_partial_config_from_toml() {
        println!("\n=== TEST: Partial configuration from TOML ===");

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let config_content = r#"
[index]
dimensions = 768

[search]
max_distance = 0.75
"#;
        fs::write(&config_path, config_content).unwrap();
        println!("  Created test config: {}", config_path.display());

        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .extract()
            .unwrap();

        assert_eq!(settings.index.dimensions, 768);
        assert_eq!(settings.search.max_distance, Some(0.75));
        assert_eq!(settings.search.limit, 10); // default value

        println!(
            "  ✓ Partial config works: dimensions={}, limit={} (default)",
            settings.index.dimensions, settings.search.limit
        );
        println!("=== TEST PASSED ===");
    }

    #[test]
    fn test_search_config_to_options() {
        let config = SearchConfig {
            limit: 5,
            max_distance: Some(2.0),
        };
        let options = config.to_options();
        assert_eq!(options.limit, 5);
        assert_eq!(options.max_distance, 2.0);

        let unbounded = SearchConfig::default().to_options();
        assert_eq!(unbounded.max_distance, f32::INFINITY);
    }
}
