//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::Workspace;
use crate::import::dates::DateOrder;

/// Cockpit configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Author recorded on projects created by an import
    pub author: Option<String>,

    /// How slash-separated dates like 03/04/2026 are read
    pub date_order: Option<DateOrder>,

    /// Cell delimiter for pasted/uploaded text (default: tab)
    pub delimiter: Option<String>,

    /// Output format used when `--format` is left at auto
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/cockpit/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_layer(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.cockpit/config.yaml)
        if let Ok(workspace) = Workspace::discover() {
            if let Some(local) = Self::read_layer(&workspace.config_path()) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("COCKPIT_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(order) = std::env::var("COCKPIT_DATE_ORDER") {
            if let Ok(order) = order.parse() {
                config.date_order = Some(order);
            }
        }
        if let Ok(delimiter) = std::env::var("COCKPIT_DELIMITER") {
            config.delimiter = Some(delimiter);
        }

        config
    }

    fn read_layer(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config layer");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cockpit")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.date_order.is_some() {
            self.date_order = other.date_order;
        }
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Date order used when a slash date is ambiguous
    pub fn date_order(&self) -> DateOrder {
        self.date_order.unwrap_or_default()
    }

    /// Delimiter byte for the tabular reader.
    ///
    /// Accepts a literal single character or the names `tab`, `comma`,
    /// `semicolon` and `pipe`. Anything else falls back to tab.
    pub fn delimiter(&self) -> u8 {
        match self.delimiter.as_deref().map(str::trim) {
            None | Some("") => b'\t',
            Some(value) => match value.to_lowercase().as_str() {
                "tab" | "\\t" => b'\t',
                "comma" => b',',
                "semicolon" => b';',
                "pipe" => b'|',
                other if other.len() == 1 => other.as_bytes()[0],
                _ => b'\t',
            },
        }
    }
}
