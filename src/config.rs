//! Adapter configuration.
//!
//! Options can be built in code, loaded from JSON (missing fields take their
//! defaults), or set one by one from `name=value` strings as typed on a
//! command line.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows loaded per page
pub const PAGE_SIZE: usize = 50;

/// Collections longer than this start with a single page loaded
pub const LARGE_THRESHOLD: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Label column 0 "Name" instead of Index/Key/Attribute
    pub show_names: bool,
    /// Show min/max for array values
    pub show_minmax: bool,
    /// Values come from a remote provider with precomputed metadata
    pub remote: bool,
    pub page_size: usize,
    pub large_threshold: usize,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        AdapterOptions {
            show_names: false,
            show_minmax: false,
            remote: false,
            page_size: PAGE_SIZE,
            large_threshold: LARGE_THRESHOLD,
        }
    }
}

impl AdapterOptions {
    pub fn names(mut self, show_names: bool) -> Self {
        self.show_names = show_names;
        self
    }

    pub fn minmax(mut self, show_minmax: bool) -> Self {
        self.show_minmax = show_minmax;
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn paging(mut self, page_size: usize, large_threshold: usize) -> Self {
        self.page_size = page_size;
        self.large_threshold = large_threshold;
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let options: AdapterOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config {
                message: "page_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Sets one option from its textual name and value
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name.to_lowercase().as_str() {
            "show_names" | "names" => self.show_names = parse_flag(name, value)?,
            "show_minmax" | "minmax" => self.show_minmax = parse_flag(name, value)?,
            "remote" => self.remote = parse_flag(name, value)?,
            "page_size" => self.page_size = parse_count(name, value)?,
            "large_threshold" => self.large_threshold = parse_count(name, value)?,
            _ => {
                return Err(Error::Config {
                    message: format!(
                        "Unknown option: '{}'. Use 'show_names', 'show_minmax', 'remote', 'page_size' or 'large_threshold'",
                        name
                    ),
                })
            }
        }
        self.validate()
    }

    /// Parses `name=value`
    pub fn set_pair(&mut self, pair: &str) -> Result<()> {
        let (name, value) = pair.split_once('=').ok_or_else(|| Error::Config {
            message: format!("expected name=value, got '{}'", pair),
        })?;
        self.set(name.trim(), value.trim())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::Config {
            message: format!("'{}' expects a boolean, got '{}'", name, value),
        }),
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| Error::Config {
        message: format!("'{}' expects a non-negative integer, got '{}'", name, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AdapterOptions::default();
        assert_eq!(options.page_size, 50);
        assert_eq!(options.large_threshold, 100);
        assert!(!options.remote);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = AdapterOptions::from_json(r#"{"show_minmax": true}"#).unwrap();
        assert!(options.show_minmax);
        assert_eq!(options.page_size, PAGE_SIZE);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(AdapterOptions::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            AdapterOptions::from_json(r#"{"page_size": 0}"#),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_set_from_text() {
        let mut options = AdapterOptions::default();
        options.set_pair("names=yes").unwrap();
        options.set("PAGE_SIZE", "20").unwrap();
        assert!(options.show_names);
        assert_eq!(options.page_size, 20);

        assert!(options.set("colour", "red").is_err());
        assert!(options.set("remote", "maybe").is_err());
        assert!(options.set_pair("remote").is_err());
    }
}
