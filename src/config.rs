// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::coerce::DirectiveOptions;
use crate::json::Orient;

/// Settings file layout, e.g.
///
/// ```yaml
/// orient: table
/// na_null: true
/// dates:
///   date_format: epoch
///   epoch_unit: s
///   date_columns: [created_at, shipped]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub orient: Option<Orient>,
    pub keep_headers: Option<bool>,
    pub na_null: Option<bool>,
    pub dates: DirectiveOptions,
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML config")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("in config {:?}", path))
    }

    /// Values set in `over` win, field by field.
    pub fn overlay(self, over: Config) -> Config {
        Config {
            orient: over.orient.or(self.orient),
            keep_headers: over.keep_headers.or(self.keep_headers),
            na_null: over.na_null.or(self.na_null),
            dates: self.dates.overlay(over.dates),
        }
    }
}
