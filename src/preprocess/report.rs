//! Tables the converter could not handle well

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Table titles keyed by page url
pub type TablesByUrl = BTreeMap<String, Vec<String>>;

/// Side report of the table rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// Tables converted with the generic row handler
    pub unhandled: TablesByUrl,

    /// Tables whose conversion failed and were left as they were
    pub errors: TablesByUrl,
}

impl TableReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unhandled(&mut self, url: &str, title: &str) {
        record(&mut self.unhandled, url, title);
    }

    pub fn record_error(&mut self, url: &str, title: &str) {
        record(&mut self.errors, url, title);
    }

    pub fn is_empty(&self) -> bool {
        self.unhandled.is_empty() && self.errors.is_empty()
    }
}

fn record(tables: &mut TablesByUrl, url: &str, title: &str) {
    tables
        .entry(url.to_string())
        .or_default()
        .push(title.to_string());
}
