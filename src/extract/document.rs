//! Rows of the extract corpus

use crate::index::DocId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A hyperlink found in an extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractLink {
    /// Visible anchor text, not unique within an extract
    pub text: String,

    /// Raw target as written in the page
    pub href: String,

    /// Absolute canonical target, set by the resolver
    pub url: Option<String>,

    /// Target document, when the url is a known extract
    pub doc_id: Option<DocId>,
}

impl ExtractLink {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
            url: None,
            doc_id: None,
        }
    }
}

/// One retrievable chunk of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtract {
    pub doc_id: DocId,

    /// Canonical url; the fragment names the anchor of sub-page extracts
    pub url: String,

    /// Structural parent, none for a site root
    pub parent: Option<DocId>,

    /// Split titles from the top of the page down to this extract
    pub titles: Vec<String>,

    /// Titles of the ancestor pages
    pub parent_titles: Vec<String>,

    pub text: String,

    pub links: Vec<ExtractLink>,

    pub source_path: Option<PathBuf>,

    pub last_modified: Option<DateTime<Utc>>,

    /// Text handed down by the parent extract's context hook
    pub context: Option<String>,

    /// 0 for the first mechanical split of a logical extract
    pub split_idx: usize,

    /// Fields from the site's metadata hook and constant metadata
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl DocumentExtract {
    /// Empty row standing for a site root
    pub fn site_root(doc_id: DocId, url: impl Into<String>) -> Self {
        Self {
            doc_id,
            url: url.into(),
            parent: None,
            titles: Vec::new(),
            parent_titles: Vec::new(),
            text: String::new(),
            links: Vec::new(),
            source_path: None,
            last_modified: None,
            context: None,
            split_idx: 0,
            metadata: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_is_flattened() {
        let mut row = DocumentExtract::site_root(0, "https://x.org");
        row.metadata.insert("faculty".into(), Value::String("Science".into()));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["faculty"], "Science");
        assert_eq!(json["doc_id"], 0);
        assert!(json["parent"].is_null());

        let back: DocumentExtract = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
