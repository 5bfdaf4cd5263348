//! # Configuration Module
//!
//! Run-wide and per-site settings for the extractor. Both are assembled
//! through builders or loaded from a JSON config file (see [`file`]) and are
//! read-only once built. Every selector, regex and hook name is validated
//! when the config is built, so a bad config fails before any page is read.
//!
//! ## Key Components
//!
//! - `ExtractorConfig`: maximum extract length, link ignore pattern, dump root and redirect map
//! - `SiteDumpConfig`: how one site's pages are cleaned and split
//! - `SplitMatcher`: one level of the split hierarchy (selector or named predicate)
//! - `hooks`: the closed set of named strategies a site may refer to
//!
//! ## Defaults
//!
//! - `max_len` 1000 characters
//! - split hierarchy `h1`, `h2`, `h3`, `h4`, `.extractor-split`, `strong_tag_title`
//! - three mandatory split levels, empty split tags ignored

mod error;
pub mod file;
pub mod hooks;

pub use error::ConfigError;
pub use file::{load_config, LoadedConfig};
pub use hooks::{ContextExtractor, MetadataExtractor, Rewrite, SplitPredicate, SPLIT_CLASS, TITLE_TAGS};

use crate::dom::{NodeId, SimpleSelector, Tree};
use crate::links::canonicalize;
use regex::Regex;
use scraper::Selector;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use url::Url;

/// Default maximum extract length in characters
pub const DEFAULT_MAX_LEN: usize = 1000;

/// Default pattern of hrefs that are never resolved
pub const DEFAULT_LINK_IGNORE_REGEX: &str = "(mailto|tel|javascript):";

pub const DEFAULT_MANDATORY_SPLITS: usize = 3;

/// Run-wide configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum length of an extract's text in characters
    pub max_len: usize,

    /// Links whose href matches at its start are dropped
    pub link_ignore_regex: Regex,

    /// Directory holding one sub-directory per crawled host
    pub dump_root: PathBuf,

    /// Optional JSON map of old url to new url
    pub redirects_path: Option<PathBuf>,
}

impl ExtractorConfig {
    /// Create a new builder
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::new()
    }
}

/// Builder for ExtractorConfig
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    max_len: usize,
    link_ignore_regex: String,
    dump_root: PathBuf,
    redirects_path: Option<PathBuf>,
}

impl Default for ExtractorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            link_ignore_regex: DEFAULT_LINK_IGNORE_REGEX.to_string(),
            dump_root: PathBuf::from("site_dumps"),
            redirects_path: None,
        }
    }

    /// Set the maximum extract length in characters
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Set the pattern of hrefs to ignore
    pub fn link_ignore_regex(mut self, pattern: impl Into<String>) -> Self {
        self.link_ignore_regex = pattern.into();
        self
    }

    pub fn dump_root(mut self, dump_root: impl Into<PathBuf>) -> Self {
        self.dump_root = dump_root.into();
        self
    }

    pub fn redirects_path(mut self, path: Option<PathBuf>) -> Self {
        self.redirects_path = path;
        self
    }

    /// Build the configuration, compiling the ignore pattern
    pub fn build(self) -> Result<ExtractorConfig, ConfigError> {
        if self.max_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_len",
                reason: "must be greater than zero".to_string(),
            });
        }
        let link_ignore_regex = Regex::new(&anchored(&self.link_ignore_regex)).map_err(|source| {
            ConfigError::InvalidRegex {
                pattern: self.link_ignore_regex.clone(),
                source,
            }
        })?;
        Ok(ExtractorConfig {
            max_len: self.max_len,
            link_ignore_regex,
            dump_root: self.dump_root,
            redirects_path: self.redirects_path,
        })
    }
}

fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})")
}

/// One level of the split hierarchy
#[derive(Debug, Clone)]
pub enum SplitMatcher {
    Selector(SimpleSelector),
    Predicate(SplitPredicate),
}

impl SplitMatcher {
    pub fn matches(&self, tree: &Tree, id: NodeId) -> bool {
        match self {
            Self::Selector(selector) => selector.matches(tree, id),
            Self::Predicate(predicate) => predicate.matches(tree, id),
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            Self::Selector(selector) => selector.as_str(),
            Self::Predicate(predicate) => predicate.name(),
        }
    }
}

/// A rewrite applied to every node matching `selector`
#[derive(Debug, Clone)]
pub struct Replacement {
    pub selector: SimpleSelector,
    pub rewrite: Rewrite,
}

/// Per-site ruleset
#[derive(Debug, Clone)]
pub struct SiteDumpConfig {
    /// Name used in logs and on the command line
    pub name: String,

    /// Canonical base url, without a trailing slash
    pub base_url: String,

    /// Directory holding the site's crawled pages
    pub dump_path: PathBuf,

    /// Root of the content kept from each page
    pub main_content: Selector,

    /// First match gives the page title
    pub title: Option<Selector>,

    /// Subtrees dropped before splitting
    pub remove: Vec<Selector>,

    /// Rewrites applied in order, each until no match remains
    pub replacements: Vec<Replacement>,

    /// Split hierarchy, outermost level first
    pub split_tags: Vec<SplitMatcher>,

    /// Skip split nodes without text
    pub ignore_empty_split_tags: bool,

    /// Levels applied regardless of extract length
    pub mandatory_splits: usize,

    /// Levels titled with a running index instead of the node text
    pub no_title_splits: Vec<usize>,

    pub metadata_extractor: MetadataExtractor,

    /// Constant fields merged into every row of the site
    pub metadata_fields: Map<String, Value>,

    pub parent_context_extractor: ContextExtractor,
}

impl SiteDumpConfig {
    /// Create a new builder
    pub fn builder(name: impl Into<String>, base_url: impl Into<String>) -> SiteDumpConfigBuilder {
        SiteDumpConfigBuilder::new(name, base_url)
    }
}

/// Builder for SiteDumpConfig
///
/// Selectors and hook names are kept as strings until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct SiteDumpConfigBuilder {
    name: String,
    base_url: String,
    dump_path: Option<PathBuf>,
    main_content: String,
    title: Option<String>,
    remove: Vec<String>,
    replacements: Vec<(String, String)>,
    split_tags: Vec<SplitTagSpec>,
    ignore_empty_split_tags: bool,
    mandatory_splits: usize,
    no_title_splits: Vec<usize>,
    metadata_extractor: String,
    metadata_fields: Map<String, Value>,
    parent_context_extractor: String,
}

/// A split level before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitTagSpec {
    Selector(String),
    Function(String),
}

impl SiteDumpConfigBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut split_tags: Vec<SplitTagSpec> = TITLE_TAGS
            .iter()
            .map(|tag| SplitTagSpec::Selector(tag.to_string()))
            .collect();
        split_tags.push(SplitTagSpec::Selector(format!(".{SPLIT_CLASS}")));
        split_tags.push(SplitTagSpec::Function("strong_tag_title".to_string()));

        Self {
            name: name.into(),
            base_url: base_url.into(),
            dump_path: None,
            main_content: "body".to_string(),
            title: Some("h1".to_string()),
            remove: Vec::new(),
            replacements: Vec::new(),
            split_tags,
            ignore_empty_split_tags: true,
            mandatory_splits: DEFAULT_MANDATORY_SPLITS,
            no_title_splits: Vec::new(),
            metadata_extractor: "none".to_string(),
            metadata_fields: Map::new(),
            parent_context_extractor: "none".to_string(),
        }
    }

    /// Set the directory holding the site's pages
    pub fn dump_path(mut self, dump_path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(dump_path.into());
        self
    }

    /// Set the CSS selector of the main content
    pub fn main_content(mut self, selector: impl Into<String>) -> Self {
        self.main_content = selector.into();
        self
    }

    /// Set the CSS selector of the page title
    pub fn title(mut self, selector: Option<String>) -> Self {
        self.title = selector;
        self
    }

    /// Set the CSS selectors of removed subtrees
    pub fn remove(mut self, selectors: Vec<String>) -> Self {
        self.remove = selectors;
        self
    }

    /// Add a (selector, rewrite name) pair
    pub fn replacement(mut self, selector: impl Into<String>, function: impl Into<String>) -> Self {
        self.replacements.push((selector.into(), function.into()));
        self
    }

    pub fn split_tags(mut self, split_tags: Vec<SplitTagSpec>) -> Self {
        self.split_tags = split_tags;
        self
    }

    pub fn ignore_empty_split_tags(mut self, ignore: bool) -> Self {
        self.ignore_empty_split_tags = ignore;
        self
    }

    pub fn mandatory_splits(mut self, count: usize) -> Self {
        self.mandatory_splits = count;
        self
    }

    pub fn no_title_splits(mut self, levels: Vec<usize>) -> Self {
        self.no_title_splits = levels;
        self
    }

    pub fn metadata_extractor(mut self, name: impl Into<String>) -> Self {
        self.metadata_extractor = name.into();
        self
    }

    pub fn metadata_fields(mut self, fields: Map<String, Value>) -> Self {
        self.metadata_fields = fields;
        self
    }

    pub fn parent_context_extractor(mut self, name: impl Into<String>) -> Self {
        self.parent_context_extractor = name.into();
        self
    }

    /// Validate everything and build the configuration
    ///
    /// `dump_root` is used to derive the dump path when none was set.
    pub fn build(self, dump_root: &Path) -> Result<SiteDumpConfig, ConfigError> {
        let site = self.name.clone();
        let parsed = Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            site: site.clone(),
            source,
        })?;
        let base_url = canonicalize(parsed.as_str());
        let dump_path = self
            .dump_path
            .unwrap_or_else(|| default_dump_path(dump_root, &parsed));

        let css = |selector: &str| {
            Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                site: site.clone(),
                selector: selector.to_string(),
                reason: e.to_string(),
            })
        };
        let simple = |selector: &str| {
            SimpleSelector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                site: site.clone(),
                selector: selector.to_string(),
                reason: e.reason,
            })
        };

        let main_content = css(&self.main_content)?;
        let title = self.title.as_deref().map(css).transpose()?;
        let remove = self
            .remove
            .iter()
            .map(|selector| css(selector))
            .collect::<Result<Vec<_>, _>>()?;

        let replacements = self
            .replacements
            .iter()
            .map(|(selector, function)| {
                Ok(Replacement {
                    selector: simple(selector)?,
                    rewrite: Rewrite::from_name(function)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let split_tags = self
            .split_tags
            .iter()
            .map(|spec| match spec {
                SplitTagSpec::Selector(selector) => simple(selector).map(SplitMatcher::Selector),
                SplitTagSpec::Function(name) => {
                    SplitPredicate::from_name(name).map(SplitMatcher::Predicate)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SiteDumpConfig {
            name: self.name,
            base_url,
            dump_path,
            main_content,
            title,
            remove,
            replacements,
            split_tags,
            ignore_empty_split_tags: self.ignore_empty_split_tags,
            mandatory_splits: self.mandatory_splits,
            no_title_splits: self.no_title_splits,
            metadata_extractor: MetadataExtractor::from_name(&self.metadata_extractor)?,
            metadata_fields: self.metadata_fields,
            parent_context_extractor: ContextExtractor::from_name(&self.parent_context_extractor)?,
        })
    }
}

/// `dump_root/<host>/<path segments>`, the layout the crawler writes
fn default_dump_path(dump_root: &Path, url: &Url) -> PathBuf {
    let mut path = dump_root.join(url.host_str().unwrap_or_default());
    for segment in url.path_segments().into_iter().flatten() {
        if !segment.is_empty() {
            path.push(segment);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults() {
        let site = SiteDumpConfig::builder("calendar", "http://calendar.example.edu/")
            .main_content("#primary-content")
            .build(Path::new("dumps"))
            .unwrap();
        assert_eq!(site.base_url, "https://calendar.example.edu");
        assert_eq!(site.dump_path, PathBuf::from("dumps/calendar.example.edu"));
        assert_eq!(site.split_tags.len(), 6);
        assert_eq!(site.split_tags[4].describe(), ".extractor-split");
        assert_eq!(site.split_tags[5].describe(), "strong_tag_title");
        assert_eq!(site.mandatory_splits, 3);
        assert!(site.ignore_empty_split_tags);
    }

    #[test]
    fn test_dump_path_follows_url_path() {
        let site = SiteDumpConfig::builder("students", "https://science.example.edu/students/")
            .build(Path::new("dumps"))
            .unwrap();
        assert_eq!(
            site.dump_path,
            PathBuf::from("dumps/science.example.edu/students")
        );
    }

    #[test]
    fn test_invalid_selectors_fail_at_build() {
        let err = SiteDumpConfig::builder("x", "https://x.org")
            .main_content("##")
            .build(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));

        let err = SiteDumpConfig::builder("x", "https://x.org")
            .split_tags(vec![SplitTagSpec::Selector("div p".to_string())])
            .build(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));

        let err = SiteDumpConfig::builder("x", "https://x.org")
            .replacement("table", "convert_list")
            .build(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFunction { .. }));
    }

    #[test]
    fn test_extractor_config() {
        let config = ExtractorConfig::builder().max_len(500).build().unwrap();
        assert_eq!(config.max_len, 500);
        assert!(config.link_ignore_regex.is_match("mailto:someone@example.com"));
        assert!(!config.link_ignore_regex.is_match("https://example.com/?mailto:x"));

        assert!(ExtractorConfig::builder().max_len(0).build().is_err());
        assert!(ExtractorConfig::builder().link_ignore_regex("(").build().is_err());
    }
}
