//! JSON config file loading
//!
//! ```json
//! {
//!   "general": {"max_len": 1000, "dump_root": "site_dumps"},
//!   "sites": [{"name": "calendar", "base_url": "https://calendar.example.edu/",
//!              "main_content": "#primary-content",
//!              "split_tags": ["h1", "h2", {"function": "strong_tag_title"}]}]
//! }
//! ```

use super::{ConfigError, ExtractorConfig, SiteDumpConfig, SplitTagSpec};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Placeholder site name that is never processed
const EXAMPLE_SITE: &str = "example_config";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGeneral {
    max_len: Option<usize>,
    link_ignore_regex: Option<String>,
    dump_root: Option<PathBuf>,
    redirects_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: RawGeneral,
    #[serde(default)]
    sites: Vec<RawSite>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSite {
    name: Option<String>,
    base_url: Option<String>,
    dump_path: Option<PathBuf>,
    main_content: Option<String>,
    title: Option<String>,
    remove: Vec<String>,
    replacements: Vec<RawReplacement>,
    split_tags: Option<Vec<RawSplitTag>>,
    ignore_empty_split_tags: Option<bool>,
    mandatory_splits: Option<usize>,
    no_title_splits: Vec<usize>,
    metadata_extractor: Option<String>,
    metadata_fields: Map<String, Value>,
    parent_context_extractor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReplacement {
    selector: String,
    function: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSplitTag {
    Selector(String),
    Function { function: String },
}

/// Everything a run needs, validated
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub extractor: ExtractorConfig,
    pub sites: Vec<SiteDumpConfig>,
}

impl LoadedConfig {
    /// Site with the given name
    pub fn site(&self, name: &str) -> Option<&SiteDumpConfig> {
        self.sites.iter().find(|site| site.name == name)
    }
}

/// Read and validate a config file
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text, path)?;
    info!(
        path = %path.display(),
        sites = config.sites.len(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Validate config text; `origin` only appears in error messages
pub fn parse_config(text: &str, origin: &Path) -> Result<LoadedConfig, ConfigError> {
    let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Json {
        path: origin.to_path_buf(),
        source,
    })?;

    let mut builder = ExtractorConfig::builder().redirects_path(raw.general.redirects_path);
    if let Some(max_len) = raw.general.max_len {
        builder = builder.max_len(max_len);
    }
    if let Some(pattern) = raw.general.link_ignore_regex {
        builder = builder.link_ignore_regex(pattern);
    }
    if let Some(dump_root) = raw.general.dump_root {
        builder = builder.dump_root(dump_root);
    }
    let extractor = builder.build()?;

    let mut names = HashSet::new();
    let mut sites = Vec::with_capacity(raw.sites.len());
    for (position, site) in raw.sites.into_iter().enumerate() {
        let label = site
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", position + 1));
        if site.name.as_deref() == Some(EXAMPLE_SITE) {
            debug!("Skipping example site config");
            continue;
        }
        let site = build_site(site, &label, &extractor.dump_root)?;
        if !names.insert(site.name.clone()) {
            return Err(ConfigError::DuplicateSite(site.name));
        }
        sites.push(site);
    }

    Ok(LoadedConfig { extractor, sites })
}

fn build_site(raw: RawSite, label: &str, dump_root: &Path) -> Result<SiteDumpConfig, ConfigError> {
    let missing = |field| ConfigError::MissingField {
        site: label.to_string(),
        field,
    };
    let name = raw.name.ok_or_else(|| missing("name"))?;
    let base_url = raw.base_url.ok_or_else(|| missing("base_url"))?;
    let main_content = raw.main_content.ok_or_else(|| missing("main_content"))?;

    let mut builder = SiteDumpConfig::builder(name, base_url)
        .main_content(main_content)
        .remove(raw.remove)
        .no_title_splits(raw.no_title_splits)
        .metadata_fields(raw.metadata_fields);

    if let Some(dump_path) = raw.dump_path {
        builder = builder.dump_path(dump_path);
    }
    if raw.title.is_some() {
        builder = builder.title(raw.title);
    }
    for replacement in raw.replacements {
        builder = builder.replacement(replacement.selector, replacement.function);
    }
    if let Some(split_tags) = raw.split_tags {
        builder = builder.split_tags(
            split_tags
                .into_iter()
                .map(|tag| match tag {
                    RawSplitTag::Selector(selector) => SplitTagSpec::Selector(selector),
                    RawSplitTag::Function { function } => SplitTagSpec::Function(function),
                })
                .collect(),
        );
    }
    if let Some(ignore) = raw.ignore_empty_split_tags {
        builder = builder.ignore_empty_split_tags(ignore);
    }
    if let Some(count) = raw.mandatory_splits {
        builder = builder.mandatory_splits(count);
    }
    if let Some(name) = raw.metadata_extractor {
        builder = builder.metadata_extractor(name);
    }
    if let Some(name) = raw.parent_context_extractor {
        builder = builder.parent_context_extractor(name);
    }

    builder.build(dump_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetadataExtractor, SplitMatcher};

    const CONFIG: &str = r##"{
        "general": {"max_len": 800, "dump_root": "dumps", "redirects_path": "dumps/redirects.json"},
        "sites": [
            {"name": "example_config", "base_url": "https://example.com", "main_content": "main"},
            {
                "name": "calendar",
                "base_url": "https://calendar.example.edu/",
                "main_content": "#primary-content",
                "remove": [".sr-only", "a[href='#top']"],
                "replacements": [{"selector": "table", "function": "convert_table"}],
                "split_tags": ["h1", "h2", ".extractor-split", {"function": "strong_tag_title"}],
                "mandatory_splits": 2,
                "no_title_splits": [3],
                "metadata_extractor": "academic_programs",
                "metadata_fields": {"source": "calendar"},
                "parent_context_extractor": "keyword_context"
            }
        ]
    }"##;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(CONFIG, Path::new("config.json")).unwrap();
        assert_eq!(config.extractor.max_len, 800);
        assert_eq!(
            config.extractor.redirects_path,
            Some(PathBuf::from("dumps/redirects.json"))
        );
        assert_eq!(config.sites.len(), 1);

        let site = config.site("calendar").unwrap();
        assert_eq!(site.dump_path, PathBuf::from("dumps/calendar.example.edu"));
        assert_eq!(site.remove.len(), 2);
        assert_eq!(site.replacements.len(), 1);
        assert_eq!(site.split_tags.len(), 4);
        assert!(matches!(site.split_tags[3], SplitMatcher::Predicate(_)));
        assert_eq!(site.mandatory_splits, 2);
        assert_eq!(site.no_title_splits, vec![3]);
        assert!(matches!(
            site.metadata_extractor,
            MetadataExtractor::AcademicPrograms(_)
        ));
        assert_eq!(site.metadata_fields["source"], "calendar");
        assert!(config.site("example_config").is_none());
    }

    #[test]
    fn test_missing_required_fields() {
        let text = r#"{"sites": [{"name": "blog", "base_url": "https://blog.example.com"}]}"#;
        let err = parse_config(text, Path::new("c.json")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "main_content", .. }
        ));

        let text = r#"{"sites": [{"main_content": "main"}]}"#;
        let err = parse_config(text, Path::new("c.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_unknown_hook_name() {
        let text = r#"{"sites": [{"name": "a", "base_url": "https://a.org", "main_content": "main",
            "split_tags": [{"function": "big_bold_text"}]}]}"#;
        let err = parse_config(text, Path::new("c.json")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFunction { .. }));
    }

    #[test]
    fn test_duplicate_sites_and_bad_json() {
        let text = r#"{"sites": [
            {"name": "a", "base_url": "https://a.org", "main_content": "main"},
            {"name": "a", "base_url": "https://b.org", "main_content": "main"}]}"#;
        assert!(matches!(
            parse_config(text, Path::new("c.json")),
            Err(ConfigError::DuplicateSite(_))
        ));
        assert!(matches!(
            parse_config("{", Path::new("c.json")),
            Err(ConfigError::Json { .. })
        ));
    }
}
