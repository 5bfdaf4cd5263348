//! Named hooks a site config may refer to
//!
//! Site configs name their split predicates, rewrites, metadata extractors
//! and context extractors by string. The names resolve here, once, while the
//! config is loaded; an unknown name is a [`ConfigError::UnknownFunction`].

use super::error::ConfigError;
use crate::dom::{NodeId, Tree};
use regex::Regex;
use serde_json::{Map, Value};

/// Class marking generated titles, also accepted as a split tag by default
pub const SPLIT_CLASS: &str = "extractor-split";

/// Heading tags treated as titles
pub const TITLE_TAGS: &[&str] = &["h1", "h2", "h3", "h4"];

/// Predicate-based split-tag matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPredicate {
    /// A short `<strong>` that is the last node of its block and not inside a
    /// heading, table or list
    StrongTagTitle,

    /// An `h3` or any element carrying the split class
    H3OrSplitClass,
}

impl SplitPredicate {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "strong_tag_title" => Ok(Self::StrongTagTitle),
            "h3_or_split_class" | "is_h3_or_split_class" => Ok(Self::H3OrSplitClass),
            _ => Err(unknown("split predicate", name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StrongTagTitle => "strong_tag_title",
            Self::H3OrSplitClass => "h3_or_split_class",
        }
    }

    pub fn matches(&self, tree: &Tree, id: NodeId) -> bool {
        match self {
            Self::StrongTagTitle => is_strong_title(tree, id),
            Self::H3OrSplitClass => {
                tree.is_tag(id, &["h3"])
                    || tree.element(id).is_some_and(|e| e.has_class(SPLIT_CLASS))
            }
        }
    }
}

fn is_strong_title(tree: &Tree, id: NodeId) -> bool {
    if !tree.is_tag(id, &["strong"]) {
        return false;
    }
    // Only a strong holding a single text node counts
    let children = tree.children(id);
    let [only] = children.as_slice() else {
        return false;
    };
    let Some(text) = tree.text(*only) else {
        return false;
    };
    let len = text.chars().count();
    if len == 0 || len > 80 {
        return false;
    }
    let nested = tree.ancestors(id).any(|ancestor| {
        tree.name(ancestor)
            .is_some_and(|name| TITLE_TAGS.contains(&name) || name == "table" || name == "ul")
    });
    !nested && tree.next_sibling(id).is_none()
}

/// Subtree rewrites applied by the preprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Tables to nested bulleted lists
    ConvertTable,
}

impl Rewrite {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "convert_table" => Ok(Self::ConvertTable),
            _ => Err(unknown("rewrite", name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConvertTable => "convert_table",
        }
    }
}

/// Title patterns recognizing faculties, programs and specializations
#[derive(Debug, Clone)]
pub struct TitlePatterns {
    faculty: Regex,
    program: Regex,
    specialization: Regex,
    requirement_list: Regex,
}

impl TitlePatterns {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            faculty: compile(r"^((The Faculty of|The School of).+|.+(Colleges?|School of \w+))$")?,
            program: compile(
                r"^((\w+\s)?(Bachelor of|Master of|Doctor of|Diploma in|Certificate in|(Dual Degree )?Program in|B\.[\w.]+ in).+|.+(Program|Programs))$",
            )?,
            specialization: compile(
                r"^((Combined Major|Major|Minor|Combined Honours|Honours).+|.+(Major|Minor))$",
            )?,
            requirement_list: compile(r"(?m)^\s*- \d+ credits of ")?,
        })
    }
}

/// Hooks producing extension fields for every extract of a site
#[derive(Debug, Clone, Default)]
pub enum MetadataExtractor {
    #[default]
    None,

    /// `faculty`, `program` and a `specialization` list matched from titles
    AcademicPrograms(TitlePatterns),

    /// Like `AcademicPrograms` with a single `specialization`, plus a
    /// `context` sentence for requirement lists
    DegreeRequirements(TitlePatterns),
}

impl MetadataExtractor {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "none" => Ok(Self::None),
            "academic_programs" | "default_extract_metadata" => {
                Ok(Self::AcademicPrograms(TitlePatterns::new()?))
            }
            "degree_requirements" | "calendar_extract_metadata" => {
                Ok(Self::DegreeRequirements(TitlePatterns::new()?))
            }
            _ => Err(unknown("metadata extractor", name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AcademicPrograms(_) => "academic_programs",
            Self::DegreeRequirements(_) => "degree_requirements",
        }
    }

    /// Extension fields for one extract
    pub fn extract(
        &self,
        _url: &str,
        titles: &[String],
        parent_titles: &[String],
        text: &str,
    ) -> Map<String, Value> {
        let mut metadata = Map::new();
        let (patterns, many_specializations) = match self {
            Self::None => return metadata,
            Self::AcademicPrograms(patterns) => (patterns, true),
            Self::DegreeRequirements(patterns) => (patterns, false),
        };

        let mut specializations = Vec::new();
        for title in parent_titles.iter().chain(titles) {
            if !metadata.contains_key("faculty") && patterns.faculty.is_match(title) {
                metadata.insert("faculty".into(), Value::String(title.clone()));
            }
            if !metadata.contains_key("program") && patterns.program.is_match(title) {
                metadata.insert("program".into(), Value::String(title.clone()));
            }
            if patterns.specialization.is_match(title) {
                specializations.push(title.clone());
            }
        }

        if many_specializations {
            if !specializations.is_empty() {
                metadata.insert(
                    "specialization".into(),
                    Value::Array(specializations.into_iter().map(Value::String).collect()),
                );
            }
            return metadata;
        }

        let specialization = specializations.into_iter().next();
        if patterns.requirement_list.is_match(text) {
            let context = match &specialization {
                Some(name) => format!("This is a list of degree requirements for {name}.\n"),
                None => "This is a list of degree requirements.\n".to_string(),
            };
            metadata.insert("context".into(), Value::String(context));
        }
        if let Some(name) = specialization {
            metadata.insert("specialization".into(), Value::String(name));
        }
        metadata
    }
}

/// Hooks picking text of a parent extract to pass down as child context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextExtractor {
    #[default]
    None,

    /// Short texts announcing what follows ("below", "as follows")
    KeywordContext,
}

impl ContextExtractor {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "none" => Ok(Self::None),
            "keyword_context" | "parent_context_extractor" => Ok(Self::KeywordContext),
            _ => Err(unknown("context extractor", name)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::KeywordContext => "keyword_context",
        }
    }

    pub fn extract(
        &self,
        _url: &str,
        _titles: &[String],
        _parent_titles: &[String],
        text: &str,
    ) -> Option<String> {
        match self {
            Self::None => None,
            Self::KeywordContext => {
                let short = text.chars().count() < 400;
                (short && ["below", "as follows"].iter().any(|k| text.contains(k)))
                    .then(|| text.to_string())
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

fn unknown(kind: &'static str, name: &str) -> ConfigError {
    ConfigError::UnknownFunction {
        kind,
        name: name.to_string(),
    }
}
