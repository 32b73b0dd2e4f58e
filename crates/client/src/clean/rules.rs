//! Cleaning heuristics as data.
//!
//! The built-in table targets third-party reader promos and prescribed-reading
//! boilerplate. A TOML file can replace any list; fields it omits keep their
//! defaults.

use std::path::Path;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or compiling cleaning rules.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("failed to load cleaning rules: {0}")]
    Load(String),

    #[error("invalid selector '{selector}' in {field}")]
    Selector { field: &'static str, selector: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<CleanError> for quire_core::Error {
    fn from(err: CleanError) -> Self {
        quire_core::Error::CleanFailed(err.to_string())
    }
}

/// Phrases, selectors and switches that drive the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRules {
    /// Text whose presence marks an element (and its container) as unwanted.
    /// Matched case-insensitively against text and attribute values.
    pub phrases: Vec<String>,

    /// Boilerplate boxes removed whole when they hold an unwanted phrase.
    pub containers: Vec<String>,

    /// Navigation and page chrome removed unconditionally.
    pub chrome: Vec<String>,

    /// Containers whose images are decoration.
    pub image_containers: Vec<String>,

    /// Remove repeated identical `h2`/`h3` headings, keeping the first.
    pub dedupe_headings: bool,
}

impl Default for CleanRules {
    fn default() -> Self {
        Self {
            phrases: [
                "Sign in to Kortext",
                "Open book in new window",
                "You will only be able to access the book on Kortext",
                "kortext.com",
                "launchReader",
                "emailKortextSupport",
                "Prescribed Reading",
            ]
            .map(String::from)
            .to_vec(),
            containers: [".no-overflow", ".box", ".generalbox", ".prescribed-reading"]
                .map(String::from)
                .to_vec(),
            chrome: [
                "nav",
                ".navigation",
                ".breadcrumb",
                "#page-header",
                ".modified",
                ".activity-navigation",
            ]
            .map(String::from)
            .to_vec(),
            image_containers: [".prescribed-reading", ".kortext", ".activityiconcontainer"]
                .map(String::from)
                .to_vec(),
            dedupe_headings: true,
        }
    }
}

impl CleanRules {
    /// Merge a TOML rules file over the built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CleanError> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| CleanError::Load(e.to_string()))
    }

    /// Built-in rules, or the file's rules when a path is configured.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self, CleanError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Rules with every selector parsed, ready for repeated use.
#[derive(Debug)]
pub(crate) struct CompiledRules {
    pub phrases: Vec<String>,
    pub containers: Vec<Selector>,
    pub chrome: Vec<Selector>,
    pub image_containers: Vec<Selector>,
    pub dedupe_headings: bool,
    pub strip: Vec<Selector>,
    pub iframe: Selector,
    pub img: Selector,
    pub paragraph: Selector,
    pub headings: Selector,
    pub media: Selector,
    pub preformatted: Selector,
    pub img_src: Regex,
}

impl CompiledRules {
    pub fn compile(rules: &CleanRules) -> Result<Self, CleanError> {
        Ok(Self {
            phrases: rules
                .phrases
                .iter()
                .map(|p| fold_text(p))
                .filter(|p| !p.is_empty())
                .collect(),
            containers: parse_all("containers", &rules.containers)?,
            chrome: parse_all("chrome", &rules.chrome)?,
            image_containers: parse_all("image_containers", &rules.image_containers)?,
            dedupe_headings: rules.dedupe_headings,
            strip: parse_all("strip", &STRIP.map(String::from))?,
            iframe: parse_one("iframe")?,
            img: parse_one("img")?,
            paragraph: parse_one("p")?,
            headings: parse_one("h2, h3")?,
            media: parse_one("img, video, audio, iframe, object, embed, svg, picture, canvas")?,
            preformatted: parse_one("pre, textarea, listing")?,
            img_src: Regex::new(r#"(<img\b[^>]*?\ssrc=")([^"]*)(")"#)?,
        })
    }
}

/// Elements that never carry readable content.
const STRIP: [&str; 3] = ["script", "style", "link[rel~=\"stylesheet\"]"];

/// Lowercase, decode leftover `&nbsp;` entities and collapse whitespace, so
/// text compares the same before and after a cleaning pass.
pub(crate) fn fold_text(text: &str) -> String {
    super::normalize_entities(text)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_one(selector: &str) -> Result<Selector, CleanError> {
    Selector::parse(selector).map_err(|_| CleanError::Selector { field: "builtin", selector: selector.to_string() })
}

fn parse_all(field: &'static str, selectors: &[String]) -> Result<Vec<Selector>, CleanError> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).map_err(|_| CleanError::Selector { field, selector: s.clone() }))
        .collect()
}
