//! Content cleaning: raw LMS HTML to distraction-free HTML.
//!
//! Passes run in a fixed order:
//!
//! 1. Strip `<script>`, `<style>` and stylesheet links
//! 2. Strip configured navigation and page chrome
//! 3. Strip every `<iframe>`
//! 4. Remove unwanted phrases together with their container
//! 5. Remove repeated `h2`/`h3` headings (when enabled)
//! 6. Remove spacer, icon and boilerplate images
//! 7. Remove paragraphs with neither text nor media
//! 8. Normalize double-encoded entities
//!
//! Cleaning never fails. If anything goes wrong the original HTML is
//! returned unchanged. The output is a fixed point: cleaning it again yields
//! the same string.

mod passes;
pub mod rules;

use std::panic::{AssertUnwindSafe, catch_unwind};

use scraper::Html;
use url::Url;

pub use rules::{CleanError, CleanRules};

use rules::CompiledRules;

/// Collapse double-encoded entities left over by the LMS editor.
///
/// `&amp;amp;` is folded down to a single `&amp;` first, then both the
/// double-encoded and plain `&nbsp;` become a regular space.
pub fn normalize_entities(html: &str) -> String {
    let mut out = html.to_string();
    while out.contains("&amp;amp;") {
        out = out.replace("&amp;amp;", "&amp;");
    }
    out.replace("&amp;nbsp;", " ").replace("&nbsp;", " ")
}

/// Stateless HTML cleaner over a compiled rule table.
///
/// Safe to share between tasks; every call parses its own document.
#[derive(Debug)]
pub struct Cleaner {
    rules: CompiledRules,
    origin_host: Option<String>,
}

impl Cleaner {
    /// Compile `rules` into a cleaner.
    pub fn new(rules: &CleanRules) -> Result<Self, CleanError> {
        Ok(Self { rules: CompiledRules::compile(rules)?, origin_host: None })
    }

    /// Treat absolute image URLs on `origin`'s host as origin media that
    /// needs the access token.
    pub fn with_origin(mut self, origin: &Url) -> Self {
        self.origin_host = origin.host_str().map(str::to_ascii_lowercase);
        self
    }

    /// Clean `raw`, returning the original on any internal failure.
    pub fn clean(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return raw.to_string();
        }

        match catch_unwind(AssertUnwindSafe(|| self.run_passes(raw))) {
            Ok(cleaned) => {
                tracing::debug!(before = raw.len(), after = cleaned.len(), "cleaned html");
                cleaned
            }
            Err(_) => {
                tracing::warn!(bytes = raw.len(), "cleaner failed, returning original html");
                raw.to_string()
            }
        }
    }

    /// Clean `raw`, then make origin-hosted images loadable with `token`.
    ///
    /// Relative and origin-host `<img src>` values that carry no token get
    /// `token=<token>` appended. Data URIs and third-party hosts are left
    /// alone.
    pub fn clean_with_token(&self, raw: &str, token: &str) -> String {
        let cleaned = self.clean(raw);
        if token.is_empty() {
            return cleaned;
        }

        self.rules
            .img_src
            .replace_all(&cleaned, |caps: &regex::Captures<'_>| {
                let src = &caps[2];
                if self.needs_token(src) {
                    let separator = if src.contains('?') { "&amp;" } else { "?" };
                    format!("{}{src}{separator}token={token}{}", &caps[1], &caps[3])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    fn needs_token(&self, src: &str) -> bool {
        let src = src.trim();
        if src.is_empty() || src.contains("token=") || src.starts_with("data:") {
            return false;
        }

        match Url::parse(src) {
            Ok(url) => match (&self.origin_host, url.host_str()) {
                (Some(origin), Some(host)) => origin.eq_ignore_ascii_case(host),
                _ => false,
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }

    fn run_passes(&self, raw: &str) -> String {
        let lower = raw.to_ascii_lowercase();
        let is_document = lower.contains("<html") || lower.contains("<body");

        let mut doc = if is_document { Html::parse_document(raw) } else { Html::parse_fragment(raw) };

        let rules = &self.rules;
        let removed = passes::strip_unreadable(&mut doc, rules)
            + passes::strip_chrome(&mut doc, rules)
            + passes::strip_iframes(&mut doc, rules)
            + passes::remove_phrases(&mut doc, rules)
            + passes::dedupe_headings(&mut doc, rules)
            + passes::remove_images(&mut doc, rules)
            + passes::remove_empty_paragraphs(&mut doc, rules);
        tracing::trace!(removed, "cleaner passes done");
        passes::keep_leading_newlines(&mut doc, rules);

        let serialized = if is_document { doc.html() } else { doc.root_element().inner_html() };
        normalize_entities(&serialized)
    }
}
