//! Origin LMS access.
//!
//! The orchestrator and reader depend only on the [`OriginClient`] trait;
//! [`LmsClient`] is the production implementation over the LMS REST web
//! service.
//!
//! ### Content resolution
//!
//! A locator is an activity URL such as `/mod/page/view.php?id=123`.
//! - The `id` query parameter names the course module.
//! - The module's course contents list its files; every `.html`/`.htm` file
//!   is downloaded and the bodies concatenated.
//! - When the module has no HTML files the locator itself is downloaded.

pub mod error;
pub mod lms;
pub mod types;

pub use error::LmsError;
pub use lms::{LmsClient, LmsConfig};

use std::fmt;

use async_trait::async_trait;
use quire_core::{AppConfig, CourseSnapshot, CourseSummary, Error};
use url::Url;

/// An LMS access token.
///
/// Debug output is redacted so the token never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting an empty one.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingCredential("empty LMS token".into()));
        }
        Ok(Self(token))
    }

    /// The configured token, or `MissingCredential`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let token = config
            .require_lms_token()
            .map_err(|e| Error::MissingCredential(e.to_string()))?;
        Self::new(token)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Authenticated access to the origin LMS.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Raw, uncleaned HTML of one activity.
    async fn fetch_content(&self, locator: &str, credential: &Credential) -> Result<String, Error>;

    async fn list_course_structure(&self, course_id: i64, credential: &Credential) -> Result<CourseSnapshot, Error>;

    async fn list_enrolled_courses(&self, credential: &Credential) -> Result<Vec<CourseSummary>, Error>;
}

/// Course module id carried in a locator's `id` query parameter.
pub fn module_id(locator: &str) -> Option<i64> {
    let url = Url::parse(locator.trim())
        .or_else(|_| Url::parse("http://relative.invalid/").and_then(|base| base.join(locator.trim())))
        .ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
}
