//! LMS REST web service client.
//!
//! ### Protocol
//!
//! - **Endpoint**: `<origin>/webservice/rest/server.php`, form-encoded POST
//! - **Authentication**: `wstoken` form field; file downloads take `token=`
//! - **Functions**: `wsfunction` names the call, `moodlewsrestformat=json`
//! - **Errors**: HTTP 200 with an `{exception, errorcode, message}` body

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use url::Url;

use quire_core::{AppConfig, CourseSnapshot, CourseSummary, Error};

use super::types::{
    ApiErrorPayload, ContentSource, CourseModuleInfo, CoursesByField, LmsCourse, LmsSection, SiteInfo, content_source,
    project_course,
};
use super::{Credential, LmsError, OriginClient, module_id};

const WEBSERVICE_PATH: &str = "webservice/rest/server.php";

/// LMS client configuration.
#[derive(Debug, Clone)]
pub struct LmsConfig {
    /// Base URL of the LMS site.
    pub base_url: Url,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string (default: quire/0.1).
    pub user_agent: String,
}

impl LmsConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.origin_url)
            .map_err(|e| Error::InvalidInput(format!("origin_url '{}': {e}", config.origin_url)))?;
        Ok(Self { base_url, timeout: config.timeout(), user_agent: config.user_agent.clone() })
    }
}

/// LMS web service client.
#[derive(Debug, Clone)]
pub struct LmsClient {
    http: reqwest::Client,
    config: LmsConfig,
    endpoint: Url,
}

impl LmsClient {
    pub fn new(config: LmsConfig) -> Result<Self, Error> {
        let endpoint = Url::parse(&format!("{}/{WEBSERVICE_PATH}", config.base_url.as_str().trim_end_matches('/')))
            .map_err(|e| Error::InvalidInput(format!("origin_url: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, endpoint })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(LmsConfig::from_app_config(config)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Invoke one web service function and decode its JSON answer.
    async fn call<T: DeserializeOwned>(
        &self, credential: &Credential, wsfunction: &str, params: &[(&str, String)],
    ) -> Result<T, LmsError> {
        let mut form: Vec<(&str, String)> = vec![
            ("wstoken", credential.expose().to_string()),
            ("wsfunction", wsfunction.to_string()),
            ("moodlewsrestformat", "json".to_string()),
        ];
        form.extend(params.iter().cloned());

        let start = Instant::now();
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LmsError::HttpStatus { status: status.as_u16() });
        }

        let text = response.text().await?;
        tracing::debug!(wsfunction, elapsed_ms = start.elapsed().as_millis() as u64, bytes = text.len(), "LMS call");

        check_error_payload(&text)?;
        serde_json::from_str(&text).map_err(|e| LmsError::Parse(format!("{wsfunction}: {e}")))
    }

    pub async fn site_info(&self, credential: &Credential) -> Result<SiteInfo, LmsError> {
        self.call(credential, "core_webservice_get_site_info", &[]).await
    }

    pub async fn user_courses(&self, credential: &Credential, user_id: i64) -> Result<Vec<LmsCourse>, LmsError> {
        self.call(credential, "core_enrol_get_users_courses", &[("userid", user_id.to_string())])
            .await
    }

    pub async fn course_contents(&self, credential: &Credential, course_id: i64) -> Result<Vec<LmsSection>, LmsError> {
        self.call(credential, "core_course_get_contents", &[("courseid", course_id.to_string())])
            .await
    }

    pub async fn course_module(&self, credential: &Credential, cmid: i64) -> Result<CourseModuleInfo, LmsError> {
        self.call(credential, "core_course_get_course_module", &[("cmid", cmid.to_string())])
            .await
    }

    /// Course full name, if the LMS will tell us.
    pub async fn course_title(&self, credential: &Credential, course_id: i64) -> Result<Option<String>, LmsError> {
        let found: CoursesByField = self
            .call(
                credential,
                "core_course_get_courses_by_field",
                &[("field", "id".to_string()), ("value", course_id.to_string())],
            )
            .await?;
        Ok(found.courses.into_iter().next().map(|course| course.fullname))
    }

    /// Download a file with token authentication.
    pub async fn download(&self, credential: &Credential, file_url: &str) -> Result<String, LmsError> {
        let url = with_token(file_url, credential.expose());

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LmsError::HttpStatus { status: status.as_u16() });
        }

        let body = response.text().await?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') {
            check_error_payload(trimmed)?;
        }
        Ok(body)
    }
}

/// Fail on a web service error body; anything else passes.
fn check_error_payload(text: &str) -> Result<(), LmsError> {
    match serde_json::from_str::<ApiErrorPayload>(text) {
        Ok(payload) if payload.is_error() => Err(LmsError::Api {
            message: payload
                .message
                .or_else(|| payload.exception.clone())
                .unwrap_or_else(|| "unknown error".to_string()),
            errorcode: payload.errorcode,
        }),
        _ => Ok(()),
    }
}

/// Append `token=` to a file URL that carries no token yet.
fn with_token(file_url: &str, token: &str) -> String {
    if file_url.contains("token=") {
        return file_url.to_string();
    }
    let separator = if file_url.contains('?') { '&' } else { '?' };
    format!("{file_url}{separator}token={token}")
}

#[async_trait]
impl OriginClient for LmsClient {
    async fn fetch_content(&self, locator: &str, credential: &Credential) -> Result<String, Error> {
        let cmid = module_id(locator).ok_or_else(|| LmsError::NoModuleId(locator.to_string()))?;

        let module = self.course_module(credential, cmid).await?;
        let sections = self.course_contents(credential, module.cm.course).await?;

        let files = match content_source(&sections, cmid) {
            ContentSource::Files(files) => files,
            ContentSource::Locator => {
                tracing::debug!(cmid, "no HTML files for module, downloading locator directly");
                return self.download(credential, locator).await.map_err(|e| {
                    tracing::debug!(cmid, error = %e, "direct download failed");
                    Error::from(LmsError::NoContent(cmid))
                });
            }
        };

        let mut combined = String::new();
        for file in &files {
            match self.download(credential, file).await {
                Ok(html) => {
                    combined.push_str(&html);
                    combined.push_str("\n\n");
                }
                Err(e) if e.is_auth_failure() => return Err(e.into()),
                Err(e) => tracing::warn!(cmid, error = %e, "failed to download module file"),
            }
        }

        if combined.trim().is_empty() {
            return Err(LmsError::NoContent(cmid).into());
        }
        Ok(combined)
    }

    async fn list_course_structure(&self, course_id: i64, credential: &Credential) -> Result<CourseSnapshot, Error> {
        let sections = self.course_contents(credential, course_id).await?;

        let title = match self.course_title(credential, course_id).await {
            Ok(Some(title)) => title,
            Ok(None) => format!("Course {course_id}"),
            Err(e) => {
                tracing::warn!(course_id, error = %e, "course title lookup failed");
                format!("Course {course_id}")
            }
        };

        Ok(project_course(course_id, title, sections))
    }

    async fn list_enrolled_courses(&self, credential: &Credential) -> Result<Vec<CourseSummary>, Error> {
        let site = self.site_info(credential).await?;
        let courses = self.user_courses(credential, site.userid).await?;
        tracing::info!(userid = site.userid, count = courses.len(), "listed enrolled courses");
        Ok(courses.into_iter().map(CourseSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_token() {
        assert_eq!(with_token("https://lms/file.html", "t"), "https://lms/file.html?token=t");
        assert_eq!(with_token("https://lms/file.php?x=1", "t"), "https://lms/file.php?x=1&token=t");
        assert_eq!(with_token("https://lms/file.php?token=old", "t"), "https://lms/file.php?token=old");
    }

    #[test]
    fn test_check_error_payload() {
        let err = check_error_payload(
            r#"{"exception":"webservice_access_exception","errorcode":"accessexception","message":"Access control exception"}"#,
        )
        .unwrap_err();
        assert!(err.is_auth_failure());

        assert!(check_error_payload(r#"{"userid": 4, "fullname": "A B"}"#).is_ok());
        assert!(check_error_payload(r#"[{"id": 1}]"#).is_ok());
        assert!(check_error_payload("<html></html>").is_ok());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = LmsConfig {
            base_url: Url::parse("https://lms.example.edu/moodle/").unwrap(),
            timeout: Duration::from_secs(5),
            user_agent: "quire-test".into(),
        };
        let client = LmsClient::new(config).unwrap();
        assert_eq!(client.endpoint.as_str(), "https://lms.example.edu/moodle/webservice/rest/server.php");
    }

    #[test]
    fn test_from_app_config() {
        let config = AppConfig { origin_url: "https://lms.example.edu".into(), ..AppConfig::default() };
        let client = LmsClient::from_app_config(&config).unwrap();
        assert_eq!(client.base_url().host_str(), Some("lms.example.edu"));
        assert_eq!(client.endpoint.as_str(), "https://lms.example.edu/webservice/rest/server.php");
    }

    #[tokio::test]
    async fn test_fetch_content_rejects_locator_without_module_id() {
        let client = LmsClient::from_app_config(&AppConfig::default()).unwrap();
        let credential = Credential::new("t").unwrap();
        let err = client
            .fetch_content("https://lms.example.edu/course/view.php", &credential)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLocator(_)));
    }
}
