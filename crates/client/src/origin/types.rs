//! LMS web service payloads and their projection into quire's model.
//!
//! Only the fields the cache and cleaner consume are modelled; everything
//! else in the responses is ignored.

use serde::Deserialize;

use quire_core::{ActivitySnapshot, CourseSnapshot, CourseSummary, SectionSnapshot};

/// Error payload the web service returns with HTTP 200.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorPayload {
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub errorcode: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorPayload {
    pub fn is_error(&self) -> bool {
        self.exception.is_some() || self.errorcode.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    pub userid: i64,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub siteurl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LmsCourse {
    pub id: i64,
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl From<LmsCourse> for CourseSummary {
    fn from(course: LmsCourse) -> Self {
        let fullname = match course.displayname {
            Some(name) if !name.trim().is_empty() => name,
            _ => course.fullname,
        };
        CourseSummary {
            id: course.id,
            shortname: course.shortname,
            fullname,
            progress: course.progress,
            completed: course.completed,
        }
    }
}

/// Response of `core_course_get_courses_by_field`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoursesByField {
    #[serde(default)]
    pub courses: Vec<LmsCourse>,
}

/// Response of `core_course_get_course_module`.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseModuleInfo {
    pub cm: CourseModuleRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseModuleRef {
    pub id: i64,
    pub course: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LmsSection {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modules: Vec<LmsModule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LmsModule {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub modname: String,
    /// 0 or 1; the service sends an integer.
    #[serde(default)]
    pub visible: Option<i32>,
    #[serde(default)]
    pub uservisible: Option<bool>,
    #[serde(default)]
    pub completiondata: Option<CompletionData>,
    #[serde(default)]
    pub contents: Vec<ModuleContent>,
}

impl LmsModule {
    pub fn is_hidden(&self) -> bool {
        self.uservisible == Some(false) || self.visible == Some(0)
    }

    /// Download URLs of the module's HTML files, in listing order.
    pub fn html_file_urls(&self) -> Vec<String> {
        self.contents
            .iter()
            .filter(|c| {
                let name = c.filename.to_ascii_lowercase();
                name.ends_with(".html") || name.ends_with(".htm")
            })
            .filter_map(|c| c.fileurl.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionData {
    pub state: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleContent {
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub fileurl: Option<String>,
}

/// Where a module's readable content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// The module's HTML files, downloaded and concatenated in order.
    Files(Vec<String>),
    /// The locator itself. Used when the module is not listed in its course
    /// contents or lists no HTML files.
    Locator,
}

/// Pick the content source for module `cmid` from its course contents.
pub fn content_source(sections: &[LmsSection], cmid: i64) -> ContentSource {
    let files = sections
        .iter()
        .flat_map(|section| section.modules.iter())
        .find(|m| m.id == cmid)
        .map(LmsModule::html_file_urls)
        .unwrap_or_default();

    if files.is_empty() { ContentSource::Locator } else { ContentSource::Files(files) }
}

/// Project course contents into a snapshot, dropping hidden modules.
pub fn project_course(course_id: i64, title: String, sections: Vec<LmsSection>) -> CourseSnapshot {
    let sections = sections
        .into_iter()
        .map(|section| SectionSnapshot {
            id: section.id,
            name: section.name,
            activities: section
                .modules
                .into_iter()
                .filter(|m| !m.is_hidden())
                .map(|m| ActivitySnapshot {
                    id: m.id.to_string(),
                    name: m.name,
                    url: m.url.unwrap_or_default(),
                    kind: m.modname,
                    completed: m.completiondata.map(|c| c.state != 0),
                })
                .collect(),
        })
        .collect();

    CourseSnapshot { id: course_id, title, sections }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENTS: &str = r#"[
        {"id": 10, "name": "General", "section": 0, "modules": [
            {"id": 100, "name": "Welcome", "modname": "page", "url": "https://lms.example.edu/mod/page/view.php?id=100",
             "visible": 1, "uservisible": true, "completiondata": {"state": 1, "timecompleted": 0},
             "contents": [
                {"type": "file", "filename": "index.html", "fileurl": "https://lms.example.edu/webservice/pluginfile.php/1/index.html"},
                {"type": "file", "filename": "style.css", "fileurl": "https://lms.example.edu/webservice/pluginfile.php/1/style.css"},
                {"type": "file", "filename": "Part2.HTM", "fileurl": "https://lms.example.edu/webservice/pluginfile.php/1/Part2.HTM"}
             ]},
            {"id": 101, "name": "Hidden quiz", "modname": "quiz", "visible": 0},
            {"id": 102, "name": "Locked", "modname": "page", "uservisible": false},
            {"id": 103, "name": "Heading", "modname": "label"}
        ]},
        {"id": 11, "name": "Week 1", "section": 1}
    ]"#;

    #[test]
    fn test_projection_drops_hidden_modules() {
        let sections: Vec<LmsSection> = serde_json::from_str(CONTENTS).unwrap();
        let snapshot = project_course(7, "Biology".into(), sections);

        assert_eq!(snapshot.id, 7);
        assert_eq!(snapshot.sections.len(), 2);
        let activities = &snapshot.sections[0].activities;
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].kind, "page");
        assert_eq!(activities[0].completed, Some(true));
        assert_eq!(activities[1].id, "103");
        assert_eq!(activities[1].url, "");
        assert_eq!(activities[1].completed, None);
        assert!(snapshot.sections[1].activities.is_empty());
    }

    #[test]
    fn test_html_file_urls() {
        let sections: Vec<LmsSection> = serde_json::from_str(CONTENTS).unwrap();
        let urls = sections[0].modules[0].html_file_urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("index.html"));
        assert!(urls[1].ends_with("Part2.HTM"));
    }

    #[test]
    fn test_content_source_prefers_html_files() {
        let sections: Vec<LmsSection> = serde_json::from_str(CONTENTS).unwrap();
        match content_source(&sections, 100) {
            ContentSource::Files(files) => {
                assert_eq!(files.len(), 2);
                assert!(files[0].ends_with("index.html"));
            }
            other => panic!("expected files, got {other:?}"),
        }
    }

    #[test]
    fn test_content_source_falls_back_to_locator() {
        let sections: Vec<LmsSection> = serde_json::from_str(CONTENTS).unwrap();
        // listed without files
        assert_eq!(content_source(&sections, 103), ContentSource::Locator);
        // not listed at all
        assert_eq!(content_source(&sections, 999), ContentSource::Locator);
        assert_eq!(content_source(&[], 100), ContentSource::Locator);
    }

    #[test]
    fn test_error_payload_detection() {
        let payload: ApiErrorPayload = serde_json::from_str(
            r#"{"exception": "moodle_exception", "errorcode": "invalidtoken", "message": "Invalid token - token not found"}"#,
        )
        .unwrap();
        assert!(payload.is_error());

        let payload: ApiErrorPayload = serde_json::from_str(r#"{"userid": 3}"#).unwrap();
        assert!(!payload.is_error());
    }

    #[test]
    fn test_course_summary_prefers_display_name() {
        let course = LmsCourse {
            id: 1,
            shortname: "BIO101".into(),
            fullname: "Biology 101 (2026)".into(),
            displayname: Some("Biology 101".into()),
            progress: Some(42.5),
            completed: None,
        };
        let summary = CourseSummary::from(course);
        assert_eq!(summary.fullname, "Biology 101");
        assert_eq!(summary.progress, Some(42.5));
    }
}
