//! Course structure snapshot.
//!
//! A denormalized, serializable projection of the origin course tree. It is
//! cached wholesale per course id and replaced wholesale on refetch.

use serde::{Deserialize, Serialize};

/// One course with its sections and activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CourseSnapshot {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SectionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SectionSnapshot {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub activities: Vec<ActivitySnapshot>,
}

/// A single activity; `url` is the locator used for content fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivitySnapshot {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// An enrolled course as listed by the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CourseSummary {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl CourseSnapshot {
    /// Locators of every activity that has one, in course order.
    pub fn activity_urls(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|section| section.activities.iter())
            .filter(|activity| !activity.url.is_empty())
            .map(|activity| activity.url.clone())
            .collect()
    }
}
