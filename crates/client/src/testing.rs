//! In-process origin for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quire_core::{ActivitySnapshot, CourseSnapshot, CourseSummary, Error, SectionSnapshot};

use crate::origin::{Credential, OriginClient};

#[derive(Debug, Default)]
pub(crate) struct FakeOrigin {
    calls: AtomicUsize,
    structure_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
    failing: HashSet<String>,
    courses: HashMap<i64, CourseSnapshot>,
    delay: Option<Duration>,
}

impl FakeOrigin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Locators that answer `NotFound`.
    pub(crate) fn failing<I, S>(mut self, locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(locators.into_iter().map(Into::into));
        self
    }

    pub(crate) fn with_course(mut self, id: i64, title: &str, locators: &[String]) -> Self {
        let activities = locators
            .iter()
            .enumerate()
            .map(|(i, url)| ActivitySnapshot {
                id: (i + 1).to_string(),
                name: format!("Activity {}", i + 1),
                url: url.clone(),
                kind: "page".into(),
                completed: None,
            })
            .collect();
        let snapshot = CourseSnapshot {
            id,
            title: title.to_string(),
            sections: vec![SectionSnapshot { id: 1, name: "Week 1".into(), activities }],
        };
        self.courses.insert(id, snapshot);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn structure_calls(&self) -> usize {
        self.structure_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl OriginClient for FakeOrigin {
    async fn fetch_content(&self, locator: &str, _credential: &Credential) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(locator.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(locator) {
            return Err(Error::NotFound(locator.to_string()));
        }
        Ok(format!(
            "<html><body><script>track()</script><nav>Home</nav><p>content of {locator}</p></body></html>"
        ))
    }

    async fn list_course_structure(&self, course_id: i64, _credential: &Credential) -> Result<CourseSnapshot, Error> {
        self.structure_calls.fetch_add(1, Ordering::SeqCst);
        self.courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("course {course_id}")))
    }

    async fn list_enrolled_courses(&self, _credential: &Credential) -> Result<Vec<CourseSummary>, Error> {
        let mut courses: Vec<_> = self
            .courses
            .values()
            .map(|course| CourseSummary {
                id: course.id,
                shortname: format!("C{}", course.id),
                fullname: course.title.clone(),
                progress: None,
                completed: None,
            })
            .collect();
        courses.sort_by_key(|course| course.id);
        Ok(courses)
    }
}
