//! Durable directory-backed cache adapter.
//!
//! Layout under the root directory:
//!
//! ```text
//! activities/<fingerprint>.html   activity:<fingerprint>
//! courses/<id>.json               course:<id>
//! <sanitized key>                 any other key (e.g. the cancel marker)
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! reader never observes a half-written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;

use super::{ACTIVITY_PREFIX, COURSE_PREFIX, CacheAdapter};
use crate::Error;

const ACTIVITIES_DIR: &str = "activities";
const COURSES_DIR: &str = "courses";
const ACTIVITY_EXT: &str = ".html";
const COURSE_EXT: &str = ".json";
const TMP_SUFFIX: &str = ".tmp";

/// Distinguishes concurrent writers of the same key.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Adapter storing one file per entry.
#[derive(Debug, Clone)]
pub struct DirectoryAdapter {
    root: PathBuf,
}

impl DirectoryAdapter {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(ACTIVITIES_DIR)).await?;
        fs::create_dir_all(root.join(COURSES_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        if let Some(fingerprint) = key.strip_prefix(ACTIVITY_PREFIX) {
            self.root
                .join(ACTIVITIES_DIR)
                .join(format!("{}{ACTIVITY_EXT}", sanitize_file_name(fingerprint)))
        } else if let Some(id) = key.strip_prefix(COURSE_PREFIX) {
            self.root
                .join(COURSES_DIR)
                .join(format!("{}{COURSE_EXT}", sanitize_file_name(id)))
        } else {
            self.root.join(sanitize_file_name(key))
        }
    }

    /// Delete files in `dir` whose reconstructed key matches `prefix`.
    async fn clear_dir(&self, dir: &Path, to_key: fn(&str) -> Option<String>, prefix: Option<&str>) -> Result<(), Error> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(key) = to_key(name) else { continue };

            if prefix.is_none_or(|p| key.starts_with(p)) {
                remove_if_present(&entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` so a key is a safe file name.
pub fn sanitize_file_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}

fn activity_key(file_name: &str) -> Option<String> {
    file_name
        .strip_suffix(ACTIVITY_EXT)
        .map(|fingerprint| format!("{ACTIVITY_PREFIX}{fingerprint}"))
}

fn course_key(file_name: &str) -> Option<String> {
    file_name.strip_suffix(COURSE_EXT).map(|id| format!("{COURSE_PREFIX}{id}"))
}

fn loose_key(file_name: &str) -> Option<String> {
    (!file_name.ends_with(TMP_SUFFIX)).then(|| file_name.to_string())
}

/// A fresh `<path>.<pid>-<seq>.tmp` sibling, unique per write.
fn tmp_path(path: &Path) -> PathBuf {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}-{seq}{TMP_SUFFIX}", std::process::id()));
    PathBuf::from(name)
}

async fn remove_if_present(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CacheAdapter for DirectoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = tmp_path(&path);
        fs::write(&tmp, value).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        remove_if_present(&self.path_for(key)).await
    }

    async fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<(), Error> {
        self.clear_dir(&self.root.join(ACTIVITIES_DIR), activity_key, prefix)
            .await?;
        self.clear_dir(&self.root.join(COURSES_DIR), course_key, prefix)
            .await?;
        self.clear_dir(&self.root, loose_key, prefix).await
    }
}
