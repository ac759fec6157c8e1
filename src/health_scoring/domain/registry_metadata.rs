use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classifiers that mark a project as no longer (or not yet) maintained.
const DEPRECATED_CLASSIFIERS: &[&str] = &[
    "Development Status :: 7 - Inactive",
    "Development Status :: 1 - Planning",
];

/// Project URL labels that conventionally point at the source repository.
const REPOSITORY_URL_KEYS: &[&str] = &["Repository", "Source", "Source Code", "Code"];

/// Package registry view of a project.
///
/// Built once per collection and never mutated; download counts come from a
/// separate source and are attached with [`RegistryMetadata::with_downloads`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    pub name: String,
    /// Latest published version
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub requires_python: Option<String>,
    #[serde(default)]
    pub requires_dist: Vec<String>,
    #[serde(default)]
    pub home_page: Option<String>,
    #[serde(default)]
    pub project_urls: BTreeMap<String, String>,
    #[serde(default)]
    pub classifiers: Vec<String>,
    /// `None` when download statistics could not be collected
    #[serde(default)]
    pub downloads_last_month: Option<u64>,
    #[serde(default)]
    pub latest_release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_releases: usize,
    #[serde(default)]
    pub yanked_releases: usize,
}

impl RegistryMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            summary: None,
            license: None,
            requires_python: None,
            requires_dist: Vec::new(),
            home_page: None,
            project_urls: BTreeMap::new(),
            classifiers: Vec::new(),
            downloads_last_month: None,
            latest_release_date: None,
            first_release_date: None,
            total_releases: 0,
            yanked_releases: 0,
        }
    }

    /// Returns the metadata carrying the given monthly download count.
    pub fn with_downloads(self, downloads_last_month: Option<u64>) -> Self {
        Self {
            downloads_last_month,
            ..self
        }
    }

    /// Source repository URL from the project URLs, falling back to a
    /// GitHub home page.
    pub fn repository_url(&self) -> Option<&str> {
        REPOSITORY_URL_KEYS
            .iter()
            .find_map(|key| self.project_urls.get(*key))
            .map(String::as_str)
            .or_else(|| {
                self.project_urls
                    .values()
                    .chain(self.home_page.iter())
                    .find(|url| url.contains("github.com"))
                    .map(String::as_str)
            })
    }

    pub fn is_deprecated(&self) -> bool {
        self.classifiers
            .iter()
            .any(|c| DEPRECATED_CLASSIFIERS.contains(&c.as_str()))
    }

    pub fn days_since_release(&self, now: DateTime<Utc>) -> Option<i64> {
        self.latest_release_date
            .map(|date| (now - date).num_days().max(0))
    }
}

/// Recent download counts for a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadStats {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
}
