//! Bucket files written by the extractor.
//!
//! Each bucket is a JSON object stored as `{dir}/{name}.json`. Objects are
//! read order-preserving so pages are processed in extractor order. A
//! missing file is an empty bucket; a malformed file is an error.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::BucketError;
use crate::lookup::{KeyTables, SpaceId};

/// Names of the buckets the composer and converter read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketName {
    /// Page title → revision id strings (first is current).
    TitleRevisions,
    /// Page title → revision descriptors.
    PageRevisionHistory,
    /// Page id → target title.
    PageIdToTitleMap,
    /// Space id → namespace prefix.
    SpaceIdToPrefixMap,
    /// Space id → homepage page id.
    SpaceIdHomepages,
    /// `"{space}---{title}"` → target title.
    PagesTitlesMap,
    /// `"{space}---{page}---{file}"` → target filename.
    FilenamesToFiletitlesMap,
    /// User key → username.
    UserkeyToUsernameMap,
}

impl BucketName {
    /// File stem of the bucket.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TitleRevisions => "title-revisions",
            Self::PageRevisionHistory => "page-revision-history",
            Self::PageIdToTitleMap => "page-id-to-title-map",
            Self::SpaceIdToPrefixMap => "space-id-to-prefix-map",
            Self::SpaceIdHomepages => "space-id-homepages",
            Self::PagesTitlesMap => "pages-titles-map",
            Self::FilenamesToFiletitlesMap => "filenames-to-filetitles-map",
            Self::UserkeyToUsernameMap => "userkey-to-username-map",
        }
    }

    /// Path of the bucket file inside `dir`.
    #[must_use]
    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.as_str()))
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded revision of a page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionDescriptor {
    /// Sequential revision number (1-based, dense per page).
    pub number: u32,
    /// Confluence version label.
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    /// `YYYYMMDDHHMMSS` timestamp.
    #[serde(default, deserialize_with = "scalar_string")]
    pub timestamp: String,
    /// Content-body ids; the first one holds the page text.
    #[serde(deserialize_with = "scalar_strings")]
    pub body_ids: Vec<String>,
    /// Whether this is the page's current revision.
    #[serde(default)]
    pub current: bool,
    /// Author username, when the extractor recorded one.
    #[serde(default)]
    pub author: Option<String>,
}

impl RevisionDescriptor {
    /// Id of the body holding the revision text.
    #[must_use]
    pub fn primary_body_id(&self) -> Option<&str> {
        self.body_ids.first().map(String::as_str)
    }
}

/// All buckets, loaded once.
#[derive(Debug, Default)]
pub struct DataBuckets {
    title_revisions: Vec<(String, Vec<String>)>,
    revision_history: Vec<(String, Vec<RevisionDescriptor>)>,
    history_index: HashMap<String, usize>,
    tables: KeyTables,
}

impl DataBuckets {
    /// Load all buckets from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a bucket file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self, BucketError> {
        let title_revisions = load_bucket::<Vec<Scalar>>(dir, BucketName::TitleRevisions)?
            .into_iter()
            .map(|(title, ids)| (title, ids.into_iter().map(Scalar::into_string).collect()))
            .collect();
        let revision_history =
            load_bucket::<Vec<RevisionDescriptor>>(dir, BucketName::PageRevisionHistory)?;

        let mut tables = KeyTables::new();
        for (id, prefix) in load_space_bucket(dir, BucketName::SpaceIdToPrefixMap)? {
            tables.insert_space(id, prefix);
        }
        tables.set_homepages(
            load_space_bucket(dir, BucketName::SpaceIdHomepages)?
                .into_iter()
                .collect(),
        );
        tables.set_page_titles(load_string_map(dir, BucketName::PageIdToTitleMap)?);
        tables.set_page_keys(load_string_map(dir, BucketName::PagesTitlesMap)?);
        tables.set_file_keys(load_string_map(dir, BucketName::FilenamesToFiletitlesMap)?);
        tables.set_users(load_string_map(dir, BucketName::UserkeyToUsernameMap)?);

        let buckets = Self::from_parts(title_revisions, revision_history, tables);
        tracing::info!(
            pages = buckets.title_revisions.len(),
            histories = buckets.revision_history.len(),
            page_keys = buckets.tables.page_key_count(),
            file_keys = buckets.tables.file_key_count(),
            "Loaded buckets from {}",
            dir.display()
        );
        Ok(buckets)
    }

    /// Assemble buckets from already-loaded parts.
    #[must_use]
    pub fn from_parts(
        title_revisions: Vec<(String, Vec<String>)>,
        revision_history: Vec<(String, Vec<RevisionDescriptor>)>,
        tables: KeyTables,
    ) -> Self {
        let history_index = revision_history
            .iter()
            .enumerate()
            .map(|(i, (title, _))| (title.clone(), i))
            .collect();
        Self {
            title_revisions,
            revision_history,
            history_index,
            tables,
        }
    }

    /// Page title → revision id strings, in extractor order.
    #[must_use]
    pub fn title_revisions(&self) -> &[(String, Vec<String>)] {
        &self.title_revisions
    }

    /// Page title → revision descriptors, in extractor order.
    #[must_use]
    pub fn revision_history(&self) -> &[(String, Vec<RevisionDescriptor>)] {
        &self.revision_history
    }

    /// Revision descriptors of one page.
    #[must_use]
    pub fn history_for(&self, title: &str) -> Option<&[RevisionDescriptor]> {
        self.history_index
            .get(title)
            .and_then(|&i| self.revision_history.get(i))
            .map(|(_, revisions)| revisions.as_slice())
    }

    /// Lookup tables.
    #[must_use]
    pub fn tables(&self) -> &KeyTables {
        &self.tables
    }
}

/// String or integer JSON value, normalized to a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Int(i) => i.to_string(),
        }
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

fn scalar_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Vec::<Scalar>::deserialize(deserializer)
        .map(|values| values.into_iter().map(Scalar::into_string).collect())
}

/// Load one bucket as ordered `(key, value)` pairs.
fn load_bucket<T: DeserializeOwned>(
    dir: &Path,
    name: BucketName,
) -> Result<Vec<(String, T)>, BucketError> {
    let path = name.path_in(dir);
    if !path.exists() {
        tracing::debug!("bucket {name} not found, using empty bucket");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| BucketError::Io {
        path: path.clone(),
        source,
    })?;
    let json_err = |source| BucketError::Json {
        path: path.clone(),
        source,
    };

    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&content).map_err(json_err)?;
    object
        .into_iter()
        .map(|(key, value)| Ok((key, serde_json::from_value(value).map_err(json_err)?)))
        .collect()
}

fn load_string_map(dir: &Path, name: BucketName) -> Result<HashMap<String, String>, BucketError> {
    Ok(load_bucket::<Scalar>(dir, name)?
        .into_iter()
        .map(|(key, value)| (key, value.into_string()))
        .collect())
}

fn load_space_bucket(dir: &Path, name: BucketName) -> Result<Vec<(SpaceId, String)>, BucketError> {
    load_bucket::<Scalar>(dir, name)?
        .into_iter()
        .map(|(key, value)| {
            let id = key
                .trim()
                .parse::<SpaceId>()
                .map_err(|_| BucketError::InvalidSpaceId {
                    bucket: name.as_str(),
                    key: key.clone(),
                })?;
            Ok((id, value.into_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyLookup;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_bucket(dir: &Path, name: BucketName, json: &str) {
        std::fs::write(name.path_in(dir), json).unwrap();
    }

    #[test]
    fn test_missing_directory_gives_empty_buckets() {
        let tmp = TempDir::new().unwrap();
        let buckets = DataBuckets::load(&tmp.path().join("nope")).unwrap();
        assert!(buckets.title_revisions().is_empty());
        assert!(buckets.revision_history().is_empty());
    }

    #[test]
    fn test_title_revisions_keep_extractor_order() {
        let tmp = TempDir::new().unwrap();
        write_bucket(
            tmp.path(),
            BucketName::TitleRevisions,
            r#"{
                "Zeta": ["3@1-20240101000000"],
                "Alpha": ["1@2-20240102000000", "2@1-20240101000000"],
                "Dev:Middle": ["5@1-20240103000000"]
            }"#,
        );

        let buckets = DataBuckets::load(tmp.path()).unwrap();
        let titles: Vec<_> = buckets
            .title_revisions()
            .iter()
            .map(|(t, _)| t.as_str())
            .collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Dev:Middle"]);
        assert_eq!(buckets.title_revisions()[1].1.len(), 2);
    }

    #[test]
    fn test_revision_history_numeric_fields() {
        let tmp = TempDir::new().unwrap();
        write_bucket(
            tmp.path(),
            BucketName::PageRevisionHistory,
            r#"{
                "Dev:Setup_Guide": [
                    {"number": 1, "version": 1, "timestamp": "20240101120000", "body_ids": [11]},
                    {"number": 2, "version": "2", "timestamp": 20240202120000, "body_ids": ["12", "13"],
                     "current": true, "author": "jdoe"}
                ]
            }"#,
        );

        let buckets = DataBuckets::load(tmp.path()).unwrap();
        let history = buckets.history_for("Dev:Setup_Guide").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, "1");
        assert_eq!(history[0].primary_body_id(), Some("11"));
        assert!(!history[0].current);
        assert_eq!(history[1].timestamp, "20240202120000");
        assert_eq!(history[1].body_ids, vec!["12".to_owned(), "13".to_owned()]);
        assert_eq!(history[1].author.as_deref(), Some("jdoe"));
        assert!(buckets.history_for("Other").is_none());
    }

    #[test]
    fn test_lookup_tables_loaded() {
        let tmp = TempDir::new().unwrap();
        write_bucket(tmp.path(), BucketName::SpaceIdToPrefixMap, r#"{"3": "Dev"}"#);
        write_bucket(tmp.path(), BucketName::SpaceIdHomepages, r#"{"3": 100}"#);
        write_bucket(tmp.path(), BucketName::PageIdToTitleMap, r#"{"100": "Dev:Main_Page"}"#);
        write_bucket(
            tmp.path(),
            BucketName::PagesTitlesMap,
            r#"{"3---Setup_Guide": "Dev:Setup_Guide"}"#,
        );
        write_bucket(
            tmp.path(),
            BucketName::FilenamesToFiletitlesMap,
            r#"{"3---Setup Guide---a.png": "Setup_Guide_a.png"}"#,
        );
        write_bucket(tmp.path(), BucketName::UserkeyToUsernameMap, r#"{"abc": "jdoe"}"#);

        let buckets = DataBuckets::load(tmp.path()).unwrap();
        let tables = buckets.tables();
        assert_eq!(tables.space_id_for_prefix("DEV"), Some(3));
        assert_eq!(tables.homepage_for_space(3), Some("100"));
        assert_eq!(tables.title_for_page_id("100"), Some("Dev:Main_Page"));
        assert_eq!(
            tables.target_title_for_page_key("3---Setup_Guide"),
            Some("Dev:Setup_Guide")
        );
        assert_eq!(
            tables.target_filename_for_file_key("3---Setup Guide---a.png"),
            Some("Setup_Guide_a.png")
        );
        assert_eq!(tables.username_for_user_key("abc"), Some("jdoe"));
    }

    #[test]
    fn test_malformed_bucket_is_error() {
        let tmp = TempDir::new().unwrap();
        write_bucket(tmp.path(), BucketName::TitleRevisions, "{ not json");

        let err = DataBuckets::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BucketError::Json { .. }));
        assert!(err.to_string().contains("title-revisions.json"));
    }

    #[test]
    fn test_invalid_space_id_key() {
        let tmp = TempDir::new().unwrap();
        write_bucket(tmp.path(), BucketName::SpaceIdToPrefixMap, r#"{"dev": "Dev"}"#);

        let err = DataBuckets::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BucketError::InvalidSpaceId { .. }));
    }
}
