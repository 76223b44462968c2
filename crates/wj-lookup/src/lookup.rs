//! Read-only lookup of precomputed migration keys.

use std::collections::HashMap;

/// Numeric Confluence space id.
pub type SpaceId = i64;

/// Space id used when a space key cannot be resolved.
///
/// Keys built from it never match, so the reference ends up broken.
pub const UNKNOWN_SPACE_ID: SpaceId = -1;

/// Read-only access to the tables produced by the extractor.
///
/// A `None` result is never an error: it marks a reference whose target
/// was not part of the export.
pub trait KeyLookup {
    /// Space id for a space key / namespace prefix.
    fn space_id_for_prefix(&self, prefix: &str) -> Option<SpaceId>;

    /// Namespace prefix of a space.
    fn prefix_for_space_id(&self, space_id: SpaceId) -> Option<&str>;

    /// Target title of a page by its Confluence page id.
    fn title_for_page_id(&self, page_id: &str) -> Option<&str>;

    /// Page id of a space's homepage.
    fn homepage_for_space(&self, space_id: SpaceId) -> Option<&str>;

    /// Target title for a `"{space}---{title}"` page key.
    fn target_title_for_page_key(&self, key: &str) -> Option<&str>;

    /// Target filename for a `"{space}---{page}---{file}"` attachment key.
    fn target_filename_for_file_key(&self, key: &str) -> Option<&str>;

    /// Username for a Confluence user key.
    fn username_for_user_key(&self, key: &str) -> Option<&str>;
}

/// In-memory lookup tables.
#[derive(Debug, Default, Clone)]
pub struct KeyTables {
    space_prefixes: HashMap<SpaceId, String>,
    prefix_to_space: HashMap<String, SpaceId>,
    page_titles: HashMap<String, String>,
    homepages: HashMap<SpaceId, String>,
    page_keys: HashMap<String, String>,
    file_keys: HashMap<String, String>,
    users: HashMap<String, String>,
}

impl KeyTables {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a space and its namespace prefix.
    #[must_use]
    pub fn with_space(mut self, space_id: SpaceId, prefix: impl Into<String>) -> Self {
        self.insert_space(space_id, prefix.into());
        self
    }

    /// Register a page id → target title entry.
    #[must_use]
    pub fn with_page_id(mut self, page_id: impl Into<String>, title: impl Into<String>) -> Self {
        self.page_titles.insert(page_id.into(), title.into());
        self
    }

    /// Register a space homepage.
    #[must_use]
    pub fn with_homepage(mut self, space_id: SpaceId, page_id: impl Into<String>) -> Self {
        self.homepages.insert(space_id, page_id.into());
        self
    }

    /// Register a page key → target title entry.
    #[must_use]
    pub fn with_page_key(mut self, key: impl Into<String>, title: impl Into<String>) -> Self {
        self.page_keys.insert(key.into(), title.into());
        self
    }

    /// Register an attachment key → target filename entry.
    #[must_use]
    pub fn with_file_key(mut self, key: impl Into<String>, filename: impl Into<String>) -> Self {
        self.file_keys.insert(key.into(), filename.into());
        self
    }

    /// Register a user key → username entry.
    #[must_use]
    pub fn with_user(mut self, key: impl Into<String>, username: impl Into<String>) -> Self {
        self.users.insert(key.into(), username.into());
        self
    }

    pub(crate) fn insert_space(&mut self, space_id: SpaceId, prefix: String) {
        self.prefix_to_space.insert(prefix.clone(), space_id);
        self.space_prefixes.insert(space_id, prefix);
    }

    pub(crate) fn set_page_titles(&mut self, titles: HashMap<String, String>) {
        self.page_titles = titles;
    }

    pub(crate) fn set_homepages(&mut self, homepages: HashMap<SpaceId, String>) {
        self.homepages = homepages;
    }

    pub(crate) fn set_page_keys(&mut self, keys: HashMap<String, String>) {
        self.page_keys = keys;
    }

    pub(crate) fn set_file_keys(&mut self, keys: HashMap<String, String>) {
        self.file_keys = keys;
    }

    pub(crate) fn set_users(&mut self, users: HashMap<String, String>) {
        self.users = users;
    }

    /// Number of page keys.
    #[must_use]
    pub fn page_key_count(&self) -> usize {
        self.page_keys.len()
    }

    /// Number of attachment keys.
    #[must_use]
    pub fn file_key_count(&self) -> usize {
        self.file_keys.len()
    }
}

impl KeyLookup for KeyTables {
    fn space_id_for_prefix(&self, prefix: &str) -> Option<SpaceId> {
        if let Some(id) = self.prefix_to_space.get(prefix) {
            return Some(*id);
        }
        // Space keys are upper case in links, prefixes are often capitalized.
        // Prefixes differing only in case resolve to the lowest space id.
        self.prefix_to_space
            .iter()
            .filter(|(known, _)| known.eq_ignore_ascii_case(prefix))
            .map(|(_, id)| *id)
            .min()
    }

    fn prefix_for_space_id(&self, space_id: SpaceId) -> Option<&str> {
        self.space_prefixes.get(&space_id).map(String::as_str)
    }

    fn title_for_page_id(&self, page_id: &str) -> Option<&str> {
        self.page_titles.get(page_id).map(String::as_str)
    }

    fn homepage_for_space(&self, space_id: SpaceId) -> Option<&str> {
        self.homepages.get(&space_id).map(String::as_str)
    }

    fn target_title_for_page_key(&self, key: &str) -> Option<&str> {
        non_empty(self.page_keys.get(key))
    }

    fn target_filename_for_file_key(&self, key: &str) -> Option<&str> {
        non_empty(self.file_keys.get(key))
    }

    fn username_for_user_key(&self, key: &str) -> Option<&str> {
        non_empty(self.users.get(key))
    }
}

/// An empty target counts as a miss.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_prefix_exact_match() {
        let tables = KeyTables::new().with_space(7, "DEV").with_space(8, "Dev");
        assert_eq!(tables.space_id_for_prefix("DEV"), Some(7));
        assert_eq!(tables.space_id_for_prefix("Dev"), Some(8));
    }

    #[test]
    fn test_space_prefix_case_insensitive_fallback() {
        let tables = KeyTables::new().with_space(3, "Dev");
        assert_eq!(tables.space_id_for_prefix("DEV"), Some(3));
        assert_eq!(tables.space_id_for_prefix("OPS"), None);
    }

    #[test]
    fn test_space_prefix_case_clash_is_deterministic() {
        for _ in 0..16 {
            let tables = KeyTables::new()
                .with_space(9, "dev")
                .with_space(4, "Dev")
                .with_space(12, "dEv");
            assert_eq!(tables.space_id_for_prefix("DEV"), Some(4));
            assert_eq!(tables.space_id_for_prefix("dev"), Some(9));
        }
    }

    #[test]
    fn test_prefix_for_space_id() {
        let tables = KeyTables::new().with_space(3, "Dev");
        assert_eq!(tables.prefix_for_space_id(3), Some("Dev"));
        assert_eq!(tables.prefix_for_space_id(4), None);
    }

    #[test]
    fn test_empty_target_is_miss() {
        let tables = KeyTables::new()
            .with_page_key("1---Empty", "")
            .with_user("u1", "");
        assert_eq!(tables.target_title_for_page_key("1---Empty"), None);
        assert_eq!(tables.username_for_user_key("u1"), None);
    }

    #[test]
    fn test_homepage_and_page_id() {
        let tables = KeyTables::new()
            .with_homepage(3, "100")
            .with_page_id("100", "Dev:Main_Page");
        let page_id = tables.homepage_for_space(3).unwrap();
        assert_eq!(tables.title_for_page_id(page_id), Some("Dev:Main_Page"));
    }

    #[test]
    fn test_file_key_lookup() {
        let tables = KeyTables::new().with_file_key("3---Setup Guide---a.png", "Setup_Guide_a.png");
        assert_eq!(
            tables.target_filename_for_file_key("3---Setup Guide---a.png"),
            Some("Setup_Guide_a.png")
        );
        assert_eq!(tables.file_key_count(), 1);
        assert_eq!(tables.page_key_count(), 0);
    }
}
