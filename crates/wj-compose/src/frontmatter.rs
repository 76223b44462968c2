//! YAML frontmatter for Wiki.js pages.

use serde::{Deserialize, Serialize};
use wj_lookup::PageTitle;

/// Frontmatter of one written page or history file.
///
/// `description` is always present (Wiki.js requires the key) and always
/// empty. The remaining optional fields are omitted when unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Display title.
    pub title: String,
    /// Page description.
    pub description: String,
    /// Tags: configured categories plus the namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Author username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISO-8601 date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Sequential revision number (history files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    /// Version label (history files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Frontmatter {
    /// Frontmatter for `title` with tags derived from `categories`.
    #[must_use]
    pub fn for_title(title: &str, categories: &[String]) -> Self {
        let parsed = PageTitle::parse(title);
        let tags = page_tags(categories, parsed.namespace());
        Self {
            title: parsed.display(),
            description: String::new(),
            tags: (!tags.is_empty()).then_some(tags),
            ..Self::default()
        }
    }

    /// Prepend this frontmatter to `body`.
    pub fn render(&self, body: &str) -> Result<String, serde_yaml::Error> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("---\n{yaml}---\n{body}"))
    }
}

/// Categories followed by the namespace, deduplicated in first-seen order.
fn page_tags(categories: &[String], namespace: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(categories.len() + 1);
    for tag in categories.iter().map(String::as_str).chain(namespace) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(rendered: &str) -> (Frontmatter, &str) {
        let rest = rendered.strip_prefix("---\n").unwrap();
        let (yaml, body) = rest.split_once("---\n").unwrap();
        (serde_yaml::from_str(yaml).unwrap(), body)
    }

    #[test]
    fn test_for_title_namespaced() {
        let fm = Frontmatter::for_title("Dev:Setup_Guide", &["Migrated".to_owned()]);
        assert_eq!(fm.title, "Setup Guide");
        assert_eq!(fm.description, "");
        assert_eq!(
            fm.tags,
            Some(vec!["Migrated".to_owned(), "Dev".to_owned()])
        );
    }

    #[test]
    fn test_for_title_without_tags() {
        let fm = Frontmatter::for_title("Main_Page", &[]);
        assert_eq!(fm.title, "Main Page");
        assert_eq!(fm.tags, None);
    }

    #[test]
    fn test_tags_deduplicated() {
        let categories = vec!["Dev".to_owned(), "Wiki".to_owned(), "Dev".to_owned()];
        let fm = Frontmatter::for_title("Dev:Page", &categories);
        assert_eq!(fm.tags, Some(vec!["Dev".to_owned(), "Wiki".to_owned()]));
    }

    #[test]
    fn test_nested_namespace_tag() {
        let fm = Frontmatter::for_title("Dev:Team:On_Call", &[]);
        assert_eq!(fm.tags, Some(vec!["Dev:Team".to_owned()]));
    }

    #[test]
    fn test_render_round_trip() {
        let fm = Frontmatter {
            author: Some("jdoe".to_owned()),
            date: Some("2025-03-10T23:12:36Z".to_owned()),
            ..Frontmatter::for_title("Dev:Setup_Guide", &[])
        };
        let rendered = fm.render("# Hello\n").unwrap();

        let (parsed, body) = parse(&rendered);
        assert_eq!(parsed, fm);
        assert_eq!(body, "# Hello\n");
    }

    #[test]
    fn test_render_omits_unset_fields() {
        let rendered = Frontmatter::for_title("Main_Page", &[])
            .render("")
            .unwrap();

        assert!(rendered.contains("title: Main Page\n"));
        assert!(rendered.contains("description: ''\n"));
        assert!(!rendered.contains("tags"));
        assert!(!rendered.contains("author"));
        assert!(!rendered.contains("revision"));
    }

    #[test]
    fn test_render_history_fields() {
        let fm = Frontmatter {
            revision: Some(2),
            version: Some("176".to_owned()),
            ..Frontmatter::for_title("Dev:Page", &[])
        };
        let rendered = fm.render("old\n").unwrap();

        let (parsed, _) = parse(&rendered);
        assert_eq!(parsed.revision, Some(2));
        assert_eq!(parsed.version.as_deref(), Some("176"));
    }
}
