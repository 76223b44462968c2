//! Cross-reference resolution.
//!
//! Rewrites `ri:attachment`, `ri:page` and `ri:user` references into final
//! Markdown link or mention text. The reference (or its enclosing `ac:link`)
//! is replaced by a single text node. Unresolved references keep a fallback
//! text followed by a `<!-- Broken … link -->` marker.

use std::fmt;

use wj_lookup::{KeyLookup, SpaceId, UNKNOWN_SPACE_ID};

use crate::document::{Document, NodeId};

const LINK_TAG: &str = "ac:link";
const IMAGE_TAG: &str = "ac:image";
const LINK_BODY_TAGS: &[&str] = &["ac:link-body", "ac:plain-text-link-body"];

/// Characters not allowed in target titles.
const ILLEGAL_TITLE_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

/// Kind of cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `ri:attachment`
    Attachment,
    /// `ri:page`
    Page,
    /// `ri:user`
    User,
}

impl LinkKind {
    /// All kinds in resolution order.
    pub const ALL: [LinkKind; 3] = [Self::Attachment, Self::Page, Self::User];

    /// Element tag of the reference.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Attachment => "ri:attachment",
            Self::Page => "ri:page",
            Self::User => "ri:user",
        }
    }

    /// Lowercase name used in markers and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Page => "page",
            Self::User => "user",
        }
    }

    /// Comment appended to the text of an unresolved reference.
    #[must_use]
    pub fn broken_marker(self) -> String {
        format!("<!-- Broken {self} link -->")
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page being converted; supplies defaults for references without a space
/// or page of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Space of the page.
    pub space_id: SpaceId,
    /// Page title as it appears in the source space.
    pub raw_page_title: String,
}

impl PageContext {
    /// Create a context.
    #[must_use]
    pub fn new(space_id: SpaceId, raw_page_title: impl Into<String>) -> Self {
        Self {
            space_id,
            raw_page_title: raw_page_title.into(),
        }
    }
}

/// Identifying attributes of one reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReference {
    /// `ri:filename`
    pub filename: Option<String>,
    /// `ri:content-title`
    pub content_title: Option<String>,
    /// `ri:space-key`
    pub space_key: Option<String>,
    /// `ri:content-id`
    pub content_id: Option<String>,
    /// `ri:userkey`
    pub user_key: Option<String>,
    /// Page reference nested in an attachment reference.
    pub nested_page: Option<Box<LinkReference>>,
    /// Custom display text from the enclosing link body.
    pub body: Option<String>,
}

impl LinkReference {
    /// Read a reference element and its enclosing `ac:link` body.
    #[must_use]
    pub fn read(doc: &Document, node: NodeId) -> Self {
        let attr = |name: &str| {
            doc.attr(node, name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let nested_page = doc
            .descendants(node)
            .into_iter()
            .find(|&d| doc.is_element(d, LinkKind::Page.tag()))
            .map(|page| Box::new(Self::read_attrs(doc, page)));

        Self {
            filename: doc.attr(node, "ri:filename").map(str::to_owned),
            content_title: attr("ri:content-title"),
            space_key: attr("ri:space-key"),
            content_id: attr("ri:content-id"),
            user_key: attr("ri:userkey"),
            nested_page,
            body: link_body(doc, node),
        }
    }

    fn read_attrs(doc: &Document, node: NodeId) -> Self {
        Self {
            content_title: doc.attr(node, "ri:content-title").map(str::to_owned),
            space_key: doc
                .attr(node, "ri:space-key")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned),
            ..Self::default()
        }
    }
}

/// Text of the `ac:link-body` / `ac:plain-text-link-body` next to `node`.
fn link_body(doc: &Document, node: NodeId) -> Option<String> {
    let link = doc.parent(node).filter(|&p| doc.is_element(p, LINK_TAG))?;
    let text: String = doc
        .children(link)
        .iter()
        .filter(|&&c| LINK_BODY_TAGS.iter().any(|tag| doc.is_element(c, tag)))
        .map(|&c| doc.text_content(c))
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final Markdown text, including the broken marker.
    pub text: String,
    /// Whether the lookup missed.
    pub broken: bool,
}

impl Resolution {
    fn hit(text: String) -> Self {
        Self {
            text,
            broken: false,
        }
    }

    fn miss(kind: LinkKind, text: &str) -> Self {
        Self {
            text: format!("{text}{}", kind.broken_marker()),
            broken: true,
        }
    }
}

/// Resolved and broken counts for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    /// References whose target was found.
    pub resolved: usize,
    /// References rendered with a broken marker.
    pub broken: usize,
}

impl KindStats {
    fn record(&mut self, resolution: &Resolution) {
        if resolution.broken {
            self.broken += 1;
        } else {
            self.resolved += 1;
        }
    }
}

/// Per-kind counts of one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub attachments: KindStats,
    pub pages: KindStats,
    pub users: KindStats,
}

impl LinkStats {
    /// Total broken references.
    #[must_use]
    pub fn broken(&self) -> usize {
        self.attachments.broken + self.pages.broken + self.users.broken
    }

    /// Total resolved references.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.attachments.resolved + self.pages.resolved + self.users.resolved
    }

    fn kind_mut(&mut self, kind: LinkKind) -> &mut KindStats {
        match kind {
            LinkKind::Attachment => &mut self.attachments,
            LinkKind::Page => &mut self.pages,
            LinkKind::User => &mut self.users,
        }
    }
}

/// Normalize a source title the way target titles are built.
///
/// Trims, collapses whitespace, replaces characters illegal in target
/// titles with `_`, upper-cases the first character and turns spaces into
/// underscores.
#[must_use]
pub fn normalize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned: String = collapsed
        .chars()
        .map(|c| if ILLEGAL_TITLE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let mut chars = cleaned.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    capitalized.replace(' ', "_")
}

/// Convert a target title into a Wiki.js path.
///
/// `Dev:Setup_Guide` becomes `/dev/setup-guide`.
#[must_use]
pub fn title_to_path(title: &str) -> String {
    let path = title.trim().replace(':', "/").to_lowercase().replace('_', "-");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Display label derived from a target title: its last segment with
/// `_` and `-` turned into spaces.
#[must_use]
pub fn title_label(title: &str) -> String {
    let last = title
        .trim()
        .trim_end_matches('/')
        .rsplit([':', '/'])
        .next()
        .unwrap_or_default();
    last.replace(['_', '-'], " ")
}

/// Resolves cross-references of one page.
pub struct LinkResolver<'a> {
    lookup: &'a dyn KeyLookup,
    context: &'a PageContext,
}

impl<'a> LinkResolver<'a> {
    /// Create a resolver for the page described by `context`.
    #[must_use]
    pub fn new(lookup: &'a dyn KeyLookup, context: &'a PageContext) -> Self {
        Self { lookup, context }
    }

    /// Resolve every kind, attachments first.
    pub fn resolve_all(&self, doc: &mut Document) -> LinkStats {
        let mut stats = LinkStats::default();
        for kind in LinkKind::ALL {
            *stats.kind_mut(kind) = self.resolve(doc, kind);
        }
        tracing::debug!(
            page = %self.context.raw_page_title,
            resolved = stats.resolved(),
            broken = stats.broken(),
            "resolved links"
        );
        stats
    }

    /// Resolve every reference of one kind.
    pub fn resolve(&self, doc: &mut Document, kind: LinkKind) -> KindStats {
        let snapshot: Vec<NodeId> = doc
            .elements_named(kind.tag())
            .into_iter()
            .filter(|&node| is_resolvable(doc, node, kind))
            .collect();

        let mut stats = KindStats::default();
        for node in snapshot {
            if !doc.is_attached(node) {
                continue;
            }
            let reference = LinkReference::read(doc, node);
            let resolution = match kind {
                LinkKind::Attachment => self.attachment(&reference),
                LinkKind::Page => self.page(&reference),
                LinkKind::User => self.user(&reference),
            };
            if resolution.broken {
                tracing::warn!(
                    page = %self.context.raw_page_title,
                    kind = %kind,
                    text = %resolution.text,
                    "broken link"
                );
            }
            stats.record(&resolution);

            let target = doc
                .parent(node)
                .filter(|&p| doc.is_element(p, LINK_TAG))
                .unwrap_or(node);
            let text = doc.create_text(resolution.text);
            doc.replace(target, text);
        }
        stats
    }

    fn space_id(&self, space_key: Option<&str>) -> SpaceId {
        match space_key {
            Some(key) => self
                .lookup
                .space_id_for_prefix(key)
                .unwrap_or(UNKNOWN_SPACE_ID),
            None => self.context.space_id,
        }
    }

    /// Resolve an attachment reference.
    #[must_use]
    pub fn attachment(&self, reference: &LinkReference) -> Resolution {
        let filename = reference.filename.as_deref().unwrap_or_default();
        let (space_id, raw_title) = match &reference.nested_page {
            Some(page) => (
                self.space_id(page.space_key.as_deref()),
                page.content_title.as_deref().unwrap_or_default(),
            ),
            None => (self.context.space_id, self.context.raw_page_title.as_str()),
        };
        let key = format!("{space_id}---{}---{filename}", basename(raw_title));

        match self.lookup.target_filename_for_file_key(&key) {
            Some(target) => {
                let label = reference.body.as_deref().unwrap_or(target);
                Resolution::hit(format!("[{label}](/uploads/{target})"))
            }
            None => {
                let label = reference.body.as_deref().unwrap_or(filename);
                Resolution::miss(LinkKind::Attachment, &format!("[{label}]({filename})"))
            }
        }
    }

    /// Resolve a page reference.
    #[must_use]
    pub fn page(&self, reference: &LinkReference) -> Resolution {
        let space_id = self.space_id(reference.space_key.as_deref());

        let (target, fallback) = if let Some(title) = &reference.content_title {
            let normalized = normalize_title(title);
            let key = format!("{space_id}---{normalized}");
            (
                self.lookup.target_title_for_page_key(&key),
                format!("Confluence---{key}"),
            )
        } else if let Some(id) = &reference.content_id {
            (
                self.lookup.title_for_page_id(id),
                format!("Confluence---{space_id}---{id}"),
            )
        } else {
            let homepage = reference
                .space_key
                .as_ref()
                .and_then(|_| self.lookup.homepage_for_space(space_id))
                .and_then(|page_id| self.lookup.title_for_page_id(page_id));
            (homepage, format!("Confluence---{space_id}---"))
        };

        match target {
            Some(title) => {
                let label = reference
                    .body
                    .clone()
                    .unwrap_or_else(|| title_label(title));
                Resolution::hit(format!("[{label}]({})", title_to_path(title)))
            }
            None => Resolution::miss(LinkKind::Page, &format!("[{fallback}]({fallback})")),
        }
    }

    /// Resolve a user reference. Custom link text is ignored.
    #[must_use]
    pub fn user(&self, reference: &LinkReference) -> Resolution {
        match reference
            .user_key
            .as_deref()
            .and_then(|key| self.lookup.username_for_user_key(key))
        {
            Some(username) => Resolution::hit(format!("@{username}")),
            None => Resolution::miss(LinkKind::User, "NULL NULL"),
        }
    }
}

/// References inside images are left for image handling; a page reference
/// inside an attachment reference belongs to the attachment.
fn is_resolvable(doc: &Document, node: NodeId, kind: LinkKind) -> bool {
    if doc.ancestor_named(node, IMAGE_TAG).is_some() {
        return false;
    }
    !(kind == LinkKind::Page && doc.ancestor_named(node, LinkKind::Attachment.tag()).is_some())
}

fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StorageParser;
    use crate::serializer::HtmlSerializer;
    use pretty_assertions::assert_eq;
    use wj_lookup::KeyTables;

    fn tables() -> KeyTables {
        KeyTables::new()
            .with_space(3, "Dev")
            .with_space(7, "Ops")
            .with_page_key("3---Setup_Guide", "Dev:Setup_Guide")
            .with_page_key("7---Runbook", "Ops:Runbook")
            .with_page_id("100", "Dev:Main_Page")
            .with_homepage(7, "100")
            .with_file_key("3---Setup Guide---diagram.png", "Setup_Guide_diagram.png")
            .with_file_key("7---Runbook---log.txt", "Runbook_log.txt")
            .with_user("abc", "jdoe")
    }

    fn resolve(body: &str, context: &PageContext) -> (String, LinkStats) {
        let lookup = tables();
        let mut doc = StorageParser::new().parse(body).unwrap();
        let stats = LinkResolver::new(&lookup, context).resolve_all(&mut doc);
        (doc.text_content(doc.root()), stats)
    }

    fn dev_page() -> PageContext {
        PageContext::new(3, "Setup Guide")
    }

    #[test]
    fn test_page_link_hit() {
        let (text, stats) = resolve(
            r#"<ac:link><ri:page ri:space-key="DEV" ri:content-title="Setup Guide" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "[Setup Guide](/dev/setup-guide)");
        assert_eq!(stats.pages.resolved, 1);
    }

    #[test]
    fn test_page_link_miss() {
        let context = PageContext::new(7, "Runbook");
        let (text, stats) = resolve(
            r#"<ac:link><ri:page ri:content-title="Ghost Page" /></ac:link>"#,
            &context,
        );
        assert_eq!(
            text,
            "[Confluence---7---Ghost_Page](Confluence---7---Ghost_Page)<!-- Broken page link -->"
        );
        assert_eq!(stats.pages.broken, 1);
    }

    #[test]
    fn test_page_link_custom_body() {
        let (text, _) = resolve(
            r#"<p>See <ac:link><ri:page ri:content-title="Setup   Guide" /><ac:plain-text-link-body><![CDATA[the guide]]></ac:plain-text-link-body></ac:link>.</p>"#,
            &dev_page(),
        );
        assert_eq!(text, "See [the guide](/dev/setup-guide).");
    }

    #[test]
    fn test_page_link_unknown_space() {
        let (text, _) = resolve(
            r#"<ac:link><ri:page ri:space-key="NOPE" ri:content-title="Setup Guide" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(
            text,
            "[Confluence----1---Setup_Guide](Confluence----1---Setup_Guide)<!-- Broken page link -->"
        );
    }

    #[test]
    fn test_page_link_by_content_id() {
        let (text, _) = resolve(
            r#"<ac:link><ri:page ri:content-id="100" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "[Main Page](/dev/main-page)");
    }

    #[test]
    fn test_page_link_space_homepage() {
        let (text, _) = resolve(
            r#"<ac:link><ri:page ri:space-key="OPS" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "[Main Page](/dev/main-page)");
    }

    #[test]
    fn test_attachment_hit_current_page() {
        let (text, stats) = resolve(
            r#"<ac:link><ri:attachment ri:filename="diagram.png" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "[Setup_Guide_diagram.png](/uploads/Setup_Guide_diagram.png)");
        assert_eq!(stats.attachments.resolved, 1);
    }

    #[test]
    fn test_attachment_nested_page_other_space() {
        let (text, stats) = resolve(
            r#"<ac:link><ri:attachment ri:filename="log.txt"><ri:page ri:space-key="OPS" ri:content-title="Runbook" /></ri:attachment><ac:link-body>the log</ac:link-body></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "[the log](/uploads/Runbook_log.txt)");
        assert_eq!(stats.pages, KindStats::default());
    }

    #[test]
    fn test_attachment_miss() {
        let (text, _) = resolve(
            r#"<ac:link><ri:attachment ri:filename="missing.pdf" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(
            text,
            "[missing.pdf](missing.pdf)<!-- Broken attachment link -->"
        );
    }

    #[test]
    fn test_user_hit_ignores_body() {
        let (text, stats) = resolve(
            r#"<ac:link><ri:user ri:userkey="abc" /><ac:link-body>John</ac:link-body></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "@jdoe");
        assert_eq!(stats.users.resolved, 1);
    }

    #[test]
    fn test_user_miss() {
        let (text, _) = resolve(
            r#"<ac:link><ri:user ri:userkey="abc123" /></ac:link>"#,
            &dev_page(),
        );
        assert_eq!(text, "NULL NULL<!-- Broken user link -->");

        let (text, _) = resolve(r#"<ac:link><ri:user ri:userkey="" /></ac:link>"#, &dev_page());
        assert_eq!(text, "NULL NULL<!-- Broken user link -->");
    }

    #[test]
    fn test_bare_reference_replaced() {
        let (text, _) = resolve(r#"<p>by <ri:user ri:userkey="abc" /></p>"#, &dev_page());
        assert_eq!(text, "by @jdoe");
    }

    #[test]
    fn test_image_references_untouched() {
        let body = r#"<ac:image><ri:attachment ri:filename="diagram.png" /></ac:image>"#;
        let lookup = tables();
        let context = dev_page();
        let mut doc = StorageParser::new().parse(body).unwrap();
        let stats = LinkResolver::new(&lookup, &context).resolve_all(&mut doc);

        assert_eq!(stats, LinkStats::default());
        assert_eq!(HtmlSerializer::new().serialize(&doc), body);
    }

    #[test]
    fn test_broken_marker_iff_miss() {
        let lookup = tables();
        let context = dev_page();
        let resolver = LinkResolver::new(&lookup, &context);
        for title in ["Setup Guide", "Nothing Here"] {
            let reference = LinkReference {
                content_title: Some(title.to_owned()),
                ..LinkReference::default()
            };
            let resolution = resolver.page(&reference);
            assert_eq!(
                resolution.text.contains("<!-- Broken page link -->"),
                resolution.broken
            );
        }
    }

    #[test]
    fn test_resolution_idempotent() {
        let body = r#"<p><ac:link><ri:page ri:content-title="Setup Guide" /></ac:link></p>"#;
        let lookup = tables();
        let context = dev_page();
        let mut doc = StorageParser::new().parse(body).unwrap();
        let resolver = LinkResolver::new(&lookup, &context);
        resolver.resolve_all(&mut doc);
        let once = HtmlSerializer::new().serialize(&doc);
        let stats = resolver.resolve_all(&mut doc);

        assert_eq!(stats, LinkStats::default());
        assert_eq!(HtmlSerializer::new().serialize(&doc), once);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  ghost   page "), "Ghost_page");
        assert_eq!(normalize_title("A [draft] #1"), "A__draft___1");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_title_to_path() {
        assert_eq!(title_to_path("Dev:Setup_Guide"), "/dev/setup-guide");
        assert_eq!(title_to_path("Main_Page"), "/main-page");
        assert_eq!(title_to_path("Ops:Team/On_Call"), "/ops/team/on-call");
    }

    #[test]
    fn test_title_label() {
        assert_eq!(title_label("Dev:Setup_Guide"), "Setup Guide");
        assert_eq!(title_label("Ops:Team/On-Call"), "On Call");
        assert_eq!(title_label("Plain"), "Plain");
    }
}
