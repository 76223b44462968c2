//! Text passes over rendered Markdown.
//!
//! Each pass is a pure `&str -> String` function. [`PostprocessPipeline`]
//! runs them in a fixed order:
//!
//! 1. [`FixExternalImages`]
//! 2. [`FixHeadingLineBreaks`]
//! 3. [`NestedHeadings`]
//! 4. [`RestoreCode`]
//!
//! Code bodies stay base64-encoded until [`RestoreCode`], so the heading
//! passes cannot alter them.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::{Captures, Regex};

use crate::macros::PRESERVED_CODE_CLASS;

static EXTERNAL_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\((https?://[^)]+)\)(\{[^}]+\})?").expect("invalid image regex")
});

/// A heading line, plus lines it continues onto through a trailing `\` break.
///
/// Only an odd run of trailing backslashes is a break; `\\` is an escaped
/// literal backslash.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(#{1,6})[ \t]+((?:(?:[^\n]*[^\\\n])?(?:\\\\)*\\\n)*[^\n]*)$")
        .expect("invalid heading regex")
});

static LINE_BREAK_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<br\s*/?>|\\\n|\n").expect("invalid line break regex"));

static NESTED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*{1,6})\s?(#{1,6})\s+(.*)$").expect("invalid nested heading regex")
});

static PRESERVED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?si)<pre class="{PRESERVED_CODE_CLASS}"(.*?)>(.*?)</pre>"#
    ))
    .expect("invalid preserved code regex")
});

static HTML_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s([^\s="]+)="([^"]*)""#).expect("invalid attribute regex"));

/// One text pass over rendered Markdown.
pub trait Postprocessor: Send {
    /// Pass name used in logs.
    fn name(&self) -> &'static str;

    /// Apply the pass.
    fn process(&self, markdown: &str) -> String;
}

/// Rewrites `![alt](http://…){attrs}` into an HTML `<img>` tag.
///
/// The alt text is HTML-escaped; the attribute block is appended verbatim.
pub struct FixExternalImages;

impl Postprocessor for FixExternalImages {
    fn name(&self) -> &'static str {
        "fix-external-images"
    }

    fn process(&self, markdown: &str) -> String {
        EXTERNAL_IMAGE
            .replace_all(markdown, |caps: &Captures| {
                let alt = escape_html(&caps[1]);
                let url = &caps[2];
                match caps.get(3) {
                    Some(attrs) => format!(r#"<img src="{url}" alt="{alt}" {} />"#, attrs.as_str()),
                    None => format!(r#"<img src="{url}" alt="{alt}" />"#),
                }
            })
            .into_owned()
    }
}

/// Flattens headings containing line-break markup onto one line.
pub struct FixHeadingLineBreaks;

impl Postprocessor for FixHeadingLineBreaks {
    fn name(&self) -> &'static str {
        "fix-heading-line-breaks"
    }

    fn process(&self, markdown: &str) -> String {
        HEADING
            .replace_all(markdown, |caps: &Captures| {
                let text = LINE_BREAK_MARKUP.replace_all(&caps[2], " ");
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("{} {text}", &caps[1])
            })
            .into_owned()
    }
}

/// Normalizes `* ## text` lines left over from list-wrapped headings.
///
/// A matching line becomes `## text`. Consecutive matching lines are
/// handled as one run and skipped past together.
pub struct NestedHeadings;

impl Postprocessor for NestedHeadings {
    fn name(&self) -> &'static str {
        "nested-headings"
    }

    fn process(&self, markdown: &str) -> String {
        let mut lines: Vec<String> = markdown.split('\n').map(str::to_owned).collect();
        let mut index = 0;
        while index < lines.len() {
            let mut end = index;
            while end < lines.len() {
                let Some(rewritten) = rewrite_nested_heading(&lines[end]) else {
                    break;
                };
                lines[end] = rewritten;
                end += 1;
            }
            index = if end > index { end } else { index + 1 };
        }
        lines.join("\n")
    }
}

fn rewrite_nested_heading(line: &str) -> Option<String> {
    let caps = NESTED_HEADING.captures(line)?;
    Some(format!("{} {}", &caps[2], caps[3].trim()))
}

/// Turns preserved `<pre>` blocks back into fenced code.
pub struct RestoreCode;

impl Postprocessor for RestoreCode {
    fn name(&self) -> &'static str {
        "restore-code"
    }

    fn process(&self, markdown: &str) -> String {
        PRESERVED_CODE
            .replace_all(markdown, |caps: &Captures| {
                let attrs: Vec<(&str, &str)> = HTML_ATTRIBUTE
                    .captures_iter(&caps[1])
                    .filter_map(|a| Some((a.get(1)?.as_str(), a.get(2)?.as_str())))
                    .collect();
                let attr = |name: &str| {
                    attrs
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| *value)
                };

                if let Some(category) = attr("data-broken-macro") {
                    return broken_code(category);
                }

                let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
                match BASE64.decode(payload.as_bytes()) {
                    Ok(bytes) => {
                        let code = String::from_utf8_lossy(&bytes);
                        let lang = attr("lang").unwrap_or_default();
                        format!("```{lang}\n{code}\n```")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "preserved code block is not valid base64");
                        broken_code("undecodable")
                    }
                }
            })
            .into_owned()
    }
}

fn broken_code(category: &str) -> String {
    format!("<!-- Broken code macro: {category} -->\n```\n```")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Ordered sequence of [`Postprocessor`] passes.
pub struct PostprocessPipeline {
    passes: Vec<Box<dyn Postprocessor>>,
}

impl PostprocessPipeline {
    /// Pipeline with no passes.
    #[must_use]
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// Append a pass.
    #[must_use]
    pub fn with_pass(mut self, pass: Box<dyn Postprocessor>) -> Self {
        self.passes.push(pass);
        self
    }

    /// Names of the passes in order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass in order.
    #[must_use]
    pub fn run(&self, markdown: &str) -> String {
        self.passes.iter().fold(markdown.to_owned(), |text, pass| {
            let out = pass.process(&text);
            if out != text {
                tracing::trace!(pass = pass.name(), "postprocess pass changed output");
            }
            out
        })
    }
}

impl Default for PostprocessPipeline {
    fn default() -> Self {
        Self::empty()
            .with_pass(Box::new(FixExternalImages))
            .with_pass(Box::new(FixHeadingLineBreaks))
            .with_pass(Box::new(NestedHeadings))
            .with_pass(Box::new(RestoreCode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_external_image_with_attrs() {
        assert_eq!(
            FixExternalImages.process("x ![a \"b\" & c](https://ex.com/i.png){width=200} y"),
            r#"x <img src="https://ex.com/i.png" alt="a &quot;b&quot; &amp; c" {width=200} /> y"#
        );
    }

    #[test]
    fn test_external_image_without_attrs() {
        assert_eq!(
            FixExternalImages.process("![logo](http://ex.com/l.svg)"),
            r#"<img src="http://ex.com/l.svg" alt="logo" />"#
        );
    }

    #[test]
    fn test_local_image_untouched() {
        let md = "![local](/uploads/a.png)";
        assert_eq!(FixExternalImages.process(md), md);
    }

    #[test]
    fn test_heading_br_markup() {
        assert_eq!(
            FixHeadingLineBreaks.process("## First<br />Second<br>Third<br/>  End  \ntext"),
            "## First Second Third End\ntext"
        );
    }

    #[test]
    fn test_heading_hard_break_continuation() {
        let out = FixHeadingLineBreaks.process("# Title\\\ncontinued\n\nbody");
        assert_eq!(out, "# Title continued\n\nbody");
    }

    #[test]
    fn test_heading_escaped_backslash_is_not_a_break() {
        let md = "# C:\\\\\n\nBody";
        assert_eq!(FixHeadingLineBreaks.process(md), md);
    }

    #[test]
    fn test_heading_escaped_backslash_before_break() {
        let out = FixHeadingLineBreaks.process("# C:\\\\\\\ndrive\n\nBody");
        assert_eq!(out, "# C:\\\\ drive\n\nBody");
    }

    #[test]
    fn test_heading_single_line() {
        let out = FixHeadingLineBreaks.process("### A<br />B");
        assert_eq!(out.lines().count(), 1);
        assert!(!out.contains("<br"));
    }

    #[test]
    fn test_non_heading_untouched() {
        let md = "text<br />more\n#hashtag";
        assert_eq!(FixHeadingLineBreaks.process(md), md);
    }

    #[test]
    fn test_nested_heading_isolated() {
        assert_eq!(
            NestedHeadings.process("intro\n* ## Heading  \nbody"),
            "intro\n## Heading\nbody"
        );
    }

    #[test]
    fn test_nested_heading_run() {
        assert_eq!(
            NestedHeadings.process("*# One\n** ## Two\n***### Three\nplain\n* list item"),
            "# One\n## Two\n### Three\nplain\n* list item"
        );
    }

    #[test]
    fn test_restore_code() {
        let payload = BASE64.encode("fn main() {\n    println!(\"hi\");\n}");
        let md = format!(r#"<pre class="PRESERVESYNTAXHIGHLIGHT" lang="rust">{payload}</pre>"#);
        assert_eq!(
            RestoreCode.process(&md),
            "```rust\nfn main() {\n    println!(\"hi\");\n}\n```"
        );
    }

    #[test]
    fn test_restore_code_without_lang() {
        let md = format!(
            r#"<pre class="PRESERVESYNTAXHIGHLIGHT">{}</pre>"#,
            BASE64.encode("ls -la")
        );
        assert_eq!(RestoreCode.process(&md), "```\nls -la\n```");
    }

    #[test]
    fn test_restore_code_wrapped_payload() {
        let payload = BASE64.encode("echo 1");
        let (a, b) = payload.split_at(4);
        let md = format!("<pre class=\"PRESERVESYNTAXHIGHLIGHT\" lang=\"sh\">{a}\n{b}</pre>");
        assert_eq!(RestoreCode.process(&md), "```sh\necho 1\n```");
    }

    #[test]
    fn test_restore_code_broken() {
        assert_eq!(
            RestoreCode.process(
                r#"<pre class="PRESERVESYNTAXHIGHLIGHT" data-broken-macro="no-body"></pre>"#
            ),
            "<!-- Broken code macro: no-body -->\n```\n```"
        );
    }

    #[test]
    fn test_restore_code_undecodable() {
        assert_eq!(
            RestoreCode.process(r#"<pre class="PRESERVESYNTAXHIGHLIGHT">***</pre>"#),
            "<!-- Broken code macro: undecodable -->\n```\n```"
        );
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            PostprocessPipeline::default().pass_names(),
            vec![
                "fix-external-images",
                "fix-heading-line-breaks",
                "nested-headings",
                "restore-code"
            ]
        );
    }

    #[test]
    fn test_pipeline_leaves_code_headings_alone() {
        let payload = BASE64.encode("# not a heading<br />\n* ## nor this");
        let md = format!(
            "## Title<br />Sub\n<pre class=\"PRESERVESYNTAXHIGHLIGHT\" lang=\"md\">{payload}</pre>"
        );
        assert_eq!(
            PostprocessPipeline::default().run(&md),
            "## Title Sub\n```md\n# not a heading<br />\n* ## nor this\n```"
        );
    }

    #[test]
    fn test_pipeline_idempotent_on_clean_text() {
        let md = "# Title\n\nSome *text* and [a link](/dev/page).";
        assert_eq!(PostprocessPipeline::default().run(md), md);
    }
}
