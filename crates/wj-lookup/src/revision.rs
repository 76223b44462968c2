//! Revision id strings: `<contentId>[/<contentId>…]@<version>-<YYYYMMDDHHMMSS>`.

/// Leading content-body id of a revision id string.
///
/// This is the run of ASCII digits before the first `/` or `@`. Returns
/// `None` when the string does not start with a digit.
///
/// ```
/// assert_eq!(wj_lookup::content_id("9011735@177-20250310231236"), Some("9011735"));
/// assert_eq!(wj_lookup::content_id("12/13@2-20240101000000"), Some("12"));
/// assert_eq!(wj_lookup::content_id("@1-2024"), None);
/// ```
#[must_use]
pub fn content_id(revision_id: &str) -> Option<&str> {
    let trimmed = revision_id.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    (end > 0).then(|| &trimmed[..end])
}

/// Version and timestamp carried by a revision id string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionMetadata {
    /// Version label.
    pub version: String,
    /// 14-digit `YYYYMMDDHHMMSS` timestamp.
    pub timestamp: String,
}

impl RevisionMetadata {
    /// Parse the part after `@`.
    ///
    /// Returns `None` when `@` or `-` is missing or the timestamp is not
    /// 14 digits.
    #[must_use]
    pub fn parse(revision_id: &str) -> Option<Self> {
        let (_, meta) = revision_id.trim().split_once('@')?;
        let (version, timestamp) = meta.rsplit_once('-')?;
        if version.is_empty() || !is_timestamp(timestamp) {
            return None;
        }
        Some(Self {
            version: version.to_owned(),
            timestamp: timestamp.to_owned(),
        })
    }

    /// Timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
    #[must_use]
    pub fn iso_date(&self) -> String {
        iso_date(&self.timestamp).unwrap_or_default()
    }
}

fn is_timestamp(value: &str) -> bool {
    value.len() == 14 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Expand a 14-digit `YYYYMMDDHHMMSS` timestamp to `YYYY-MM-DDTHH:MM:SSZ`.
#[must_use]
pub fn iso_date(timestamp: &str) -> Option<String> {
    if !is_timestamp(timestamp) {
        return None;
    }
    let t = timestamp;
    Some(format!(
        "{}-{}-{}T{}:{}:{}Z",
        &t[0..4],
        &t[4..6],
        &t[6..8],
        &t[8..10],
        &t[10..12],
        &t[12..14]
    ))
}
