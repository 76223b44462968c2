//! Namespaced target page titles (`Dev:Setup_Guide`).

use crate::lookup::{KeyLookup, SpaceId, UNKNOWN_SPACE_ID};

/// A target page title split at its last `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTitle<'a> {
    namespace: Option<&'a str>,
    name: &'a str,
}

impl<'a> PageTitle<'a> {
    /// Split `title` into namespace and name.
    ///
    /// Everything before the last `:` is the namespace.
    #[must_use]
    pub fn parse(title: &'a str) -> Self {
        match title.rsplit_once(':') {
            Some((namespace, name)) if !namespace.is_empty() => Self {
                namespace: Some(namespace),
                name,
            },
            Some((_, name)) => Self {
                namespace: None,
                name,
            },
            None => Self {
                namespace: None,
                name: title,
            },
        }
    }

    /// Namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&'a str> {
        self.namespace
    }

    /// Title without namespace, in canonical underscore form.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Human-readable title: name with underscores as spaces.
    #[must_use]
    pub fn display(&self) -> String {
        self.name.replace('_', " ")
    }

    /// Space owning this title, found through its namespace prefix.
    ///
    /// Titles without namespace belong to the space with an empty prefix.
    #[must_use]
    pub fn space_id(&self, lookup: &dyn KeyLookup) -> SpaceId {
        let prefix = self
            .namespace
            .and_then(|ns| ns.split(':').next())
            .unwrap_or_default();
        lookup
            .space_id_for_prefix(prefix)
            .unwrap_or(UNKNOWN_SPACE_ID)
    }
}
