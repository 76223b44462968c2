//! Extractor bucket loading and read-only key lookup tables.
//!
//! The extractor leaves its results in `{workspace}/buckets/<name>.json`.
//! [`DataBuckets`] loads them once; afterwards everything is read-only.
//!
//! - [`KeyLookup`]: the lookup seam used by link resolution
//! - [`KeyTables`]: in-memory implementation of [`KeyLookup`]
//! - [`RevisionDescriptor`]: one entry of a page's revision history
//! - [`content_id`] / [`RevisionMetadata`]: revision id string parsing
//! - [`PageTitle`]: namespaced target titles
//!
//! # Example
//!
//! ```
//! use wj_lookup::{KeyLookup, KeyTables};
//!
//! let tables = KeyTables::new()
//!     .with_space(3, "DEV")
//!     .with_page_key("3---Setup_Guide", "Dev:Setup_Guide");
//!
//! assert_eq!(tables.space_id_for_prefix("DEV"), Some(3));
//! assert_eq!(
//!     tables.target_title_for_page_key("3---Setup_Guide"),
//!     Some("Dev:Setup_Guide")
//! );
//! assert_eq!(tables.username_for_user_key("nobody"), None);
//! ```

mod buckets;
mod error;
mod lookup;
mod revision;
mod title;

pub use buckets::{BucketName, DataBuckets, RevisionDescriptor};
pub use error::BucketError;
pub use lookup::{KeyLookup, KeyTables, SpaceId, UNKNOWN_SPACE_ID};
pub use revision::{RevisionMetadata, content_id, iso_date};
pub use title::PageTitle;
