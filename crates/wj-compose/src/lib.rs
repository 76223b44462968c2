//! Wiki.js result tree composition.
//!
//! Takes rendered Markdown bodies from `<workspace>/converted/` and writes
//! them as Wiki.js pages with YAML frontmatter:
//!
//! ```text
//! result/
//! +-- pages/
//! |   +-- dev/setup-guide.md
//! |   +-- dev/history/setup-guide/setup-guide-v1.md
//! +-- uploads/
//!     +-- logo.png
//! ```
//!
//! Output paths are a pure function of the page title (see [`output_path`]).

mod assets;
mod composer;
mod error;
mod frontmatter;
mod paths;

pub use assets::{AssetCopier, AssetReport};
pub use composer::{ComposeReport, PageComposer};
pub use error::ComposeError;
pub use frontmatter::Frontmatter;
pub use paths::{history_path, output_path, page_slug};
