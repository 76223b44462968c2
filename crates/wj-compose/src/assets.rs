//! Flat copy of extracted attachments into the uploads directory.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use wj_config::CollisionPolicy;

use crate::error::ComposeError;

/// Outcome of an asset copy pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssetReport {
    /// Files written to the destination.
    pub copied: usize,
    /// Files whose name was already taken during this pass.
    pub collisions: usize,
}

/// Copies every file below a source tree into one flat directory.
pub struct AssetCopier {
    policy: CollisionPolicy,
}

impl AssetCopier {
    /// Create a copier resolving name clashes with `policy`.
    #[must_use]
    pub fn new(policy: CollisionPolicy) -> Self {
        Self { policy }
    }

    /// Copy all files under `source` into `dest` by filename only.
    ///
    /// Files are visited in sorted path order. A missing `source` copies
    /// nothing.
    pub fn copy_tree(&self, source: &Path, dest: &Path) -> Result<AssetReport, ComposeError> {
        let mut report = AssetReport::default();
        if !source.is_dir() {
            tracing::info!("No asset directory at {}, skipping", source.display());
            return Ok(report);
        }
        fs::create_dir_all(dest).map_err(|e| ComposeError::io(dest, e))?;

        let mut files = Vec::new();
        collect_files(source, &mut files)?;

        let mut taken: HashSet<OsString> = HashSet::new();
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target_name = if taken.contains(name) {
                report.collisions += 1;
                match self.policy {
                    CollisionPolicy::Overwrite => {
                        tracing::warn!(
                            "Asset name collision, overwriting with {}",
                            file.display()
                        );
                        name.to_os_string()
                    }
                    CollisionPolicy::Skip => {
                        tracing::warn!("Asset name collision, skipping {}", file.display());
                        continue;
                    }
                    CollisionPolicy::Rename => {
                        let renamed = free_name(name, &taken);
                        tracing::warn!(
                            "Asset name collision, copying {} as {}",
                            file.display(),
                            Path::new(&renamed).display()
                        );
                        renamed
                    }
                }
            } else {
                name.to_os_string()
            };

            let target = dest.join(&target_name);
            fs::copy(&file, &target).map_err(|e| ComposeError::io(&file, e))?;
            tracing::debug!("Copied {} to {}", file.display(), target.display());
            taken.insert(target_name);
            report.copied += 1;
        }

        Ok(report)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ComposeError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| ComposeError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ComposeError::io(dir, e))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// First `<stem>-<n><.ext>` not yet taken.
fn free_name(name: &std::ffi::OsStr, taken: &HashSet<OsString>) -> OsString {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| OsString::from(format!("{stem}-{n}{ext}")))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_os_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("images");
        write(&source, "a/logo.png", "first");
        write(&source, "b/logo.png", "second");
        write(&source, "b/c/diagram.svg", "svg");
        let dest = temp.path().join("uploads");
        (temp, source, dest)
    }

    #[test]
    fn test_copy_flattens_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("images");
        write(&source, "1/2/photo.jpg", "jpg");
        write(&source, "notes.txt", "txt");
        let dest = temp.path().join("uploads");

        let report = AssetCopier::new(CollisionPolicy::Overwrite)
            .copy_tree(&source, &dest)
            .unwrap();

        assert_eq!(report, AssetReport { copied: 2, collisions: 0 });
        assert_eq!(fs::read_to_string(dest.join("photo.jpg")).unwrap(), "jpg");
        assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "txt");
    }

    #[test]
    fn test_collision_overwrite() {
        let (_temp, source, dest) = setup();

        let report = AssetCopier::new(CollisionPolicy::Overwrite)
            .copy_tree(&source, &dest)
            .unwrap();

        assert_eq!(report, AssetReport { copied: 3, collisions: 1 });
        assert_eq!(fs::read_to_string(dest.join("logo.png")).unwrap(), "second");
    }

    #[test]
    fn test_collision_skip() {
        let (_temp, source, dest) = setup();

        let report = AssetCopier::new(CollisionPolicy::Skip)
            .copy_tree(&source, &dest)
            .unwrap();

        assert_eq!(report, AssetReport { copied: 2, collisions: 1 });
        assert_eq!(fs::read_to_string(dest.join("logo.png")).unwrap(), "first");
    }

    #[test]
    fn test_collision_rename() {
        let (_temp, source, dest) = setup();
        write(&source, "c/logo.png", "third");

        let report = AssetCopier::new(CollisionPolicy::Rename)
            .copy_tree(&source, &dest)
            .unwrap();

        assert_eq!(report, AssetReport { copied: 4, collisions: 2 });
        assert_eq!(fs::read_to_string(dest.join("logo.png")).unwrap(), "first");
        assert_eq!(fs::read_to_string(dest.join("logo-1.png")).unwrap(), "second");
        assert_eq!(fs::read_to_string(dest.join("logo-2.png")).unwrap(), "third");
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();

        let report = AssetCopier::new(CollisionPolicy::Overwrite)
            .copy_tree(&temp.path().join("nope"), &temp.path().join("uploads"))
            .unwrap();

        assert_eq!(report, AssetReport::default());
    }

    #[test]
    fn test_free_name() {
        let mut taken = HashSet::new();
        taken.insert(OsString::from("README"));
        taken.insert(OsString::from("README-1"));
        assert_eq!(
            free_name(std::ffi::OsStr::new("README"), &taken),
            OsString::from("README-2")
        );
    }
}
