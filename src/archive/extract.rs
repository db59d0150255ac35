//! Writing an archive onto the filesystem.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::Archive;
use crate::error::{Error, Result};

/// Extract every entry of `archive` below `destination`, overwriting existing files.
///
/// Entries are written in archive order and nothing is rolled back when a later entry fails.
pub fn extract_archive(archive: &Archive, destination: &Path) -> Result<PathBuf> {
    fs::create_dir_all(destination).map_err(|err| Error::extraction(destination, err))?;

    for entry in archive.entries() {
        let relative = enclosed_path(entry.name()).ok_or_else(|| {
            Error::extraction(
                entry.name(),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "entry escapes the destination directory",
                ),
            )
        })?;
        let target = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|err| Error::extraction(&target, err))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::extraction(parent, err))?;
        }
        fs::write(&target, entry.data()).map_err(|err| Error::extraction(&target, err))?;
        debug!(path = %target.display(), "extracted entry");
    }

    Ok(destination.to_path_buf())
}

/// Resolve an entry name to a relative path that stays inside the destination.
fn enclosed_path(name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&name.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!relative.as_os_str().is_empty()).then_some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveEntry;
    use tempfile::tempdir;

    #[test]
    fn writes_entries_and_overwrites_existing_files() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let dest = temp.path().join("src");
        fs::create_dir_all(dest.join("classes"))?;
        fs::write(dest.join("classes/Foo.cls"), "stale")?;

        let mut archive = Archive::new();
        archive.push(ArchiveEntry::new("classes/", Vec::new()))?;
        archive.push(ArchiveEntry::new("classes/Foo.cls", "public class Foo {}"))?;
        archive.push(ArchiveEntry::new("package.xml", "<Package/>"))?;

        let written = extract_archive(&archive, &dest)?;

        assert_eq!(written, dest);
        assert_eq!(fs::read_to_string(dest.join("classes/Foo.cls"))?, "public class Foo {}");
        assert_eq!(fs::read_to_string(dest.join("package.xml"))?, "<Package/>");
        Ok(())
    }

    #[test]
    fn refuses_entries_outside_destination() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let dest = temp.path().join("out");

        let mut archive = Archive::new();
        archive.push(ArchiveEntry::new("../escape.txt", "nope"))?;

        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(!temp.path().join("escape.txt").exists());
        Ok(())
    }

    #[test]
    fn normalises_enclosed_paths() {
        assert_eq!(enclosed_path("a/./b/../c.txt"), Some(PathBuf::from("a/c.txt")));
        assert_eq!(enclosed_path("a\\b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(enclosed_path("/etc/passwd"), None);
        assert_eq!(enclosed_path("a/../../b"), None);
        assert_eq!(enclosed_path("./"), None);
    }
}
