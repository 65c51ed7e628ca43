//! Local chart archive extraction.
//!
//! Every member is checked before anything is written: an archive holding a
//! single member that would land outside the destination is rejected as a
//! whole.

use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, warn};

use crate::error::{NoopsError, PackageError, Result};

/// Returns true if `chart` names a local archive rather than a search keyword.
#[must_use]
pub fn is_local_archive(chart: &str) -> bool {
    chart.ends_with(".tgz") || chart.ends_with(".tar.gz")
}

/// Extracts the gzipped chart archive into `dst`.
///
/// Returns the chart directory, the top-level directory of the archive.
///
/// # Errors
///
/// Returns `UnsafeArchiveEntry` if any member escapes `dst`, or an IO error.
pub fn extract_chart(archive: &Path, dst: &Path) -> Result<PathBuf> {
    debug!("Extracting {} into {}", archive.display(), dst.display());
    if !archive.exists() {
        return Err(NoopsError::file_not_found(archive));
    }

    let top = validate(open(archive)?)?;

    let mut tar = open(archive)?;
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.unpack_in(dst)? {
            let name = entry.path()?.display().to_string();
            warn!("Archive member {name} was refused by the unpacker");
            return Err(PackageError::UnsafeArchiveEntry { entry: name }.into());
        }
    }

    top.map(|dir| dst.join(dir)).ok_or_else(|| {
        NoopsError::from(PackageError::InvalidChartDescriptor {
            path: archive.to_path_buf(),
            message: "archive is empty".to_string(),
        })
    })
}

fn open(archive: &Path) -> Result<Archive<GzDecoder<File>>> {
    Ok(Archive::new(GzDecoder::new(File::open(archive)?)))
}

/// Checks every member, returning the first top-level directory.
///
/// Links are resolved lexically, and no member or link target may pass
/// through a link declared earlier in the archive.
fn validate<R: Read>(mut tar: Archive<R>) -> Result<Option<PathBuf>> {
    let mut top: Option<PathBuf> = None;
    let mut links: HashSet<PathBuf> = HashSet::new();

    for entry in tar.entries()? {
        let entry = entry?;
        let path = entry.path()?.into_owned();
        let unsafe_entry = || {
            NoopsError::from(PackageError::UnsafeArchiveEntry {
                entry: path.display().to_string(),
            })
        };

        let member = resolve(Path::new(""), &path, &links).ok_or_else(unsafe_entry)?;

        let kind = entry.header().entry_type();
        if matches!(kind, EntryType::Symlink | EntryType::Link) {
            let target = entry.link_name()?.ok_or_else(unsafe_entry)?.into_owned();
            let base = match kind {
                EntryType::Symlink => member.parent().unwrap_or(Path::new("")),
                _ => Path::new(""),
            };
            if member.as_os_str().is_empty()
                || target.is_absolute()
                || resolve(base, &target, &links).is_none()
            {
                return Err(unsafe_entry());
            }
            debug!("Archive link {} -> {}", path.display(), target.display());
            links.insert(member);
        }

        if top.is_none() {
            top = path
                .components()
                .find(|c| matches!(c, Component::Normal(_)))
                .map(|c| PathBuf::from(c.as_os_str()));
        }
    }

    Ok(top)
}

/// Lexical resolution of `rel` from `base`.
///
/// `None` once it climbs above the root, is not relative, or reaches one of
/// `links`.
fn resolve(base: &Path, rel: &Path, links: &HashSet<PathBuf>) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in base.components().chain(rel.components()) {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                if links.contains(&resolved) {
                    return None;
                }
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    fn regular(name: &[u8], data: &[u8]) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_cksum();
        header
    }

    fn write_archive(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).expect("Failed to create archive");
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in members {
            builder
                .append(&regular(name.as_bytes(), data.as_bytes()), data.as_bytes())
                .expect("Failed to append member");
        }
        builder
            .into_inner()
            .expect("Failed to finish tar")
            .finish()
            .expect("Failed to finish gzip");
    }

    #[test]
    fn test_extract_chart() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let archive = dir.path().join("demo-1.0.0.tgz");
        write_archive(
            &archive,
            &[
                ("demo/Chart.yaml", "name: demo\n"),
                ("demo/noops/values-default.yaml", "a: 1\n"),
            ],
        );

        let dst = dir.path().join("out");
        std::fs::create_dir(&dst).expect("Failed to create dst");
        let chart = extract_chart(&archive, &dst).expect("safe archive");

        assert_eq!(chart, dst.join("demo"));
        assert!(chart.join("noops/values-default.yaml").exists());
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let archive = dir.path().join("evil.tgz");
        write_archive(
            &archive,
            &[
                ("demo/Chart.yaml", "name: demo\n"),
                ("../../etc/passed", "owned\n"),
            ],
        );

        let dst = dir.path().join("a").join("b");
        std::fs::create_dir_all(&dst).expect("Failed to create dst");
        let err = extract_chart(&archive, &dst).expect_err("traversal must be rejected");

        assert!(matches!(
            err,
            NoopsError::Package(PackageError::UnsafeArchiveEntry { .. })
        ));
        assert!(!dir.path().join("etc/passed").exists());
        // nothing is written when the archive is refused
        assert!(!dst.join("demo").exists());
    }

    fn write_links(path: &Path, links: &[(&str, &str)]) {
        let file = File::create(path).expect("Failed to create archive");
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, target) in links {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            builder
                .append_link(&mut header, name, target)
                .expect("Failed to append link");
        }
        builder
            .into_inner()
            .expect("Failed to finish tar")
            .finish()
            .expect("Failed to finish gzip");
    }

    #[test]
    fn test_rejects_escaping_symlink() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let archive = dir.path().join("link.tgz");
        write_links(&archive, &[("demo/escape", "../../outside")]);

        let err = extract_chart(&archive, dir.path()).expect_err("escaping link");
        assert!(err.to_string().contains("demo/escape"));
    }

    #[test]
    fn test_rejects_symlink_chain() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("secret.txt"), "host secret\n").expect("secret");
        let dst = dir.path().join("a").join("b");
        std::fs::create_dir_all(&dst).expect("Failed to create dst");

        let archive = dir.path().join("chain.tgz");
        write_links(
            &archive,
            &[
                ("demo/l", ".."),
                ("demo/l/m", "../.."),
                ("demo/leak", "l/m/secret.txt"),
            ],
        );

        let err = extract_chart(&archive, &dst).expect_err("link chain must be rejected");
        assert!(matches!(
            err,
            NoopsError::Package(PackageError::UnsafeArchiveEntry { ref entry }) if entry == "demo/l/m"
        ));
        assert!(!dst.join("demo").exists());
    }

    #[test]
    fn test_rejects_target_through_earlier_link() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dst = dir.path().join("a").join("b");
        std::fs::create_dir_all(&dst).expect("Failed to create dst");

        let archive = dir.path().join("through.tgz");
        write_links(&archive, &[("demo/l", ".."), ("demo/leak", "l/../../secret.txt")]);

        let err = extract_chart(&archive, &dst).expect_err("target through a link");
        assert!(err.to_string().contains("demo/leak"));
        assert!(!dst.join("demo").exists());
    }

    #[test]
    fn test_resolve() {
        let none = HashSet::new();
        assert_eq!(
            resolve(Path::new(""), Path::new("a/b"), &none),
            Some(PathBuf::from("a/b"))
        );
        assert_eq!(
            resolve(Path::new("a"), Path::new("../b"), &none),
            Some(PathBuf::from("b"))
        );
        assert_eq!(resolve(Path::new("a"), Path::new("../../b"), &none), None);
        assert_eq!(resolve(Path::new(""), Path::new("/etc"), &none), None);

        let links = HashSet::from([PathBuf::from("demo/l")]);
        assert_eq!(resolve(Path::new("demo"), Path::new("l/x"), &links), None);
        assert_eq!(
            resolve(Path::new("demo"), Path::new("lx"), &links),
            Some(PathBuf::from("demo/lx"))
        );
    }

    #[test]
    fn test_is_local_archive() {
        assert!(is_local_archive("./charts/demo-1.0.0.tgz"));
        assert!(is_local_archive("demo.tar.gz"));
        assert!(!is_local_archive("noops/demo-++1.0.0"));
    }
}
