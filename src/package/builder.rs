//! Zip packaging of unit directories.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::changeset::UnitName;
use crate::error::{BuildError, FnshipError, Result};

/// A freshly built deployment archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Unit the archive was built for.
    pub unit: UnitName,
    /// Where the archive was written.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Number of regular files packaged.
    pub file_count: usize,
    /// Hex sha256 of the archive.
    pub sha256: String,
}

/// Builds one zip per unit into an artifact directory.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    /// Output directory for archives.
    artifact_dir: PathBuf,
}

enum Entry {
    Dir(String),
    File { name: String, path: PathBuf, mode: u32 },
}

impl PackageBuilder {
    /// Creates a builder writing into `artifact_dir`.
    #[must_use]
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Returns the archive path for a unit.
    #[must_use]
    pub fn artifact_path(&self, unit: &UnitName) -> PathBuf {
        self.artifact_dir.join(format!("{unit}.zip"))
    }

    /// Packages every file under `unit_dir` into `<artifact_dir>/<unit>.zip`.
    ///
    /// Entries are written in sorted order with a fixed timestamp, so the
    /// same tree always yields the same archive bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing, is not a directory,
    /// holds no files, or the archive cannot be written.
    pub fn build(&self, unit: &UnitName, unit_dir: &Path) -> Result<Archive> {
        match fs::metadata(unit_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(FnshipError::Build(BuildError::NotADirectory {
                    path: unit_dir.to_path_buf(),
                }));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FnshipError::Build(BuildError::MissingDirectory {
                    path: unit_dir.to_path_buf(),
                }));
            }
            Err(e) => return Err(e.into()),
        }

        let mut entries = Vec::new();
        collect_entries(unit_dir, unit_dir, &mut entries)?;

        let file_count = entries
            .iter()
            .filter(|e| matches!(e, Entry::File { .. }))
            .count();
        if file_count == 0 {
            return Err(FnshipError::Build(BuildError::EmptyDirectory {
                path: unit_dir.to_path_buf(),
            }));
        }

        let archive_path = self.artifact_path(unit);
        write_archive(&archive_path, &entries)
            .map_err(|message| BuildError::archive_write(&archive_path, message))?;

        let bytes = fs::read(&archive_path)
            .map_err(|e| BuildError::archive_write(&archive_path, e.to_string()))?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        info!(
            "Packaged {unit}: {file_count} file(s), {} bytes -> {}",
            bytes.len(),
            archive_path.display()
        );

        Ok(Archive {
            unit: unit.clone(),
            path: archive_path,
            size_bytes: bytes.len() as u64,
            file_count,
            sha256,
        })
    }
}

/// Walks `dir` in sorted order, recording entries relative to `root`.
fn collect_entries(root: &Path, dir: &Path, entries: &mut Vec<Entry>) -> Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    children.sort();

    for path in children {
        let meta = fs::metadata(&path)?;
        let name = archive_name(root, &path);

        if meta.is_dir() {
            entries.push(Entry::Dir(name));
            collect_entries(root, &path, entries)?;
        } else if meta.is_file() {
            entries.push(Entry::File {
                name,
                path,
                mode: file_mode(&meta),
            });
        } else {
            debug!("Skipping special file {}", path.display());
        }
    }

    Ok(())
}

fn write_archive(archive_path: &Path, entries: &[Entry]) -> std::result::Result<(), String> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(archive_path).map_err(|e| e.to_string())?;
    let mut zip = ZipWriter::new(file);

    for entry in entries {
        match entry {
            Entry::Dir(name) => {
                zip.add_directory(format!("{name}/"), entry_options(0o755))
                    .map_err(|e| e.to_string())?;
            }
            Entry::File { name, path, mode } => {
                zip.start_file(name.clone(), entry_options(*mode))
                    .map_err(|e| e.to_string())?;
                let mut source = File::open(path)
                    .map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
                io::copy(&mut source, &mut zip).map_err(|e| e.to_string())?;
            }
        }
    }

    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

/// Deflated entry with a fixed 1980-01-01 timestamp.
fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(mode)
}

/// Path of `path` inside the archive: relative to `root`, `/`-separated.
fn archive_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    // the function runtime only needs read access, executables keep x
    (meta.permissions().mode() & 0o777) | 0o444
}

#[cfg(not(unix))]
const fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn unit(name: &str) -> UnitName {
        UnitName::new(name).unwrap()
    }

    fn setup() -> (TempDir, PackageBuilder) {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let builder = PackageBuilder::new(temp.path().join("artifacts"));
        (temp, builder)
    }

    #[test]
    fn test_build_nested_directory() {
        let (temp, builder) = setup();
        let dir = temp.path().join("alpha");
        fs::create_dir_all(dir.join("lib/deep")).unwrap();
        fs::write(dir.join("lambda_function.py"), "def lambda_handler(e, c): pass\n").unwrap();
        fs::write(dir.join("lib/util.py"), "X = 1\n").unwrap();
        fs::write(dir.join("lib/deep/data.json"), "{}\n").unwrap();

        let archive = builder.build(&unit("alpha"), &dir).unwrap();

        assert_eq!(archive.path, temp.path().join("artifacts/alpha.zip"));
        assert_eq!(archive.file_count, 3);
        assert!(archive.size_bytes > 0);
        assert_eq!(archive.sha256.len(), 64);

        let mut zip = zip::ZipArchive::new(File::open(&archive.path).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "lambda_function.py",
                "lib/",
                "lib/deep/",
                "lib/deep/data.json",
                "lib/util.py",
            ]
        );

        let mut content = String::new();
        zip.by_name("lib/util.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "X = 1\n");
    }

    #[test]
    fn test_build_is_reproducible() {
        let (temp, builder) = setup();
        let dir = temp.path().join("beta");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.py"), "a\n").unwrap();
        fs::write(dir.join("b.py"), "b\n").unwrap();

        let first = builder.build(&unit("beta"), &dir).unwrap();
        let second = builder.build(&unit("beta"), &dir).unwrap();
        assert_eq!(first.sha256, second.sha256);
    }

    #[test]
    fn test_missing_directory_fails() {
        let (temp, builder) = setup();
        let err = builder
            .build(&unit("ghost"), &temp.path().join("ghost"))
            .unwrap_err();
        assert!(matches!(
            err,
            FnshipError::Build(BuildError::MissingDirectory { .. })
        ));
    }

    #[test]
    fn test_empty_directory_fails() {
        let (temp, builder) = setup();
        let dir = temp.path().join("hollow");
        fs::create_dir_all(dir.join("only/subdirs")).unwrap();

        let err = builder.build(&unit("hollow"), &dir).unwrap_err();
        assert!(matches!(
            err,
            FnshipError::Build(BuildError::EmptyDirectory { .. })
        ));
        assert!(!builder.artifact_path(&unit("hollow")).exists());
    }

    #[test]
    fn test_file_path_is_not_a_directory() {
        let (temp, builder) = setup();
        let file = temp.path().join("plain.py");
        fs::write(&file, "x\n").unwrap();

        let err = builder.build(&unit("plain"), &file).unwrap_err();
        assert!(matches!(
            err,
            FnshipError::Build(BuildError::NotADirectory { .. })
        ));
    }
}
