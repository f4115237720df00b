use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ConvertError, Result};

/// An input container found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    /// File name without the extension
    pub base_name: String,
    pub directory: PathBuf,
}

impl MediaFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let base_name = path
            .file_stem()
            .ok_or_else(|| {
                ConvertError::Config(format!("Invalid media filename: {}", path.display()))
            })?
            .to_string_lossy()
            .to_string();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self { path, base_name, directory })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        has_extension(&self.path, extension)
    }
}

/// Case-insensitive extension check, `extension` given without the dot
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// List the files directly inside `dir` whose extension matches, sorted by name
pub fn scan_directory<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<MediaFile>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(ConvertError::FileNotFound(dir.display().to_string()));
    }
    if !dir.is_dir() {
        return Err(ConvertError::Config(format!("{} is not a directory", dir.display())));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if has_extension(entry.path(), extension) {
            files.push(MediaFile::new(entry.path())?);
        } else {
            debug!("Ignoring {}", entry.path().display());
        }
    }

    info!("Found {} .{} file(s) in {}", files.len(), extension, dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn test_scan_matches_extension_case_insensitively() {
        let temp = TempDir::new().unwrap();
        temp.child("b.MKV").touch().unwrap();
        temp.child("a.mkv").touch().unwrap();
        temp.child("c.mp4").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();

        let files = scan_directory(temp.path(), "mkv").unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["a.mkv", "b.MKV"]);
        assert_eq!(files[1].base_name, "b");
        assert_eq!(files[0].directory, temp.path());
    }

    #[test]
    fn test_scan_does_not_recurse() {
        let temp = TempDir::new().unwrap();
        temp.child("top.mkv").touch().unwrap();
        temp.child("season1/episode.mkv").touch().unwrap();
        temp.child("folder.mkv").create_dir_all().unwrap();

        let files = scan_directory(temp.path(), "mkv").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].base_name, "top");
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(scan_directory(&missing, "mkv"), Err(ConvertError::FileNotFound(_))));
    }

    #[test]
    fn test_media_file_parts() {
        let file = MediaFile::new("/videos/The Movie (2020).mkv").unwrap();
        assert_eq!(file.base_name, "The Movie (2020)");
        assert_eq!(file.directory, PathBuf::from("/videos"));
        assert!(file.has_extension("MKV"));

        let bare = MediaFile::new("movie.mkv").unwrap();
        assert_eq!(bare.directory, PathBuf::from("."));
    }
}
