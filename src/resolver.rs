//! Expansion of user-supplied path candidates into the list of files to validate.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

/// Suffix a directory entry must carry to be picked up (case-sensitive)
pub const XML_SUFFIX: &[u8] = b".xml";

/// A verified, existing regular file slated for validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    /// Path as it should be shown to the user
    pub path: PathBuf,
    /// Canonical identity used for duplicate detection
    #[serde(skip)]
    pub canonical: PathBuf,
}

impl fmt::Display for ResolvedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Insertion-ordered, duplicate-free list of files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    files: Vec<ResolvedFile>,
    seen: HashSet<PathBuf>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `file` unless a file with the same identity is already present.
    /// Returns whether the file was added.
    pub fn push(&mut self, file: ResolvedFile) -> bool {
        if !self.seen.insert(file.canonical.clone()) {
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedFile> {
        self.files.iter()
    }

    /// Display paths in list order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a ResolvedFile;
    type IntoIter = std::slice::Iter<'a, ResolvedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Result of resolving a candidate list
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub files: FileList,
    pub diagnostics: Vec<String>,
}

/// Expands files and directories into a [`FileList`].
///
/// Directories contribute their immediate `.xml` children, in listing order,
/// at the position the directory appeared. Explicit files are taken as-is
/// regardless of extension. Missing candidates produce a diagnostic and are
/// otherwise skipped; readability is not checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSetResolver;

impl FileSetResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve<I, S>(&self, candidates: I) -> Resolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let mut resolution = Resolution::default();

        for candidate in candidates {
            let path = candidate.as_ref();

            match fs::metadata(path).await {
                Ok(metadata) if metadata.is_dir() => {
                    self.expand_directory(path, &mut resolution).await;
                }
                Ok(metadata) if metadata.is_file() => {
                    let file = identify(path.to_path_buf()).await;
                    if !resolution.files.push(file) {
                        tracing::debug!("Skipping duplicate file {}", path.display());
                    }
                }
                Ok(_) => {
                    tracing::debug!("Ignoring {}: neither a file nor a directory", path.display());
                }
                Err(e) => {
                    tracing::debug!("Unable to inspect {}: {}", path.display(), e);
                    resolution.diagnostics.push(format!(
                        "The specified file ({}) does not exist",
                        path.display()
                    ));
                }
            }
        }

        tracing::debug!(
            files = resolution.files.len(),
            diagnostics = resolution.diagnostics.len(),
            "Resolved candidates"
        );
        resolution
    }

    async fn expand_directory(&self, dir: &Path, resolution: &mut Resolution) {
        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::debug!("Unable to list directory {}: {}", dir.display(), e);
                resolution.diagnostics.push(format!(
                    "Unable to list the specified folder ({}): {}",
                    dir.display(),
                    e
                ));
                return;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Error reading directory {}: {}", dir.display(), e);
                    break;
                }
            };

            let entry_path = entry.path();
            if !has_xml_suffix(&entry_path) {
                continue;
            }

            // Follows symlinks, so a link to a regular file counts as a file.
            match fs::metadata(&entry_path).await {
                Ok(metadata) if metadata.is_file() => {
                    resolution.files.push(identify(entry_path).await);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", entry_path.display(), e);
                }
            }
        }
    }
}

fn has_xml_suffix(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.as_encoded_bytes().ends_with(XML_SUFFIX))
        .unwrap_or(false)
}

/// Attach a canonical identity to `path`, falling back to an absolute path
async fn identify(path: PathBuf) -> ResolvedFile {
    let canonical = match fs::canonicalize(&path).await {
        Ok(canonical) => canonical,
        Err(_) => std::path::absolute(&path).unwrap_or_else(|_| path.clone()),
    };

    ResolvedFile { path, canonical }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path_str(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    fn create_test_directory() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        std::fs::write(root.join("a.xml"), "<a/>").unwrap();
        std::fs::write(root.join("b.xml"), "<b/>").unwrap();
        std::fs::write(root.join("notes.txt"), "text").unwrap();
        std::fs::write(root.join("upper.XML"), "<c/>").unwrap();
        std::fs::create_dir(root.join("nested.xml")).unwrap();
        std::fs::write(root.join("nested.xml").join("deep.xml"), "<d/>").unwrap();

        temp_dir
    }

    #[tokio::test]
    async fn test_directory_contributes_immediate_xml_files_only() {
        let temp_dir = create_test_directory();
        let resolution = FileSetResolver::new()
            .resolve([path_str(temp_dir.path())])
            .await;

        let mut names: Vec<String> = resolution
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.xml", "b.xml"]);
        assert!(resolution.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_file_is_trusted_without_suffix() {
        let temp_dir = create_test_directory();
        let notes = temp_dir.path().join("notes.txt");

        let resolution = FileSetResolver::new().resolve([path_str(&notes)]).await;

        assert_eq!(resolution.files.paths(), vec![notes]);
    }

    #[tokio::test]
    async fn test_missing_candidate_records_diagnostic() {
        let temp_dir = TempDir::new().unwrap();
        let missing = path_str(&temp_dir.path().join("missing.xml"));

        let resolution = FileSetResolver::new().resolve([missing.clone()]).await;

        assert!(resolution.files.is_empty());
        assert_eq!(
            resolution.diagnostics,
            vec![format!("The specified file ({}) does not exist", missing)]
        );
    }

    #[tokio::test]
    async fn test_same_file_twice_is_listed_once() {
        let temp_dir = create_test_directory();
        let a = path_str(&temp_dir.path().join("a.xml"));

        let resolution = FileSetResolver::new().resolve([a.clone(), a]).await;

        assert_eq!(resolution.files.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_detected_through_different_spellings() {
        let temp_dir = create_test_directory();
        let direct = temp_dir.path().join("a.xml");
        let dotted = temp_dir.path().join(".").join("a.xml");

        let resolution = FileSetResolver::new()
            .resolve([path_str(&direct), path_str(temp_dir.path()), path_str(&dotted)])
            .await;

        // a.xml from the explicit argument, b.xml from the directory
        assert_eq!(resolution.files.len(), 2);
        assert_eq!(resolution.files.paths()[0], direct);
    }

    #[tokio::test]
    async fn test_directory_entries_appear_at_directory_position() {
        let temp_dir = create_test_directory();
        let other = TempDir::new().unwrap();
        let before = other.path().join("before.xml");
        let after = other.path().join("after.xml");
        std::fs::write(&before, "<x/>").unwrap();
        std::fs::write(&after, "<y/>").unwrap();

        let resolution = FileSetResolver::new()
            .resolve([path_str(&before), path_str(temp_dir.path()), path_str(&after)])
            .await;

        let paths = resolution.files.paths();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], before);
        assert_eq!(paths[3], after);
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let resolution = FileSetResolver::new()
            .resolve([path_str(temp_dir.path())])
            .await;

        assert!(resolution.files.is_empty());
        assert!(resolution.diagnostics.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_names_are_resolved() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let temp_dir = TempDir::new().unwrap();
        let name = OsString::from_vec(b"caf\xe9.xml".to_vec());
        let file = temp_dir.path().join(&name);
        if std::fs::write(&file, "<a/>").is_err() {
            // Filesystem insists on UTF-8 names
            return;
        }

        let from_folder = FileSetResolver::new().resolve([temp_dir.path()]).await;
        assert_eq!(from_folder.files.paths(), vec![file.clone()]);

        let explicit = FileSetResolver::new().resolve([&file]).await;
        assert_eq!(explicit.files.paths(), vec![file]);
        assert!(explicit.diagnostics.is_empty());
    }

    #[test]
    fn test_xml_suffix_is_case_sensitive() {
        assert!(has_xml_suffix(Path::new("/data/a.xml")));
        assert!(!has_xml_suffix(Path::new("/data/a.XML")));
        assert!(!has_xml_suffix(Path::new("/data/axml")));
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let resolution = FileSetResolver::new().resolve(Vec::<String>::new()).await;
        assert!(resolution.files.is_empty());
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_file_list_rejects_same_identity() {
        let mut list = FileList::new();
        let first = ResolvedFile {
            path: PathBuf::from("a.xml"),
            canonical: PathBuf::from("/data/a.xml"),
        };
        let second = ResolvedFile {
            path: PathBuf::from("./a.xml"),
            canonical: PathBuf::from("/data/a.xml"),
        };

        assert!(list.push(first));
        assert!(!list.push(second));
        assert_eq!(list.paths(), vec![PathBuf::from("a.xml")]);
    }
}
