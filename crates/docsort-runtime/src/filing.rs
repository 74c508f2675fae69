//! Filing: where a document goes, and moving it there.

use std::path::{Path, PathBuf};

use tracing::debug;

use docsort_core::{
    validate_category_name, CategorySnapshot, DocSortConfig, Error, Result, UnknownLabelPolicy,
    UNCATEGORIZED,
};

/// Turn a classifier label into the category a document is filed under.
///
/// Empty labels, the sentinel in any casing, and labels that cannot be used
/// as a single folder name all resolve to [`UNCATEGORIZED`]. Labels outside
/// the configured set follow `policy`.
pub fn resolve_category(
    label: &str,
    snapshot: &CategorySnapshot,
    policy: UnknownLabelPolicy,
) -> String {
    let label = label.trim();
    if label.is_empty() || label.eq_ignore_ascii_case(UNCATEGORIZED) {
        return UNCATEGORIZED.to_string();
    }
    if validate_category_name(label).is_err() {
        debug!("Label {:?} is not a usable folder name", label);
        return UNCATEGORIZED.to_string();
    }
    if snapshot.contains(label) {
        return label.to_string();
    }
    match policy {
        UnknownLabelPolicy::Accept => label.to_string(),
        UnknownLabelPolicy::Reject => UNCATEGORIZED.to_string(),
    }
}

/// Moves documents into `{output_root}/{category}` (or a folder override).
#[derive(Debug, Clone)]
pub struct FilingEngine {
    output_root: PathBuf,
    holding_folder: String,
}

impl FilingEngine {
    pub fn new(output_root: impl Into<PathBuf>, holding_folder: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            holding_folder: holding_folder.into(),
        }
    }

    pub fn from_config(config: &DocSortConfig) -> Self {
        Self::new(&config.output_root, &config.holding_folder)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Folder for documents no category fits.
    pub fn holding_dir(&self) -> PathBuf {
        self.output_root.join(&self.holding_folder)
    }

    /// [`resolve_category`], with the holding folder's own name treated like
    /// the sentinel so nothing lands there as a regular category.
    pub fn resolve(
        &self,
        label: &str,
        snapshot: &CategorySnapshot,
        policy: UnknownLabelPolicy,
    ) -> String {
        self.canonical(&resolve_category(label, snapshot, policy))
    }

    /// Map the sentinel in any casing, or the holding folder's name, to
    /// [`UNCATEGORIZED`].
    pub fn canonical(&self, category: &str) -> String {
        if category.eq_ignore_ascii_case(UNCATEGORIZED)
            || category.eq_ignore_ascii_case(&self.holding_folder)
        {
            UNCATEGORIZED.to_string()
        } else {
            category.to_string()
        }
    }

    /// Target directory for `category` under `snapshot`.
    pub fn destination_dir(&self, category: &str, snapshot: &CategorySnapshot) -> PathBuf {
        if category == UNCATEGORIZED {
            return self.holding_dir();
        }
        match snapshot.folder_for(category) {
            Some(folder) => folder.to_path_buf(),
            None => self.output_root.join(category),
        }
    }

    /// Move `source` into the folder for `category`, keeping its file name.
    /// Blocking.
    pub fn file(&self, source: &Path, category: &str, snapshot: &CategorySnapshot) -> Result<PathBuf> {
        self.move_into(source, &self.destination_dir(category, snapshot))
    }

    /// Move `source` into the holding folder. Blocking.
    pub fn file_to_holding(&self, source: &Path) -> Result<PathBuf> {
        self.move_into(source, &self.holding_dir())
    }

    /// Rename `source` into `dir`. An existing file of the same name is
    /// replaced. On failure the source stays where it was.
    fn move_into(&self, source: &Path, dir: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| Error::FilingError(format!("no file name: {}", source.display())))?;

        std::fs::create_dir_all(dir)
            .map_err(|e| Error::FilingError(format!("create {}: {}", dir.display(), e)))?;

        let destination = dir.join(name);
        std::fs::rename(source, &destination).map_err(|e| {
            Error::FilingError(format!(
                "move {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })?;

        debug!("Moved {} to {}", source.display(), destination.display());
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsort_core::{Category, ErrorKind};

    fn snapshot() -> CategorySnapshot {
        CategorySnapshot::new(vec![
            Category::new("Auto"),
            Category::new("Schule"),
            Category {
                name: "Versicherung".into(),
                folder: Some(PathBuf::from("/mnt/versicherung")),
            },
        ])
    }

    #[test]
    fn test_resolve_known_and_sentinel() {
        let snap = snapshot();
        let accept = UnknownLabelPolicy::Accept;
        assert_eq!(resolve_category(" Auto\n", &snap, accept), "Auto");
        assert_eq!(resolve_category("", &snap, accept), UNCATEGORIZED);
        assert_eq!(resolve_category("   ", &snap, accept), UNCATEGORIZED);
        assert_eq!(resolve_category("uncategorized", &snap, accept), UNCATEGORIZED);
    }

    #[test]
    fn test_resolve_unknown_label_follows_policy() {
        let snap = snapshot();
        assert_eq!(
            resolve_category("Steuer", &snap, UnknownLabelPolicy::Accept),
            "Steuer"
        );
        assert_eq!(
            resolve_category("Steuer", &snap, UnknownLabelPolicy::Reject),
            UNCATEGORIZED
        );
    }

    #[test]
    fn test_resolve_rejects_path_like_labels() {
        let snap = snapshot();
        let accept = UnknownLabelPolicy::Accept;
        assert_eq!(resolve_category("../etc", &snap, accept), UNCATEGORIZED);
        assert_eq!(resolve_category("a/b", &snap, accept), UNCATEGORIZED);
        assert_eq!(resolve_category("..", &snap, accept), UNCATEGORIZED);
    }

    #[test]
    fn test_holding_folder_name_resolves_to_sentinel() {
        let engine = FilingEngine::new("/out", "Inbox");
        let snap = snapshot();
        let accept = UnknownLabelPolicy::Accept;
        assert_eq!(engine.resolve("Inbox", &snap, accept), UNCATEGORIZED);
        assert_eq!(engine.resolve("inbox", &snap, accept), UNCATEGORIZED);
        assert_eq!(engine.resolve("Auto", &snap, accept), "Auto");
        assert_eq!(engine.canonical("UNCATEGORIZED"), UNCATEGORIZED);
        assert_eq!(engine.canonical("Steuer"), "Steuer");
    }

    #[test]
    fn test_destination_dir() {
        let engine = FilingEngine::new("/out", "Inbox");
        let snap = snapshot();
        assert_eq!(engine.destination_dir("Auto", &snap), PathBuf::from("/out/Auto"));
        assert_eq!(
            engine.destination_dir("Versicherung", &snap),
            PathBuf::from("/mnt/versicherung")
        );
        assert_eq!(
            engine.destination_dir(UNCATEGORIZED, &snap),
            PathBuf::from("/out/Inbox")
        );
        // Ad-hoc categories get a folder under the output root.
        assert_eq!(engine.destination_dir("Steuer", &snap), PathBuf::from("/out/Steuer"));
    }

    #[test]
    fn test_file_moves_and_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Input");
        std::fs::create_dir_all(&input).unwrap();
        let source = input.join("zeugnis.pdf");
        std::fs::write(&source, b"content").unwrap();

        let engine = FilingEngine::new(dir.path().join("Output"), UNCATEGORIZED);
        let dest = engine.file(&source, "Schule", &snapshot()).unwrap();

        assert_eq!(dest, dir.path().join("Output/Schule/zeugnis.pdf"));
        assert!(dest.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_file_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FilingEngine::new(dir.path().join("Output"), UNCATEGORIZED);
        let existing = dir.path().join("Output/Auto/a.pdf");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"old").unwrap();

        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"new").unwrap();
        engine.file(&source, "Auto", &snapshot()).unwrap();

        assert_eq!(std::fs::read(&existing).unwrap(), b"new");
    }

    #[test]
    fn test_failed_move_leaves_source_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Output");
        std::fs::create_dir_all(&output).unwrap();
        // A regular file where the category folder should be.
        std::fs::write(output.join("Auto"), b"not a dir").unwrap();

        let source = dir.path().join("a.pdf");
        std::fs::write(&source, b"x").unwrap();

        let engine = FilingEngine::new(&output, UNCATEGORIZED);
        let err = engine.file(&source, "Auto", &snapshot()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilingError);
        assert!(source.exists());
    }

    #[test]
    fn test_file_to_holding() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FilingEngine::new(dir.path(), "Uncategorized");
        let source = dir.path().join("scan.pdf");
        std::fs::write(&source, b"x").unwrap();
        let dest = engine.file_to_holding(&source).unwrap();
        assert_eq!(dest, dir.path().join("Uncategorized/scan.pdf"));
    }
}
