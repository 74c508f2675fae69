//! Category configuration: CRUD with whole-file atomic persistence.
//!
//! The category list is the only piece of configuration the operator edits
//! while the watcher is live. Every component that needs it holds a
//! `CategoryStore` handle and takes a [`CategorySnapshot`] per document, so a
//! concurrent edit never changes the set halfway through one document.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Reserved sentinel for documents that could not be placed.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Categories seeded on first run.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Schule",
    "Versicherung",
    "Immobile - Hertastr",
    "Immobile - Saarbrückerplatz",
    "Auto",
];

/// One configured category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Dedicated output folder; `None` means `{output_root}/{name}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CategoryFile {
    #[serde(default)]
    categories: Vec<Category>,
}

/// Immutable view of the category list at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySnapshot {
    categories: Vec<Category>,
}

impl CategorySnapshot {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Category names in configured order.
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
    }

    /// Folder override for a category, if one is configured.
    pub fn folder_for(&self, name: &str) -> Option<&Path> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.folder.as_deref())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Checks that a name can be used both as a category and as one path component.
pub fn validate_category_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(|c| c.is_control())
    {
        return Err(Error::InvalidCategory(name.to_string()));
    }
    Ok(())
}

/// Identity of the file contents the in-memory list was read from.
type FileStamp = Option<(SystemTime, u64)>;

fn file_stamp(path: &Path) -> FileStamp {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

struct Loaded {
    categories: Vec<Category>,
    stamp: FileStamp,
}

/// Persistent, thread-safe category list.
///
/// Several processes may hold a store on the same file (a running server and
/// a one-shot CLI edit). Reads pick up changes made elsewhere once the file's
/// modification stamp moves, and every edit is applied to the file's current
/// contents rather than to this handle's copy.
pub struct CategoryStore {
    path: PathBuf,
    loaded: RwLock<Loaded>,
}

impl CategoryStore {
    /// Load the store, seeding and persisting the defaults if the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let categories = match read_file(&path) {
            Ok(categories) => categories,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                let seeded: Vec<Category> =
                    DEFAULT_CATEGORIES.iter().map(|n| Category::new(*n)).collect();
                write_atomic(&path, &seeded)?;
                info!("Initialized {} with {} default categories", path.display(), seeded.len());
                seeded
            }
            Err(e) => return Err(e),
        };

        info!("CategoryStore: {} categories loaded", categories.len());

        let stamp = file_stamp(&path);
        Ok(Self {
            path,
            loaded: RwLock::new(Loaded { categories, stamp }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Category names in configured order.
    pub fn categories(&self) -> Vec<String> {
        self.refresh();
        self.loaded.read().categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Consistent copy of the current configuration.
    pub fn snapshot(&self) -> CategorySnapshot {
        self.refresh();
        CategorySnapshot::new(self.loaded.read().categories.clone())
    }

    /// Re-read the file if it changed since it was last read or written.
    /// A file that is missing or malformed keeps the last good list.
    fn refresh(&self) {
        let stamp = file_stamp(&self.path);
        if stamp.is_none() || stamp == self.loaded.read().stamp {
            return;
        }

        let mut loaded = self.loaded.write();
        if stamp == loaded.stamp {
            return;
        }
        match read_file(&self.path) {
            Ok(categories) => {
                debug!("Reloaded {} categories from {}", categories.len(), self.path.display());
                loaded.categories = categories;
                loaded.stamp = stamp;
            }
            Err(e) => warn!("Keeping previous categories: {}", e),
        }
    }

    /// Add a category. Fails if the name is taken, reserved, or malformed.
    pub fn add(&self, name: &str, folder: Option<PathBuf>) -> Result<Vec<String>> {
        check_assignable(name)?;
        self.mutate(|categories| {
            if categories.iter().any(|c| c.name == name) {
                return Err(Error::DuplicateCategory(name.to_string()));
            }
            categories.push(Category {
                name: name.to_string(),
                folder,
            });
            Ok(())
        })?;
        info!("Category '{}' added", name);
        Ok(self.categories())
    }

    /// Rename a category in place, keeping its position and folder override.
    pub fn rename(&self, old: &str, new: &str) -> Result<Vec<String>> {
        check_assignable(new)?;
        self.mutate(|categories| {
            let idx = categories
                .iter()
                .position(|c| c.name == old)
                .ok_or_else(|| Error::NotFound(format!("category '{old}'")))?;
            if new != old && categories.iter().any(|c| c.name == new) {
                return Err(Error::DuplicateCategory(new.to_string()));
            }
            categories[idx].name = new.to_string();
            Ok(())
        })?;
        info!("Category '{}' renamed to '{}'", old, new);
        Ok(self.categories())
    }

    /// Set or clear the dedicated output folder of a category.
    pub fn set_folder(&self, name: &str, folder: Option<PathBuf>) -> Result<Vec<String>> {
        self.mutate(|categories| {
            let category = categories
                .iter_mut()
                .find(|c| c.name == name)
                .ok_or_else(|| Error::NotFound(format!("category '{name}'")))?;
            category.folder = folder;
            Ok(())
        })?;
        info!("Category '{}' folder updated", name);
        Ok(self.categories())
    }

    /// Remove a category.
    pub fn delete(&self, name: &str) -> Result<Vec<String>> {
        self.mutate(|categories| {
            let len_before = categories.len();
            categories.retain(|c| c.name != name);
            if categories.len() == len_before {
                return Err(Error::NotFound(format!("category '{name}'")));
            }
            Ok(())
        })?;
        info!("Category '{}' deleted", name);
        Ok(self.categories())
    }

    /// Apply an edit to the file's current contents, persist it, then publish
    /// it. The write lock is held throughout so edits through this handle are
    /// serialized.
    fn mutate<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Category>) -> Result<()>,
    {
        let mut loaded = self.loaded.write();
        let mut next = match read_file(&self.path) {
            Ok(categories) => categories,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                loaded.categories.clone()
            }
            Err(e) => return Err(e),
        };
        edit(&mut next)?;
        write_atomic(&self.path, &next)?;
        loaded.categories = next;
        loaded.stamp = file_stamp(&self.path);
        Ok(())
    }
}

/// Parse the category file, dropping the reserved sentinel if present.
fn read_file(path: &Path) -> Result<Vec<Category>> {
    let data = std::fs::read_to_string(path)?;
    let file: CategoryFile = serde_json::from_str(&data)
        .map_err(|e| Error::Config(format!("{} is not valid: {}", path.display(), e)))?;
    let mut categories = file.categories;
    let before = categories.len();
    categories.retain(|c| c.name != UNCATEGORIZED);
    if categories.len() != before {
        warn!("Ignoring reserved category '{}' in {}", UNCATEGORIZED, path.display());
    }
    Ok(categories)
}

fn check_assignable(name: &str) -> Result<()> {
    validate_category_name(name)?;
    if name == UNCATEGORIZED {
        return Err(Error::ReservedCategory(name.to_string()));
    }
    Ok(())
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, categories: &[Category]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = CategoryFile {
        categories: categories.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (CategoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = CategoryStore::load(dir.path().join("categories.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_load_seeds_defaults_and_persists() {
        let (store, dir) = test_store();
        assert_eq!(store.categories(), DEFAULT_CATEGORIES);
        assert!(dir.path().join("categories.json").exists());

        let reloaded = CategoryStore::load(dir.path().join("categories.json")).unwrap();
        assert_eq!(reloaded.categories(), DEFAULT_CATEGORIES);
    }

    #[test]
    fn test_add_duplicate_fails_without_change() {
        let (store, _dir) = test_store();
        store.add("Steuer", None).unwrap();
        let count = store.categories().len();

        let result = store.add("Steuer", None);
        assert!(matches!(result, Err(Error::DuplicateCategory(_))));
        assert_eq!(store.categories().len(), count);
    }

    #[test]
    fn test_add_reserved_and_invalid() {
        let (store, _dir) = test_store();
        assert!(matches!(
            store.add(UNCATEGORIZED, None),
            Err(Error::ReservedCategory(_))
        ));
        assert!(matches!(store.add("", None), Err(Error::InvalidCategory(_))));
        assert!(matches!(store.add("a/b", None), Err(Error::InvalidCategory(_))));
        assert!(matches!(store.add("..", None), Err(Error::InvalidCategory(_))));
        assert!(matches!(store.add(" Auto", None), Err(Error::InvalidCategory(_))));
    }

    #[test]
    fn test_rename_round_trip_restores_list() {
        let (store, _dir) = test_store();
        store
            .set_folder("Auto", Some(PathBuf::from("/srv/docs/auto")))
            .unwrap();
        let before = store.snapshot();

        store.rename("Auto", "Fahrzeug").unwrap();
        assert!(store.categories().contains(&"Fahrzeug".to_string()));
        assert_eq!(
            store.snapshot().folder_for("Fahrzeug"),
            Some(Path::new("/srv/docs/auto"))
        );

        store.rename("Fahrzeug", "Auto").unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_rename_errors() {
        let (store, _dir) = test_store();
        assert!(matches!(
            store.rename("Missing", "Other"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.rename("Auto", "Schule"),
            Err(Error::DuplicateCategory(_))
        ));
        // Renaming to itself is a no-op, not a conflict.
        store.rename("Auto", "Auto").unwrap();
    }

    #[test]
    fn test_delete() {
        let (store, _dir) = test_store();
        store.delete("Schule").unwrap();
        assert!(!store.categories().contains(&"Schule".to_string()));
        assert!(matches!(store.delete("Schule"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_mutations_survive_reload() {
        let (store, dir) = test_store();
        store.add("Steuer", Some(PathBuf::from("/tmp/steuer"))).unwrap();
        store.delete("Auto").unwrap();

        let reloaded = CategoryStore::load(dir.path().join("categories.json")).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert!(!dir.path().join("categories.json.tmp").exists());
    }

    #[test]
    fn test_failed_mutation_leaves_file_unchanged() {
        let (store, dir) = test_store();
        let path = dir.path().join("categories.json");
        let before = std::fs::read_to_string(&path).unwrap();

        let _ = store.add("Auto", None);
        let _ = store.delete("Nope");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(CategoryStore::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_edits_from_another_handle_are_kept() {
        let (server, dir) = test_store();
        let cli = CategoryStore::load(dir.path().join("categories.json")).unwrap();

        cli.add("Steuer", None).unwrap();
        server.add("Miete", None).unwrap();

        let names = server.categories();
        assert!(names.contains(&"Steuer".to_string()));
        assert!(names.contains(&"Miete".to_string()));

        let reloaded = CategoryStore::load(dir.path().join("categories.json")).unwrap();
        assert_eq!(reloaded.categories(), names);
    }

    #[test]
    fn test_snapshot_picks_up_external_change() {
        let (server, dir) = test_store();
        let cli = CategoryStore::load(dir.path().join("categories.json")).unwrap();

        cli.delete("Schule").unwrap();
        cli.rename("Auto", "KFZ").unwrap();

        let snapshot = server.snapshot();
        assert!(!snapshot.contains("Schule"));
        assert!(snapshot.contains("KFZ"));
        assert!(matches!(server.delete("Auto"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_malformed_external_edit_keeps_last_good_list() {
        let (store, dir) = test_store();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, "{ half written").unwrap();

        assert_eq!(store.categories(), DEFAULT_CATEGORIES);
        assert!(matches!(store.add("Steuer", None), Err(Error::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ half written");
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let (store, _dir) = test_store();
        let snapshot = store.snapshot();
        store.add("Steuer", None).unwrap();
        assert!(!snapshot.contains("Steuer"));
        assert!(store.snapshot().contains("Steuer"));
    }
}
