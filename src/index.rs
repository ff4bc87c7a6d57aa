//! Directory indexing: one record per case-normalized relative module path.

use std::collections::btree_map::{self, BTreeMap, Entry};
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::extract;
use crate::ports::FileSystem;
use crate::version::Version;

/// A module found under a scanned root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Path relative to the root with `/` separators, original casing.
    pub relative_path: String,
    /// Path as returned by the directory walk.
    pub full_path: PathBuf,
    /// Extracted version, if any.
    pub version: Option<Version>,
}

/// Sorted mapping from normalized key to the best-known record for it.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    records: BTreeMap<String, ModuleRecord>,
}

impl DirectoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, resolving a key collision with [`prefer_incoming`].
    ///
    /// A winning duplicate replaces the stored full path and version. The
    /// first-seen relative path is kept.
    pub fn merge(&mut self, record: ModuleRecord) {
        match self.records.entry(normalize_key(&record.relative_path)) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                if prefer_incoming(stored.version.as_ref(), record.version.as_ref()) {
                    stored.full_path = record.full_path;
                    stored.version = record.version;
                }
            }
        }
    }

    /// Looks up a record by normalized key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ModuleRecord> {
        self.records.get(key)
    }

    /// Normalized keys in sorted order.
    pub fn keys(&self) -> btree_map::Keys<'_, String, ModuleRecord> {
        self.records.keys()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the index holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lowercases a relative path and folds `\` to `/`.
#[must_use]
pub fn normalize_key(relative_path: &str) -> String {
    relative_path.replace('\\', "/").to_lowercase()
}

/// Decides whether an incoming duplicate replaces the stored record.
///
/// A structured version replaces a strictly lower structured one, and any
/// version replaces an absent one. Ties, opaque values and absent incoming
/// versions keep what is stored.
#[must_use]
pub fn prefer_incoming(existing: Option<&Version>, incoming: Option<&Version>) -> bool {
    match (existing, incoming) {
        (Some(Version::Structured(old)), Some(Version::Structured(new))) => new > old,
        (None, Some(_)) => true,
        _ => false,
    }
}

/// Scans `root` for modules with the given extension and extracts their
/// versions.
///
/// A missing root yields an empty index. Walk failures are logged and also
/// yield an empty index.
pub fn build_index(fs: &dyn FileSystem, root: &Path, extension: &str) -> DirectoryIndex {
    let mut index = DirectoryIndex::new();
    if !fs.is_dir(root) {
        info!(root = %root.display(), "root does not exist, nothing to index");
        return index;
    }

    let files = match fs.walk_files(root) {
        Ok(files) => files,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "could not walk tree");
            return index;
        }
    };

    for path in files.into_iter().filter(|p| has_extension(p, extension)) {
        let Some(relative_path) = relative_path(root, &path) else {
            warn!(path = %path.display(), "file outside of root, skipping");
            continue;
        };
        let version = extract::read_version(fs, &path);
        index.merge(ModuleRecord { relative_path, full_path: path, version });
    }

    info!(root = %root.display(), modules = index.len(), "indexed tree");
    index
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension().is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .strip_prefix(root)
        .ok()?
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
