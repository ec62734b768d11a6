//! Data directory layout, tolerant history loading and atomic writes.
//!
//! ```text
//! <data_dir>/
//! ├── manifest.json
//! ├── recipes_index.json
//! ├── recipes/<id>.json
//! └── images/<hash>.jpg
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use recipefeed_shared::{DetailRecord, Manifest, RecipeFeedError, RecipeIndex, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INDEX_FILE: &str = "recipes_index.json";
pub const RECIPES_DIR: &str = "recipes";

/// Paths of the persisted documents under one data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn detail_path(&self, id: &str) -> PathBuf {
        self.root.join(RECIPES_DIR).join(format!("{id}.json"))
    }

    pub fn load_manifest(&self) -> Option<Manifest> {
        read_json_opt(&self.manifest_path())
    }

    pub fn load_index(&self) -> Option<RecipeIndex> {
        read_json_opt(&self.index_path())
    }

    pub fn load_detail(&self, id: &str) -> Option<DetailRecord> {
        read_json_opt(&self.detail_path(id))
    }
}

/// Read a JSON document. Missing and malformed files both yield `None`;
/// malformed ones are logged.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read previous document, treating as absent");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed previous document, treating as absent");
            None
        }
    }
}

/// Pretty JSON with a trailing newline.
pub fn render_json<T: Serialize>(data: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data).map_err(|e| {
        RecipeFeedError::validation(format!("JSON serialization failed: {e}"))
    })?;
    json.push('\n');
    Ok(json)
}

/// Write via a sibling temp file and rename.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| RecipeFeedError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, contents).map_err(|e| RecipeFeedError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RecipeFeedError::io(path, e))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote document");
    Ok(())
}

/// Documents to persist for one writing run.
#[derive(Debug)]
pub struct ArtifactSet<'a> {
    pub details: Vec<&'a DetailRecord>,
    pub index: &'a RecipeIndex,
    pub manifest: &'a Manifest,
}

/// Serialize everything first, then write details, the index and finally
/// the manifest. Returns the number of files written.
#[instrument(skip_all, fields(root = %layout.root().display(), details = set.details.len()))]
pub fn commit(layout: &DataLayout, set: &ArtifactSet<'_>) -> Result<usize> {
    let mut pending: Vec<(PathBuf, String)> = Vec::with_capacity(set.details.len() + 2);
    for detail in &set.details {
        pending.push((layout.detail_path(&detail.id), render_json(*detail)?));
    }
    pending.push((layout.index_path(), render_json(set.index)?));
    pending.push((layout.manifest_path(), render_json(set.manifest)?));

    for (path, contents) in &pending {
        write_atomic(path, contents)?;
    }

    info!(files = pending.len(), "documents written");
    Ok(pending.len())
}
