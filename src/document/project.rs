//! Persisted project layout and the persistence boundary.
//!
//! Bitmaps are stored as base64 PNG strings inside camelCase JSON. A lightweight
//! [`ProjectSummary`] index allows listing projects without loading them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::document::frame::{Frame, FrameId, LayerImage};
use crate::document::layer::{Layer, LayerId};
use crate::document::store::LayerStore;
use crate::foundation::core::CanvasSize;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Identity of a saved project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn default_volume() -> f32 {
    1.0
}

/// An external audio file placed on the timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// Identity.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Source file.
    pub path: PathBuf,
    /// Start position on the timeline in milliseconds; negative values trim the head.
    #[serde(default)]
    pub offset_ms: i64,
    /// Linear gain.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Muted tracks are ignored on export.
    #[serde(default)]
    pub muted: bool,
}

impl AudioTrack {
    /// An unmuted track at unit volume starting at the beginning of the timeline.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            path: path.into(),
            offset_ms: 0,
            volume: 1.0,
            muted: false,
        }
    }
}

/// One frame as persisted: layer id to base64 PNG.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    /// Frame identity.
    pub id: FrameId,
    /// Encoded bitmap per layer.
    pub layers: BTreeMap<LayerId, String>,
}

/// Persisted project state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Identity.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Canvas dimensions.
    pub canvas_size: CanvasSize,
    /// Optional base64 PNG drawn under every frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Layer list, bottom first.
    pub layers: Vec<Layer>,
    /// Timeline.
    pub frames: Vec<FrameRecord>,
    /// Playback rate.
    pub fps: u32,
    /// Audio attached to the timeline.
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
}

/// Listing entry, kept separately from the full project.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Identity.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: u64,
    /// First frame thumbnail as a PNG data URL.
    pub thumbnail_url: String,
}

fn encode_png_b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn decode_png_b64(s: &str) -> FlipbookResult<Vec<u8>> {
    let raw = s.strip_prefix(DATA_URL_PREFIX).unwrap_or(s);
    STANDARD
        .decode(raw)
        .map_err(|e| FlipbookError::decode(format!("invalid base64 image: {e}")))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Project {
    /// Serialize a document.
    #[tracing::instrument(level = "debug", skip_all, fields(frames = store.frames().len()))]
    pub fn from_store(
        id: ProjectId,
        name: impl Into<String>,
        store: &LayerStore,
        fps: u32,
        audio_tracks: Vec<AudioTrack>,
    ) -> FlipbookResult<Self> {
        let mut frames = Vec::with_capacity(store.frames().len());
        for frame in store.frames() {
            let mut layers = BTreeMap::new();
            for layer in store.layers() {
                if let Some(cell) = frame.cell(layer.id) {
                    layers.insert(layer.id, encode_png_b64(&cell.to_png()?));
                }
            }
            frames.push(FrameRecord {
                id: frame.id,
                layers,
            });
        }
        let background_image = store
            .background_image()
            .map(|img| img.encode_png().map(|png| encode_png_b64(&png)))
            .transpose()?;
        Ok(Self {
            id,
            name: name.into(),
            canvas_size: store.canvas_size(),
            background_image,
            layers: store.layers().to_vec(),
            frames,
            fps,
            audio_tracks,
        })
    }

    /// Rebuild the document. Cell images stay encoded until first use; a cell whose base64 is
    /// malformed is dropped with a warning and backfilled blank.
    #[tracing::instrument(level = "debug", skip_all, fields(project = %self.id))]
    pub fn to_store(&self) -> FlipbookResult<LayerStore> {
        if self.fps == 0 {
            return Err(FlipbookError::validation("fps must be > 0"));
        }
        let canvas = CanvasSize::new(self.canvas_size.width, self.canvas_size.height)?;
        let mut frames = Vec::with_capacity(self.frames.len());
        for record in &self.frames {
            let mut frame = Frame::with_id(record.id);
            for (layer, data) in &record.layers {
                match decode_png_b64(data) {
                    Ok(bytes) => frame.set_cell(*layer, LayerImage::from_encoded(bytes)),
                    Err(err) => {
                        tracing::warn!(frame = %record.id, layer = %layer, error = %err, "skipping layer bitmap");
                    }
                }
            }
            frames.push(frame);
        }
        let background = match self.background_image.as_deref().map(decode_png_b64) {
            None => None,
            Some(bytes) => match bytes.and_then(|b| Bitmap::decode(&b)) {
                Ok(bmp) => Some(Arc::new(bmp)),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring undecodable background image");
                    None
                }
            },
        };
        LayerStore::from_parts(canvas, self.layers.clone(), frames, background)
    }

    /// Listing entry with a thumbnail of the first frame.
    pub fn summary(&self, thumbnail_edge: u32) -> FlipbookResult<ProjectSummary> {
        let mut store = self.to_store()?;
        let first = store.frames()[0].id;
        let thumbnail_url = match store.thumbnail(first, thumbnail_edge) {
            Some(thumb) => format!("{DATA_URL_PREFIX}{}", encode_png_b64(&thumb.encode_png()?)),
            None => String::new(),
        };
        Ok(ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            last_modified: now_millis(),
            thumbnail_url,
        })
    }

    /// Total duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.frames.len() as u64) * 1000 / u64::from(self.fps.max(1))
    }

    /// Parse project JSON.
    pub fn from_json(json: &str) -> FlipbookResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> FlipbookResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read a project file.
    pub fn read_file(path: &Path) -> FlipbookResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json(&json)
    }
}

/// Save/load keyed by project id, plus a summary listing.
///
/// A failed save leaves both the stored data and the caller's in-memory state untouched.
pub trait ProjectStore {
    /// Persist a project and update its summary.
    fn save(&mut self, project: &Project) -> FlipbookResult<ProjectSummary>;
    /// Load a full project.
    fn load(&self, id: ProjectId) -> FlipbookResult<Project>;
    /// Summaries, most recently modified first.
    fn list(&self) -> FlipbookResult<Vec<ProjectSummary>>;
    /// Remove a project. Returns `false` when it did not exist.
    fn delete(&mut self, id: ProjectId) -> FlipbookResult<bool>;
}

fn sort_recent_first(mut items: Vec<ProjectSummary>) -> Vec<ProjectSummary> {
    items.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    items
}

fn io_error(err: std::io::Error, what: String) -> FlipbookError {
    if err.kind() == std::io::ErrorKind::StorageFull {
        return FlipbookError::storage_full(what);
    }
    FlipbookError::Other(anyhow::Error::new(err).context(what))
}

/// One JSON file per project plus an `index.json` of summaries under a directory.
#[derive(Debug)]
pub struct DirProjectStore {
    root: PathBuf,
    thumbnail_edge: u32,
}

impl DirProjectStore {
    /// Use (and create) `root`.
    pub fn open(root: impl Into<PathBuf>, thumbnail_edge: u32) -> FlipbookResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create project directory '{}'", root.display()))?;
        Ok(Self {
            root,
            thumbnail_edge,
        })
    }

    fn project_path(&self, id: ProjectId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn read_index(&self) -> FlipbookResult<Vec<ProjectSummary>> {
        let path = self.index_path();
        match std::fs::read_to_string(&path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(io_error(err, format!("read '{}'", path.display()))),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> FlipbookResult<()> {
        let tmp = path.with_extension("json.tmp");
        if let Err(err) = std::fs::write(&tmp, contents) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_error(err, format!("write '{}'", tmp.display())));
        }
        std::fs::rename(&tmp, path)
            .map_err(|err| io_error(err, format!("rename into '{}'", path.display())))
    }

    fn write_index(&self, index: &[ProjectSummary]) -> FlipbookResult<()> {
        self.write_atomic(&self.index_path(), &serde_json::to_string(index)?)
    }
}

impl ProjectStore for DirProjectStore {
    #[tracing::instrument(level = "info", skip_all, fields(project = %project.id))]
    fn save(&mut self, project: &Project) -> FlipbookResult<ProjectSummary> {
        let summary = project.summary(self.thumbnail_edge)?;
        self.write_atomic(&self.project_path(project.id), &project.to_json()?)?;
        let mut index = self.read_index()?;
        index.retain(|s| s.id != project.id);
        index.push(summary.clone());
        self.write_index(&index)?;
        Ok(summary)
    }

    fn load(&self, id: ProjectId) -> FlipbookResult<Project> {
        Project::read_file(&self.project_path(id))
    }

    fn list(&self) -> FlipbookResult<Vec<ProjectSummary>> {
        Ok(sort_recent_first(self.read_index()?))
    }

    fn delete(&mut self, id: ProjectId) -> FlipbookResult<bool> {
        let path = self.project_path(id);
        let existed = match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => return Err(io_error(err, format!("remove '{}'", path.display()))),
        };
        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|s| s.id != id);
        if index.len() != before {
            self.write_index(&index)?;
        }
        Ok(existed)
    }
}

/// In-memory store with an optional byte quota over all stored JSON.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: HashMap<ProjectId, (String, ProjectSummary)>,
    quota: Option<usize>,
    thumbnail_edge: u32,
}

impl MemoryProjectStore {
    /// Unbounded store.
    pub fn new(thumbnail_edge: u32) -> Self {
        Self {
            projects: HashMap::new(),
            quota: None,
            thumbnail_edge,
        }
    }

    /// Store that refuses saves once the stored JSON would exceed `bytes`.
    pub fn with_quota(thumbnail_edge: u32, bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::new(thumbnail_edge)
        }
    }

    /// Bytes of JSON currently stored.
    pub fn used_bytes(&self) -> usize {
        self.projects.values().map(|(json, _)| json.len()).sum()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn save(&mut self, project: &Project) -> FlipbookResult<ProjectSummary> {
        let json = project.to_json()?;
        if let Some(quota) = self.quota {
            let replaced = self.projects.get(&project.id).map_or(0, |(j, _)| j.len());
            let needed = self.used_bytes() - replaced + json.len();
            if needed > quota {
                tracing::warn!(needed, quota, "project store quota exceeded");
                return Err(FlipbookError::storage_full(format!(
                    "saving '{}' needs {needed} bytes, quota is {quota}",
                    project.name
                )));
            }
        }
        let summary = project.summary(self.thumbnail_edge)?;
        self.projects.insert(project.id, (json, summary.clone()));
        Ok(summary)
    }

    fn load(&self, id: ProjectId) -> FlipbookResult<Project> {
        let (json, _) = self
            .projects
            .get(&id)
            .ok_or_else(|| FlipbookError::validation(format!("unknown project {id}")))?;
        Project::from_json(json)
    }

    fn list(&self) -> FlipbookResult<Vec<ProjectSummary>> {
        Ok(sort_recent_first(
            self.projects.values().map(|(_, s)| s.clone()).collect(),
        ))
    }

    fn delete(&mut self, id: ProjectId) -> FlipbookResult<bool> {
        Ok(self.projects.remove(&id).is_some())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/project.rs"]
mod tests;
