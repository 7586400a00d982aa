//! Editor session: the pointer/gesture state machine over one open document.
//!
//! All transitions happen synchronously inside the event handlers. The session owns the layer
//! store, undo history, floating selection, viewport and live pointer table, and exactly one
//! [`Mode`] is current at a time.

use std::mem;
use std::sync::Arc;

use crate::composite::compositor::Background;
use crate::document::frame::FrameId;
use crate::document::history::{History, Snapshot};
use crate::document::layer::{BlendMode, Layer, LayerId};
use crate::document::project::{AudioTrack, Project, ProjectId};
use crate::document::store::{DrawingSession, LayerStore};
use crate::editor::pointer::{PointerButton, PointerEvent, PointerId, PointerTable};
use crate::editor::text::{SvgTextRenderer, TextRenderer};
use crate::editor::tool::{Tool, ToolSettings};
use crate::editor::viewport::Viewport;
use crate::foundation::core::{CanvasSize, Point, Rect, Rgba8, Vec2};
use crate::foundation::error::FlipbookResult;
use crate::raster::bitmap::Bitmap;
use crate::raster::draw::{self, BrushStyle, ShapeKind};
use crate::raster::flood_fill::flood_fill;
use crate::selection::engine::{SelectionEngine, SelectionHit};
use crate::selection::floating::{FlipAxis, FloatingSelection, Handle};

/// Editor tunables.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Undo entries retained, current state included.
    pub history_capacity: usize,
    /// Minimum selection width/height in canvas pixels.
    pub min_selection_size: f64,
    /// Handle hit radius in screen pixels.
    pub handle_radius: f64,
    /// Longest edge of frame thumbnails.
    pub thumbnail_edge: u32,
    /// Text size as a multiple of the stroke width.
    pub text_size_factor: f32,
    /// Smallest text size in pixels.
    pub min_text_px: f32,
    /// Zoom lower bound.
    pub min_zoom: f64,
    /// Zoom upper bound.
    pub max_zoom: f64,
    /// Opacity of neighbouring frames in the onion skin.
    pub onion_opacity: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            min_selection_size: 5.0,
            handle_radius: 8.0,
            thumbnail_edge: 160,
            text_size_factor: 4.0,
            min_text_px: 8.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
            onion_opacity: 0.3,
        }
    }
}

/// Freehand stroke in progress.
#[derive(Debug)]
pub struct StrokeState {
    pointer: PointerId,
    surface: DrawingSession,
    brush: BrushStyle,
    points: Vec<Point>,
}

impl StrokeState {
    /// Canvas points accumulated so far.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Shape drag with live preview.
#[derive(Debug)]
pub struct ShapeState {
    pointer: PointerId,
    surface: DrawingSession,
    brush: BrushStyle,
    kind: ShapeKind,
    filled: bool,
    start: Point,
    current: Point,
}

/// Multi-pointer pan/zoom baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureState {
    centroid: Point,
    spread: Option<f64>,
    scale: f64,
    pan: Vec2,
}

/// Inline text being typed.
#[derive(Clone, Debug, PartialEq)]
pub struct TextEntry {
    /// Top-left of the text box in canvas space.
    pub anchor: Point,
    /// Typed text.
    pub text: String,
}

/// The single current interaction.
#[derive(Debug, Default)]
pub enum Mode {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Pen or eraser stroke.
    Stroke(StrokeState),
    /// Shape tool drag.
    Shape(ShapeState),
    /// Marquee drag, canvas space.
    Marquee {
        pointer: PointerId,
        start: Point,
        current: Point,
    },
    /// Dragging the floating selection.
    Moving { pointer: PointerId, last: Point },
    /// Dragging a selection handle.
    Resizing {
        pointer: PointerId,
        handle: Handle,
        last: Point,
    },
    /// Pinch/pan.
    Gesture(GestureState),
    /// Text caret open.
    TextEntry(TextEntry),
}

/// Everything needed to edit one project.
pub struct EditorSession {
    config: EditorConfig,
    project_id: ProjectId,
    name: String,
    fps: u32,
    audio_tracks: Vec<AudioTrack>,
    store: LayerStore,
    history: History,
    selection: SelectionEngine,
    viewport: Viewport,
    pointers: PointerTable,
    mode: Mode,
    tool: Tool,
    settings: ToolSettings,
    active_layer: LayerId,
    current_frame: FrameId,
    text_renderer: Box<dyn TextRenderer>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("project_id", &self.project_id)
            .field("tool", &self.tool)
            .field("mode", &self.mode)
            .field("current_frame", &self.current_frame)
            .field("active_layer", &self.active_layer)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// New blank project: one layer, one frame.
    pub fn new(name: impl Into<String>, canvas: CanvasSize, fps: u32, config: EditorConfig) -> Self {
        let store = LayerStore::new(canvas);
        Self::with_store(ProjectId::new(), name.into(), store, fps.max(1), Vec::new(), config)
    }

    /// Open a saved project.
    pub fn open(project: &Project, config: EditorConfig) -> FlipbookResult<Self> {
        let store = project.to_store()?;
        Ok(Self::with_store(
            project.id,
            project.name.clone(),
            store,
            project.fps,
            project.audio_tracks.clone(),
            config,
        ))
    }

    fn with_store(
        project_id: ProjectId,
        name: String,
        store: LayerStore,
        fps: u32,
        audio_tracks: Vec<AudioTrack>,
        config: EditorConfig,
    ) -> Self {
        let history = History::new(store.snapshot(), config.history_capacity);
        let active_layer = store.layers()[store.layers().len() - 1].id;
        let current_frame = store.frames()[0].id;
        Self {
            selection: SelectionEngine::new(config.min_selection_size),
            viewport: Viewport::new(config.min_zoom, config.max_zoom),
            project_id,
            name,
            fps,
            audio_tracks,
            store,
            history,
            pointers: PointerTable::default(),
            mode: Mode::Idle,
            tool: Tool::default(),
            settings: ToolSettings::default(),
            active_layer,
            current_frame,
            text_renderer: Box::new(SvgTextRenderer::default()),
            config,
        }
    }

    /// Replace the text renderer.
    pub fn with_text_renderer(mut self, renderer: Box<dyn TextRenderer>) -> Self {
        self.text_renderer = renderer;
        self
    }

    /// Serialize the current state. A floating selection is not part of the project.
    pub fn to_project(&self) -> FlipbookResult<Project> {
        Project::from_store(
            self.project_id,
            self.name.clone(),
            &self.store,
            self.fps,
            self.audio_tracks.clone(),
        )
    }

    // --- accessors -------------------------------------------------------------------------

    /// Read-only document.
    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Undo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current interaction.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Floating selection, if any.
    pub fn selection(&self) -> Option<&FloatingSelection> {
        self.selection.selection()
    }

    /// Viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Active tool.
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Tool settings.
    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Layer that tools act on.
    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    /// Frame being edited.
    pub fn current_frame(&self) -> FrameId {
        self.current_frame
    }

    /// Timeline position of the frame being edited.
    pub fn current_frame_index(&self) -> usize {
        self.store.frame_index(self.current_frame).unwrap_or(0)
    }

    /// Playback rate.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attached audio.
    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    // --- settings --------------------------------------------------------------------------

    /// Switch tool. Blocked (returns `false`) during a multi-pointer gesture.
    ///
    /// An in-progress stroke is finalized, pending text is committed and, when leaving
    /// select/text, the floating selection is committed onto the active layer. If that commit
    /// is rejected the selection stays floating.
    pub fn set_tool(&mut self, tool: Tool) -> bool {
        if matches!(self.mode, Mode::Gesture(_)) {
            tracing::debug!(?tool, "tool switch blocked during gesture");
            return false;
        }
        self.finish_interaction();
        if !tool.keeps_selection() {
            self.commit_selection();
        }
        self.tool = tool;
        true
    }

    /// Set the paint color.
    pub fn set_color(&mut self, color: Rgba8) {
        self.settings.color = color;
    }

    /// Set the stroke width (at least half a pixel).
    pub fn set_stroke_width(&mut self, width: f32) {
        if width.is_finite() {
            self.settings.stroke_width = width.max(0.5);
        }
    }

    /// Choose the shape drawn by the shape tool.
    pub fn set_shape(&mut self, kind: ShapeKind, filled: bool) {
        self.settings.shape = kind;
        self.settings.shape_filled = filled;
    }

    /// Change the playback rate.
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.max(1);
    }

    /// Rename the project.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Attach an audio track.
    pub fn add_audio_track(&mut self, track: AudioTrack) {
        self.audio_tracks.push(track);
    }

    /// Detach an audio track by id.
    pub fn remove_audio_track(&mut self, id: uuid::Uuid) -> bool {
        let before = self.audio_tracks.len();
        self.audio_tracks.retain(|t| t.id != id);
        before != self.audio_tracks.len()
    }

    // --- pointer input ---------------------------------------------------------------------

    /// A pointer went down. Returns whether the event was consumed.
    pub fn pointer_down(&mut self, ev: PointerEvent) -> bool {
        self.pointers.insert(ev.id, ev.position);

        if self.pointers.len() >= 2 || ev.button != PointerButton::Primary {
            self.enter_gesture();
            return true;
        }
        if !matches!(self.mode, Mode::Idle | Mode::TextEntry(_)) {
            return false;
        }

        let at = self.viewport.screen_to_canvas(ev.position);
        match self.tool {
            Tool::Pen | Tool::Eraser => self.begin_stroke(ev.id, at),
            Tool::Shape => self.begin_shape(ev.id, at),
            Tool::Fill => self.fill_at(at),
            Tool::Select => self.begin_select(ev.id, at),
            Tool::Text => {
                self.finish_text();
                self.mode = Mode::TextEntry(TextEntry {
                    anchor: at,
                    text: String::new(),
                });
                true
            }
            Tool::Eyedropper => self.pick_color(at),
        }
    }

    /// A tracked pointer moved.
    pub fn pointer_move(&mut self, ev: PointerEvent) -> bool {
        if !self.pointers.update(ev.id, ev.position) {
            return false;
        }
        let at = self.viewport.screen_to_canvas(ev.position);
        match &mut self.mode {
            Mode::Gesture(g) => {
                let g = *g;
                self.apply_gesture(g);
                true
            }
            Mode::Stroke(s) if s.pointer == ev.id => {
                if let Some(&last) = s.points.last() {
                    draw::stroke_segment(s.surface.surface_mut(), last, at, s.brush);
                }
                s.points.push(at);
                true
            }
            Mode::Shape(s) if s.pointer == ev.id => {
                s.current = at;
                s.surface.restore_base();
                draw::draw_shape(s.surface.surface_mut(), s.kind, s.start, at, s.brush, s.filled);
                true
            }
            Mode::Marquee {
                pointer, current, ..
            } if *pointer == ev.id => {
                *current = at;
                true
            }
            Mode::Moving { pointer, last } if *pointer == ev.id => {
                let delta = at - *last;
                *last = at;
                self.selection.move_by(delta)
            }
            Mode::Resizing {
                pointer,
                handle,
                last,
            } if *pointer == ev.id => {
                let delta = at - *last;
                *last = at;
                let handle = *handle;
                self.selection.resize(handle, delta)
            }
            _ => false,
        }
    }

    /// A pointer was released.
    pub fn pointer_up(&mut self, ev: PointerEvent) -> bool {
        if self.pointers.remove(ev.id).is_none() {
            return false;
        }
        if let Mode::Gesture(_) = self.mode {
            if self.pointers.is_empty() {
                self.mode = Mode::Idle;
            } else {
                self.rebaseline_gesture();
            }
            return true;
        }
        let owns = match &self.mode {
            Mode::Stroke(s) => s.pointer == ev.id,
            Mode::Shape(s) => s.pointer == ev.id,
            Mode::Marquee { pointer, .. }
            | Mode::Moving { pointer, .. }
            | Mode::Resizing { pointer, .. } => *pointer == ev.id,
            Mode::Idle | Mode::Gesture(_) | Mode::TextEntry(_) => false,
        };
        if !owns {
            return false;
        }
        match mem::take(&mut self.mode) {
            Mode::Stroke(s) => self.end_stroke(s),
            Mode::Shape(s) => self.end_shape(s),
            Mode::Marquee { start, current, .. } => {
                let frame = self.current_frame;
                let layer = self.active_layer;
                let rect = Rect::from_points(start, current);
                if self.selection.lift(&mut self.store, frame, layer, rect) {
                    self.record();
                }
            }
            Mode::Moving { .. } | Mode::Resizing { .. } => {}
            other => self.mode = other,
        }
        true
    }

    /// The platform cancelled a pointer (e.g. palm rejection). Strokes it owned are discarded.
    pub fn pointer_cancel(&mut self, id: PointerId) {
        if self.pointers.remove(id).is_none() {
            return;
        }
        match mem::take(&mut self.mode) {
            Mode::Gesture(g) => {
                if self.pointers.is_empty() {
                    self.mode = Mode::Idle;
                } else {
                    self.mode = Mode::Gesture(g);
                    self.rebaseline_gesture();
                }
            }
            Mode::Stroke(s) if s.pointer == id => self.store.cancel_drawing(s.surface),
            Mode::Shape(s) if s.pointer == id => self.store.cancel_drawing(s.surface),
            Mode::Marquee { pointer, .. }
            | Mode::Moving { pointer, .. }
            | Mode::Resizing { pointer, .. }
                if pointer == id => {}
            other => self.mode = other,
        }
    }

    /// Mouse wheel: zoom about the pointer.
    pub fn wheel(&mut self, at: Point, delta: f64) {
        self.viewport.wheel(at, delta);
    }

    /// Pan the view by a screen delta.
    pub fn pan_view(&mut self, delta: Vec2) {
        self.viewport.pan_by(delta);
    }

    /// Reset zoom and pan.
    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    fn begin_stroke(&mut self, pointer: PointerId, at: Point) -> bool {
        let Some(surface) = self.store.begin_drawing(self.current_frame, self.active_layer) else {
            return false;
        };
        self.mode = Mode::Stroke(StrokeState {
            pointer,
            surface,
            brush: self.settings.brush(self.tool),
            points: vec![at],
        });
        true
    }

    fn end_stroke(&mut self, mut s: StrokeState) {
        if let [only] = s.points.as_slice() {
            draw::stamp_dot(s.surface.surface_mut(), *only, s.brush);
        }
        if self.store.finish_drawing(s.surface) {
            self.record();
        }
    }

    fn begin_shape(&mut self, pointer: PointerId, at: Point) -> bool {
        let Some(surface) = self.store.begin_drawing(self.current_frame, self.active_layer) else {
            return false;
        };
        self.mode = Mode::Shape(ShapeState {
            pointer,
            surface,
            brush: self.settings.brush(Tool::Shape),
            kind: self.settings.shape,
            filled: self.settings.shape_filled,
            start: at,
            current: at,
        });
        true
    }

    fn end_shape(&mut self, s: ShapeState) {
        if s.start == s.current {
            self.store.cancel_drawing(s.surface);
            return;
        }
        if self.store.finish_drawing(s.surface) {
            self.record();
        }
    }

    fn begin_select(&mut self, pointer: PointerId, at: Point) -> bool {
        let radius = self.config.handle_radius / self.viewport.scale();
        match self.selection.hit_test(at, radius) {
            SelectionHit::Handle(handle) => {
                self.mode = Mode::Resizing {
                    pointer,
                    handle,
                    last: at,
                };
            }
            SelectionHit::Body => {
                self.mode = Mode::Moving { pointer, last: at };
            }
            SelectionHit::Outside => {
                self.commit_selection();
                self.mode = Mode::Marquee {
                    pointer,
                    start: at,
                    current: at,
                };
            }
        }
        true
    }

    fn fill_at(&mut self, at: Point) -> bool {
        if !self.store.is_editable(self.active_layer) || at.x < 0.0 || at.y < 0.0 {
            return false;
        }
        let Ok(current) = self.store.get_bitmap(self.current_frame, self.active_layer) else {
            return false;
        };
        let mut bmp = current.as_ref().clone();
        let stats = flood_fill(&mut bmp, at.x as u32, at.y as u32, self.settings.color.to_premul());
        if stats.filled == 0 {
            return false;
        }
        match self.store.set_bitmap(self.current_frame, self.active_layer, bmp) {
            Ok(()) => {
                self.record();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "fill discarded");
                false
            }
        }
    }

    fn pick_color(&mut self, at: Point) -> bool {
        if at.x < 0.0 || at.y < 0.0 {
            return false;
        }
        let Some(flat) = self.store.composite(self.current_frame, &Background::Transparent) else {
            return false;
        };
        match flat.pixel(at.x as u32, at.y as u32) {
            Some(px) if px[3] > 0 => {
                self.settings.color = Rgba8::from_premul(px);
                true
            }
            _ => false,
        }
    }

    // --- gestures --------------------------------------------------------------------------

    fn enter_gesture(&mut self) {
        match mem::take(&mut self.mode) {
            Mode::Stroke(s) => {
                tracing::debug!("stroke cancelled by gesture");
                self.store.cancel_drawing(s.surface);
            }
            Mode::Shape(s) => {
                tracing::debug!("shape cancelled by gesture");
                self.store.cancel_drawing(s.surface);
            }
            Mode::TextEntry(entry) => {
                self.commit_text_entry(entry);
            }
            Mode::Gesture(_)
            | Mode::Idle
            | Mode::Marquee { .. }
            | Mode::Moving { .. }
            | Mode::Resizing { .. } => {}
        }
        self.mode = Mode::Gesture(self.gesture_baseline());
    }

    fn gesture_baseline(&self) -> GestureState {
        GestureState {
            centroid: self.pointers.centroid().unwrap_or(Point::ZERO),
            spread: self.pointers.spread(),
            scale: self.viewport.scale(),
            pan: self.viewport.pan(),
        }
    }

    fn rebaseline_gesture(&mut self) {
        if let Mode::Gesture(_) = self.mode {
            self.mode = Mode::Gesture(self.gesture_baseline());
        }
    }

    fn apply_gesture(&mut self, g: GestureState) {
        let Some(centroid) = self.pointers.centroid() else {
            return;
        };
        let scale = match (g.spread, self.pointers.spread()) {
            (Some(d0), Some(d)) if d0 > f64::EPSILON => self.viewport.clamp_scale(g.scale * d / d0),
            _ => g.scale,
        };
        // Keep the canvas point that was under the initial centroid under the current one.
        let anchor = (g.centroid.to_vec2() - g.pan) / g.scale;
        let pan = centroid.to_vec2() - anchor * scale;
        self.viewport.set(scale, pan);
    }

    // --- selection -------------------------------------------------------------------------

    /// Commit the floating selection onto the active layer. Rejected (selection kept) when the
    /// active layer is locked or hidden.
    pub fn commit_selection(&mut self) -> bool {
        if self.selection.commit(&mut self.store, self.active_layer) {
            self.record();
            return true;
        }
        false
    }

    /// Drop the floating selection. Its pixels were already cut from the layer.
    pub fn delete_selection(&mut self) -> bool {
        if matches!(self.mode, Mode::Moving { .. } | Mode::Resizing { .. }) {
            self.mode = Mode::Idle;
        }
        self.selection.discard()
    }

    /// Quarter-turn the floating selection.
    pub fn rotate_selection(&mut self) -> bool {
        self.selection.rotate()
    }

    /// Mirror the floating selection.
    pub fn flip_selection(&mut self, axis: FlipAxis) -> bool {
        self.selection.flip(axis)
    }

    /// Lift a canvas rectangle from the active layer directly, as a marquee release would.
    pub fn select_rect(&mut self, rect: Rect) -> bool {
        let (frame, layer) = (self.current_frame, self.active_layer);
        if self.selection.lift(&mut self.store, frame, layer, rect) {
            self.record();
            return true;
        }
        false
    }

    /// Commit before leaving the current frame; a rejected commit discards.
    fn settle_selection(&mut self) {
        if !self.selection.is_floating() {
            return;
        }
        if self.selection.commit(&mut self.store, self.active_layer) {
            self.record();
        } else {
            tracing::debug!("floating selection discarded");
            self.selection.discard();
        }
    }

    // --- text ------------------------------------------------------------------------------

    /// Append typed characters to the open text entry.
    pub fn text_input(&mut self, text: &str) -> bool {
        match &mut self.mode {
            Mode::TextEntry(entry) => {
                entry.text.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Delete the last typed character.
    pub fn text_backspace(&mut self) -> bool {
        match &mut self.mode {
            Mode::TextEntry(entry) => entry.text.pop().is_some(),
            _ => false,
        }
    }

    /// End text entry and float the rasterized text as a selection.
    ///
    /// Empty text just closes the caret.
    pub fn finish_text(&mut self) -> bool {
        match mem::take(&mut self.mode) {
            Mode::TextEntry(entry) => self.commit_text_entry(entry),
            other => {
                self.mode = other;
                false
            }
        }
    }

    /// Close the caret without rendering anything.
    pub fn cancel_text(&mut self) -> bool {
        if let Mode::TextEntry(_) = self.mode {
            self.mode = Mode::Idle;
            return true;
        }
        false
    }

    /// Font size the text tool uses for the current stroke width.
    pub fn text_font_px(&self) -> f32 {
        (self.settings.stroke_width * self.config.text_size_factor).max(self.config.min_text_px)
    }

    fn commit_text_entry(&mut self, entry: TextEntry) -> bool {
        if entry.text.trim().is_empty() {
            return false;
        }
        let font_px = self.text_font_px();
        let bitmap = match self
            .text_renderer
            .rasterize(&entry.text, font_px, self.settings.color)
        {
            Ok(bmp) => bmp,
            Err(err) => {
                tracing::warn!(error = %err, "text rasterization failed");
                return false;
            }
        };
        self.commit_selection();
        let (frame, layer) = (self.current_frame, self.active_layer);
        self.selection
            .place(&mut self.store, frame, layer, bitmap, entry.anchor)
    }

    // --- document --------------------------------------------------------------------------

    fn finish_interaction(&mut self) {
        match mem::take(&mut self.mode) {
            Mode::Stroke(s) => self.end_stroke(s),
            Mode::Shape(s) => self.end_shape(s),
            Mode::TextEntry(entry) => {
                self.commit_text_entry(entry);
            }
            Mode::Gesture(g) => self.mode = Mode::Gesture(g),
            Mode::Idle | Mode::Marquee { .. } | Mode::Moving { .. } | Mode::Resizing { .. } => {}
        }
    }

    fn cancel_interaction(&mut self) {
        match mem::take(&mut self.mode) {
            Mode::Stroke(s) => self.store.cancel_drawing(s.surface),
            Mode::Shape(s) => self.store.cancel_drawing(s.surface),
            Mode::Gesture(g) => self.mode = Mode::Gesture(g),
            _ => {}
        }
    }

    fn record(&mut self) {
        self.history.record(self.store.snapshot());
    }

    /// Make the frame at `index` current. A floating selection is committed (or discarded if that is
    /// rejected) and open text is finished first.
    pub fn go_to_frame(&mut self, index: usize) -> bool {
        let Some(id) = self.store.frames().get(index).map(|f| f.id) else {
            return false;
        };
        if matches!(self.mode, Mode::Gesture(_)) {
            return false;
        }
        self.finish_interaction();
        self.settle_selection();
        self.current_frame = id;
        true
    }

    /// Step to the next frame.
    pub fn next_frame(&mut self) -> bool {
        self.go_to_frame(self.current_frame_index() + 1)
    }

    /// Step to the previous frame.
    pub fn previous_frame(&mut self) -> bool {
        match self.current_frame_index().checked_sub(1) {
            Some(i) => self.go_to_frame(i),
            None => false,
        }
    }

    /// Pick the layer tools act on.
    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.store.layer(id).is_none() {
            return false;
        }
        self.finish_interaction();
        self.active_layer = id;
        true
    }

    /// Insert a blank frame after the current one and make it current.
    pub fn add_frame(&mut self) -> FrameId {
        self.finish_interaction();
        self.settle_selection();
        let id = self.store.add_frame(Some(self.current_frame_index()));
        self.current_frame = id;
        self.record();
        id
    }

    /// Copy the current frame and make the copy current.
    pub fn duplicate_frame(&mut self) -> Option<FrameId> {
        self.finish_interaction();
        self.settle_selection();
        let id = self.store.duplicate_frame(self.current_frame)?;
        self.current_frame = id;
        self.record();
        Some(id)
    }

    /// Delete the current frame; the previous one (or the new first) becomes current.
    pub fn delete_frame(&mut self) -> bool {
        self.finish_interaction();
        self.settle_selection();
        let idx = self.current_frame_index();
        if !self.store.remove_frame(self.current_frame) {
            return false;
        }
        let next = idx.saturating_sub(1).min(self.store.frames().len() - 1);
        self.current_frame = self.store.frames()[next].id;
        self.record();
        true
    }

    /// Move the current frame to another timeline position.
    pub fn move_frame(&mut self, to: usize) -> bool {
        if self.store.move_frame(self.current_frame, to) {
            self.record();
            return true;
        }
        false
    }

    /// Add a layer above the active one and make it active.
    pub fn add_layer(&mut self) -> Layer {
        self.finish_interaction();
        let layer = self.store.create_layer(Some(self.active_layer));
        self.active_layer = layer.id;
        self.record();
        layer
    }

    /// Remove a layer (never the last one).
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        self.finish_interaction();
        let idx = self.store.layer_index(id);
        if !self.store.remove_layer(id) {
            return false;
        }
        if self.active_layer == id {
            let i = idx.unwrap_or(0).saturating_sub(1).min(self.store.layers().len() - 1);
            self.active_layer = self.store.layers()[i].id;
        }
        self.record();
        true
    }

    /// Move a layer in the stack.
    pub fn move_layer(&mut self, id: LayerId, to: usize) -> bool {
        self.finish_interaction();
        self.recorded(|s| s.move_layer(id, to))
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> bool {
        self.recorded(|s| s.rename_layer(id, name))
    }

    /// Show or hide a layer.
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        self.finish_interaction();
        self.recorded(|s| s.set_layer_visible(id, visible))
    }

    /// Lock or unlock a layer.
    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) -> bool {
        self.finish_interaction();
        self.recorded(|s| s.set_layer_locked(id, locked))
    }

    /// Set a layer's opacity.
    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        self.recorded(|s| s.set_layer_opacity(id, opacity))
    }

    /// Set a layer's blend mode.
    pub fn set_layer_blend_mode(&mut self, id: LayerId, mode: BlendMode) -> bool {
        self.recorded(|s| s.set_layer_blend_mode(id, mode))
    }

    /// Crop or extend the canvas.
    pub fn resize_canvas(&mut self, size: CanvasSize) -> bool {
        self.finish_interaction();
        self.commit_selection();
        self.recorded(|s| s.resize_canvas(size))
    }

    /// Set or clear the background image.
    pub fn set_background_image(&mut self, image: Option<Bitmap>) {
        self.store.set_background_image(image);
    }

    fn recorded(&mut self, f: impl FnOnce(&mut LayerStore) -> bool) -> bool {
        let changed = f(&mut self.store);
        if changed {
            self.record();
        }
        changed
    }

    // --- history ---------------------------------------------------------------------------

    /// Step back one snapshot. Any in-progress stroke and floating selection are discarded.
    pub fn undo(&mut self) -> bool {
        self.cancel_interaction();
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        let snapshot = snapshot.clone();
        self.restore(&snapshot);
        true
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> bool {
        self.cancel_interaction();
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        let snapshot = snapshot.clone();
        self.restore(&snapshot);
        true
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        if let Mode::TextEntry(_) = self.mode {
            self.mode = Mode::Idle;
        }
        self.selection.discard();
        let frame_idx = self.current_frame_index();
        self.store.restore(snapshot);
        if self.store.frame(self.current_frame).is_none() {
            let i = frame_idx.min(self.store.frames().len() - 1);
            self.current_frame = self.store.frames()[i].id;
        }
        if self.store.layer(self.active_layer).is_none() {
            self.active_layer = self.store.layers()[self.store.layers().len() - 1].id;
        }
    }

    // --- views -----------------------------------------------------------------------------

    /// Cached thumbnail of a frame.
    pub fn thumbnail(&mut self, index: usize) -> Option<Arc<Bitmap>> {
        let id = self.store.frames().get(index)?.id;
        self.store.thumbnail(id, self.config.thumbnail_edge)
    }

    /// Current frame composited over the document background, with the floating selection
    /// drawn on top.
    pub fn render_current(&self) -> Option<Bitmap> {
        let mut out = self
            .store
            .composite(self.current_frame, &self.store.background())?;
        if let Some(sel) = self.selection.selection() {
            sel.draw_onto(&mut out);
        }
        Some(out)
    }

    /// Onion skin for the current frame.
    pub fn onion_skin(&self) -> Option<Bitmap> {
        self.store
            .onion_skin(self.current_frame, self.config.onion_opacity)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/session.rs"]
mod tests;
