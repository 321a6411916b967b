use paratext::{
    Color, InlineAttachment, ItemKind, Point, Rect, StyleRef, TextItem, TextItemList, UnitConfig,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::render_ir::{Canvas, LaidOutItem, LayoutParams, LayoutSnapshot};
use crate::render_layout::Layouter;

#[derive(Default)]
struct ParagraphState {
    items: TextItemList,
    laid_out: Vec<LaidOutItem>,
    max_width: f32,
    total_height: f32,
}

impl ParagraphState {
    fn layout(&mut self, params: &LayoutParams) {
        let result = Layouter::new(*params).layout(self.items.items());
        self.laid_out = result.items;
        self.max_width = result.max_width;
        self.total_height = result.total_height;
    }
}

/// A thread-safe paragraph: source items plus the result of the last layout.
///
/// Every operation takes the paragraph lock for its whole duration, so a UI
/// thread can append and lay out while another thread draws.
#[derive(Default)]
pub struct TextParagraph {
    state: Mutex<ParagraphState>,
    units: UnitConfig,
}

impl TextParagraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph whose markup lengths resolve against `units`.
    pub fn with_units(units: UnitConfig) -> Self {
        Self {
            state: Mutex::default(),
            units,
        }
    }

    fn state(&self) -> MutexGuard<'_, ParagraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_text(&self, text: &str, style: &StyleRef) {
        self.state().items.add_text(text, style);
    }

    pub fn add_hyper_text(&self, markup: &str, style: &StyleRef) {
        self.state().items.add_hyper_text(markup, style, &self.units);
    }

    pub fn add_attachment(&self, object: Arc<dyn InlineAttachment>, style: &StyleRef) {
        self.state().items.add_attachment(object, style);
    }

    /// Drops all items and the last layout.
    pub fn clear(&self) {
        *self.state() = ParagraphState::default();
    }

    /// Replaces the laid-out sequence and metrics with a fresh pass.
    pub fn layout(&self, params: &LayoutParams) {
        self.state().layout(params);
    }

    /// Replaces the content with a single run and lays it out, all under one lock.
    ///
    /// `text` is parsed as markup when `hyper_text` is set.
    pub fn rebuild(&self, text: &str, style: &StyleRef, hyper_text: bool, params: &LayoutParams) {
        let mut state = self.state();
        *state = ParagraphState::default();
        match (text.is_empty(), hyper_text) {
            (true, _) => {}
            (false, true) => state.items.add_hyper_text(text, style, &self.units),
            (false, false) => state.items.add_text(text, style),
        }
        state.layout(params);
    }

    /// Paint the laid-out items with the paragraph's top-left at `(x, y)`.
    ///
    /// Items outside the canvas' invalidated region are skipped. A zero text
    /// color falls back to `default_color`.
    pub fn draw(&self, canvas: &mut dyn Canvas, x: f32, y: f32, default_color: Color) {
        let state = self.state();
        let clip = canvas.invalidated_rect();
        for laid in &state.laid_out {
            let frame = laid.styled_frame().offset(x, y);
            if clip.is_some_and(|clip| !clip.intersects(&frame)) {
                continue;
            }
            draw_item(canvas, &laid.item, frame, default_color);
        }
    }

    /// First laid-out item whose drawn frame contains `(x, y)`, in paragraph coordinates.
    pub fn item_at_position(&self, x: f32, y: f32) -> Option<LaidOutItem> {
        let point = Point::new(x, y);
        self.state()
            .laid_out
            .iter()
            .find(|laid| laid.styled_frame().contains(point))
            .cloned()
    }

    pub fn maximum_width(&self) -> f32 {
        self.state().max_width
    }

    pub fn total_height(&self) -> f32 {
        self.state().total_height
    }

    pub fn logical_length(&self) -> usize {
        self.state().items.logical_length()
    }

    /// Number of source items.
    pub fn item_count(&self) -> usize {
        self.state().items.len()
    }

    pub fn laid_out_items(&self) -> Vec<LaidOutItem> {
        self.state().laid_out.clone()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        let state = self.state();
        LayoutSnapshot::from_items(&state.laid_out, state.max_width, state.total_height)
    }
}

fn draw_item(canvas: &mut dyn Canvas, item: &TextItem, frame: Rect, default_color: Color) {
    let style = item.style();
    let color = if style.text_color.is_zero() {
        default_color
    } else {
        style.text_color
    };
    let Some(font) = style.font.as_ref() else {
        return;
    };
    match item.kind() {
        ItemKind::Word(_) => {
            if style.background_color.a > 0 {
                canvas.fill_rect(frame, style.background_color);
            }
        }
        ItemKind::Space | ItemKind::Tab => {}
        ItemKind::LineBreak | ItemKind::Attach(_) => return,
    }

    let metrics = font.metrics();
    let bottom = frame.bottom();
    let mut decorate = |enabled: bool, line_y: f32| {
        if enabled {
            canvas.draw_line(
                Point::new(frame.left(), line_y),
                Point::new(frame.right(), line_y),
                1.0,
                color,
            );
        }
    };
    decorate(style.underline, bottom - metrics.descent / 2.0);
    decorate(style.overline, bottom - metrics.descent - metrics.ascent);
    decorate(
        style.line_through,
        bottom - (metrics.descent + metrics.ascent) / 2.0,
    );

    if let Some(text) = item.text() {
        canvas.draw_text(text, frame.origin(), font, color);
    }
}
