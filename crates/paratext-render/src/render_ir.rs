use paratext::{Color, Font, ItemKind, Point, Rect, Size, TextItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Drawing surface consumed by [`TextParagraph::draw`](crate::TextParagraph::draw).
pub trait Canvas {
    /// Draw `text` with its top-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, font: &Font, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn draw_line(&mut self, from: Point, to: Point, stroke_width: f32, color: Color);

    /// Region that needs repainting. `None` repaints everything.
    fn invalidated_rect(&self) -> Option<Rect> {
        None
    }
}

/// Horizontal placement of each line inside the width budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical placement of a text box's content inside its frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// How lines are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiLineMode {
    /// One line; the first line break ends layout.
    #[default]
    Single,
    /// New lines only at explicit line breaks.
    Multiple,
    /// Wrap at word boundaries, splitting words wider than the budget.
    WordWrap,
    /// Wrap anywhere, splitting whichever word overflows.
    BreakWord,
}

impl MultiLineMode {
    pub fn wraps(self) -> bool {
        matches!(self, Self::WordWrap | Self::BreakWord)
    }
}

/// Where an overflowing line is cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EllipsizeMode {
    #[default]
    None,
    End,
    Start,
    Middle,
}

/// Parameters of one layout pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Line budget in pixels.
    pub width: f32,
    /// Distance between tab stops.
    pub tab_width: f32,
    /// Minimum gap between the pen and the next tab stop.
    pub tab_margin: f32,
    pub align: TextAlign,
    pub multi_line: MultiLineMode,
    pub ellipsis: EllipsizeMode,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            tab_width: 1.0,
            tab_margin: 1.0,
            align: TextAlign::Left,
            multi_line: MultiLineMode::Single,
            ellipsis: EllipsizeMode::None,
        }
    }
}

impl LayoutParams {
    /// Convenience for a width budget with default modes.
    pub fn for_width(width: f32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }
}

/// An item placed by layout, in paragraph coordinates.
#[derive(Clone, Debug)]
pub struct LaidOutItem {
    pub item: Arc<TextItem>,
    /// Top-left corner before the style's vertical offset.
    pub position: Point,
    pub size: Size,
}

impl LaidOutItem {
    pub fn frame(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Frame shifted by the style's `y_offset`, as drawn.
    pub fn styled_frame(&self) -> Rect {
        self.frame().offset(0.0, self.item.style().y_offset)
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }
}

/// Kind tag of a [`SnapshotItem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotItemKind {
    Word,
    Space,
    Tab,
}

/// Serializable record of one laid-out item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub kind: SnapshotItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub frame: Rect,
}

/// Serializable record of a layout pass, for regression dumps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub max_width: f32,
    pub total_height: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SnapshotItem>,
}

impl LayoutSnapshot {
    pub(crate) fn from_items(items: &[LaidOutItem], max_width: f32, total_height: f32) -> Self {
        let items = items
            .iter()
            .filter_map(|laid| {
                let kind = match laid.item.kind() {
                    ItemKind::Word(_) => SnapshotItemKind::Word,
                    ItemKind::Space => SnapshotItemKind::Space,
                    ItemKind::Tab => SnapshotItemKind::Tab,
                    ItemKind::LineBreak | ItemKind::Attach(_) => return None,
                };
                Some(SnapshotItem {
                    kind,
                    text: laid.item.text().map(str::to_string),
                    frame: laid.styled_frame(),
                })
            })
            .collect();
        Self {
            max_width,
            total_height,
            items,
        }
    }

    /// Concatenated text of all snapshot items, spaces and tabs included.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|item| match item.kind {
                SnapshotItemKind::Word => item.text.as_deref().unwrap_or_default(),
                SnapshotItemKind::Space => " ",
                SnapshotItemKind::Tab => "\t",
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_params_deserialize_with_defaults() {
        let params: LayoutParams =
            serde_json::from_str(r#"{"width": 120.0, "multi_line": "word-wrap", "ellipsis": "end"}"#)
                .unwrap();
        assert_eq!(params.width, 120.0);
        assert_eq!(params.multi_line, MultiLineMode::WordWrap);
        assert_eq!(params.ellipsis, EllipsizeMode::End);
        assert_eq!(params.align, TextAlign::Left);
        assert_eq!(params.tab_width, 1.0);
    }

    #[test]
    fn only_wrapping_modes_wrap() {
        assert!(MultiLineMode::WordWrap.wraps());
        assert!(MultiLineMode::BreakWord.wraps());
        assert!(!MultiLineMode::Single.wraps());
        assert!(!MultiLineMode::Multiple.wraps());
    }

    #[test]
    fn snapshot_json_keeps_frames() {
        let snapshot = LayoutSnapshot {
            max_width: 10.0,
            total_height: 4.0,
            items: vec![SnapshotItem {
                kind: SnapshotItemKind::Word,
                text: Some("hi".to_string()),
                frame: Rect::new(0.0, 0.0, 10.0, 4.0),
            }],
        };
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"kind\":\"word\""));
        assert_eq!(LayoutSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
