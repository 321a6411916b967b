//! Line layout, ellipsis truncation and paragraph drawing for `paratext`.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod paragraph;
mod render_ir;
mod render_layout;
mod text_box;

pub use paragraph::TextParagraph;
pub use paratext::{Color, Point, Rect, Size};
pub use render_ir::{
    Canvas, EllipsizeMode, LaidOutItem, LayoutParams, LayoutSnapshot, MultiLineMode,
    SnapshotItem, SnapshotItemKind, TextAlign, VerticalAlign,
};
pub use render_layout::{LayoutResult, Layouter, ELLIPSIS_TEXT, MIDDLE_ELLIPSIS_SLACK_RATIO};
pub use text_box::{SimpleTextBox, TextBoxParams};
