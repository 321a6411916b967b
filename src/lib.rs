//! Styled text items, markup cascade and unit resolution for rich-text paragraphs.
//!
//! The crate turns plain text or a small HTML-like markup subset into an ordered
//! list of [`TextItem`]s that share frozen [`TextStyle`]s. Line layout, drawing
//! and hit-testing live in `paratext-render`.

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

mod color;
mod font;
mod geometry;
mod hypertext;
mod item;
mod item_list;
pub mod markup;
mod style;
mod units;

pub use color::Color;
pub use font::{Font, FontDesc, FontMetrics, FontRef, GlyphAtlas, GlyphMetrics, MonospaceMetrics};
pub use geometry::{almost_equal, almost_zero, Point, Rect, Size, EPSILON};
pub use item::{InlineAttachment, ItemKind, TextItem, WordItem};
pub use item_list::TextItemList;
pub use markup::{parse_markup, MarkupDocument, MarkupElement, MarkupError, MarkupNode};
pub use style::{derive_style, StyleOverrides, StyleRef, TextStyle, UNSET_LINE_HEIGHT};
pub use units::{
    html_font_size, parse_length, parse_line_height, LengthContext, LengthError, UnitConfig,
    Viewport,
};
