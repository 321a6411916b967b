//! Typed paragraph content units.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::font::FontRef;
use crate::geometry::{Point, Size};
use crate::style::StyleRef;

/// Space advance as a fraction of the font height.
const SPACE_WIDTH_RATIO: f32 = 0.3;

/// Caller-owned inline object laid out alongside text.
pub trait InlineAttachment: Send + Sync {
    fn size(&self) -> Size;

    /// Receives the top-left corner chosen by layout, in paragraph coordinates.
    fn set_position(&self, position: Point);
}

/// Text of a word plus its last measurement.
pub struct WordItem {
    text: String,
    measured: Mutex<Option<(FontRef, Size)>>,
}

impl fmt::Debug for WordItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WordItem").field(&self.text).finish()
    }
}

impl WordItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            measured: Mutex::new(None),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size of the text in `font`; cached until asked with a different font.
    pub fn measure(&self, font: Option<&FontRef>) -> Size {
        let Some(font) = font else {
            return Size::ZERO;
        };
        let mut cached = self
            .measured
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_font, size)) = cached.as_ref() {
            if Arc::ptr_eq(cached_font, font) {
                log::trace!("word size cache hit for {:?}", self.text);
                return *size;
            }
        }
        let size = font.measure_text(&self.text);
        *cached = Some((Arc::clone(font), size));
        size
    }
}

/// The closed set of item variants.
pub enum ItemKind {
    Word(WordItem),
    Space,
    Tab,
    LineBreak,
    Attach(Arc<dyn InlineAttachment>),
}

impl fmt::Debug for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(word) => f.debug_tuple("Word").field(&word.text).finish(),
            Self::Space => f.write_str("Space"),
            Self::Tab => f.write_str("Tab"),
            Self::LineBreak => f.write_str("LineBreak"),
            Self::Attach(_) => f.write_str("Attach"),
        }
    }
}

/// One indivisible unit of paragraph content and the style it was created with.
#[derive(Debug)]
pub struct TextItem {
    style: StyleRef,
    kind: ItemKind,
}

impl TextItem {
    pub fn new(kind: ItemKind, style: StyleRef) -> Self {
        Self { style, kind }
    }

    pub fn word(text: impl Into<String>, style: StyleRef) -> Self {
        Self::new(ItemKind::Word(WordItem::new(text)), style)
    }

    pub fn space(style: StyleRef) -> Self {
        Self::new(ItemKind::Space, style)
    }

    pub fn tab(style: StyleRef) -> Self {
        Self::new(ItemKind::Tab, style)
    }

    pub fn line_break(style: StyleRef) -> Self {
        Self::new(ItemKind::LineBreak, style)
    }

    pub fn attachment(object: Arc<dyn InlineAttachment>, style: StyleRef) -> Self {
        Self::new(ItemKind::Attach(object), style)
    }

    pub fn style(&self) -> &StyleRef {
        &self.style
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Word text, `None` for every other variant.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Word(word) => Some(word.text()),
            _ => None,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, ItemKind::Word(_))
    }

    /// Source characters this item stands for.
    pub fn logical_length(&self) -> usize {
        match &self.kind {
            ItemKind::Word(word) => word.text().chars().count(),
            _ => 1,
        }
    }

    /// Natural size before layout. Tabs report zero width: their advance depends
    /// on the pen position.
    pub fn measure(&self) -> Size {
        let height = self.style.font_height();
        match &self.kind {
            ItemKind::Word(word) => word.measure(self.style.font.as_ref()),
            ItemKind::Space => Size::new(height * SPACE_WIDTH_RATIO, height),
            ItemKind::Tab => Size::new(0.0, height),
            ItemKind::LineBreak => Size::new(height / 2.0, height),
            ItemKind::Attach(object) => object.size(),
        }
    }
}
