//! Frozen text styles and copy-on-write derivation.

use std::sync::Arc;

use crate::color::Color;
use crate::font::{FontDesc, FontRef};
use crate::geometry::almost_equal;

/// `line_height` value meaning "use the item's natural height".
pub const UNSET_LINE_HEIGHT: f32 = -1.0;

/// Visual attributes shared by a run of items.
///
/// A style is frozen once an item references it. Changes go through
/// [`derive_style`], which clones only when something actually differs.
#[derive(Clone, Debug)]
pub struct TextStyle {
    pub font: Option<FontRef>,
    /// Glyph color; [`Color::ZERO`] means "use the caller's default".
    pub text_color: Color,
    /// Background fill, drawn when alpha is non-zero.
    pub background_color: Color,
    pub underline: bool,
    pub overline: bool,
    pub line_through: bool,
    /// Explicit line height in pixels, or [`UNSET_LINE_HEIGHT`].
    pub line_height: f32,
    /// Vertical shift applied when drawing (superscript/subscript).
    pub y_offset: f32,
    /// Link target.
    pub href: Option<String>,
}

/// Shared style handle.
pub type StyleRef = Arc<TextStyle>;

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: None,
            text_color: Color::ZERO,
            background_color: Color::ZERO,
            underline: false,
            overline: false,
            line_through: false,
            line_height: UNSET_LINE_HEIGHT,
            y_offset: 0.0,
            href: None,
        }
    }
}

impl TextStyle {
    /// Base style for a font, inheriting the face's own decoration flags.
    pub fn with_font(font: FontRef) -> Self {
        let desc = font.desc();
        Self {
            underline: desc.underline,
            line_through: desc.strikeout,
            font: Some(font),
            ..Self::default()
        }
    }

    pub fn into_ref(self) -> StyleRef {
        Arc::new(self)
    }

    /// Line box height of the style's font, zero without one.
    pub fn font_height(&self) -> f32 {
        self.font.as_ref().map_or(0.0, |font| font.height())
    }

    pub fn has_line_height(&self) -> bool {
        self.line_height >= 0.0
    }
}

/// Attribute overrides collected from one markup element.
///
/// `None` leaves the parent's value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleOverrides {
    pub family: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
    pub underline: Option<bool>,
    pub overline: Option<bool>,
    pub line_through: Option<bool>,
    pub line_height: Option<f32>,
    pub y_offset: Option<f32>,
    pub href: Option<String>,
}

impl StyleOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn font_desc_for(&self, parent: &FontDesc) -> Option<FontDesc> {
        let desc = FontDesc {
            family: self.family.clone().unwrap_or_else(|| parent.family.clone()),
            size: self.size.unwrap_or(parent.size),
            bold: self.bold.unwrap_or(parent.bold),
            italic: self.italic.unwrap_or(parent.italic),
            ..parent.clone()
        };
        (!desc.same_face(parent)).then_some(desc)
    }
}

fn differs<T: PartialEq>(wanted: &Option<T>, current: &T) -> bool {
    wanted.as_ref().is_some_and(|value| value != current)
}

fn differs_f32(wanted: Option<f32>, current: f32) -> bool {
    wanted.is_some_and(|value| !almost_equal(value, current))
}

/// Resolve `overrides` against `parent`.
///
/// Returns `parent` itself when nothing differs. Otherwise the result is a
/// fresh style with only the differing fields replaced. A new font is built
/// (on the parent font's provider) only when family, size, weight or slant
/// differ from the parent's descriptor.
pub fn derive_style(parent: &StyleRef, overrides: &StyleOverrides) -> StyleRef {
    if overrides.is_empty() {
        return Arc::clone(parent);
    }
    let new_font = parent
        .font
        .as_ref()
        .and_then(|font| overrides.font_desc_for(font.desc()).map(|desc| font.derive(desc)));

    let changed = new_font.is_some()
        || differs(&overrides.text_color, &parent.text_color)
        || differs(&overrides.background_color, &parent.background_color)
        || differs(&overrides.underline, &parent.underline)
        || differs(&overrides.overline, &parent.overline)
        || differs(&overrides.line_through, &parent.line_through)
        || differs_f32(overrides.line_height, parent.line_height)
        || differs_f32(overrides.y_offset, parent.y_offset)
        || overrides
            .href
            .as_ref()
            .is_some_and(|href| parent.href.as_deref() != Some(href.as_str()));
    if !changed {
        return Arc::clone(parent);
    }

    let mut style = TextStyle::clone(parent);
    if let Some(font) = new_font {
        style.font = Some(font);
    }
    if let Some(color) = overrides.text_color {
        style.text_color = color;
    }
    if let Some(color) = overrides.background_color {
        style.background_color = color;
    }
    if let Some(flag) = overrides.underline {
        style.underline = flag;
    }
    if let Some(flag) = overrides.overline {
        style.overline = flag;
    }
    if let Some(flag) = overrides.line_through {
        style.line_through = flag;
    }
    if let Some(line_height) = overrides.line_height {
        style.line_height = line_height;
    }
    if let Some(offset) = overrides.y_offset {
        style.y_offset = offset;
    }
    if let Some(href) = &overrides.href {
        style.href = Some(href.clone());
    }
    Arc::new(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{Font, MonospaceMetrics};

    fn base() -> StyleRef {
        let font = Font::new(FontDesc::new("Serif", 10.0), Arc::new(MonospaceMetrics::default()));
        TextStyle::with_font(font).into_ref()
    }

    #[test]
    fn empty_overrides_return_parent() {
        let parent = base();
        let derived = derive_style(&parent, &StyleOverrides::default());
        assert!(Arc::ptr_eq(&parent, &derived));
    }

    #[test]
    fn equal_overrides_do_not_allocate() {
        let parent = base();
        let overrides = StyleOverrides {
            family: Some("serif".to_string()),
            size: Some(10.0),
            bold: Some(false),
            underline: Some(false),
            line_height: Some(UNSET_LINE_HEIGHT),
            ..StyleOverrides::default()
        };
        let derived = derive_style(&parent, &overrides);
        assert!(Arc::ptr_eq(&parent, &derived));
    }

    #[test]
    fn differing_override_clones_remaining_fields() {
        let parent = derive_style(
            &base(),
            &StyleOverrides {
                href: Some("https://example.com".to_string()),
                ..StyleOverrides::default()
            },
        );
        let derived = derive_style(
            &parent,
            &StyleOverrides {
                text_color: Some(Color::rgb(1, 2, 3)),
                ..StyleOverrides::default()
            },
        );
        assert!(!Arc::ptr_eq(&parent, &derived));
        assert_eq!(derived.text_color, Color::rgb(1, 2, 3));
        assert_eq!(derived.href.as_deref(), Some("https://example.com"));
        let (Some(a), Some(b)) = (&parent.font, &derived.font) else {
            panic!("font should be inherited");
        };
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn font_override_builds_new_font() {
        let parent = base();
        let derived = derive_style(
            &parent,
            &StyleOverrides {
                bold: Some(true),
                ..StyleOverrides::default()
            },
        );
        let font = derived.font.as_ref().expect("font");
        assert!(font.desc().bold);
        assert_eq!(font.desc().family, "Serif");
        assert!(!Arc::ptr_eq(font, parent.font.as_ref().expect("font")));
    }

    #[test]
    fn font_overrides_without_parent_font_are_ignored() {
        let parent = TextStyle::default().into_ref();
        let derived = derive_style(
            &parent,
            &StyleOverrides {
                size: Some(30.0),
                ..StyleOverrides::default()
            },
        );
        assert!(Arc::ptr_eq(&parent, &derived));
    }

    #[test]
    fn base_style_follows_face_decoration() {
        let font = Font::new(
            FontDesc {
                underline: true,
                strikeout: true,
                ..FontDesc::default()
            },
            Arc::new(MonospaceMetrics::default()),
        );
        let style = TextStyle::with_font(font);
        assert!(style.underline && style.line_through);
        assert_eq!(style.font_height(), 16.0);
    }
}
