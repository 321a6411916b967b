//! embedded-graphics backend for `paratext` paragraphs.
//!
//! [`MonoGlyphMetrics`] measures with the built-in ASCII mono fonts and
//! [`EgCanvas`] paints laid-out paragraphs onto any [`DrawTarget`].

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

use embedded_graphics::{
    geometry::{Point as EgPoint, Size as EgSize},
    mono_font::{
        ascii::{
            FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_ITALIC, FONT_7X14,
            FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_8X13_ITALIC, FONT_9X18,
            FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use paratext::{Font, FontDesc, FontMetrics, GlyphMetrics};
use paratext_render::{Canvas, Color, Point, Rect, Size};
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SizeBucket {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl SizeBucket {
    fn for_size(size: f32) -> Self {
        if size >= 24.0 {
            Self::ExtraLarge
        } else if size >= 20.0 {
            Self::Large
        } else if size >= 16.0 {
            Self::Medium
        } else {
            Self::Small
        }
    }
}

/// Picks the closest built-in mono font for a description.
///
/// Bold italic has no dedicated face and renders bold.
pub fn mono_font_for(desc: &FontDesc) -> &'static MonoFont<'static> {
    match (SizeBucket::for_size(desc.size), desc.bold, desc.italic) {
        (SizeBucket::Small, false, false) => &FONT_6X9,
        (SizeBucket::Small, false, true) => &FONT_6X13_ITALIC,
        (SizeBucket::Small, true, _) => &FONT_6X13_BOLD,
        (SizeBucket::Medium, false, false) => &FONT_7X14,
        (SizeBucket::Medium, false, true) => &FONT_7X13_ITALIC,
        (SizeBucket::Medium, true, _) => &FONT_7X14_BOLD,
        (SizeBucket::Large, false, false) => &FONT_8X13,
        (SizeBucket::Large, false, true) => &FONT_8X13_ITALIC,
        (SizeBucket::Large, true, _) => &FONT_8X13_BOLD,
        (SizeBucket::ExtraLarge, false, false) => &FONT_10X20,
        (SizeBucket::ExtraLarge, false, true) => &FONT_9X18,
        (SizeBucket::ExtraLarge, true, _) => &FONT_9X18_BOLD,
    }
}

/// [`GlyphMetrics`] backed by the embedded-graphics ASCII mono fonts.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoGlyphMetrics;

impl GlyphMetrics for MonoGlyphMetrics {
    fn char_size(&self, desc: &FontDesc, _ch: char) -> Size {
        let font = mono_font_for(desc);
        Size::new(
            (font.character_size.width + font.character_spacing) as f32,
            font.character_size.height as f32,
        )
    }

    fn font_metrics(&self, desc: &FontDesc) -> FontMetrics {
        let font = mono_font_for(desc);
        let height = font.character_size.height;
        FontMetrics {
            ascent: font.baseline as f32,
            descent: height.saturating_sub(font.baseline) as f32,
            leading: 0.0,
        }
    }
}

/// Maps typographic punctuation onto single ASCII glyphs the mono fonts carry.
fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    let replacement = |ch: char| match ch {
        '\u{00A0}' => Some(' '),
        '\u{2013}' | '\u{2014}' => Some('-'),
        '\u{2018}' | '\u{2019}' => Some('\''),
        '\u{201C}' | '\u{201D}' => Some('"'),
        _ => None,
    };
    if !text.chars().any(|ch| replacement(ch).is_some()) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| replacement(ch).unwrap_or(ch))
            .collect(),
    )
}

fn to_eg_point(point: Point) -> EgPoint {
    EgPoint::new(point.x.round() as i32, point.y.round() as i32)
}

fn to_rgb(color: Color) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}

/// A [`Canvas`] drawing onto an embedded-graphics target.
///
/// Canvas calls cannot fail, so the first target error is kept and later
/// calls become no-ops. Call [`EgCanvas::finish`] to collect it. Colors are
/// drawn opaque; fully transparent colors draw nothing.
pub struct EgCanvas<'a, D>
where
    D: DrawTarget,
{
    target: &'a mut D,
    clip: Option<Rect>,
    error: Option<D::Error>,
}

impl<'a, D> EgCanvas<'a, D>
where
    D: DrawTarget,
    D::Color: From<Rgb888>,
{
    pub fn new(target: &'a mut D) -> Self {
        Self {
            target,
            clip: None,
            error: None,
        }
    }

    /// Restrict drawing to items intersecting `clip`.
    pub fn with_clip(mut self, clip: Rect) -> Self {
        self.clip = Some(clip);
        self
    }

    /// First error reported by the target, if any.
    pub fn finish(self) -> Result<(), D::Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run(&mut self, draw: impl FnOnce(&mut D) -> Result<(), D::Error>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = draw(&mut *self.target) {
            log::debug!("draw target error; dropping remaining paragraph commands");
            self.error = Some(err);
        }
    }
}

impl<D> Canvas for EgCanvas<'_, D>
where
    D: DrawTarget,
    D::Color: From<Rgb888>,
{
    fn draw_text(&mut self, text: &str, origin: Point, font: &Font, color: Color) {
        if color.a == 0 {
            return;
        }
        let style = MonoTextStyle::new(mono_font_for(font.desc()), D::Color::from(to_rgb(color)));
        let text = normalize_text_for_mono(text);
        let origin = to_eg_point(origin);
        self.run(|target| {
            Text::with_baseline(text.as_ref(), origin, style, Baseline::Top)
                .draw(target)
                .map(|_| ())
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.a == 0 || rect.is_empty() {
            return;
        }
        let shape = Rectangle::new(
            to_eg_point(rect.origin()),
            EgSize::new(rect.width.round() as u32, rect.height.round() as u32),
        );
        let style = PrimitiveStyle::with_fill(D::Color::from(to_rgb(color)));
        self.run(|target| shape.into_styled(style).draw(target));
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke_width: f32, color: Color) {
        if color.a == 0 {
            return;
        }
        let style = PrimitiveStyle::with_stroke(
            D::Color::from(to_rgb(color)),
            stroke_width.round().max(1.0) as u32,
        );
        let line = Line::new(to_eg_point(from), to_eg_point(to));
        self.run(|target| line.into_styled(style).draw(target));
    }

    fn invalidated_rect(&self) -> Option<Rect> {
        if self.clip.is_some() {
            return self.clip;
        }
        let bounds = self.target.bounding_box();
        Some(Rect::new(
            bounds.top_left.x as f32,
            bounds.top_left.y as f32,
            bounds.size.width as f32,
            bounds.size.height as f32,
        ))
    }
}
