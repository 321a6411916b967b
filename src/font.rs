//! Font descriptors, glyph-metrics providers and the per-font glyph atlas.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::geometry::{almost_equal, Size};

/// Requested face for a run of text.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontDesc {
    /// Family name, case preserved.
    pub family: String,
    /// Font size in pixels.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    /// Underline requested by the face itself (as opposed to markup).
    pub underline: bool,
    /// Strikeout requested by the face itself.
    pub strikeout: bool,
}

impl Default for FontDesc {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size: 16.0,
            bold: false,
            italic: false,
            underline: false,
            strikeout: false,
        }
    }
}

impl FontDesc {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            ..Self::default()
        }
    }

    /// Compares the fields that select a face: family, size, weight and slant.
    pub fn same_face(&self, other: &FontDesc) -> bool {
        self.family.eq_ignore_ascii_case(&other.family)
            && almost_equal(self.size, other.size)
            && self.bold == other.bold
            && self.italic == other.italic
    }
}

/// Vertical font metrics in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of the line box.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line box.
    pub descent: f32,
    /// Extra gap recommended between lines.
    pub leading: f32,
}

impl FontMetrics {
    /// Line box height (`ascent + descent`).
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Width oracle for glyphs. Results must be stable for a given `(desc, ch)`.
pub trait GlyphMetrics: Send + Sync {
    /// Advance width and line height of a single character.
    fn char_size(&self, desc: &FontDesc, ch: char) -> Size;

    /// Vertical metrics for the face.
    fn font_metrics(&self, desc: &FontDesc) -> FontMetrics;
}

/// Deterministic metrics where every glyph advances by a fixed ratio of the font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMetrics {
    /// Advance width as a fraction of the font size.
    pub advance_ratio: f32,
    /// Ascent as a fraction of the font size.
    pub ascent_ratio: f32,
    /// Descent as a fraction of the font size.
    pub descent_ratio: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance_ratio: 0.5,
            ascent_ratio: 0.8,
            descent_ratio: 0.2,
        }
    }
}

impl GlyphMetrics for MonospaceMetrics {
    fn char_size(&self, desc: &FontDesc, _ch: char) -> Size {
        let metrics = self.font_metrics(desc);
        Size::new(desc.size * self.advance_ratio, metrics.height())
    }

    fn font_metrics(&self, desc: &FontDesc) -> FontMetrics {
        FontMetrics {
            ascent: desc.size * self.ascent_ratio,
            descent: desc.size * self.descent_ratio,
            leading: 0.0,
        }
    }
}

/// A face bound to its metrics provider, with a private glyph-size atlas.
///
/// Fonts are shared between styles and paragraphs as [`FontRef`]. The atlas has
/// its own lock so paragraphs on different threads can measure with one font.
pub struct Font {
    desc: FontDesc,
    provider: Arc<dyn GlyphMetrics>,
    metrics: FontMetrics,
    atlas: Mutex<HashMap<char, Size>>,
}

/// Shared font handle.
pub type FontRef = Arc<Font>;

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("desc", &self.desc)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Font {
    pub fn new(desc: FontDesc, provider: Arc<dyn GlyphMetrics>) -> FontRef {
        let metrics = provider.font_metrics(&desc);
        Arc::new(Self {
            desc,
            provider,
            metrics,
            atlas: Mutex::new(HashMap::new()),
        })
    }

    /// A sibling face on the same metrics provider.
    pub fn derive(&self, desc: FontDesc) -> FontRef {
        Font::new(desc, Arc::clone(&self.provider))
    }

    pub fn desc(&self) -> &FontDesc {
        &self.desc
    }

    pub fn size(&self) -> f32 {
        self.desc.size
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Line box height used for spaces, tabs and line breaks.
    pub fn height(&self) -> f32 {
        self.metrics.height()
    }

    /// Locks the glyph atlas for a measuring pass.
    pub fn glyphs(&self) -> GlyphAtlas<'_> {
        GlyphAtlas {
            font: self,
            cache: self.atlas.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Width is the sum of glyph advances, height the tallest glyph.
    pub fn measure_text(&self, text: &str) -> Size {
        self.glyphs().text_size(text)
    }
}

/// Locked view of a font's glyph-size cache.
pub struct GlyphAtlas<'a> {
    font: &'a Font,
    cache: MutexGuard<'a, HashMap<char, Size>>,
}

impl GlyphAtlas<'_> {
    pub fn char_size(&mut self, ch: char) -> Size {
        if let Some(size) = self.cache.get(&ch) {
            return *size;
        }
        let size = self.font.provider.char_size(&self.font.desc, ch);
        self.cache.insert(ch, size);
        size
    }

    pub fn text_size(&mut self, text: &str) -> Size {
        text.chars().fold(Size::ZERO, |acc, ch| {
            let glyph = self.char_size(ch);
            Size::new(acc.width + glyph.width, acc.height.max(glyph.height))
        })
    }

    /// Advance of every character in `text`, in order.
    pub fn advances(&mut self, text: &str) -> Vec<f32> {
        text.chars().map(|ch| self.char_size(ch).width).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingMetrics {
        calls: AtomicUsize,
    }

    impl GlyphMetrics for CountingMetrics {
        fn char_size(&self, desc: &FontDesc, _ch: char) -> Size {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Size::new(desc.size / 2.0, desc.size)
        }

        fn font_metrics(&self, desc: &FontDesc) -> FontMetrics {
            FontMetrics {
                ascent: desc.size * 0.75,
                descent: desc.size * 0.25,
                leading: 0.0,
            }
        }
    }

    #[test]
    fn atlas_caches_glyphs_per_font() {
        let provider = Arc::new(CountingMetrics::default());
        let font = Font::new(FontDesc::new("Serif", 10.0), provider.clone());

        assert_eq!(font.measure_text("abba"), Size::new(20.0, 10.0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(font.measure_text("ab"), Size::new(10.0, 10.0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn derived_font_shares_provider_but_not_atlas() {
        let provider = Arc::new(CountingMetrics::default());
        let font = Font::new(FontDesc::new("Serif", 10.0), provider.clone());
        font.measure_text("a");

        let bold = font.derive(FontDesc {
            bold: true,
            ..font.desc().clone()
        });
        assert_eq!(bold.measure_text("a"), Size::new(5.0, 10.0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bold.height(), 10.0);
    }

    #[test]
    fn same_face_ignores_decoration_and_family_case() {
        let a = FontDesc::new("Arial", 12.0);
        let b = FontDesc {
            underline: true,
            ..FontDesc::new("arial", 12.0)
        };
        assert!(a.same_face(&b));
        assert!(!a.same_face(&FontDesc::new("Arial", 13.0)));
    }

    #[test]
    fn empty_text_measures_zero() {
        let font = Font::new(FontDesc::default(), Arc::new(MonospaceMetrics::default()));
        assert_eq!(font.measure_text(""), Size::ZERO);
    }
}
