use paratext::{almost_equal, Color, FontRef, Rect, TextStyle, UnitConfig, EPSILON};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::paragraph::TextParagraph;
use crate::render_ir::{
    Canvas, EllipsizeMode, LaidOutItem, LayoutParams, MultiLineMode, TextAlign, VerticalAlign,
};

/// Inputs of a [`SimpleTextBox`] update.
#[derive(Clone, Debug)]
pub struct TextBoxParams<'a> {
    pub text: &'a str,
    /// Parse `text` as markup instead of plain text.
    pub hyper_text: bool,
    pub font: Option<FontRef>,
    /// Width budget; negative values clamp to zero.
    pub width: f32,
    /// The box sizes itself to its content, so lines never wrap.
    pub wrapping_width: bool,
    pub multi_line: MultiLineMode,
    pub ellipsis: EllipsizeMode,
    pub align: TextAlign,
}

impl<'a> TextBoxParams<'a> {
    /// Single left-aligned plain-text line.
    pub fn new(text: &'a str, font: Option<FontRef>) -> Self {
        Self {
            text,
            hyper_text: false,
            font,
            width: 0.0,
            wrapping_width: false,
            multi_line: MultiLineMode::Single,
            ellipsis: EllipsizeMode::None,
            align: TextAlign::Left,
        }
    }
}

/// Inputs of the last update, after mode normalization.
struct CacheKey {
    text: String,
    hyper_text: bool,
    font: Option<FontRef>,
    width: f32,
    multi_line: MultiLineMode,
    ellipsis: EllipsizeMode,
    align: TextAlign,
}

fn same_font(a: &Option<FontRef>, b: &Option<FontRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// A paragraph that re-tokenizes and re-lays out only when its inputs change.
#[derive(Default)]
pub struct SimpleTextBox {
    paragraph: TextParagraph,
    key: Mutex<Option<CacheKey>>,
}

impl SimpleTextBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: UnitConfig) -> Self {
        Self {
            paragraph: TextParagraph::with_units(units),
            key: Mutex::default(),
        }
    }

    fn key(&self) -> MutexGuard<'_, Option<CacheKey>> {
        self.key.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn paragraph(&self) -> &TextParagraph {
        &self.paragraph
    }

    /// Bring the cached paragraph in line with `params`.
    pub fn update(&self, params: &TextBoxParams<'_>) {
        self.update_locked(&mut self.key(), params);
    }

    fn update_locked(&self, key: &mut Option<CacheKey>, params: &TextBoxParams<'_>) {
        let mut multi_line = params.multi_line;
        let mut ellipsis = params.ellipsis;
        let mut width = params.width.max(0.0);
        if params.wrapping_width && multi_line != MultiLineMode::Single {
            multi_line = MultiLineMode::Multiple;
        }
        if params.wrapping_width || multi_line != MultiLineMode::Single {
            ellipsis = EllipsizeMode::None;
        }
        // Unwrapped, untruncated, left-aligned text never looks at the width.
        if params.align == TextAlign::Left
            && matches!(multi_line, MultiLineMode::Single | MultiLineMode::Multiple)
            && ellipsis == EllipsizeMode::None
        {
            width = 0.0;
        }

        // Styles are frozen once shared, so any font change means new items.
        let retokenize = key.as_ref().map_or(true, |last| {
            last.text != params.text
                || last.hyper_text != params.hyper_text
                || !same_font(&last.font, &params.font)
        });
        let relayout = retokenize
            || key.as_ref().map_or(true, |last| {
                !almost_equal(last.width, width)
                    || last.multi_line != multi_line
                    || last.ellipsis != ellipsis
                    || last.align != params.align
            });

        let tab_width = params.font.as_ref().map_or(0.0, |font| font.height() * 2.0);
        let layout = LayoutParams {
            width,
            tab_width,
            tab_margin: tab_width / 4.0,
            align: params.align,
            multi_line,
            ellipsis,
        };
        if retokenize {
            let style = match &params.font {
                Some(font) => TextStyle::with_font(Arc::clone(font)),
                None => TextStyle::default(),
            }
            .into_ref();
            self.paragraph.rebuild(params.text, &style, params.hyper_text, &layout);
        } else if relayout {
            self.paragraph.layout(&layout);
        } else {
            log::trace!("text box layout cache hit");
        }

        *key = Some(CacheKey {
            text: params.text.to_string(),
            hyper_text: params.hyper_text,
            font: params.font.clone(),
            width,
            multi_line,
            ellipsis,
            align: params.align,
        });
    }

    /// Width of the widest laid-out line.
    pub fn content_width(&self) -> f32 {
        self.paragraph.maximum_width()
    }

    pub fn content_height(&self) -> f32 {
        self.paragraph.total_height()
    }

    /// Hit-test in box coordinates.
    pub fn item_at_position(&self, x: f32, y: f32) -> Option<LaidOutItem> {
        self.paragraph.item_at_position(x, y)
    }

    /// Update against `frame`'s width, then draw inside `frame`.
    ///
    /// Nothing is drawn for a zero color or a frame narrower than [`EPSILON`].
    pub fn draw(
        &self,
        canvas: &mut dyn Canvas,
        params: &TextBoxParams<'_>,
        frame: Rect,
        vertical_align: VerticalAlign,
        color: Color,
    ) {
        if color.is_zero() || frame.width < EPSILON {
            return;
        }
        // Held through the draw so no other update lands in between.
        let mut key = self.key();
        self.update_locked(
            &mut key,
            &TextBoxParams {
                width: frame.width,
                ..params.clone()
            },
        );
        let height = self.content_height();
        let top = match vertical_align {
            VerticalAlign::Top => frame.top(),
            VerticalAlign::Middle => frame.top() + (frame.height - height) / 2.0,
            VerticalAlign::Bottom => frame.bottom() - height,
        };
        self.paragraph.draw(canvas, frame.left(), top, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paratext::{Font, FontDesc, MonospaceMetrics, Point};

    fn mono_font() -> FontRef {
        Font::new(FontDesc::new("mono", 10.0), Arc::new(MonospaceMetrics::default()))
    }

    fn first_item(text_box: &SimpleTextBox) -> LaidOutItem {
        text_box.paragraph().laid_out_items().remove(0)
    }

    #[test]
    fn width_change_relayouts_without_retokenizing() {
        let font = mono_font();
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("aaa bbb ccc", Some(font));
        params.multi_line = MultiLineMode::WordWrap;
        params.width = 40.0;
        text_box.update(&params);
        assert_eq!(text_box.content_height(), 20.0);
        let before = first_item(&text_box);

        params.width = 100.0;
        text_box.update(&params);
        assert_eq!(text_box.content_height(), 10.0);
        assert!(Arc::ptr_eq(&before.item, &first_item(&text_box).item));
    }

    #[test]
    fn text_change_retokenizes() {
        let font = mono_font();
        let text_box = SimpleTextBox::new();
        text_box.update(&TextBoxParams::new("one", Some(font.clone())));
        let before = first_item(&text_box);
        text_box.update(&TextBoxParams::new("two", Some(font)));
        let after = first_item(&text_box);
        assert!(!Arc::ptr_eq(&before.item, &after.item));
        assert_eq!(after.item.text(), Some("two"));
    }

    #[test]
    fn unchanged_inputs_keep_layout() {
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("hello world", Some(mono_font()));
        params.width = 40.0;
        params.ellipsis = EllipsizeMode::End;
        text_box.update(&params);
        let ellipsis = text_box.paragraph().laid_out_items().pop().unwrap();
        assert_eq!(ellipsis.item.text(), Some("..."));

        text_box.update(&params);
        let again = text_box.paragraph().laid_out_items().pop().unwrap();
        assert!(Arc::ptr_eq(&ellipsis.item, &again.item));
    }

    #[test]
    fn multi_line_and_wrapping_width_drop_ellipsis() {
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("hello world", Some(mono_font()));
        params.width = 40.0;
        params.ellipsis = EllipsizeMode::End;
        params.multi_line = MultiLineMode::WordWrap;
        params.wrapping_width = true;
        text_box.update(&params);
        // Auto width turns wrapping into explicit-break mode: one long line.
        assert_eq!(text_box.content_width(), 53.0);
        assert_eq!(text_box.content_height(), 10.0);
    }

    #[test]
    fn empty_text_has_no_content() {
        let text_box = SimpleTextBox::new();
        text_box.update(&TextBoxParams::new("", Some(mono_font())));
        assert_eq!(text_box.content_width(), 0.0);
        assert_eq!(text_box.content_height(), 0.0);
        assert!(text_box.item_at_position(0.0, 0.0).is_none());
    }

    #[test]
    fn hyper_text_box_resolves_markup() {
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("<b>x</b> y", Some(mono_font()));
        params.hyper_text = true;
        text_box.update(&params);
        let bold = first_item(&text_box);
        assert!(bold.item.style().font.as_ref().unwrap().desc().bold);
        assert_eq!(text_box.paragraph().logical_length(), 3);
    }

    #[test]
    fn font_change_retokenizes() {
        let text_box = SimpleTextBox::new();
        text_box.update(&TextBoxParams::new("one", Some(mono_font())));
        let before = first_item(&text_box);

        let larger = Font::new(FontDesc::new("mono", 20.0), Arc::new(MonospaceMetrics::default()));
        text_box.update(&TextBoxParams::new("one", Some(larger.clone())));
        let after = first_item(&text_box);
        assert!(!Arc::ptr_eq(&before.item, &after.item));
        assert!(Arc::ptr_eq(after.item.style().font.as_ref().unwrap(), &larger));
        assert_eq!(text_box.content_height(), 20.0);
    }

    #[test]
    fn font_change_retokenizes_hyper_text() {
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("x <b>y</b>", Some(mono_font()));
        params.hyper_text = true;
        text_box.update(&params);

        let larger = Font::new(FontDesc::new("mono", 20.0), Arc::new(MonospaceMetrics::default()));
        params.font = Some(larger.clone());
        text_box.update(&params);
        let plain = first_item(&text_box);
        assert!(Arc::ptr_eq(plain.item.style().font.as_ref().unwrap(), &larger));
        let bold = text_box.paragraph().laid_out_items().pop().unwrap();
        assert_eq!(bold.item.text(), Some("y"));
        assert_eq!(bold.item.style().font.as_ref().unwrap().size(), 20.0);
        assert!(bold.item.style().font.as_ref().unwrap().desc().bold);
    }

    #[derive(Default)]
    struct Origins(Vec<Point>);

    impl Canvas for Origins {
        fn draw_text(&mut self, _text: &str, origin: Point, _font: &paratext::Font, _color: Color) {
            self.0.push(origin);
        }

        fn fill_rect(&mut self, _rect: Rect, _color: Color) {}

        fn draw_line(&mut self, _from: Point, _to: Point, _stroke_width: f32, _color: Color) {}
    }

    #[test]
    fn draw_applies_vertical_alignment() {
        let text_box = SimpleTextBox::new();
        let params = TextBoxParams::new("ab", Some(mono_font()));
        let frame = Rect::new(5.0, 100.0, 50.0, 30.0);

        let mut canvas = Origins::default();
        text_box.draw(&mut canvas, &params, frame, VerticalAlign::Top, Color::BLACK);
        text_box.draw(&mut canvas, &params, frame, VerticalAlign::Middle, Color::BLACK);
        text_box.draw(&mut canvas, &params, frame, VerticalAlign::Bottom, Color::BLACK);
        assert_eq!(
            canvas.0,
            vec![
                Point::new(5.0, 100.0),
                Point::new(5.0, 110.0),
                Point::new(5.0, 120.0),
            ]
        );
    }

    #[test]
    fn draw_skips_zero_color_and_empty_frame() {
        let text_box = SimpleTextBox::new();
        let params = TextBoxParams::new("ab", Some(mono_font()));
        let mut canvas = Origins::default();
        text_box.draw(&mut canvas, &params, Rect::new(0.0, 0.0, 50.0, 10.0), VerticalAlign::Top, Color::ZERO);
        text_box.draw(&mut canvas, &params, Rect::new(0.0, 0.0, 0.0, 10.0), VerticalAlign::Top, Color::BLACK);
        assert!(canvas.0.is_empty());
    }

    #[test]
    fn right_aligned_box_uses_frame_width() {
        let text_box = SimpleTextBox::new();
        let mut params = TextBoxParams::new("ab", Some(mono_font()));
        params.align = TextAlign::Right;
        let mut canvas = Origins::default();
        text_box.draw(&mut canvas, &params, Rect::new(0.0, 0.0, 50.0, 10.0), VerticalAlign::Top, Color::BLACK);
        assert_eq!(canvas.0, vec![Point::new(40.0, 0.0)]);
    }
}
