use paratext::{ItemKind, Point, Size, StyleRef, TextItem, EPSILON};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::render_ir::{EllipsizeMode, LaidOutItem, LayoutParams, MultiLineMode, TextAlign};

/// Placeholder drawn where a line is truncated.
pub const ELLIPSIS_TEXT: &str = "...";

/// Minimum gap between a middle ellipsis and the text after it, as a fraction
/// of the ellipsis width.
pub const MIDDLE_ELLIPSIS_SLACK_RATIO: f32 = 0.2;

/// Output of one layout pass.
#[derive(Clone, Debug, Default)]
pub struct LayoutResult {
    /// Words, spaces and tabs in visual order.
    pub items: Vec<LaidOutItem>,
    /// Widest line, measured to the last visible pixel after truncation.
    pub max_width: f32,
    pub total_height: f32,
}

/// Line-breaking engine for a run of text items.
#[derive(Clone, Copy, Debug, Default)]
pub struct Layouter {
    params: LayoutParams,
}

impl Layouter {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    /// Place `items` into lines.
    ///
    /// A wrapping mode with a width below [`EPSILON`] produces an empty result.
    pub fn layout(&self, items: &[Arc<TextItem>]) -> LayoutResult {
        if self.params.multi_line.wraps() && self.params.width < EPSILON {
            log::debug!(
                "skipping layout: width {} too small to wrap",
                self.params.width
            );
            return LayoutResult::default();
        }
        let mut state = LayoutState::new(&self.params);
        state.run(items);
        let result = state.finish();
        log::debug!(
            "laid out {} of {} items: max_width={} total_height={}",
            result.items.len(),
            items.len(),
            result.max_width,
            result.total_height
        );
        result
    }
}

struct LineEntry {
    item: Arc<TextItem>,
    x: f32,
    size: Size,
}

struct LayoutState<'a> {
    params: &'a LayoutParams,
    x: f32,
    y: f32,
    line: SmallVec<[LineEntry; 16]>,
    line_height: f32,
    max_width: f32,
    ended: bool,
    output: Vec<LaidOutItem>,
}

impl<'a> LayoutState<'a> {
    fn new(params: &'a LayoutParams) -> Self {
        Self {
            params,
            x: 0.0,
            y: 0.0,
            line: SmallVec::new(),
            line_height: 0.0,
            max_width: 0.0,
            ended: false,
            output: Vec::new(),
        }
    }

    fn run(&mut self, items: &[Arc<TextItem>]) {
        let mut idx = 0usize;
        while idx < items.len() && !self.ended {
            let item = &items[idx];
            match item.kind() {
                ItemKind::Word(_) => {
                    let run_end = items[idx..]
                        .iter()
                        .position(|next| !next.is_word())
                        .map_or(items.len(), |offset| idx + offset);
                    idx += self.process_words(&items[idx..run_end]).max(1);
                }
                ItemKind::Tab => {
                    let height = item.measure().height;
                    let stop = self.next_tab_stop();
                    self.append(Arc::clone(item), Size::new(stop - self.x, height));
                    idx += 1;
                }
                ItemKind::LineBreak => {
                    self.apply_line_height(item, item.measure().height);
                    self.end_line();
                    if self.params.multi_line == MultiLineMode::Single {
                        self.ended = true;
                    }
                    idx += 1;
                }
                ItemKind::Space | ItemKind::Attach(_) => {
                    self.append(Arc::clone(item), item.measure());
                    idx += 1;
                }
            }
        }
        if !self.ended && !self.line.is_empty() {
            self.end_line();
        }
    }

    fn finish(self) -> LayoutResult {
        LayoutResult {
            items: self.output,
            max_width: self.max_width,
            total_height: self.y,
        }
    }

    fn next_tab_stop(&self) -> f32 {
        let tab_width = self.params.tab_width;
        if tab_width < EPSILON {
            return self.x;
        }
        (((self.x + self.params.tab_margin) / tab_width).floor() + 1.0) * tab_width
    }

    fn apply_line_height(&mut self, item: &TextItem, natural_height: f32) {
        let style = item.style();
        let height = if style.has_line_height() {
            style.line_height
        } else {
            natural_height
        };
        self.line_height = self.line_height.max(height);
    }

    fn append(&mut self, item: Arc<TextItem>, size: Size) {
        self.apply_line_height(&item, size.height);
        self.line.push(LineEntry {
            item,
            x: self.x,
            size,
        });
        self.x += size.width;
    }

    fn fits(&self, width: f32) -> bool {
        self.x + width <= self.params.width + EPSILON
    }

    /// Lays out a run of adjacent words. Returns how many were consumed; the
    /// caller restarts after a split word.
    fn process_words(&mut self, words: &[Arc<TextItem>]) -> usize {
        let sizes: SmallVec<[Size; 8]> = words.iter().map(|word| word.measure()).collect();
        let run_width: f32 = sizes.iter().map(|size| size.width).sum();

        if !self.params.multi_line.wraps() || self.fits(run_width) {
            self.append_all(words, &sizes);
            return words.len();
        }
        if self.params.multi_line == MultiLineMode::BreakWord || self.line.is_empty() {
            return self.break_words(words, &sizes);
        }

        self.end_line();
        if self.ended {
            return words.len();
        }
        if self.fits(run_width) {
            self.append_all(words, &sizes);
            words.len()
        } else {
            self.break_words(words, &sizes)
        }
    }

    fn append_all(&mut self, words: &[Arc<TextItem>], sizes: &[Size]) {
        for (word, size) in words.iter().zip(sizes) {
            self.append(Arc::clone(word), *size);
        }
    }

    /// Appends whole words while they fit, then splits the first that doesn't.
    fn break_words(&mut self, words: &[Arc<TextItem>], sizes: &[Size]) -> usize {
        for (idx, (word, size)) in words.iter().zip(sizes).enumerate() {
            if self.fits(size.width) {
                self.append(Arc::clone(word), *size);
                continue;
            }
            self.split_word(word, *size);
            return idx + 1;
        }
        words.len()
    }

    /// Splits `word` into per-line pieces. The last piece stays on the open line.
    fn split_word(&mut self, word: &Arc<TextItem>, size: Size) {
        let (Some(font), Some(text)) = (word.style().font.as_ref(), word.text()) else {
            self.append(Arc::clone(word), size);
            return;
        };
        let advances = font.glyphs().advances(text);
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(core::iter::once(text.len()))
            .collect();

        let mut start = 0usize;
        let mut piece_width = 0.0f32;
        let mut idx = 0usize;
        while idx < advances.len() {
            let advance = advances[idx];
            if self.fits(piece_width + advance) {
                piece_width += advance;
                idx += 1;
                continue;
            }
            if idx == start {
                if !self.line.is_empty() {
                    self.end_line();
                    if self.ended {
                        return;
                    }
                    continue;
                }
                // Every line takes at least one glyph.
                piece_width += advance;
                idx += 1;
                continue;
            }
            self.append_piece(word, &text[boundaries[start]..boundaries[idx]], piece_width, size.height);
            self.end_line();
            if self.ended {
                return;
            }
            start = idx;
            piece_width = 0.0;
        }
        if start < advances.len() {
            self.append_piece(word, &text[boundaries[start]..], piece_width, size.height);
        }
    }

    fn append_piece(&mut self, word: &TextItem, text: &str, width: f32, height: f32) {
        let piece = TextItem::word(text, Arc::clone(word.style()));
        self.append(Arc::new(piece), Size::new(width, height));
    }

    /// Positions the buffered line, truncates it if needed and moves the pen down.
    fn end_line(&mut self) {
        let budget = self.params.width;
        let line_width = self.x;
        let line_y = self.y;
        let line_height = self.line_height;
        let ellipsize =
            self.params.ellipsis != EllipsizeMode::None && line_width > budget + EPSILON;
        let origin_x = if ellipsize {
            0.0
        } else {
            match self.params.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (budget - line_width) / 2.0,
                TextAlign::Right => budget - line_width,
            }
        };

        let line_start = self.output.len();
        let line_style = self.line.last().map(|entry| Arc::clone(entry.item.style()));
        for entry in self.line.drain(..) {
            let position = Point::new(
                origin_x + entry.x,
                line_y + (line_height - entry.size.height) / 2.0,
            );
            if let ItemKind::Attach(object) = entry.item.kind() {
                object.set_position(position);
                continue;
            }
            if matches!(entry.item.kind(), ItemKind::LineBreak) {
                continue;
            }
            self.output.push(LaidOutItem {
                item: entry.item,
                position,
                size: entry.size,
            });
        }

        let mut visible_width = line_width;
        if ellipsize {
            if let Some(width) =
                self.ellipsize(line_start, line_style, line_y, line_height, line_width)
            {
                visible_width = width;
                self.ended = true;
            }
        }
        self.max_width = self.max_width.max(visible_width);
        self.y += line_height;
        self.x = 0.0;
        self.line_height = 0.0;
    }

    /// Truncates the line stored at `output[line_start..]`. Returns the visible
    /// width, or `None` when the line was left alone.
    fn ellipsize(
        &mut self,
        line_start: usize,
        line_style: Option<StyleRef>,
        line_y: f32,
        line_height: f32,
        line_width: f32,
    ) -> Option<f32> {
        // The last emitted item styles the ellipsis; attachment-only lines use their own.
        let style = match self.output.get(line_start..).and_then(<[_]>::last) {
            Some(laid) => Arc::clone(laid.item.style()),
            None => line_style?,
        };
        let item = Arc::new(TextItem::word(ELLIPSIS_TEXT, style));
        let size = item.measure();
        let budget = self.params.width;
        if budget < size.width {
            log::trace!(
                "skipping ellipsis: width {} narrower than ellipsis {}",
                budget,
                size.width
            );
            return None;
        }
        let ellipsis = Ellipsis {
            item,
            size,
            y: line_y + (line_height - size.height) / 2.0,
        };

        let line = self.output.split_off(line_start);
        let truncated = match self.params.ellipsis {
            EllipsizeMode::None => None,
            EllipsizeMode::End => ellipsize_end(&line, &ellipsis, budget),
            EllipsizeMode::Start => ellipsize_start(&line, &ellipsis, budget, line_width),
            EllipsizeMode::Middle => ellipsize_middle(&line, &ellipsis, budget, line_width),
        };
        match truncated {
            Some((items, visible_width)) => {
                self.output.extend(items);
                Some(visible_width)
            }
            None => {
                self.output.extend(line);
                None
            }
        }
    }
}

struct Ellipsis {
    item: Arc<TextItem>,
    size: Size,
    y: f32,
}

impl Ellipsis {
    fn at(&self, x: f32) -> LaidOutItem {
        LaidOutItem {
            item: Arc::clone(&self.item),
            position: Point::new(x, self.y),
            size: self.size,
        }
    }
}

fn shifted(laid: &LaidOutItem, dx: f32) -> LaidOutItem {
    let mut moved = laid.clone();
    moved.position.x += dx;
    moved
}

/// Longest prefix of a word that fits in `available`, at the word's position.
fn fit_prefix(laid: &LaidOutItem, available: f32) -> Option<LaidOutItem> {
    let text = laid.item.text()?;
    let font = laid.item.style().font.as_ref()?;
    let advances = font.glyphs().advances(text);
    let mut width = 0.0f32;
    let mut count = 0usize;
    for advance in advances {
        if width + advance > available + EPSILON {
            break;
        }
        width += advance;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let end = text.char_indices().nth(count).map_or(text.len(), |(offset, _)| offset);
    Some(LaidOutItem {
        item: Arc::new(TextItem::word(&text[..end], Arc::clone(laid.item.style()))),
        position: laid.position,
        size: Size::new(width, laid.size.height),
    })
}

/// Longest suffix of a word that fits in `available`, ending at `right`.
fn fit_suffix(laid: &LaidOutItem, available: f32, right: f32) -> Option<LaidOutItem> {
    let text = laid.item.text()?;
    let font = laid.item.style().font.as_ref()?;
    let advances = font.glyphs().advances(text);
    let mut width = 0.0f32;
    let mut count = 0usize;
    for advance in advances.iter().rev() {
        if width + advance > available + EPSILON {
            break;
        }
        width += advance;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let start = text
        .char_indices()
        .nth(advances.len() - count)
        .map_or(text.len(), |(offset, _)| offset);
    Some(LaidOutItem {
        item: Arc::new(TextItem::word(&text[start..], Arc::clone(laid.item.style()))),
        position: Point::new(right - width, laid.position.y),
        size: Size::new(width, laid.size.height),
    })
}

/// Keep the head of the line and append the ellipsis.
fn ellipsize_end(
    line: &[LaidOutItem],
    ellipsis: &Ellipsis,
    budget: f32,
) -> Option<(Vec<LaidOutItem>, f32)> {
    let limit = budget - ellipsis.size.width;
    let cut = line
        .iter()
        .position(|laid| laid.right() > limit + EPSILON)
        .unwrap_or(line.len());
    let mut kept: Vec<LaidOutItem> = line[..cut].to_vec();
    // Attachments are not in `line`; one that overflows ends the kept text where it starts.
    let mut ellipsis_x = kept.last().map_or(0.0, LaidOutItem::right);
    if let Some(cut_item) = line.get(cut).filter(|laid| laid.position.x <= limit + EPSILON) {
        ellipsis_x = cut_item.position.x;
        if let Some(prefix) = fit_prefix(cut_item, limit - cut_item.position.x) {
            ellipsis_x = prefix.right();
            kept.push(prefix);
        }
    }
    kept.push(ellipsis.at(ellipsis_x));
    Some((kept, ellipsis_x + ellipsis.size.width))
}

/// Keep the tail of the line, right-anchored, behind a leading ellipsis.
fn ellipsize_start(
    line: &[LaidOutItem],
    ellipsis: &Ellipsis,
    budget: f32,
    line_width: f32,
) -> Option<(Vec<LaidOutItem>, f32)> {
    let shift = budget - line_width;
    let ellipsis_width = ellipsis.size.width;
    let cut = line
        .iter()
        .rposition(|laid| laid.position.x + shift < ellipsis_width - EPSILON)?;
    let cut_item = &line[cut];
    let cut_right = cut_item.right() + shift;
    let suffix = fit_suffix(cut_item, cut_right - ellipsis_width, cut_right);
    let content_x = suffix.as_ref().map_or(cut_right, |kept| kept.position.x);

    let mut kept = Vec::with_capacity(line.len() - cut + 1);
    kept.push(ellipsis.at(content_x - ellipsis_width));
    kept.extend(suffix);
    kept.extend(line[cut + 1..].iter().map(|laid| shifted(laid, shift)));
    Some((kept, budget))
}

/// Keep both ends of the line with the ellipsis in between.
fn ellipsize_middle(
    line: &[LaidOutItem],
    ellipsis: &Ellipsis,
    budget: f32,
    line_width: f32,
) -> Option<(Vec<LaidOutItem>, f32)> {
    let ellipsis_width = ellipsis.size.width;
    let half = (budget - ellipsis_width) / 2.0;
    let slack = ellipsis_width * MIDDLE_ELLIPSIS_SLACK_RATIO;
    let shift = budget - line_width;

    let left_cut = line.iter().position(|laid| laid.right() > half + EPSILON)?;
    let left_item = &line[left_cut];
    let prefix = fit_prefix(left_item, half - left_item.position.x);
    let left_end = prefix
        .as_ref()
        .map_or(left_item.position.x, |kept| kept.right());

    let right_bound = left_end + ellipsis_width + slack;
    let right_from = (left_cut..line.len())
        .find(|&idx| line[idx].position.x + shift >= right_bound - EPSILON)
        .unwrap_or(line.len());
    let suffix = (right_from > left_cut)
        .then(|| &line[right_from - 1])
        .and_then(|straddle| {
            let right = straddle.right() + shift;
            (right > right_bound + EPSILON)
                .then(|| fit_suffix(straddle, right - right_bound, right))
                .flatten()
        });

    let right_x = suffix
        .as_ref()
        .map(|kept| kept.position.x)
        .or_else(|| line.get(right_from).map(|laid| laid.position.x + shift));
    let ellipsis_x = right_x.map_or(left_end, |x| (x - slack - ellipsis_width).max(left_end));
    let visible_width = if right_x.is_some() {
        budget
    } else {
        ellipsis_x + ellipsis_width
    };

    let mut kept: Vec<LaidOutItem> = line[..left_cut].to_vec();
    kept.extend(prefix);
    kept.push(ellipsis.at(ellipsis_x));
    kept.extend(suffix);
    kept.extend(line[right_from..].iter().map(|laid| shifted(laid, shift)));
    Some((kept, visible_width))
}
