//! Ordered item storage and the plain-text tokenizer.

use std::sync::Arc;

use crate::hypertext;
use crate::item::{InlineAttachment, TextItem};
use crate::markup::parse_markup;
use crate::style::StyleRef;
use crate::units::UnitConfig;

/// Items of one paragraph in reading order, plus the source length they cover.
#[derive(Clone, Debug, Default)]
pub struct TextItemList {
    items: Vec<Arc<TextItem>>,
    logical_length: usize,
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\u{0B}' | '\u{0C}')
}

impl TextItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Arc<TextItem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Source characters represented so far.
    pub fn logical_length(&self) -> usize {
        self.logical_length
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.logical_length = 0;
    }

    pub fn push(&mut self, item: TextItem) {
        self.logical_length += item.logical_length();
        self.items.push(Arc::new(item));
    }

    pub fn add_attachment(&mut self, object: Arc<dyn InlineAttachment>, style: &StyleRef) {
        self.push(TextItem::attachment(object, Arc::clone(style)));
    }

    /// Split `text` into words, spaces, tabs and line breaks.
    ///
    /// `\r\n` yields a single line break. Vertical tab and form feed separate
    /// words without producing an item.
    pub fn add_text(&mut self, text: &str, style: &StyleRef) {
        let mut word_start: Option<usize> = None;
        let mut chars = text.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if !is_separator(ch) {
                word_start.get_or_insert(idx);
                continue;
            }
            if let Some(start) = word_start.take() {
                self.push(TextItem::word(&text[start..idx], Arc::clone(style)));
            }
            match ch {
                ' ' => self.push(TextItem::space(Arc::clone(style))),
                '\t' => self.push(TextItem::tab(Arc::clone(style))),
                '\r' => {
                    if chars.peek().is_some_and(|(_, next)| *next == '\n') {
                        chars.next();
                    }
                    self.push(TextItem::line_break(Arc::clone(style)));
                }
                '\n' => self.push(TextItem::line_break(Arc::clone(style))),
                _ => {}
            }
        }
        if let Some(start) = word_start {
            self.push(TextItem::word(&text[start..], Arc::clone(style)));
        }
    }

    /// Parse `markup` and append its styled items. Malformed markup adds nothing.
    pub fn add_hyper_text(&mut self, markup: &str, style: &StyleRef, units: &UnitConfig) {
        match parse_markup(markup) {
            Ok(document) => hypertext::append_document(self, &document, style, units),
            Err(err) => log::debug!("ignoring malformed markup: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::style::TextStyle;

    fn kinds(list: &TextItemList) -> Vec<String> {
        list.items()
            .iter()
            .map(|item| match item.kind() {
                ItemKind::Word(word) => format!("W({})", word.text()),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn splits_words_and_spaces() {
        let mut list = TextItemList::new();
        list.add_text("a b", &TextStyle::default().into_ref());
        assert_eq!(kinds(&list), ["W(a)", "Space", "W(b)"]);
        assert_eq!(list.logical_length(), 3);
    }

    #[test]
    fn crlf_is_one_break() {
        let mut list = TextItemList::new();
        list.add_text("one\r\ntwo\rthree\n", &TextStyle::default().into_ref());
        assert_eq!(
            kinds(&list),
            ["W(one)", "LineBreak", "W(two)", "LineBreak", "W(three)", "LineBreak"]
        );
        assert_eq!(list.logical_length(), 14);
    }

    #[test]
    fn preserves_runs_of_whitespace() {
        let mut list = TextItemList::new();
        list.add_text("x\t  y", &TextStyle::default().into_ref());
        assert_eq!(kinds(&list), ["W(x)", "Tab", "Space", "Space", "W(y)"]);
    }

    #[test]
    fn form_feed_separates_without_item() {
        let mut list = TextItemList::new();
        list.add_text("a\u{0C}b", &TextStyle::default().into_ref());
        assert_eq!(kinds(&list), ["W(a)", "W(b)"]);
        assert_eq!(list.logical_length(), 2);
    }

    #[test]
    fn multibyte_words_count_chars() {
        let mut list = TextItemList::new();
        list.add_text("héllo wörld", &TextStyle::default().into_ref());
        assert_eq!(kinds(&list), ["W(héllo)", "Space", "W(wörld)"]);
        assert_eq!(list.logical_length(), 11);
    }

    #[test]
    fn empty_text_is_a_no_op() {
        let mut list = TextItemList::new();
        list.add_text("", &TextStyle::default().into_ref());
        assert!(list.is_empty());
        assert_eq!(list.logical_length(), 0);
    }

    #[test]
    fn malformed_markup_adds_nothing() {
        let mut list = TextItemList::new();
        list.add_hyper_text("<b>broken <i", &TextStyle::default().into_ref(), &UnitConfig::default());
        assert!(list.is_empty());
    }
}
