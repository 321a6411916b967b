//! Permissive markup tree built on `quick-xml`.
//!
//! Accepts the loose HTML that shows up in UI strings: unquoted attribute
//! values, void elements without a closing slash, mismatched or missing end
//! tags. Only reader-level syntax errors fail.

use core::fmt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Elements that never take children.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "wbr"];

/// One node of a parsed markup tree.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
    /// Text made only of whitespace.
    WhiteSpace(String),
}

/// An element with lower-cased local name and attribute names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Value of the first attribute named `name` (lower-case).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Top-level nodes of a markup string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkupDocument {
    pub nodes: Vec<MarkupNode>,
}

impl MarkupDocument {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reader failure while building a markup tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupError {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Reader byte offset where the failure was detected.
    pub token_offset: Option<usize>,
}

impl MarkupError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into().into_boxed_str(),
            token_offset: None,
        }
    }

    fn with_token_offset(mut self, offset: usize) -> Self {
        self.token_offset = Some(offset);
        self
    }
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(offset) = self.token_offset {
            write!(f, " [token_offset={}]", offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for MarkupError {}

/// Open elements plus the finished top-level nodes.
struct TreeBuilder {
    roots: Vec<MarkupNode>,
    open: Vec<MarkupElement>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            roots: Vec::new(),
            open: Vec::with_capacity(8),
        }
    }

    fn children(&mut self) -> &mut Vec<MarkupNode> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        }
    }

    fn append(&mut self, node: MarkupNode) {
        self.children().push(node);
    }

    /// Adjacent text, entity and CDATA chunks merge into one node.
    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.children();
        if let Some(last) = children.last_mut() {
            if let MarkupNode::Text(existing) | MarkupNode::WhiteSpace(existing) = last {
                let mut merged = core::mem::take(existing);
                merged.push_str(text);
                *last = text_node(merged);
                return;
            }
        }
        children.push(text_node(text.to_string()));
    }

    /// Close the innermost open element named `name` and everything inside it.
    fn close(&mut self, name: &str) {
        let Some(depth) = self.open.iter().rposition(|element| element.name == name) else {
            log::trace!("ignoring unmatched end tag </{}>", name);
            return;
        };
        while self.open.len() > depth {
            self.close_innermost();
        }
    }

    fn close_innermost(&mut self) {
        if let Some(element) = self.open.pop() {
            self.append(MarkupNode::Element(element));
        }
    }

    fn finish(mut self) -> MarkupDocument {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        MarkupDocument { nodes: self.roots }
    }
}

fn text_node(text: String) -> MarkupNode {
    if text.chars().all(char::is_whitespace) {
        MarkupNode::WhiteSpace(text)
    } else {
        MarkupNode::Text(text)
    }
}

fn reader_token_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, MarkupError> {
    let decoded = reader.decoder().decode(raw).map_err(|err| {
        MarkupError::new("MARKUP_DECODE_ERROR", format!("Decode error: {:?}", err))
            .with_token_offset(reader_token_offset(reader))
    })?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
) -> Result<MarkupElement, MarkupError> {
    let name = decode_tag_name(reader, e.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in e.html_attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        let raw = match reader.decoder().decode(&attr.value) {
            Ok(v) => v.to_string(),
            Err(_) => continue,
        };
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(unescaped) => unescaped.into_owned(),
            Err(_) => raw,
        };
        attributes.push((key, value));
    }
    Ok(MarkupElement::new(name, attributes))
}

/// Build a markup tree from `text`.
pub fn parse_markup(text: &str) -> Result<MarkupDocument, MarkupError> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::new();
    let mut entity_buf = String::with_capacity(16);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = element_from_start(&reader, &e)?;
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    builder.append(MarkupNode::Element(element));
                } else {
                    builder.open.push(element);
                }
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&reader, &e)?;
                builder.append(MarkupNode::Element(element));
            }
            Ok(Event::End(e)) => {
                let name = decode_tag_name(&reader, e.name().as_ref())?;
                builder.close(&name);
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|err| {
                    MarkupError::new("MARKUP_DECODE_ERROR", format!("Decode error: {:?}", err))
                        .with_token_offset(reader_token_offset(&reader))
                })?;
                builder.append_text(&text);
            }
            Ok(Event::CData(e)) => {
                let text = reader.decoder().decode(&e).map_err(|err| {
                    MarkupError::new("MARKUP_DECODE_ERROR", format!("Decode error: {:?}", err))
                        .with_token_offset(reader_token_offset(&reader))
                })?;
                builder.append_text(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let entity_name = e.decode().map_err(|err| {
                    MarkupError::new("MARKUP_DECODE_ERROR", format!("Decode error: {:?}", err))
                        .with_token_offset(reader_token_offset(&reader))
                })?;
                entity_buf.clear();
                entity_buf.push('&');
                entity_buf.push_str(entity_name.as_ref());
                entity_buf.push(';');
                match quick_xml::escape::unescape(&entity_buf) {
                    Ok(resolved) => builder.append_text(&resolved),
                    Err(_) => builder.append_text(&entity_buf),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(
                    MarkupError::new("MARKUP_SYNTAX_ERROR", format!("XML error: {:?}", err))
                        .with_token_offset(reader_token_offset(&reader)),
                );
            }
        }
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(element) => element,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn builds_nested_tree() {
        let doc = parse_markup("<b>bold<i>more</i></b> tail").unwrap();
        assert_eq!(doc.nodes.len(), 2);
        let b = element(&doc.nodes[0]);
        assert_eq!(b.name, "b");
        assert_eq!(b.children[0], MarkupNode::Text("bold".to_string()));
        let i = element(&b.children[1]);
        assert_eq!(i.children, vec![MarkupNode::Text("more".to_string())]);
        assert_eq!(doc.nodes[1], MarkupNode::Text(" tail".to_string()));
    }

    #[test]
    fn lowercases_names_and_unquoted_attributes() {
        let doc = parse_markup("<FONT Color=red size='+1'>x</FONT>").unwrap();
        let font = element(&doc.nodes[0]);
        assert_eq!(font.name, "font");
        assert_eq!(font.attribute("color"), Some("red"));
        assert_eq!(font.attribute("size"), Some("+1"));
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let doc = parse_markup("a<br>b").unwrap();
        assert_eq!(doc.nodes.len(), 3);
        assert!(element(&doc.nodes[1]).children.is_empty());
        assert_eq!(doc.nodes[2], MarkupNode::Text("b".to_string()));
    }

    #[test]
    fn mismatched_end_closes_to_matching_open() {
        let doc = parse_markup("<b><i>x</b>y</i>").unwrap();
        let b = element(&doc.nodes[0]);
        assert_eq!(element(&b.children[0]).name, "i");
        assert_eq!(doc.nodes[1], MarkupNode::Text("y".to_string()));
    }

    #[test]
    fn unclosed_elements_close_at_end() {
        let doc = parse_markup("<u>open").unwrap();
        let u = element(&doc.nodes[0]);
        assert_eq!(u.children, vec![MarkupNode::Text("open".to_string())]);
    }

    #[test]
    fn entities_merge_into_text() {
        let doc = parse_markup("a &amp; b&lt;c &bogus;").unwrap();
        assert_eq!(
            doc.nodes,
            vec![MarkupNode::Text("a & b<c &bogus;".to_string())]
        );
    }

    #[test]
    fn whitespace_only_text_is_marked() {
        let doc = parse_markup("<b>x</b>\n<i>y</i>").unwrap();
        assert_eq!(doc.nodes[1], MarkupNode::WhiteSpace("\n".to_string()));
    }

    #[test]
    fn truncated_tag_is_an_error() {
        let err = parse_markup("<b>broken <i").unwrap_err();
        assert_eq!(err.code, "MARKUP_SYNTAX_ERROR");
        assert!(err.to_string().starts_with("MARKUP_SYNTAX_ERROR"));
    }
}
