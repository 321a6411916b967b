//! Markup tree walk: element semantics, attributes and inline declarations.

use crate::color::Color;
use crate::item_list::TextItemList;
use crate::markup::{MarkupDocument, MarkupElement, MarkupNode};
use crate::style::{derive_style, StyleOverrides, StyleRef};
use crate::units::{html_font_size, parse_length, parse_line_height, LengthContext, UnitConfig};

/// Appends the styled items of `document` to `list`.
pub(crate) fn append_document(
    list: &mut TextItemList,
    document: &MarkupDocument,
    style: &StyleRef,
    units: &UnitConfig,
) {
    for node in &document.nodes {
        append_node(list, node, style, units);
    }
}

fn append_node(list: &mut TextItemList, node: &MarkupNode, style: &StyleRef, units: &UnitConfig) {
    match node {
        MarkupNode::Text(text) | MarkupNode::WhiteSpace(text) => list.add_text(text, style),
        MarkupNode::Element(element) => {
            let overrides = element_overrides(element, style, units);
            let element_style = derive_style(style, &overrides);
            if element.name == "br" {
                list.add_text("\n", &element_style);
            }
            for child in &element.children {
                append_node(list, child, &element_style, units);
            }
        }
    }
}

/// Overrides implied by the tag, then attributes, then the inline `style`.
fn element_overrides(
    element: &MarkupElement,
    style: &StyleRef,
    units: &UnitConfig,
) -> StyleOverrides {
    let mut overrides = StyleOverrides::default();
    let parent_font = style.font.as_deref();
    let ctx = LengthContext::new(units, parent_font);

    match element.name.as_str() {
        "a" => {
            overrides.text_color = Some(Color::BLUE);
            overrides.underline = Some(true);
        }
        "b" | "strong" => overrides.bold = Some(true),
        "i" | "em" => overrides.italic = Some(true),
        "u" => overrides.underline = Some(true),
        "s" | "strike" | "del" => overrides.line_through = Some(true),
        "sup" | "sub" => {
            if let Some(font) = parent_font {
                let shift = font.height() / 4.0;
                overrides.y_offset = Some(if element.name == "sup" {
                    style.y_offset - shift
                } else {
                    style.y_offset + shift
                });
                overrides.size = Some(font.size() * 2.0 / 3.0);
            }
        }
        _ => {}
    }

    if let Some(href) = element.attribute("href") {
        overrides.href = Some(href.to_string());
    }
    if let Some(face) = element.attribute("face") {
        if let Some(family) = first_family(face) {
            overrides.family = Some(family);
        }
    }
    if let Some(size) = element.attribute("size") {
        match html_font_size(size, &ctx) {
            Ok(px) => overrides.size = Some(px),
            Err(err) => log::debug!("dropping size={:?}: {}", size, err),
        }
    }
    if let Some(color) = element.attribute("color").and_then(Color::parse) {
        overrides.text_color = Some(color);
    }
    if let Some(color) = element.attribute("bgcolor").and_then(Color::parse) {
        overrides.background_color = Some(color);
    }
    if let Some(declarations) = element.attribute("style") {
        apply_declarations(&mut overrides, declarations, &ctx);
    }
    overrides
}

/// Applies `name: value; ...` declarations in order. Bad values are skipped.
fn apply_declarations(overrides: &mut StyleOverrides, declarations: &str, ctx: &LengthContext<'_>) {
    for declaration in declarations.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let keyword = value.to_ascii_lowercase();
        match name.as_str() {
            "color" => match Color::parse(value) {
                Some(color) => overrides.text_color = Some(color),
                None => log::debug!("dropping color: {:?}", value),
            },
            "background-color" => match Color::parse(value) {
                Some(color) => overrides.background_color = Some(color),
                None => log::debug!("dropping background-color: {:?}", value),
            },
            "line-height" => match parse_line_height(value, ctx) {
                Ok(px) => overrides.line_height = Some(px),
                Err(err) => log::debug!("dropping line-height: {}", err),
            },
            "font-family" => {
                if let Some(family) = first_family(value) {
                    overrides.family = Some(family);
                }
            }
            "font-size" => match parse_length(value, ctx) {
                Ok(px) => overrides.size = Some(px),
                Err(err) => log::debug!("dropping font-size: {}", err),
            },
            "font-weight" => {
                if let Some(bold) = parse_weight(&keyword) {
                    overrides.bold = Some(bold);
                }
            }
            "font-style" => match keyword.as_str() {
                "italic" | "oblique" => overrides.italic = Some(true),
                "normal" => overrides.italic = Some(false),
                _ => {}
            },
            "font" => apply_font_shorthand(overrides, value, ctx),
            "text-decoration" | "text-decoration-line" => {
                overrides.underline = Some(keyword.contains("underline"));
                overrides.overline = Some(keyword.contains("overline"));
                overrides.line_through = Some(keyword.contains("line-through"));
            }
            _ => {}
        }
    }
}

fn parse_weight(keyword: &str) -> Option<bool> {
    match keyword {
        "bold" | "bolder" => Some(true),
        "normal" | "lighter" => Some(false),
        numeric => numeric.parse::<u16>().ok().map(|weight| weight >= 600),
    }
}

/// `font: [style] [weight] size[/line-height] family...`
fn apply_font_shorthand(overrides: &mut StyleOverrides, value: &str, ctx: &LengthContext<'_>) {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    for (idx, token) in tokens.iter().enumerate() {
        let keyword = token.to_ascii_lowercase();
        match keyword.as_str() {
            "italic" | "oblique" => {
                overrides.italic = Some(true);
                continue;
            }
            "bold" | "bolder" => {
                overrides.bold = Some(true);
                continue;
            }
            _ => {}
        }
        if let Some((size, line_height)) = token.split_once('/') {
            match parse_length(size, ctx) {
                Ok(px) => overrides.size = Some(px),
                Err(err) => log::debug!("dropping font size {:?}: {}", size, err),
            }
            match parse_line_height(line_height, ctx) {
                Ok(px) => overrides.line_height = Some(px),
                Err(err) => log::debug!("dropping line height {:?}: {}", line_height, err),
            }
        } else if let Ok(px) = parse_length(token, ctx) {
            overrides.size = Some(px);
        } else {
            continue;
        }
        if let Some(family) = first_family(&tokens[idx + 1..].join(" ")) {
            overrides.family = Some(family);
        }
        return;
    }
}

/// First entry of a comma-separated family list, unquoted.
fn first_family(value: &str) -> Option<String> {
    value
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .find(|part| !part.is_empty())
        .map(|part| part.to_string())
}
