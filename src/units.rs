//! CSS/HTML length resolution.

use core::fmt;

use crate::font::Font;
use crate::geometry::almost_zero;

/// Screen size used for `vw`/`vh`/`vmin`/`vmax`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Inputs for unit conversion that do not depend on the markup.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnitConfig {
    /// Size of `medium`/`initial` and the `rem` base, in pixels.
    pub default_font_size: f32,
    /// Pixels per inch for physical units.
    pub dpi: f32,
    /// Screen size for viewport units.
    pub viewport: Viewport,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            default_font_size: 16.0,
            dpi: 96.0,
            viewport: Viewport::default(),
        }
    }
}

impl UnitConfig {
    /// Convenience for a known screen size with default sizes.
    pub fn for_viewport(width: f32, height: f32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            ..Self::default()
        }
    }
}

/// Everything a length needs to resolve relative units.
#[derive(Clone, Copy, Debug)]
pub struct LengthContext<'a> {
    pub config: &'a UnitConfig,
    /// Font of the enclosing element, if any.
    pub font: Option<&'a Font>,
}

impl<'a> LengthContext<'a> {
    pub fn new(config: &'a UnitConfig, font: Option<&'a Font>) -> Self {
        Self { config, font }
    }

    /// Font size `em`, `%` and `inherit` are relative to.
    pub fn context_size(&self) -> f32 {
        self.font
            .map_or(self.config.default_font_size, |font| font.size())
    }
}

/// Why a length could not be resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum LengthError {
    Empty,
    /// No numeric prefix and not a known keyword.
    InvalidNumber(String),
    /// A non-zero number without a unit.
    UnitlessNonZero(f32),
    UnknownUnit(String),
}

impl fmt::Display for LengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty length"),
            Self::InvalidNumber(raw) => write!(f, "invalid length: {:?}", raw),
            Self::UnitlessNonZero(value) => write!(f, "length {} has no unit", value),
            Self::UnknownUnit(unit) => write!(f, "unknown length unit: {:?}", unit),
        }
    }
}

impl std::error::Error for LengthError {}

/// HTML `<font size>` scale, indexed by size 1..=7.
const HTML_SIZE_FACTORS: [f32; 7] = [0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0];

/// Resolve a CSS length to pixels.
pub fn parse_length(raw: &str, ctx: &LengthContext<'_>) -> Result<f32, LengthError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(LengthError::Empty);
    }
    if let Some(px) = keyword_size(&value.to_ascii_lowercase(), ctx) {
        return Ok(px);
    }
    let (number, unit) = split_number(value)?;
    if unit.is_empty() {
        return if almost_zero(number) {
            Ok(0.0)
        } else {
            Err(LengthError::UnitlessNonZero(number))
        };
    }
    apply_unit(number, &unit.to_ascii_lowercase(), ctx)
}

/// Like [`parse_length`], but a bare number multiplies the context font size.
pub fn parse_line_height(raw: &str, ctx: &LengthContext<'_>) -> Result<f32, LengthError> {
    match split_number(raw.trim()) {
        Ok((number, "")) => Ok(number * ctx.context_size()),
        _ => parse_length(raw, ctx),
    }
}

/// Resolve the HTML `size` attribute: `1`..`7`, `+n`/`-n` relative to 3, or a CSS length.
pub fn html_font_size(raw: &str, ctx: &LengthContext<'_>) -> Result<f32, LengthError> {
    let value = raw.trim();
    let (relative, digits) = match value.as_bytes().first() {
        Some(b'+') | Some(b'-') => (true, &value[1..]),
        _ => (false, value),
    };
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        let magnitude: i32 = digits.parse().unwrap_or(i32::MAX).min(7);
        let index = if !relative {
            magnitude
        } else if value.starts_with('-') {
            3 - magnitude
        } else {
            3 + magnitude
        };
        let factor = HTML_SIZE_FACTORS[(index.clamp(1, 7) - 1) as usize];
        return Ok(ctx.config.default_font_size * factor);
    }
    parse_length(value, ctx)
}

fn keyword_size(value: &str, ctx: &LengthContext<'_>) -> Option<f32> {
    let default = ctx.config.default_font_size;
    let px = match value {
        "medium" | "initial" => default,
        "xx-small" => default / 4.0,
        "x-small" => default / 2.0,
        "small" => default * 3.0 / 4.0,
        "large" => default * 3.0 / 2.0,
        "x-large" => default * 2.0,
        "xx-large" => default * 4.0,
        "smaller" => ctx.context_size() / 1.5,
        "larger" => ctx.context_size() * 1.5,
        "inherit" => ctx.context_size(),
        _ => return None,
    };
    Some(px)
}

/// Split `12.5em` into `(12.5, "em")`. The exponent is only taken when digits follow.
fn split_number(value: &str) -> Result<(f32, &str), LengthError> {
    let bytes = value.as_bytes();
    let mut end = 0usize;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &value[digits_start..end] == "." {
        return Err(LengthError::InvalidNumber(value.to_string()));
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    let number = value[..end]
        .parse::<f32>()
        .map_err(|_| LengthError::InvalidNumber(value.to_string()))?;
    Ok((number, value[end..].trim()))
}

fn apply_unit(number: f32, unit: &str, ctx: &LengthContext<'_>) -> Result<f32, LengthError> {
    let dpi = ctx.config.dpi;
    let viewport = ctx.config.viewport;
    let px = match unit {
        "%" => ctx.context_size() * number / 100.0,
        "px" => number,
        "in" => number * dpi,
        "cm" => number * dpi / 2.54,
        "mm" => number * dpi / 25.4,
        "pt" => number * dpi / 72.0,
        "pc" => number * dpi / 6.0,
        "em" => number * ctx.context_size(),
        "rem" => number * ctx.config.default_font_size,
        "ch" => number * ctx.font.map_or(1.0, |font| font.height()),
        "ex" => number * ctx.font.map_or(1.0, |font| font.measure_text("0").width),
        "vw" => number * viewport.width / 100.0,
        "vh" => number * viewport.height / 100.0,
        "vmin" => number * viewport.width.min(viewport.height) / 100.0,
        "vmax" => number * viewport.width.max(viewport.height) / 100.0,
        other => return Err(LengthError::UnknownUnit(other.to_string())),
    };
    Ok(px)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontDesc, MonospaceMetrics};
    use std::sync::Arc;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn keywords_scale_default_and_context() {
        let config = UnitConfig::default();
        let font = Font::new(FontDesc::new("serif", 24.0), Arc::new(MonospaceMetrics::default()));
        let ctx = LengthContext::new(&config, Some(&font));
        assert_eq!(parse_length("medium", &ctx), Ok(16.0));
        assert_eq!(parse_length("XX-Large", &ctx), Ok(64.0));
        assert_eq!(parse_length("x-small", &ctx), Ok(8.0));
        assert_eq!(parse_length("smaller", &ctx), Ok(16.0));
        assert_eq!(parse_length("inherit", &ctx), Ok(24.0));
    }

    #[test]
    fn physical_units_use_dpi() {
        let config = UnitConfig::default();
        let ctx = LengthContext::new(&config, None);
        assert!(approx(parse_length("1in", &ctx).unwrap(), 96.0));
        assert!(approx(parse_length("2.54cm", &ctx).unwrap(), 96.0));
        assert!(approx(parse_length("12pt", &ctx).unwrap(), 16.0));
        assert!(approx(parse_length("1pc", &ctx).unwrap(), 16.0));
        assert!(approx(parse_length("10mm", &ctx).unwrap(), 37.795));
    }

    #[test]
    fn relative_units_follow_context_font() {
        let config = UnitConfig::for_viewport(800.0, 600.0);
        let font = Font::new(FontDesc::new("serif", 20.0), Arc::new(MonospaceMetrics::default()));
        let ctx = LengthContext::new(&config, Some(&font));
        assert_eq!(parse_length("1.5em", &ctx), Ok(30.0));
        assert_eq!(parse_length("2rem", &ctx), Ok(32.0));
        assert_eq!(parse_length("50%", &ctx), Ok(10.0));
        assert_eq!(parse_length("1ch", &ctx), Ok(20.0));
        assert_eq!(parse_length("2ex", &ctx), Ok(20.0));
        assert_eq!(parse_length("10vw", &ctx), Ok(80.0));
        assert_eq!(parse_length("10vmin", &ctx), Ok(60.0));
        assert_eq!(parse_length("10vmax", &ctx), Ok(80.0));
    }

    #[test]
    fn unitless_only_accepted_for_zero() {
        let config = UnitConfig::default();
        let ctx = LengthContext::new(&config, None);
        assert_eq!(parse_length("0", &ctx), Ok(0.0));
        assert_eq!(parse_length("-0.0", &ctx), Ok(0.0));
        assert_eq!(parse_length("3", &ctx), Err(LengthError::UnitlessNonZero(3.0)));
        assert_eq!(
            parse_length("3furlongs", &ctx),
            Err(LengthError::UnknownUnit("furlongs".to_string()))
        );
        assert!(matches!(parse_length("em", &ctx), Err(LengthError::InvalidNumber(_))));
        assert_eq!(parse_length("  ", &ctx), Err(LengthError::Empty));
    }

    #[test]
    fn exponent_requires_digits() {
        let config = UnitConfig::default();
        let ctx = LengthContext::new(&config, None);
        assert_eq!(parse_length("1e1px", &ctx), Ok(10.0));
        assert_eq!(parse_length("2em", &ctx), Ok(32.0));
    }

    #[test]
    fn line_height_multiplier() {
        let config = UnitConfig::default();
        let font = Font::new(FontDesc::new("serif", 10.0), Arc::new(MonospaceMetrics::default()));
        let ctx = LengthContext::new(&config, Some(&font));
        assert_eq!(parse_line_height("1.5", &ctx), Ok(15.0));
        assert_eq!(parse_line_height("18px", &ctx), Ok(18.0));
        assert!(parse_line_height("tall", &ctx).is_err());
    }

    #[test]
    fn html_size_scale() {
        let config = UnitConfig::default();
        let ctx = LengthContext::new(&config, None);
        assert_eq!(html_font_size("3", &ctx), Ok(16.0));
        assert_eq!(html_font_size("7", &ctx), Ok(64.0));
        assert_eq!(html_font_size("+1", &ctx), Ok(24.0));
        assert_eq!(html_font_size("-2", &ctx), Ok(8.0));
        assert_eq!(html_font_size("12", &ctx), Ok(64.0));
        assert_eq!(html_font_size("20px", &ctx), Ok(20.0));
    }
}
