//! Text appearance generation for form field widgets

use crate::Align;

/// Font size used when a field asks for auto sizing and the widget is tall enough
const MAX_AUTO_FONT_SIZE: f32 = 12.0;

/// Smallest font size auto sizing will shrink to
const MIN_AUTO_FONT_SIZE: f32 = 4.0;

/// Padding between the widget border and the text, in points
const PADDING: f64 = 2.0;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a gray color (0.0 = black, 1.0 = white)
    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Convert a CMYK color to RGB
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::rgb(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Parsed `/DA` (default appearance) string of a variable text field
///
/// Only the operators that matter for a plain text appearance are
/// understood: `Tf`, `g`, `rg` and `k`. Everything else is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAppearance {
    /// Font resource name without the leading slash (e.g. "Helv")
    pub font_name: String,
    /// Font size in points, 0 means auto size
    pub font_size: f32,
    /// Text color
    pub color: Color,
}

impl Default for DefaultAppearance {
    fn default() -> Self {
        Self {
            font_name: "Helv".to_string(),
            font_size: 0.0,
            color: Color::black(),
        }
    }
}

impl DefaultAppearance {
    /// Parse a `/DA` string such as `/Helv 12 Tf 0 g`
    pub fn parse(da: &str) -> Self {
        let mut result = Self::default();
        let mut operands: Vec<&str> = Vec::new();

        for token in da.split_whitespace() {
            match token {
                "Tf" => {
                    if let [.., name, size] = operands.as_slice() {
                        if let Some(name) = name.strip_prefix('/') {
                            result.font_name = name.to_string();
                        }
                        result.font_size = size.parse().unwrap_or(0.0);
                    }
                    operands.clear();
                }
                "g" => {
                    if let Some(level) = numbers::<1>(&operands) {
                        result.color = Color::gray(level[0]);
                    }
                    operands.clear();
                }
                "rg" => {
                    if let Some([r, g, b]) = numbers::<3>(&operands) {
                        result.color = Color::rgb(r, g, b);
                    }
                    operands.clear();
                }
                "k" => {
                    if let Some([c, m, y, k]) = numbers::<4>(&operands) {
                        result.color = Color::from_cmyk(c, m, y, k);
                    }
                    operands.clear();
                }
                t if t.starts_with('/') || t.parse::<f32>().is_ok() => operands.push(t),
                _ => operands.clear(),
            }
        }

        result
    }
}

/// Take the last `N` operands as numbers
fn numbers<const N: usize>(operands: &[&str]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(&operands[operands.len() - N..]) {
        *slot = token.parse().ok()?;
    }
    Some(out)
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Width of text set in Helvetica, in points
fn helvetica_text_width(text: &str, font_size: f32) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| match c as u32 {
            code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as u32,
            _ => 556,
        })
        .sum();
    units as f64 * font_size as f64 / 1000.0
}

/// Escape text as a PDF literal string in WinAnsi (Latin-1) bytes
///
/// Returns `None` when the text holds characters a standard 14 font
/// cannot show; viewers then rebuild the appearance from `/NeedAppearances`.
fn latin1_literal(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        let code = c as u32;
        // WinAnsi and Latin-1 agree only outside the control ranges;
        // 0x80..=0x9F are other glyphs there (euro sign, quotes, ...)
        if code > 0xFF || (code < 0x20 && c != '\t') || (0x7F..=0x9F).contains(&code) {
            return None;
        }
        let byte = code as u8;
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    Some(out)
}

/// Generate the content of a text widget's normal appearance stream
///
/// Creates the marked-content block (`/Tx BMC ... EMC`) with a clip to the
/// widget box and one `BT ... ET` run per line.
///
/// # Arguments
/// * `value` - Field value to show
/// * `width` / `height` - Widget size in points (from `/Rect`)
/// * `da` - Parsed default appearance
/// * `align` - Quadding of the field
/// * `multiline` - Whether newlines start new lines
///
/// # Returns
/// Content stream bytes, or `None` if the value cannot be shown in Helvetica
pub fn generate_field_appearance(
    value: &str,
    width: f64,
    height: f64,
    da: &DefaultAppearance,
    align: Align,
    multiline: bool,
) -> Option<Vec<u8>> {
    let flattened;
    let lines: Vec<&str> = if multiline {
        value.lines().collect()
    } else {
        flattened = value.replace(['\r', '\n'], " ");
        vec![flattened.as_str()]
    };

    let font_size = if da.font_size > 0.0 {
        da.font_size
    } else {
        auto_font_size(&lines, width, height)
    };
    let leading = font_size as f64 * 1.15;

    let mut ops: Vec<u8> = Vec::new();
    ops.extend_from_slice(b"/Tx BMC\nq\n");

    // Clip to the inner box
    ops.extend_from_slice(
        format!(
            "1 1 {} {} re W n\n",
            (width - 2.0).max(0.0),
            (height - 2.0).max(0.0)
        )
        .as_bytes(),
    );

    let first_baseline = if multiline {
        height - PADDING - font_size as f64
    } else {
        // Vertically centered, with descender allowance
        (height - font_size as f64) / 2.0 + font_size as f64 * 0.22
    };

    for (i, line) in lines.iter().enumerate() {
        let literal = latin1_literal(line)?;
        let text_width = helvetica_text_width(line, font_size);
        let x = match align {
            Align::Left => PADDING,
            Align::Center => (width - text_width) / 2.0,
            Align::Right => width - PADDING - text_width,
        };
        let y = first_baseline - leading * i as f64;

        ops.extend_from_slice(b"BT\n");
        ops.extend_from_slice(
            format!("{} {} {} rg\n", da.color.r, da.color.g, da.color.b).as_bytes(),
        );
        ops.extend_from_slice(format!("/{} {} Tf\n", da.font_name, font_size).as_bytes());
        ops.extend_from_slice(format!("{:.2} {:.2} Td\n", x, y).as_bytes());
        ops.extend_from_slice(&literal);
        ops.extend_from_slice(b" Tj\nET\n");
    }

    ops.extend_from_slice(b"Q\nEMC\n");
    Some(ops)
}

/// Pick a font size that fits every line into the widget
fn auto_font_size(lines: &[&str], width: f64, height: f64) -> f32 {
    let line_count = lines.len().max(1) as f64;
    let by_height = ((height - 2.0 * PADDING) / (line_count * 1.15)) as f32;
    let mut size = by_height.clamp(MIN_AUTO_FONT_SIZE, MAX_AUTO_FONT_SIZE);

    let available = width - 2.0 * PADDING;
    let widest = lines
        .iter()
        .map(|line| helvetica_text_width(line, 1.0))
        .fold(0.0_f64, f64::max);
    if widest > 0.0 && widest * size as f64 > available {
        size = ((available / widest) as f32).max(MIN_AUTO_FONT_SIZE);
    }
    size
}
