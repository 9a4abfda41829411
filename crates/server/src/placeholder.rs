use serde::Deserialize;

const DEFAULT_WIDTH: u32 = 400;
const DEFAULT_HEIGHT: u32 = 300;
const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Default, Deserialize)]
pub struct PlaceholderQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub text: Option<String>,
}

/// Grey placeholder image with a centered caption.
pub fn render_svg(query: &PlaceholderQuery) -> String {
    let width = query.width.unwrap_or(DEFAULT_WIDTH).clamp(1, MAX_DIMENSION);
    let height = query.height.unwrap_or(DEFAULT_HEIGHT).clamp(1, MAX_DIMENSION);
    let caption = query
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(escape_xml)
        .unwrap_or_else(|| format!("{width}x{height}"));

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="100%" height="100%" fill="#f3f4f6"/><text x="50%" y="50%" fill="#6b7280" font-family="Arial, sans-serif" font-size="16" text-anchor="middle" dominant-baseline="middle">{caption}</text></svg>"##
    )
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
