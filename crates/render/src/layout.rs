use crate::font::CaptionFont;

/// Extra pixels between caption lines.
pub const LEADING: u32 = 5;

pub fn text_width(font: &dyn CaptionFont, text: &str) -> f32 {
    text.chars().map(|c| font.advance(c)).sum()
}

/// Line pitch: the inked height of "Test" plus [`LEADING`].
pub fn line_height(font: &dyn CaptionFont) -> u32 {
    let mut top = i32::MIN;
    let mut bottom = i32::MAX;
    for c in "Test".chars() {
        let g = font.rasterize(c);
        if g.height == 0 {
            continue;
        }
        top = top.max(g.ymin + g.height as i32);
        bottom = bottom.min(g.ymin);
    }
    let ink = if top > bottom { (top - bottom) as u32 } else { 0 };
    ink + LEADING
}

/// Greedy word wrap to `max_width` pixels.
///
/// Each newline-separated paragraph is wrapped on its own; blank paragraphs
/// become empty lines. A word wider than the limit gets a line to itself.
pub fn wrap_text(font: &dyn CaptionFont, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    if text.is_empty() {
        return lines;
    }

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if text_width(font, &candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }

    lines
}
