//! Lightweight markdown renderer for finished chat responses.
//!
//! Handles the subset of markdown models actually produce:
//! - `# Heading` through `#### Heading`
//! - fenced code blocks (```lang ... ```)
//! - `**bold**`, `*italic*` and `` `inline code` ``
//! - `- bullet` and `* bullet` list items
//! - `[text](url)` links
//!
//! Parsing into [`Block`]s is separate from drawing so it can be tested
//! without a UI.

use eframe::egui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    Heading { level: u8, text: &'a str },
    Code { lang: &'a str, body: String },
    Bullet(&'a str),
    Paragraph(&'a str),
    Blank,
}

pub fn parse_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(lang) = trimmed.strip_prefix("```") {
            let mut body = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                body.push(inner);
            }
            // an unterminated fence runs to the end of the text
            blocks.push(Block::Code {
                lang: lang.trim(),
                body: body.join("\n"),
            });
            continue;
        }

        if trimmed.is_empty() {
            blocks.push(Block::Blank);
            continue;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=4).contains(&hashes) {
            if let Some(rest) = trimmed[hashes..].strip_prefix(' ') {
                blocks.push(Block::Heading {
                    level: hashes as u8,
                    text: rest.trim(),
                });
                continue;
            }
        }

        if let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            blocks.push(Block::Bullet(rest));
            continue;
        }

        blocks.push(Block::Paragraph(trimmed));
    }
    blocks
}

/// Render markdown text into an egui UI region.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, base_color: egui::Color32) {
    let link_color = egui::Color32::from_rgb(100, 170, 240);
    let code_bg = if base_color.r() > 128 {
        // dark mode
        egui::Color32::from_rgb(60, 60, 70)
    } else {
        egui::Color32::from_rgb(230, 232, 236)
    };

    for block in parse_blocks(text) {
        match block {
            Block::Blank => ui.add_space(6.0),
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 18.0,
                    2 => 16.0,
                    3 => 15.0,
                    _ => 14.0,
                };
                ui.add_space(4.0 + (4 - level.min(4)) as f32 * 1.5);
                ui.label(egui::RichText::new(text).strong().size(size).color(base_color));
                ui.add_space(2.0);
            }
            Block::Code { lang, body } => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(4.0))
                    .inner_margin(egui::Margin::same(6.0))
                    .show(ui, |ui| {
                        if !lang.is_empty() {
                            ui.label(egui::RichText::new(lang).small().weak());
                        }
                        ui.label(egui::RichText::new(body).monospace().color(base_color));
                    });
            }
            Block::Bullet(text) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("  •  ").size(14.0).color(base_color));
                    render_inline_markdown(ui, text, base_color, link_color, code_bg);
                });
            }
            Block::Paragraph(text) => {
                ui.horizontal_wrapped(|ui| {
                    render_inline_markdown(ui, text, base_color, link_color, code_bg);
                });
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<'a> {
    Plain(&'a str),
    Bold(&'a str),
    Italic(&'a str),
    Code(&'a str),
    Link { text: &'a str, url: &'a str },
}

/// Split one line into inline spans. Unclosed markers stay plain text.
pub fn parse_inline(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some((pos, marker)) = find_next_marker(remaining) else {
            spans.push(Span::Plain(remaining));
            break;
        };
        if pos > 0 {
            spans.push(Span::Plain(&remaining[..pos]));
        }
        let after = &remaining[pos + marker.open_len()..];
        let parsed = match marker {
            MarkerKind::Bold => after.find("**").map(|end| (Span::Bold(&after[..end]), end + 2)),
            MarkerKind::Italic => after.find('*').map(|end| (Span::Italic(&after[..end]), end + 1)),
            MarkerKind::Code => after.find('`').map(|end| (Span::Code(&after[..end]), end + 1)),
            MarkerKind::Link => after.find("](").and_then(|close_bracket| {
                let url_part = &after[close_bracket + 2..];
                url_part.find(')').map(|close_paren| {
                    (
                        Span::Link {
                            text: &after[..close_bracket],
                            url: &url_part[..close_paren],
                        },
                        close_bracket + 2 + close_paren + 1,
                    )
                })
            }),
        };
        match parsed {
            Some((span, consumed)) => {
                spans.push(span);
                remaining = &after[consumed..];
            }
            None => {
                // No closing marker: the rest is plain text
                spans.push(Span::Plain(&remaining[pos..]));
                break;
            }
        }
    }
    spans
}

/// Render a single line with inline formatting.
fn render_inline_markdown(
    ui: &mut egui::Ui,
    text: &str,
    base_color: egui::Color32,
    link_color: egui::Color32,
    code_bg: egui::Color32,
) {
    let base_size = 14.0;
    for span in parse_inline(text) {
        match span {
            Span::Plain(t) => {
                ui.label(egui::RichText::new(t).size(base_size).color(base_color));
            }
            Span::Bold(t) => {
                ui.label(egui::RichText::new(t).size(base_size).strong().color(base_color));
            }
            Span::Italic(t) => {
                ui.label(egui::RichText::new(t).size(base_size).italics().color(base_color));
            }
            Span::Code(t) => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(3.0))
                    .inner_margin(egui::Margin::symmetric(4.0, 1.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(t)
                                .size(base_size)
                                .monospace()
                                .color(base_color),
                        );
                    });
            }
            Span::Link { text, url } => {
                ui.add(egui::Hyperlink::from_label_and_url(
                    egui::RichText::new(text)
                        .size(base_size)
                        .color(link_color)
                        .underline(),
                    url,
                ))
                .on_hover_text(url);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Bold,   // **
    Italic, // *
    Code,   // `
    Link,   // [
}

impl MarkerKind {
    fn open_len(self) -> usize {
        match self {
            MarkerKind::Bold => 2,
            _ => 1,
        }
    }
}

/// Find the next inline marker in the text.
fn find_next_marker(text: &str) -> Option<(usize, MarkerKind)> {
    let mut candidates: Vec<(usize, MarkerKind)> = Vec::new();

    if let Some(pos) = text.find('*') {
        if text[pos..].starts_with("**") {
            candidates.push((pos, MarkerKind::Bold));
        } else {
            candidates.push((pos, MarkerKind::Italic));
        }
    }
    if let Some(pos) = text.find('`') {
        candidates.push((pos, MarkerKind::Code));
    }
    if let Some(pos) = text.find('[') {
        // Only treat as link if followed by ]( somewhere
        if text[pos..].contains("](") {
            candidates.push((pos, MarkerKind::Link));
        }
    }

    candidates.into_iter().min_by_key(|(pos, _)| *pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cover_headings_fences_and_bullets() {
        let text = "# Title\n\nSome text\n```rust\nfn main() {}\n\nlet x = 1;\n```\n- one\n* two\n#nospace";
        let blocks = parse_blocks(text);
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 1, text: "Title" },
                Block::Blank,
                Block::Paragraph("Some text"),
                Block::Code {
                    lang: "rust",
                    body: "fn main() {}\n\nlet x = 1;".to_string()
                },
                Block::Bullet("one"),
                Block::Bullet("two"),
                Block::Paragraph("#nospace"),
            ]
        );
    }

    #[test]
    fn unterminated_fence_takes_the_rest() {
        let blocks = parse_blocks("```\nstill streaming\n# not a heading");
        assert_eq!(
            blocks,
            vec![Block::Code {
                lang: "",
                body: "still streaming\n# not a heading".to_string()
            }]
        );
    }

    #[test]
    fn inline_spans() {
        assert_eq!(
            parse_inline("a **b** *c* `d` [e](http://f)"),
            vec![
                Span::Plain("a "),
                Span::Bold("b"),
                Span::Plain(" "),
                Span::Italic("c"),
                Span::Plain(" "),
                Span::Code("d"),
                Span::Plain(" "),
                Span::Link { text: "e", url: "http://f" },
            ]
        );
    }

    #[test]
    fn unclosed_markers_stay_plain() {
        assert_eq!(
            parse_inline("2 ** 3 is eight"),
            vec![Span::Plain("2 "), Span::Plain("** 3 is eight")]
        );
        assert_eq!(parse_inline("`open"), vec![Span::Plain("`open")]);
    }
}
