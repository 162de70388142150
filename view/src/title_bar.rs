use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// A single-row header: a title, a dimmer detail string after it, and an
/// optional right-aligned badge (e.g. " RECORDING " on red).
pub struct TitleBar<'a> {
    title: &'a str,
    detail: Option<&'a str>,
    badge: Option<(&'a str, Style)>,
    style: Style,
    detail_style: Style,
    gap: u16,
}

impl<'a> TitleBar<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            detail: None,
            badge: None,
            style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            detail_style: Style::default().fg(Color::DarkGray),
            gap: 2,
        }
    }

    pub fn detail(mut self, text: &'a str) -> Self {
        self.detail = Some(text);
        self
    }

    /// Set a right-aligned badge.
    pub fn badge(mut self, text: &'a str, style: Style) -> Self {
        self.badge = Some((text, style));
        self
    }
}

impl Widget for TitleBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let y = area.y;
        let mut x = area.x;
        x = put_str(buf, x, y, area.right(), self.title, self.style);

        if let Some(detail) = self.detail {
            x = x.saturating_add(self.gap);
            put_str(buf, x, y, area.right(), detail, self.detail_style);
        }

        // Right-aligned badge drawn last so it wins on narrow terminals.
        if let Some((text, style)) = self.badge {
            let text_len = text.chars().count() as u16;
            if text_len < area.width {
                let sx = area.right() - text_len;
                put_str(buf, sx, y, area.right(), text, style);
            }
        }
    }
}

/// Write `text` from `x` until `right`; returns the next free column.
fn put_str(buf: &mut Buffer, mut x: u16, y: u16, right: u16, text: &str, style: Style) -> u16 {
    for ch in text.chars() {
        if x >= right {
            break;
        }
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(ch);
            cell.set_style(style);
        }
        x += 1;
    }
    x
}
