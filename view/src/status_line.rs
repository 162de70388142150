use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// Full-width, one-row message strip. Green for success, red for errors.
pub struct StatusLine<'a> {
    text: &'a str,
    style: Style,
}

impl<'a> StatusLine<'a> {
    pub fn new(text: &'a str, ok: bool) -> Self {
        let bg = if ok { Color::Green } else { Color::Red };
        Self {
            text,
            style: Style::default().fg(Color::Black).bg(bg),
        }
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let mut chars = self.text.chars();
        for x in area.left()..area.right() {
            let ch = chars.next().unwrap_or(' ');
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(ch);
                cell.set_style(self.style);
            }
        }
    }
}
