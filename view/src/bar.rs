use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// A one-row horizontal level bar. The filled part covers `fraction` of the
/// width (clamped to `[0, 1]`); both parts are drawn as styled blanks.
pub struct Bar {
    fraction: f64,
    filled_style: Style,
    empty_style: Style,
}

impl Bar {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            filled_style: Style::default().bg(Color::Cyan),
            empty_style: Style::default().bg(Color::Blue),
        }
    }

    pub fn filled_style(mut self, style: Style) -> Self {
        self.filled_style = style;
        self
    }

    pub fn empty_style(mut self, style: Style) -> Self {
        self.empty_style = style;
        self
    }

    /// Number of filled cells for a bar `width` cells wide.
    pub fn fill_len(fraction: f64, width: u16) -> u16 {
        let f = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        (f64::from(width) * f) as u16
    }
}

impl Widget for Bar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let fill = Self::fill_len(self.fraction, area.width);
        let y = area.y;
        for i in 0..area.width {
            let style = if i < fill {
                self.filled_style
            } else {
                self.empty_style
            };
            if let Some(cell) = buf.cell_mut((area.x + i, y)) {
                cell.set_char(' ');
                cell.set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_clamped() {
        assert_eq!(Bar::fill_len(0.5, 10), 5);
        assert_eq!(Bar::fill_len(-1.0, 10), 0);
        assert_eq!(Bar::fill_len(3.0, 10), 10);
        assert_eq!(Bar::fill_len(f64::NAN, 10), 0);
    }

    #[test]
    fn renders_two_tones() {
        let area = Rect::new(0, 0, 4, 1);
        let mut buf = Buffer::empty(area);
        Bar::new(0.5)
            .filled_style(Style::default().bg(Color::White))
            .empty_style(Style::default().bg(Color::Blue))
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].bg, Color::White);
        assert_eq!(buf[(1, 0)].bg, Color::White);
        assert_eq!(buf[(2, 0)].bg, Color::Blue);
        assert_eq!(buf[(3, 0)].bg, Color::Blue);
    }
}
