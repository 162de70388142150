use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

use crate::bar::Bar;

/// A scrolling list of indented rows where value rows carry a bracketed
/// value and a level bar.
///
/// Layout per row: cursor, label (indented), `[ value ]`, bar to the right
/// edge. Rows are `row_height` lines apart.
pub struct RowList<'a> {
    rows: &'a [Row<'a>],
    selected: Option<usize>,
    offset: usize,
    row_height: u16,
    /// Columns reserved for the indented label.
    name_width: u16,
    /// Columns reserved for `[ value ]`.
    value_width: u16,
    style: Style,
    selected_style: Style,
    bar_styles: (Style, Style),
    selected_bar_styles: (Style, Style),
    cursor: &'a str,
    scrollbar: bool,
    scrollbar_style: Style,
    scrollbar_track_style: Style,
}

/// One entry of the list.
pub struct Row<'a> {
    pub indent: u16,
    pub label: &'a str,
    pub value: Option<RowValue<'a>>,
}

/// The value part of a row: display text and the bar position in `[0, 1]`.
pub struct RowValue<'a> {
    pub text: &'a str,
    pub fraction: f64,
}

impl<'a> Row<'a> {
    pub fn header(indent: u16, label: &'a str) -> Self {
        Self {
            indent,
            label,
            value: None,
        }
    }

    pub fn value(indent: u16, label: &'a str, text: &'a str, fraction: f64) -> Self {
        Self {
            indent,
            label,
            value: Some(RowValue { text, fraction }),
        }
    }
}

impl<'a> RowList<'a> {
    pub fn new(rows: &'a [Row<'a>], selected: Option<usize>, offset: usize) -> Self {
        Self {
            rows,
            selected,
            offset,
            row_height: 1,
            name_width: 30,
            value_width: 19,
            style: Style::default().fg(Color::Cyan),
            selected_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            bar_styles: (
                Style::default().bg(Color::Cyan),
                Style::default().bg(Color::Blue),
            ),
            selected_bar_styles: (
                Style::default().bg(Color::White),
                Style::default().bg(Color::Blue),
            ),
            cursor: "->",
            scrollbar: true,
            scrollbar_style: Style::default().fg(Color::White),
            scrollbar_track_style: Style::default().fg(Color::DarkGray),
        }
    }

    /// How many rows fit in `height` lines at `row_height` lines per row.
    pub fn capacity(height: u16, row_height: u16) -> usize {
        (height / row_height.max(1)) as usize
    }

    pub fn row_height(mut self, lines: u16) -> Self {
        self.row_height = lines.max(1);
        self
    }

    pub fn columns(mut self, name_width: u16, value_width: u16) -> Self {
        self.name_width = name_width;
        self.value_width = value_width;
        self
    }

    pub fn scrollbar(mut self, show: bool) -> Self {
        self.scrollbar = show;
        self
    }
}

/// Center `s` in a field of `pad` columns, truncating if it is longer.
pub fn center(s: &str, pad: usize) -> String {
    let text: String = s.chars().take(pad).collect();
    let len = text.chars().count();
    let left = (pad - len) / 2;
    let right = pad - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

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

impl Widget for RowList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let visible = Self::capacity(area.height, self.row_height);
        let has_scrollbar = self.scrollbar && self.rows.len() > visible && visible > 0;
        let content_right = if has_scrollbar {
            area.right().saturating_sub(1)
        } else {
            area.right()
        };
        let cursor_width = self.cursor.chars().count() as u16 + 1;

        for slot in 0..visible {
            let idx = self.offset + slot;
            let Some(row) = self.rows.get(idx) else {
                break;
            };
            let y = area.y + slot as u16 * self.row_height;
            let is_selected = self.selected == Some(idx);
            let style = if is_selected {
                self.selected_style
            } else {
                self.style
            };

            if is_selected {
                put_str(buf, area.x, y, content_right, self.cursor, Style::default());
            }

            // Label, indented and cut to the name column.
            let label_x = area.x + cursor_width + row.indent;
            let label_room = self.name_width.saturating_sub(row.indent + 1) as usize;
            let label: String = row.label.chars().take(label_room).collect();
            let label_right = match row.value {
                Some(_) => content_right.min(area.x + cursor_width + self.name_width),
                None => content_right,
            };
            put_str(buf, label_x, y, label_right, &label, style);

            let Some(value) = &row.value else {
                continue;
            };

            let value_x = area.x + cursor_width + self.name_width;
            let inner = self.value_width.saturating_sub(5) as usize;
            let text = format!("[ {} ]", center(value.text, inner));
            put_str(buf, value_x, y, content_right, &text, style);

            let bar_x = value_x + self.value_width;
            // Keep one blank column before the edge.
            let bar_right = content_right.saturating_sub(1);
            if bar_x < bar_right {
                let (filled, empty) = if is_selected {
                    self.selected_bar_styles
                } else {
                    self.bar_styles
                };
                Bar::new(value.fraction)
                    .filled_style(filled)
                    .empty_style(empty)
                    .render(Rect::new(bar_x, y, bar_right - bar_x, 1), buf);
            }
        }

        if has_scrollbar {
            let sb_x = area.right() - 1;
            let height = area.height as usize;
            let total = self.rows.len();
            let thumb_size = ((height * visible) / total).max(1);
            let max_offset = total - visible;
            let thumb_start = (self.offset.min(max_offset) * (height - thumb_size)) / max_offset;

            for line in 0..height {
                let y = area.y + line as u16;
                let in_thumb = line >= thumb_start && line < thumb_start + thumb_size;
                let (ch, style) = if in_thumb {
                    ('┃', self.scrollbar_style)
                } else {
                    ('│', self.scrollbar_track_style)
                };
                if let Some(cell) = buf.cell_mut((sb_x, y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
            }
        }
    }
}
