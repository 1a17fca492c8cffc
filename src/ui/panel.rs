//! Bordered output panels.
//!
//! Panels are drawn with ratatui widgets into small off-screen buffers, a
//! slice of the body at a time, and written out row by row. They scroll with
//! the rest of the session instead of taking over the screen, and arbitrarily
//! long output never needs one giant buffer.

use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor,
};
use crossterm::queue;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Widget, Wrap};
use std::io::{self, Write};

/// Columns taken by the borders and the one-column padding on each side.
const CHROME: u16 = 4;
/// Panels never get narrower than this.
const MIN_WIDTH: u16 = 12;
/// Nor wider than this, whatever the terminal reports.
const MAX_WIDTH: u16 = 512;
/// Body lines wrapped together per slice.
const SLICE_LINES: usize = 32;
/// Longer body lines are hard-split so a slice always wraps to fewer than
/// `u16::MAX` rows.
const MAX_LINE_CHARS: usize = 1024;

/// A titled box around some text.
#[derive(Debug, Clone)]
pub struct Panel {
    title: String,
    border: Color,
    body: Text<'static>,
}

impl Panel {
    pub fn new(title: impl Into<String>, border: Color) -> Self {
        Self {
            title: title.into(),
            border,
            body: Text::default(),
        }
    }

    /// Append one line to the body.
    pub fn line(mut self, line: impl Into<Line<'static>>) -> Self {
        self.body.lines.push(line.into());
        self
    }

    /// Append every line of `text`, all in `style`.
    pub fn block_of(mut self, text: &str, style: Style) -> Self {
        for line in text.lines() {
            let mut rest = line;
            while let Some((at, _)) = rest.char_indices().nth(MAX_LINE_CHARS) {
                self.body
                    .lines
                    .push(Line::from(Span::styled(rest[..at].to_string(), style)));
                rest = &rest[at..];
            }
            self.body
                .lines
                .push(Line::from(Span::styled(rest.to_string(), style)));
        }
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &Text<'static> {
        &self.body
    }

    /// Total columns the panel takes, at most `max_width`.
    pub fn width(&self, max_width: u16) -> u16 {
        let max_width = max_width.clamp(MIN_WIDTH, MAX_WIDTH);
        let content = self.body.width().max(self.title_line().width());
        u16::try_from(content)
            .unwrap_or(u16::MAX)
            .saturating_add(CHROME)
            .clamp(MIN_WIDTH, max_width)
    }

    fn title_line(&self) -> Line<'static> {
        Line::from(format!(" {} ", self.title)).bold()
    }

    /// Draw the panel no wider than `max_width` columns, handing each
    /// finished piece to `emit` top to bottom. Every piece stays within the
    /// cell limit of a ratatui [`Buffer`].
    pub fn render_each<F>(&self, max_width: u16, mut emit: F) -> io::Result<()>
    where
        F: FnMut(&Buffer) -> io::Result<()>,
    {
        let width = self.width(max_width);
        let inner_width = width - CHROME;
        let window = (u16::MAX / width).saturating_sub(2).max(1);

        let slices: Vec<&[Line<'static>]> = if self.body.lines.is_empty() {
            vec![&self.body.lines[..]]
        } else {
            self.body.lines.chunks(SLICE_LINES).collect()
        };
        let last = slices.len() - 1;

        for (index, slice) in slices.into_iter().enumerate() {
            let paragraph = Paragraph::new(Text::from(slice.to_vec())).wrap(Wrap { trim: false });
            let rows = paragraph.line_count(inner_width).max(1);

            let mut offset = 0usize;
            while offset < rows {
                let Ok(scroll) = u16::try_from(offset) else {
                    break;
                };
                let take = (rows - offset).min(usize::from(window));
                let top = index == 0 && offset == 0;
                let bottom = index == last && offset + take >= rows;

                let mut borders = Borders::LEFT | Borders::RIGHT;
                if top {
                    borders |= Borders::TOP;
                }
                if bottom {
                    borders |= Borders::BOTTOM;
                }
                let mut block = Block::new()
                    .borders(borders)
                    .border_style(Style::default().fg(self.border))
                    .padding(Padding::horizontal(1));
                if top {
                    block = block.title(self.title_line());
                }

                // `take` is bounded by `window`, which fits in u16.
                let height = take as u16 + u16::from(top) + u16::from(bottom);
                let area = Rect::new(0, 0, width, height);
                let mut buf = Buffer::empty(area);
                paragraph
                    .clone()
                    .scroll((scroll, 0))
                    .block(block)
                    .render(area, &mut buf);
                emit(&buf)?;

                offset += take;
            }
        }
        Ok(())
    }

    /// Write the panel to `out` with ANSI styling.
    pub fn write_to<W: Write>(&self, out: &mut W, max_width: u16) -> io::Result<()> {
        self.render_each(max_width, |buf| write_buffer(out, buf))
    }
}

/// Write a rendered buffer as plain lines with ANSI styling.
fn write_buffer<W: Write>(out: &mut W, buf: &Buffer) -> io::Result<()> {
    let area = buf.area;
    for y in area.top()..area.bottom() {
        let mut current = (Color::Reset, Modifier::empty());
        let mut skip = 0usize;
        for x in area.left()..area.right() {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let cell = &buf[(x, y)];
            let symbol = cell.symbol();
            skip = Span::raw(symbol).width().saturating_sub(1);

            let style = (cell.fg, cell.modifier);
            if style != current {
                queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
                apply(out, style.0, style.1)?;
                current = style;
            }
            queue!(out, Print(symbol))?;
        }
        if current != (Color::Reset, Modifier::empty()) {
            queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

fn apply<W: Write>(out: &mut W, fg: Color, modifier: Modifier) -> io::Result<()> {
    if modifier.contains(Modifier::BOLD) {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if modifier.contains(Modifier::DIM) {
        queue!(out, SetAttribute(Attribute::Dim))?;
    }
    if let Some(color) = term_color(fg) {
        queue!(out, SetForegroundColor(color))?;
    }
    Ok(())
}

/// Map the named colours used in panels onto crossterm's.
pub(crate) fn term_color(color: Color) -> Option<TermColor> {
    let mapped = match color {
        Color::Reset => return None,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    };
    Some(mapped)
}
