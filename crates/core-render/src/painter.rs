//! Queued drawing over a crossterm writer.
//!
//! The painter batches cursor movement, styling and text into the
//! underlying writer; nothing reaches the terminal until [`Painter::flush`].
//! One flush per redraw keeps partial frames off slow terminals. All
//! coordinates are absolute screen cells; view-relative drawing adds the
//! region origin before calling in.

use std::io::{self, Write};

use core_model::LineStyle;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::style::{term_attr, term_color};

pub struct Painter<W: Write> {
    out: W,
}

impl<W: Write> Painter<W> {
    pub fn new(out: W) -> Painter<W> {
        Painter { out }
    }

    pub fn move_to(&mut self, col: u16, row: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    /// Apply a palette style. Attributes are reset first so styles never
    /// bleed between runs.
    pub fn set_style(&mut self, style: LineStyle) -> io::Result<()> {
        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(term_color(style.fg)),
            SetBackgroundColor(term_color(style.bg)),
        )?;
        if let Some(attr) = term_attr(style.attr) {
            queue!(self.out, SetAttribute(attr))?;
        }
        Ok(())
    }

    pub fn print(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print(text))
    }

    /// Clear from the cursor to the end of the row, in the current style's
    /// background.
    pub fn clear_to_eol(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::UntilNewLine))
    }

    pub fn clear_all(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))
    }

    /// Paint one full-width bar (title or status row): style, text, then a
    /// clear so the background runs to the right edge.
    pub fn draw_bar(&mut self, row: u16, style: LineStyle, text: &str) -> io::Result<()> {
        self.move_to(0, row)?;
        self.set_style(style)?;
        self.print(text)?;
        self.clear_to_eol()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Attr, Color};

    fn style() -> LineStyle {
        LineStyle {
            fg: Color::Yellow,
            bg: Color::Default,
            attr: Attr::Bold,
        }
    }

    #[test]
    fn queued_output_reaches_writer_on_flush() {
        let mut painter = Painter::new(Vec::new());
        painter.move_to(0, 3).unwrap();
        painter.set_style(style()).unwrap();
        painter.print("hello").unwrap();
        painter.clear_to_eol().unwrap();
        painter.flush().unwrap();

        let bytes = painter.out;
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("hello"));
        // Cursor addressing and SGR escapes surround the text.
        assert!(text.contains("\u{1b}["));
    }

    #[test]
    fn bar_clears_to_edge() {
        let mut painter = Painter::new(Vec::new());
        painter.draw_bar(10, style(), "[main] HEAD").unwrap();
        painter.flush().unwrap();
        let text = String::from_utf8_lossy(&painter.out).into_owned();
        assert!(text.contains("[main] HEAD"));
        // ClearType::UntilNewLine is CSI K.
        assert!(text.ends_with("\u{1b}[K"));
    }
}
