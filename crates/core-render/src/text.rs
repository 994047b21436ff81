//! Plain text row rendering: tab expansion, clipping, and the optional
//! line-number gutter.
//!
//! Column accounting here is per character with tabs rounded up to the next
//! stop; the width-fitting engine in `core-text` is reserved for the main
//! view's aligned columns. The gutter prints zero-padded numbers sized by
//! the buffer's digit count so the column never jumps as lines stream in;
//! a digit-count change triggers a full redraw instead.

/// Line-number gutter state for one row.
#[derive(Debug, Clone, Copy)]
pub struct Gutter {
    /// Digits of the largest line number in the buffer.
    pub digits: usize,
    /// Number to print, or `None` for rows between intervals.
    pub number: Option<usize>,
}

impl Gutter {
    /// Cells the gutter occupies, separator included.
    pub fn cols(&self) -> usize {
        self.digits + 2
    }

    /// Render the gutter cell: `004: ` or blank padding of equal width.
    pub fn render(&self) -> String {
        match self.number {
            Some(n) => format!("{:0width$}: ", n, width = self.digits),
            None => format!("{:width$}: ", "", width = self.digits),
        }
    }
}

/// Expand tabs to spaces and clip the result to `max_cols` cells.
pub fn expand_tabs_clip(text: &str, tab_size: usize, max_cols: usize) -> String {
    let tab_size = tab_size.max(1);
    let mut out = String::with_capacity(text.len());
    let mut col = 0usize;

    for c in text.chars() {
        if col >= max_cols {
            break;
        }
        if c == '\t' {
            let stop = tab_size - (col % tab_size);
            for _ in 0..stop.min(max_cols - col) {
                out.push(' ');
            }
            col += stop;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_round_to_next_stop() {
        assert_eq!(expand_tabs_clip("a\tb", 8, 80), "a       b");
        assert_eq!(expand_tabs_clip("ab\tc", 4, 80), "ab  c");
        assert_eq!(expand_tabs_clip("\t.", 8, 80), "        .");
    }

    #[test]
    fn clipping_respects_budget() {
        assert_eq!(expand_tabs_clip("abcdef", 8, 3), "abc");
        // A tab crossing the boundary fills what space remains.
        assert_eq!(expand_tabs_clip("a\tbc", 8, 4), "a   ");
    }

    #[test]
    fn gutter_zero_pads_and_blanks() {
        let numbered = Gutter {
            digits: 3,
            number: Some(7),
        };
        assert_eq!(numbered.render(), "007: ");
        assert_eq!(numbered.cols(), 5);

        let blank = Gutter {
            digits: 3,
            number: None,
        };
        assert_eq!(blank.render(), "   : ");
    }
}
