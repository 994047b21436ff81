//! Screen partition arithmetic.
//!
//! The terminal is divided into at most two view regions, each followed by
//! a one-row title bar, with the status row at the very bottom. A split
//! gives the new (secondary) view the lower two thirds of the body; the
//! previous view keeps the remainder on top. All arithmetic saturates so a
//! degenerate terminal produces empty regions instead of wrapping.

/// Content area of one view: rows `[top, top + rows)`, with the title bar
/// on the row directly below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top: u16,
    pub rows: u16,
    pub cols: u16,
}

impl Region {
    pub fn title_row(&self) -> u16 {
        self.top + self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub primary: Region,
    pub secondary: Option<Region>,
    pub status_row: u16,
    pub cols: u16,
}

/// Fraction of the body handed to the split-off view.
fn split_rows(body: u16) -> u16 {
    body * 2 / 3
}

pub fn compute(cols: u16, rows: u16, split: bool) -> ScreenLayout {
    // One row for the status window.
    let body = rows.saturating_sub(1);

    if !split {
        return ScreenLayout {
            primary: Region {
                top: 0,
                rows: body.saturating_sub(1),
                cols,
            },
            secondary: None,
            status_row: body,
            cols,
        };
    }

    let secondary_total = split_rows(body);
    let primary_total = body.saturating_sub(secondary_total);

    ScreenLayout {
        primary: Region {
            top: 0,
            rows: primary_total.saturating_sub(1),
            cols,
        },
        secondary: Some(Region {
            top: primary_total,
            rows: secondary_total.saturating_sub(1),
            cols,
        }),
        status_row: body,
        cols,
    }
}
