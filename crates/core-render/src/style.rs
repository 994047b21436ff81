//! Mapping from the palette's color/attribute model onto crossterm.

use core_model::{Attr, Color};
use crossterm::style::{Attribute, Color as TermColor};

/// Palette color → terminal color. `Default` resets to whatever the
/// terminal considers its default for that plane.
pub fn term_color(color: Color) -> TermColor {
    match color {
        Color::Default => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Blue => TermColor::DarkBlue,
        Color::Cyan => TermColor::DarkCyan,
        Color::Green => TermColor::DarkGreen,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Red => TermColor::DarkRed,
        Color::White => TermColor::White,
        Color::Yellow => TermColor::DarkYellow,
    }
}

/// Palette attribute → terminal attribute. `Normal` maps to `None` (the
/// painter resets attributes before applying a style). `Standout` has no
/// direct crossterm equivalent and renders as reverse video, which is what
/// most terminfo entries alias it to anyway.
pub fn term_attr(attr: Attr) -> Option<Attribute> {
    match attr {
        Attr::Normal => None,
        Attr::Blink => Some(Attribute::SlowBlink),
        Attr::Bold => Some(Attribute::Bold),
        Attr::Dim => Some(Attribute::Dim),
        Attr::Reverse => Some(Attribute::Reverse),
        Attr::Standout => Some(Attribute::Reverse),
        Attr::Underline => Some(Attribute::Underlined),
    }
}
