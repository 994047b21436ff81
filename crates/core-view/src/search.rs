//! Regex search over a view buffer.
//!
//! Each view keeps its own compiled pattern; the last pattern entered at a
//! prompt is also remembered globally so `n` works in a view that has not
//! searched yet. Iteration uses plain unsigned index arithmetic: walking
//! backwards past zero wraps to a huge index, which fails the bounds test
//! and ends the search; there is deliberately no wraparound to the other
//! end of the buffer.

use regex::Regex;

use crate::context::Context;
use crate::view::{View, ViewSearch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    fn step(self) -> usize {
        match self {
            // Wrapping add of usize::MAX is a decrement.
            SearchDirection::Forward => 1,
            SearchDirection::Backward => usize::MAX,
        }
    }
}

/// Result of a search request, with the status-line text to show.
#[derive(Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Cursor moved to a matching line.
    Hit {
        lineno: usize,
        prev_lineno: usize,
        /// The viewport was recentered; repaint the region.
        scrolled: bool,
        message: String,
    },
    /// Nothing matched (or there was nothing to search with).
    Miss(String),
    /// The pattern failed to compile; no search state was installed.
    Error(String),
}

/// Install a new pattern on the view and jump to its first match, starting
/// at the current line.
pub fn search(view: &mut View, direction: SearchDirection, pattern: &str) -> SearchOutcome {
    view.search = None;

    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            let reason = err.to_string();
            let reason = reason.lines().last().unwrap_or("unknown error");
            return SearchOutcome::Error(format!("Search failed: {reason}"));
        }
    };

    view.search = Some(ViewSearch {
        pattern: pattern.to_owned(),
        regex,
    });

    find(view, direction, false)
}

/// Continue with the view's pattern (`n`/`N`), falling back to the global
/// one when the view has none.
pub fn find_next(view: &mut View, ctx: &Context, direction: SearchDirection) -> SearchOutcome {
    if view.search.is_none() {
        if ctx.search.is_empty() {
            return SearchOutcome::Miss("No previous search".to_owned());
        }
        return search(view, direction, &ctx.search);
    }
    find(view, direction, true)
}

fn find(view: &mut View, direction: SearchDirection, advance: bool) -> SearchOutcome {
    let Some(state) = view.search.as_ref() else {
        return SearchOutcome::Miss("No previous search".to_owned());
    };
    let pattern = state.pattern.clone();
    let regex = state.regex.clone();
    let adapter = view.id.adapter();

    let mut lineno = view.lineno;
    if advance {
        lineno = lineno.wrapping_add(direction.step());
    }

    while lineno < view.lines() {
        if adapter.grep(&view.buffer[lineno], &regex) {
            let prev_lineno = view.lineno;
            // Recenter when the hit is outside the viewport (including
            // "above it", via the unsigned wrap).
            let scrolled = lineno.wrapping_sub(view.offset) >= view.height().max(1);
            if scrolled {
                view.offset = lineno;
            }
            view.lineno = lineno;
            return SearchOutcome::Hit {
                lineno,
                prev_lineno,
                scrolled,
                message: format!("Line {} matches '{}'", lineno + 1, pattern),
            };
        }
        lineno = lineno.wrapping_add(direction.step());
    }

    SearchOutcome::Miss(format!("No match found for '{pattern}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Settings;
    use core_keymap::Bindings;
    use core_model::{LineEntry, LineKind, Palette, RefIndex};
    use core_render::Region;
    use crate::view::ViewId;

    fn ctx() -> Context {
        Context::new(
            Settings::default(),
            Palette::built_in(),
            Bindings::new(),
            RefIndex::new(),
        )
    }

    fn pager_view(lines: &[&str]) -> View {
        let mut view = View::new(ViewId::Pager);
        view.window = Region {
            top: 0,
            rows: 10,
            cols: 80,
        };
        for line in lines {
            view.buffer
                .push(LineEntry::text(LineKind::Default, line.to_string()));
        }
        view
    }

    #[test]
    fn fresh_search_includes_the_current_line() {
        let mut view = pager_view(&["foo", "bar", "foo again"]);
        let outcome = search(&mut view, SearchDirection::Forward, "foo");
        match outcome {
            SearchOutcome::Hit {
                lineno, message, ..
            } => {
                assert_eq!(lineno, 0);
                assert_eq!(message, "Line 1 matches 'foo'");
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn find_next_skips_the_current_line() {
        let mut view = pager_view(&["foo", "bar", "foo again"]);
        let ctx = ctx();
        search(&mut view, SearchDirection::Forward, "foo");
        let outcome = find_next(&mut view, &ctx, SearchDirection::Forward);
        match outcome {
            SearchOutcome::Hit { lineno, .. } => assert_eq!(lineno, 2),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn next_then_prev_returns_to_the_original_row() {
        let mut view = pager_view(&["match one", "noise", "match two", "noise"]);
        let ctx = ctx();
        search(&mut view, SearchDirection::Forward, "match");
        assert_eq!(view.lineno, 0);
        find_next(&mut view, &ctx, SearchDirection::Forward);
        assert_eq!(view.lineno, 2);
        find_next(&mut view, &ctx, SearchDirection::Backward);
        assert_eq!(view.lineno, 0);
    }

    #[test]
    fn search_ends_at_the_buffer_edges_without_wrapping() {
        let mut view = pager_view(&["only here", "noise", "noise"]);
        let ctx = ctx();
        search(&mut view, SearchDirection::Forward, "only");
        assert_eq!(view.lineno, 0);

        // Backwards from the first line falls off the start.
        let outcome = find_next(&mut view, &ctx, SearchDirection::Backward);
        assert_eq!(
            outcome,
            SearchOutcome::Miss("No match found for 'only'".to_owned())
        );
        assert_eq!(view.lineno, 0, "cursor unchanged on a miss");
    }

    #[test]
    fn bad_pattern_reports_and_installs_nothing() {
        let mut view = pager_view(&["text"]);
        let outcome = search(&mut view, SearchDirection::Forward, "te[xt");
        assert!(matches!(outcome, SearchOutcome::Error(ref msg) if msg.starts_with("Search failed: ")));
        assert!(view.search.is_none());
    }

    #[test]
    fn find_next_without_any_pattern_reports() {
        let mut view = pager_view(&["text"]);
        let ctx = ctx();
        let outcome = find_next(&mut view, &ctx, SearchDirection::Forward);
        assert_eq!(outcome, SearchOutcome::Miss("No previous search".to_owned()));
    }

    #[test]
    fn find_next_falls_back_to_the_global_pattern() {
        let mut view = pager_view(&["alpha", "beta"]);
        let mut ctx = ctx();
        ctx.search = "beta".to_owned();
        let outcome = find_next(&mut view, &ctx, SearchDirection::Forward);
        match outcome {
            SearchOutcome::Hit { lineno, .. } => assert_eq!(lineno, 1),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(view.search.is_some(), "fallback installs the pattern");
    }

    #[test]
    fn distant_match_recenters_the_viewport() {
        let lines: Vec<String> = (0..40)
            .map(|i| if i == 30 { "needle".to_owned() } else { format!("hay {i}") })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut view = pager_view(&refs);
        let outcome = search(&mut view, SearchDirection::Forward, "needle");
        match outcome {
            SearchOutcome::Hit { scrolled, .. } => assert!(scrolled),
            other => panic!("expected hit, got {other:?}"),
        }
        assert_eq!(view.offset, 30);
        assert_eq!(view.lineno, 30);
    }
}
