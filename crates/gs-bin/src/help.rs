//! Help view synthesis.
//!
//! The help screen is the one view with no subprocess behind it: the
//! request catalog and the default key table are rendered once into the
//! view's buffer through its (pager) adapter, and the buffer is kept for
//! the rest of the session.

use core_keymap::{Bindings, REQUEST_INFO, Request};
use core_view::{Context, View};

/// Comma-joined default keys for one request, in table scan order.
fn key_names(request: Request) -> String {
    let names: Vec<String> = Bindings::default_keys_for(request)
        .map(|key| key.display_name())
        .collect();
    names.join(", ")
}

pub fn open_help_view(view: &mut View, ctx: &mut Context) {
    if view.lines() > 0 {
        return;
    }

    let mut feed = |view: &mut View, line: String| {
        let _ = view.id.adapter().read(view, ctx, line);
    };

    feed(view, "Quick reference for gitscope keybindings:".to_owned());

    for info in REQUEST_INFO {
        match info.request {
            None => {
                feed(view, String::new());
                feed(view, info.help.to_owned());
            }
            Some(request) => {
                feed(
                    view,
                    format!("    {:<21} {}", key_names(request), info.help),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Settings;
    use core_keymap::Bindings;
    use core_model::{Palette, RefIndex};
    use core_view::ViewId;

    fn ctx() -> Context {
        Context::new(
            Settings::default(),
            Palette::built_in(),
            Bindings::new(),
            RefIndex::new(),
        )
    }

    #[test]
    fn help_lists_groups_and_bindings() {
        let mut ctx = ctx();
        let mut view = View::new(ViewId::Help);
        open_help_view(&mut view, &mut ctx);

        let lines: Vec<&str> = view
            .buffer
            .iter()
            .map(|entry| entry.as_text().unwrap())
            .collect();
        assert!(lines[0].starts_with("Quick reference"));
        assert!(lines.iter().any(|l| *l == "View switching"));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("'m'") && l.contains("Show main view"))
        );
        // The duplicated 'b' binding surfaces under both requests.
        assert!(
            lines
                .iter()
                .any(|l| l.contains("Show blob view") && l.contains("'b'"))
        );
        assert!(
            lines
                .iter()
                .any(|l| l.contains("Move cursor one page up") && l.contains("'b'"))
        );
    }

    #[test]
    fn help_view_builds_only_once() {
        let mut ctx = ctx();
        let mut view = View::new(ViewId::Help);
        open_help_view(&mut view, &mut ctx);
        let lines = view.lines();
        open_help_view(&mut view, &mut ctx);
        assert_eq!(view.lines(), lines);
    }
}
