//! Shared browsing context.
//!
//! Three ref slots couple the views together: the main and pager views
//! publish the commit under the cursor into `ref_commit`, the tree view
//! publishes the hovered blob into `ref_blob`, and `ref_head` names the
//! branch the session started on. A child view reads its slot lazily when
//! it (re)loads, which is the whole drill-down mechanism. All writes happen
//! from draw code on the event-loop thread; there is no other thread to
//! race with.
//!
//! The context also carries the loaded settings and palette, the ref index,
//! and the transient cross-view state: the tree path, a pending prompt
//! command, the last search pattern, and the loading refcount that decides
//! whether keystroke input may block.

use core_config::Settings;
use core_keymap::Bindings;
use core_model::{Palette, RefIndex};

/// Which ref slot a view formats its command from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Head,
    Commit,
    Blob,
    /// Fixed content (help, pager): the id never changes.
    Static,
}

pub struct Context {
    pub settings: Settings,
    pub palette: Palette,
    pub bindings: Bindings,
    pub refs: RefIndex,

    /// Current head, commit and blob ids.
    pub ref_head: String,
    pub ref_commit: String,
    pub ref_blob: String,

    /// Path browsed by the tree view, always `""` or `<seg>/` repeated.
    pub opt_path: String,
    /// One-shot command override installed by the prompt.
    pub opt_cmd: Option<String>,
    /// Last search pattern, shared across views.
    pub search: String,

    /// Views currently streaming; nonzero switches the keystroke read to
    /// polling.
    pub loading_views: usize,
    /// Stdin is pending adoption by the pager view.
    pub stdin_pending: bool,
}

impl Context {
    pub fn new(settings: Settings, palette: Palette, bindings: Bindings, refs: RefIndex) -> Context {
        Context {
            settings,
            palette,
            bindings,
            refs,
            ref_head: "HEAD".to_owned(),
            ref_commit: "HEAD".to_owned(),
            ref_blob: String::new(),
            opt_path: String::new(),
            opt_cmd: None,
            search: String::new(),
            loading_views: 0,
            stdin_pending: false,
        }
    }

    /// Resolve an id source to the current id text.
    pub fn id_for(&self, source: IdSource) -> &str {
        match source {
            IdSource::Head => &self.ref_head,
            IdSource::Commit => &self.ref_commit,
            IdSource::Blob => &self.ref_blob,
            IdSource::Static => "static",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_sources_resolve_to_slots() {
        let mut ctx = Context::new(
            Settings::default(),
            Palette::built_in(),
            Bindings::new(),
            RefIndex::new(),
        );
        ctx.ref_commit = "c".repeat(40);
        ctx.ref_blob = "b".repeat(40);

        assert_eq!(ctx.id_for(IdSource::Head), "HEAD");
        assert_eq!(ctx.id_for(IdSource::Commit), ctx.ref_commit);
        assert_eq!(ctx.id_for(IdSource::Blob), ctx.ref_blob);
        assert_eq!(ctx.id_for(IdSource::Static), "static");
    }
}
