//! The interactive application: display slots, request dispatch, and the
//! cooperative event loop.
//!
//! One loop alternates between draining every loading view's channel and
//! reading a single keystroke. While anything is loading the keystroke read
//! polls with a short budget so streaming continues; otherwise it blocks
//! and the process sleeps. All view and display mutation happens between
//! those two points; no other thread touches state.

use std::io;
use std::time::Duration;

use anyhow::Result;
use core_keymap::{Key, Keymap, Request};
use core_model::LineKind;
use core_render::{Painter, compute};
use core_terminal::{TermEvent, poll_event, read_event};
use core_view::{
    Context, MoveOp, OpenFlags, ScrollOp, SearchDirection, SearchOutcome, View, ViewId, find_next,
    search,
};
use tracing::{debug, info, warn};

use crate::help;

const VERSION_REPORT: &str = concat!("gitscope-", env!("CARGO_PKG_VERSION"));

/// Keystroke poll budget while views are loading.
const LOAD_POLL: Duration = Duration::from_millis(50);

pub struct App {
    views: Vec<View>,
    ctx: Context,
    /// At most two displayed views: primary on top, split secondary below.
    display: [Option<ViewId>; 2],
    current: usize,
    cols: u16,
    rows: u16,
    status_row: u16,
    status_empty: bool,
    /// View the next prompt-driven open targets.
    opt_request: ViewId,
}

fn view_request(id: ViewId) -> Request {
    match id {
        ViewId::Main => Request::ViewMain,
        ViewId::Diff => Request::ViewDiff,
        ViewId::Log => Request::ViewLog,
        ViewId::Tree => Request::ViewTree,
        ViewId::Blob => Request::ViewBlob,
        ViewId::Help => Request::ViewHelp,
        ViewId::Pager => Request::ViewPager,
    }
}

fn request_view(request: Request) -> Option<ViewId> {
    match request {
        Request::ViewMain => Some(ViewId::Main),
        Request::ViewDiff => Some(ViewId::Diff),
        Request::ViewLog => Some(ViewId::Log),
        Request::ViewTree => Some(ViewId::Tree),
        Request::ViewBlob => Some(ViewId::Blob),
        Request::ViewHelp => Some(ViewId::Help),
        Request::ViewPager => Some(ViewId::Pager),
        _ => None,
    }
}

impl App {
    pub fn new(ctx: Context, initial: ViewId, size: (u16, u16)) -> App {
        App {
            views: ViewId::ALL.iter().map(|&id| View::new(id)).collect(),
            ctx,
            display: [None, None],
            current: 0,
            cols: size.0,
            rows: size.1,
            status_row: size.1.saturating_sub(1),
            status_empty: true,
            opt_request: initial,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        info!(target: "runtime", initial = self.opt_request.name(), "session_start");
        let mut request = view_request(self.opt_request);

        loop {
            if !self.dispatch(request)? {
                break;
            }

            let progressed = self.update_loading_views()?;

            // While pipes are actively streaming, check for a keystroke
            // without waiting so the next batch drains immediately; an idle
            // load polls with a nap, and a fully idle session blocks.
            let event = if self.ctx.loading_views > 0 {
                let timeout = if progressed {
                    Duration::ZERO
                } else {
                    LOAD_POLL
                };
                poll_event(timeout)?
            } else {
                Some(read_event()?)
            };

            request = match event {
                None => Request::None,
                Some(TermEvent::Interrupt) => Request::Quit,
                Some(TermEvent::Resize(cols, rows)) => {
                    self.cols = cols;
                    self.rows = rows;
                    Request::ScreenResize
                }
                Some(TermEvent::Key(key)) => self.translate_key(key)?,
            };
        }

        info!(target: "runtime", "session_end");
        Ok(())
    }

    /// Look a key up and run the prompts that need the status line before
    /// the dispatcher sees the request.
    fn translate_key(&mut self, key: Key) -> Result<Request> {
        let keymap = match self.current_view_id() {
            Some(id) => id.keymap(),
            None => Keymap::Generic,
        };

        let request = match self.ctx.bindings.get(keymap, key) {
            Some(request) => request,
            None => {
                self.report("Unknown key, press 'h' for help")?;
                return Ok(Request::None);
            }
        };

        match request {
            Request::Prompt => {
                let Some(input) = self.read_prompt(":")? else {
                    return Ok(Request::None);
                };
                // Interpret the input as a git subcommand; `show` output is
                // a diff, anything else goes through the plain pager.
                self.opt_request = match input.split_once(char::is_whitespace) {
                    Some(("show", _)) => ViewId::Diff,
                    _ => ViewId::Pager,
                };
                self.ctx.opt_cmd = Some(format!("git {input}"));
                Ok(Request::Prompt)
            }
            Request::Search | Request::SearchBack => {
                let prefix = if request == Request::Search { "/" } else { "?" };
                let Some(input) = self.read_prompt(prefix)? else {
                    return Ok(Request::None);
                };
                self.ctx.search = input;
                Ok(request)
            }
            other => Ok(other),
        }
    }

    /// Execute one request. Returns false to quit.
    fn dispatch(&mut self, request: Request) -> Result<bool> {
        debug!(target: "input", ?request, "dispatch");
        match request {
            Request::MoveUp => self.move_current(MoveOp::Up)?,
            Request::MoveDown => self.move_current(MoveOp::Down)?,
            Request::MovePageUp => self.move_current(MoveOp::PageUp)?,
            Request::MovePageDown => self.move_current(MoveOp::PageDown)?,
            Request::MoveFirstLine => self.move_current(MoveOp::FirstLine)?,
            Request::MoveLastLine => self.move_current(MoveOp::LastLine)?,

            Request::ScrollLineUp => self.scroll_current(ScrollOp::LineUp)?,
            Request::ScrollLineDown => self.scroll_current(ScrollOp::LineDown)?,
            Request::ScrollPageUp => self.scroll_current(ScrollOp::PageUp)?,
            Request::ScrollPageDown => self.scroll_current(ScrollOp::PageDown)?,

            Request::ViewBlob if self.ctx.ref_blob.is_empty() => {
                self.report("No file chosen, press 't' to open tree view")?;
            }
            Request::ViewMain
            | Request::ViewDiff
            | Request::ViewLog
            | Request::ViewTree
            | Request::ViewBlob
            | Request::ViewHelp
            | Request::ViewPager => {
                let target = request_view(request).expect("view request");
                self.open_view(self.current_view_id(), target, OpenFlags::default())?;
            }

            Request::Next => self.next_previous(MoveOp::Down)?,
            Request::Previous => self.next_previous(MoveOp::Up)?,
            Request::Enter => {
                if let Some(id) = self.current_view_id() {
                    self.enter_view(id)?;
                }
            }

            Request::ViewNext => self.focus_next_view()?,

            Request::ToggleLineno => {
                self.ctx.settings.line_number = !self.ctx.settings.line_number;
                self.redraw_display()?;
            }
            Request::ToggleRevGraph => {
                self.ctx.settings.rev_graph = !self.ctx.settings.rev_graph;
                self.redraw_display()?;
            }

            Request::Prompt => {
                // Always rerun commands from the prompt.
                self.open_view(
                    self.current_view_id(),
                    self.opt_request,
                    OpenFlags {
                        split: false,
                        reload: true,
                    },
                )?;
            }

            Request::Search => self.search_current(SearchDirection::Forward)?,
            Request::SearchBack => self.search_current(SearchDirection::Backward)?,
            Request::FindNext => self.find_current(SearchDirection::Forward)?,
            Request::FindPrev => self.find_current(SearchDirection::Backward)?,

            Request::StopLoading => self.stop_loading()?,
            Request::ShowVersion => self.report(VERSION_REPORT)?,

            Request::ScreenResize => {
                self.resize();
                self.redraw_display()?;
            }
            Request::ScreenRedraw => self.redraw_display()?,
            Request::None => {}

            Request::ViewClose => return self.close_current(),
            Request::Quit => return Ok(false),
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Display bookkeeping
    // ------------------------------------------------------------------

    fn current_view_id(&self) -> Option<ViewId> {
        self.display[self.current]
    }

    fn displayed_count(&self) -> usize {
        if self.display[1].is_some() { 2 } else { 1 }
    }

    fn is_displayed(&self, id: ViewId) -> bool {
        self.display[0] == Some(id) || self.display[1] == Some(id)
    }

    fn view(&self, id: ViewId) -> &View {
        &self.views[id.index()]
    }

    fn view_mut(&mut self, id: ViewId) -> &mut View {
        &mut self.views[id.index()]
    }

    /// Recompute regions for the displayed views.
    fn resize(&mut self) {
        let layout = compute(self.cols, self.rows, self.display[1].is_some());
        self.status_row = layout.status_row;
        if let Some(primary) = self.display[0] {
            self.view_mut(primary).window = layout.primary;
        }
        if let (Some(secondary), Some(region)) = (self.display[1], layout.secondary) {
            self.view_mut(secondary).window = region;
        }
    }

    /// Open `target`, replacing the display or splitting it.
    fn open_view(
        &mut self,
        prev: Option<ViewId>,
        target: ViewId,
        flags: OpenFlags,
    ) -> Result<()> {
        let nviews = self.displayed_count();
        let base_view = self.display[0];

        if Some(target) == prev && nviews == 1 && !flags.reload {
            return self.report(&format!("Already in {} view", target.name()));
        }

        if target == ViewId::Help {
            let Self { views, ctx, .. } = self;
            help::open_help_view(&mut views[target.index()], ctx);
        } else if flags.reload || self.view(target).is_stale(&self.ctx) {
            let Self { views, ctx, .. } = self;
            if let Err(err) = views[target.index()].begin_update(ctx) {
                warn!(target: "view", view = target.name(), %err, "load failed");
                return self.report(&format!("Failed to load {} view", target.name()));
            }
        }

        if flags.split {
            self.display[1] = Some(target);
            self.current = 1;
        } else {
            // Maximize the new view.
            self.display = [Some(target), None];
            self.current = 0;
        }

        // Resize when switching between split- and full-screen, or between
        // two different full-screen views.
        if nviews != self.displayed_count() || (nviews == 1 && base_view != self.display[0]) {
            self.resize();
        }

        // Scroll the view that was split if its cursor fell outside the
        // shrunken window.
        if flags.split {
            if let Some(prev_id) = prev.filter(|&p| p != target) {
                let prev_view = self.view_mut(prev_id);
                if prev_view.height() > 0
                    && prev_view.lineno - prev_view.offset >= prev_view.height()
                {
                    let lines =
                        prev_view.lineno - prev_view.offset - prev_view.height() + 1;
                    prev_view.do_scroll(lines as isize);
                }
                self.refresh_view(prev_id)?;
            }
        }

        if let Some(prev_id) = prev.filter(|&p| p != target) {
            // Blur the previous view's title.
            self.update_title(prev_id)?;
            let view = self.view_mut(target);
            view.parent = Some(prev_id);
            view.closed = false;
        }

        if target == ViewId::Blob {
            // Mirror what the title bar should show.
            self.view_mut(ViewId::Blob).ref_name = self.ctx.ref_blob.clone();
        }

        self.refresh_view(target)?;
        self.report("")
    }

    /// Close the current view, restoring its parent full-screen; closing a
    /// root quits.
    fn close_current(&mut self) -> Result<bool> {
        let Some(id) = self.current_view_id() else {
            return Ok(false);
        };
        let parent = self.view(id).parent;
        let restorable = parent
            .filter(|&p| p != id && !self.view(p).closed)
            .is_some();
        if !restorable {
            return Ok(false);
        }

        let parent = parent.expect("checked above");
        self.display = [Some(parent), None];
        self.current = 0;
        let view = self.view_mut(id);
        view.closed = true;
        view.parent = None;

        self.resize();
        self.redraw_display()?;
        Ok(true)
    }

    fn focus_next_view(&mut self) -> Result<()> {
        let nviews = self.displayed_count();
        let next = (self.current + 1) % nviews;
        if next == self.current {
            return self.report("Only one view is displayed");
        }
        let old = self.current_view_id();
        self.current = next;
        // Blur out the title of the previous view.
        if let Some(old) = old {
            self.update_title(old)?;
        }
        self.report("")
    }

    // ------------------------------------------------------------------
    // Navigation and search
    // ------------------------------------------------------------------

    fn move_current(&mut self, op: MoveOp) -> Result<()> {
        let Some(id) = self.current_view_id() else {
            return Ok(());
        };
        let nav = self.view_mut(id).move_cursor(op);
        self.apply_nav(id, nav.message, nav.scrolled, nav.prev_lineno, nav.moved)
    }

    fn scroll_current(&mut self, op: ScrollOp) -> Result<()> {
        let Some(id) = self.current_view_id() else {
            return Ok(());
        };
        let nav = self.view_mut(id).scroll(op);
        self.apply_nav(id, nav.message, nav.scrolled, nav.prev_lineno, nav.moved)
    }

    fn apply_nav(
        &mut self,
        id: ViewId,
        message: Option<&'static str>,
        scrolled: bool,
        prev_lineno: usize,
        moved: bool,
    ) -> Result<()> {
        if let Some(message) = message {
            return self.report(message);
        }
        if !moved {
            return Ok(());
        }
        if scrolled {
            self.refresh_view(id)?;
        } else {
            self.repaint_line(id, prev_lineno)?;
            let lineno = self.view(id).lineno;
            self.repaint_line(id, lineno)?;
        }
        self.report("")
    }

    /// NEXT/PREVIOUS: a diff under the main view (or a blob under the tree
    /// view) follows its parent's selection instead of moving itself.
    fn next_previous(&mut self, op: MoveOp) -> Result<()> {
        let Some(id) = self.current_view_id() else {
            return Ok(());
        };
        let parent = self.view(id).parent;
        let redirected = (id == ViewId::Diff && parent == Some(ViewId::Main))
            || (id == ViewId::Blob && parent == Some(ViewId::Tree));

        if !redirected {
            return self.move_current(op);
        }

        let parent = parent.expect("redirected implies parent");
        let nav = self.view_mut(parent).move_cursor(op);
        if let Some(message) = nav.message {
            return self.report(message);
        }
        if self.is_displayed(parent) {
            if nav.scrolled {
                self.refresh_view(parent)?;
            } else {
                self.repaint_line(parent, nav.prev_lineno)?;
                let lineno = self.view(parent).lineno;
                self.repaint_line(parent, lineno)?;
            }
            self.update_title(parent)?;
        }
        // Re-enter the parent's new selection so this view follows it.
        self.enter_view(parent)
    }

    fn enter_view(&mut self, id: ViewId) -> Result<()> {
        if self.view(id).lines() == 0 {
            return self.report("Nothing to enter");
        }

        let is_primary = self.display[0] == Some(id);
        let outcome = {
            let Self { views, ctx, .. } = self;
            let view = &mut views[id.index()];
            view.id.adapter().enter(view, ctx, is_primary)
        };

        let mut split_opened = false;
        if let Some((target, flags)) = outcome.open {
            split_opened = flags.split;
            self.open_view(Some(id), target, flags)?;
        }

        if outcome.scroll_after {
            // Scroll the entered view even if it was split away from, so
            // Enter walks the log while opening each commit diff.
            let nav = self.view_mut(id).scroll(ScrollOp::LineDown);
            if let Some(message) = nav.message {
                self.report(message)?;
            } else if self.is_displayed(id) {
                self.refresh_view(id)?;
            }
            if split_opened {
                self.update_title(id)?;
            }
        }
        Ok(())
    }

    fn search_current(&mut self, direction: SearchDirection) -> Result<()> {
        let Some(id) = self.current_view_id() else {
            return Ok(());
        };
        let pattern = self.ctx.search.clone();
        let outcome = search(self.view_mut(id), direction, &pattern);
        self.apply_search_outcome(id, outcome)
    }

    fn find_current(&mut self, direction: SearchDirection) -> Result<()> {
        let Some(id) = self.current_view_id() else {
            return Ok(());
        };
        let outcome = {
            let Self { views, ctx, .. } = self;
            find_next(&mut views[id.index()], ctx, direction)
        };
        self.apply_search_outcome(id, outcome)
    }

    fn apply_search_outcome(&mut self, id: ViewId, outcome: SearchOutcome) -> Result<()> {
        match outcome {
            SearchOutcome::Hit {
                prev_lineno,
                lineno,
                scrolled,
                message,
            } => {
                if scrolled {
                    self.refresh_view(id)?;
                } else {
                    self.repaint_line(id, prev_lineno)?;
                    self.repaint_line(id, lineno)?;
                }
                self.report(&message)
            }
            SearchOutcome::Miss(message) | SearchOutcome::Error(message) => {
                self.report(&message)
            }
        }
    }

    fn stop_loading(&mut self) -> Result<()> {
        for &id in ViewId::ALL {
            if self.view(id).is_loading() {
                let Self { views, ctx, .. } = self;
                views[id.index()].end_update(ctx);
                self.report(&format!("Stopped loading the {} view", id.name()))?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Incremental loading
    // ------------------------------------------------------------------

    /// One bounded read pass over every loading view, with incremental
    /// repaints for whatever became visible. Returns whether any view made
    /// progress, so the caller can pace its keystroke polling.
    pub fn update_loading_views(&mut self) -> Result<bool> {
        let mut progressed = false;
        for &id in ViewId::ALL {
            if !self.view(id).is_loading() {
                continue;
            }

            let outcome = {
                let Self { views, ctx, .. } = self;
                views[id.index()].update(ctx)
            };
            progressed |= outcome.changed_from.is_some() || outcome.finished;

            if self.is_displayed(id) {
                if id == ViewId::Tree || outcome.digits_changed {
                    // Insert-sorting (or a wider gutter) may have moved
                    // every row.
                    self.refresh_view(id)?;
                } else if let Some(changed_from) = outcome.changed_from {
                    // Redraw the previous line too: a commit record may
                    // have gained its refs after first being drawn.
                    let start = if id == ViewId::Main {
                        changed_from.saturating_sub(1)
                    } else {
                        changed_from
                    };
                    let view = self.view(id);
                    if start < view.offset + view.height() {
                        let from_row = start.max(view.offset) - view.offset;
                        self.refresh_rows(id, from_row)?;
                    }
                    self.update_title(id)?;
                } else {
                    self.update_title(id)?;
                }
            }

            if outcome.finished {
                match outcome.error {
                    Some(error) => self.report(&error)?,
                    None => self.report("")?,
                }
            }
        }
        Ok(progressed)
    }

    // ------------------------------------------------------------------
    // Painting
    // ------------------------------------------------------------------

    /// Repaint a whole view region plus its title.
    fn refresh_view(&mut self, id: ViewId) -> Result<()> {
        if !self.is_displayed(id) {
            return Ok(());
        }
        self.refresh_rows(id, 0)?;
        self.update_title(id)
    }

    /// Repaint window rows `from_row..` of a view; rows past the buffer
    /// end are cleared.
    fn refresh_rows(&mut self, id: ViewId, from_row: usize) -> Result<()> {
        let Self { views, ctx, .. } = self;
        let view = &mut views[id.index()];
        let mut painter = Painter::new(io::stdout().lock());
        let mut drawing = true;

        for row in from_row..view.height() {
            if drawing {
                drawing = view.id.adapter().draw(view, ctx, &mut painter, row)?;
            }
            if !drawing {
                painter.move_to(0, view.window.top + row as u16)?;
                painter.set_style(ctx.palette.style(LineKind::Default))?;
                painter.clear_to_eol()?;
            }
        }
        painter.flush()?;
        Ok(())
    }

    /// Repaint the single row holding buffer line `lineno`, if visible.
    fn repaint_line(&mut self, id: ViewId, lineno: usize) -> Result<()> {
        if !self.is_displayed(id) {
            return Ok(());
        }
        let view = self.view(id);
        if lineno < view.offset || lineno >= view.offset + view.height() {
            return Ok(());
        }
        let row = lineno - view.offset;

        let Self { views, ctx, .. } = self;
        let view = &mut views[id.index()];
        let mut painter = Painter::new(io::stdout().lock());
        view.id.adapter().draw(view, ctx, &mut painter, row)?;
        painter.flush()?;
        Ok(())
    }

    fn update_title(&mut self, id: ViewId) -> Result<()> {
        if !self.is_displayed(id) {
            return Ok(());
        }
        let focused = self.current_view_id() == Some(id);
        let style = self.ctx.palette.style(if focused {
            LineKind::TitleFocus
        } else {
            LineKind::TitleBlur
        });
        let view = self.view(id);
        let text = view.title_text();
        let row = view.window.title_row();

        let mut painter = Painter::new(io::stdout().lock());
        painter.draw_bar(row, style, &text)?;
        painter.flush()?;
        Ok(())
    }

    /// Repaint everything: both regions, both titles, the status line.
    fn redraw_display(&mut self) -> Result<()> {
        {
            let mut painter = Painter::new(io::stdout().lock());
            painter.set_style(self.ctx.palette.style(LineKind::Default))?;
            painter.clear_all()?;
            painter.flush()?;
        }
        for slot in 0..2 {
            if let Some(id) = self.display[slot] {
                self.refresh_view(id)?;
            }
        }
        self.draw_status("")?;
        Ok(())
    }

    /// Update status and title window.
    fn report(&mut self, message: &str) -> Result<()> {
        if !(self.status_empty && message.is_empty()) {
            self.draw_status(message)?;
            self.status_empty = message.is_empty();
        }
        if let Some(id) = self.current_view_id() {
            self.update_title(id)?;
        }
        Ok(())
    }

    fn draw_status(&mut self, message: &str) -> Result<()> {
        let style = self.ctx.palette.style(LineKind::Status);
        let mut painter = Painter::new(io::stdout().lock());
        painter.draw_bar(self.status_row, style, message)?;
        painter.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prompt
    // ------------------------------------------------------------------

    /// Line input on the status row. Background loads keep streaming while
    /// the prompt is up. `None` means cancelled (ESC, or deleting past the
    /// start, or an empty answer).
    fn read_prompt(&mut self, prefix: &str) -> Result<Option<String>> {
        let mut buf = String::new();

        loop {
            let progressed = self.update_loading_views()?;
            self.draw_status(&format!("{prefix}{buf}"))?;
            self.status_empty = false;

            let event = if self.ctx.loading_views > 0 {
                let timeout = if progressed {
                    Duration::ZERO
                } else {
                    LOAD_POLL
                };
                poll_event(timeout)?
            } else {
                Some(read_event()?)
            };

            match event {
                None => continue,
                Some(TermEvent::Resize(cols, rows)) => {
                    self.cols = cols;
                    self.rows = rows;
                    self.resize();
                    self.redraw_display()?;
                }
                Some(TermEvent::Interrupt) | Some(TermEvent::Key(Key::Escape)) => break,
                Some(TermEvent::Key(Key::Enter)) => {
                    if buf.is_empty() {
                        break;
                    }
                    self.report("")?;
                    return Ok(Some(buf));
                }
                Some(TermEvent::Key(Key::Backspace)) => {
                    if buf.pop().is_none() {
                        break;
                    }
                }
                Some(TermEvent::Key(Key::Char(c))) if !c.is_control() => buf.push(c),
                Some(TermEvent::Key(_)) => {}
            }
        }

        // Clear the prompt leftovers from the status window.
        self.report("")?;
        Ok(None)
    }
}
