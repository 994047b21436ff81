//! The view: a reactive container binding a subprocess to a growing line
//! buffer behind a viewport.
//!
//! One `View` exists per kind for the whole session. Loading rebuilds the
//! buffer but the window geometry, search state and parent link survive
//! reloads. The viewport invariant maintained by every navigation call:
//! `offset <= lineno < buffer.len()` and `lineno < offset + height`
//! whenever the buffer is non-empty.
//!
//! `update` drains at most one window-height of lines per tick. Too few
//! lines per tick means redraw churn while a fast command streams; too many
//! and a keystroke waits behind a megabyte of diff. One screenful balances
//! the two and naturally scales with the terminal.

use std::time::Instant;

use core_keymap::Keymap;
use core_model::LineEntry;
use core_render::Region;
use core_text::decimal_digits;
use regex::Regex;
use tracing::{debug, info};

use crate::adapter::Adapter;
use crate::context::{Context, IdSource};
use crate::loader::{LoadError, LoadEvent, Loader, decode_line, substitute_template};

/// The seven views, in request/display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewId {
    Main,
    Diff,
    Log,
    Tree,
    Blob,
    Help,
    Pager,
}

impl ViewId {
    pub const ALL: &'static [ViewId] = &[
        ViewId::Main,
        ViewId::Diff,
        ViewId::Log,
        ViewId::Tree,
        ViewId::Blob,
        ViewId::Help,
        ViewId::Pager,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewId::Main => "main",
            ViewId::Diff => "diff",
            ViewId::Log => "log",
            ViewId::Tree => "tree",
            ViewId::Blob => "blob",
            ViewId::Help => "help",
            ViewId::Pager => "pager",
        }
    }

    pub fn keymap(self) -> Keymap {
        match self {
            ViewId::Main => Keymap::Main,
            ViewId::Diff => Keymap::Diff,
            ViewId::Log => Keymap::Log,
            ViewId::Tree => Keymap::Tree,
            ViewId::Blob => Keymap::Blob,
            ViewId::Help => Keymap::Help,
            ViewId::Pager => Keymap::Pager,
        }
    }

    /// Content noun shown in the title bar.
    pub fn content_type(self) -> &'static str {
        match self {
            ViewId::Main => "commit",
            ViewId::Tree => "file",
            _ => "line",
        }
    }

    pub fn adapter(self) -> Adapter {
        match self {
            ViewId::Main => Adapter::Main,
            ViewId::Tree => Adapter::Tree,
            ViewId::Blob => Adapter::Blob,
            _ => Adapter::Pager,
        }
    }

    pub fn id_source(self) -> IdSource {
        match self {
            ViewId::Main | ViewId::Log => IdSource::Head,
            ViewId::Diff | ViewId::Tree => IdSource::Commit,
            ViewId::Blob => IdSource::Blob,
            ViewId::Help | ViewId::Pager => IdSource::Static,
        }
    }

    /// Default command template; `%s` slots are filled at load time.
    pub fn default_cmd(self) -> &'static str {
        match self {
            ViewId::Main => "git log --topo-order --pretty=raw %s 2>/dev/null",
            ViewId::Diff => {
                "git show --root --patch-with-stat --find-copies-harder -B -C %s 2>/dev/null"
            }
            ViewId::Log => "git log --cc --stat -n100 %s 2>/dev/null",
            ViewId::Tree => "git ls-tree %s %s",
            ViewId::Blob => "git cat-file blob %s",
            ViewId::Help | ViewId::Pager => "",
        }
    }

    /// Environment variable overriding the command template.
    pub fn env_var(self) -> &'static str {
        match self {
            ViewId::Main => "GITSCOPE_MAIN_CMD",
            ViewId::Diff => "GITSCOPE_DIFF_CMD",
            ViewId::Log => "GITSCOPE_LOG_CMD",
            ViewId::Tree => "GITSCOPE_TREE_CMD",
            ViewId::Blob => "GITSCOPE_BLOB_CMD",
            ViewId::Help => "GITSCOPE_HELP_CMD",
            ViewId::Pager => "GITSCOPE_PAGER_CMD",
        }
    }
}

/// Compiled search state of one view.
pub struct ViewSearch {
    pub pattern: String,
    pub regex: Regex,
}

pub struct View {
    pub id: ViewId,
    /// Command template: environment override or the built-in default.
    pub cmd_template: String,
    /// Ref shown in the title; tracks the cursor in the parent views.
    pub ref_name: String,
    /// Id the current buffer was loaded for; differing from the bound id
    /// means the view is stale and reloads on open.
    pub vid: String,

    /// Content region on screen, zero-sized until first displayed.
    pub window: Region,

    pub offset: usize,
    pub lineno: usize,
    pub buffer: Vec<LineEntry>,
    /// Digits of the line count, sizing the number gutter.
    pub digits: usize,

    pub search: Option<ViewSearch>,

    /// View that opened this one; restored by VIEW_CLOSE.
    pub parent: Option<ViewId>,
    pub closed: bool,

    pub loader: Option<Loader>,
    pub start_time: Option<Instant>,
}

/// What a navigation request changed, for the caller's repaint decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavResult {
    pub moved: bool,
    /// The viewport shifted: repaint the region. Otherwise repainting the
    /// old and new cursor rows suffices.
    pub scrolled: bool,
    pub prev_lineno: usize,
    pub message: Option<&'static str>,
}

impl NavResult {
    fn blocked(message: &'static str) -> NavResult {
        NavResult {
            moved: false,
            scrolled: false,
            prev_lineno: 0,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOp {
    Up,
    Down,
    PageUp,
    PageDown,
    FirstLine,
    LastLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOp {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
}

/// Result of one `update` tick.
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    /// Buffer index of the first appended/changed line, when any arrived.
    pub changed_from: Option<usize>,
    /// The number gutter widened; everything needs repainting.
    pub digits_changed: bool,
    /// EOF or error: the load ended this tick.
    pub finished: bool,
    /// Status-line text for a failed load.
    pub error: Option<String>,
}

impl View {
    pub fn new(id: ViewId) -> View {
        let cmd_template = std::env::var(id.env_var())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| id.default_cmd().to_owned());

        View {
            id,
            cmd_template,
            ref_name: String::new(),
            vid: String::new(),
            window: Region {
                top: 0,
                rows: 0,
                cols: 0,
            },
            offset: 0,
            lineno: 0,
            buffer: Vec::new(),
            digits: 0,
            search: None,
            parent: None,
            closed: false,
            loader: None,
            start_time: None,
        }
    }

    pub fn lines(&self) -> usize {
        self.buffer.len()
    }

    pub fn height(&self) -> usize {
        self.window.rows as usize
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    /// Needs a reload before being shown for its current binding.
    pub fn is_stale(&self, ctx: &Context) -> bool {
        self.vid != ctx.id_for(self.id.id_source())
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Start (or restart) streaming this view's command.
    pub fn begin_update(&mut self, ctx: &mut Context) -> Result<(), LoadError> {
        if self.loader.is_some() {
            self.end_update(ctx);
        }

        let id = ctx.id_for(self.id.id_source()).to_owned();

        let loader = if let Some(cmd) = ctx.opt_cmd.take() {
            // A prompt command can show anything; the old ref binding no
            // longer describes the content.
            self.ref_name.clear();
            Loader::spawn(&cmd)?
        } else if self.id == ViewId::Pager && ctx.stdin_pending {
            ctx.stdin_pending = false;
            Loader::from_stdin()
        } else if self.id == ViewId::Tree {
            // A new commit id restarts the browse at the tree root.
            if self.vid != id {
                ctx.opt_path.clear();
            }
            Loader::spawn(&substitute_template(
                &self.cmd_template,
                &[id.as_str(), ctx.opt_path.as_str()],
            ))?
        } else {
            Loader::spawn(&substitute_template(&self.cmd_template, &[id.as_str()]))?
        };

        ctx.loading_views += 1;
        self.offset = 0;
        self.lineno = 0;
        self.buffer.clear();
        self.digits = 0;
        self.vid = id;
        self.start_time = Some(Instant::now());
        self.loader = Some(loader);
        info!(target: "view", view = self.id.name(), vid = %self.vid, "load_begin");
        Ok(())
    }

    /// Drain up to one window-height of pending lines into the buffer.
    pub fn update(&mut self, ctx: &mut Context) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        let Some(mut loader) = self.loader.take() else {
            return outcome;
        };

        let before = self.lines();
        let budget = self.height().max(1);
        let mut finished = false;

        for _ in 0..budget {
            match loader.try_next() {
                Some(LoadEvent::Line(raw)) => {
                    let line = decode_line(&raw);
                    if let Err(err) = self.id.adapter().read(self, ctx, line) {
                        outcome.error = Some(format!("{err}"));
                        finished = true;
                        break;
                    }
                }
                Some(LoadEvent::Eof) => {
                    finished = true;
                    break;
                }
                Some(LoadEvent::Failed(err)) => {
                    outcome.error = Some(format!("Failed to read: {err}"));
                    finished = true;
                    break;
                }
                None => break,
            }
        }

        if self.lines() != before {
            outcome.changed_from = Some(before);
        }

        let digits = decimal_digits(self.lines());
        if digits != self.digits {
            self.digits = digits;
            outcome.digits_changed = true;
        }

        if finished {
            loader.close();
            ctx.loading_views = ctx.loading_views.saturating_sub(1);
            outcome.finished = true;
            debug!(
                target: "view",
                view = self.id.name(),
                lines = self.lines(),
                error = outcome.error.as_deref(),
                "load_end"
            );
        } else {
            self.loader = Some(loader);
        }
        outcome
    }

    /// Stop streaming; buffered content stays browsable.
    pub fn end_update(&mut self, ctx: &mut Context) {
        if let Some(mut loader) = self.loader.take() {
            loader.close();
            ctx.loading_views = ctx.loading_views.saturating_sub(1);
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Move the cursor, scrolling the viewport along when it runs off.
    pub fn move_cursor(&mut self, op: MoveOp) -> NavResult {
        let height = self.height() as isize;
        let lines = self.lines() as isize;
        let lineno = self.lineno as isize;

        let steps: isize = match op {
            MoveOp::FirstLine => -lineno,
            MoveOp::LastLine => lines - lineno - 1,
            MoveOp::PageUp => {
                if height > lineno {
                    -lineno
                } else {
                    -height
                }
            }
            MoveOp::PageDown => {
                if lineno + height >= lines {
                    lines - lineno - 1
                } else {
                    height
                }
            }
            MoveOp::Up => -1,
            MoveOp::Down => 1,
        };

        if steps <= 0 && self.lineno == 0 {
            return NavResult::blocked("Cannot move beyond the first line");
        }
        if steps >= 0 && self.lineno + 1 >= self.lines() {
            return NavResult::blocked("Cannot move beyond the last line");
        }

        let prev_lineno = self.lineno;
        self.lineno = (lineno + steps) as usize;

        if self.lineno < self.offset || self.lineno >= self.offset + self.height() {
            let mut delta = steps;
            if steps < 0 && (-steps) as usize > self.offset {
                delta = -(self.offset as isize);
            } else if steps > 0
                && self.lineno == self.lines() - 1
                && self.lines() > self.height()
            {
                delta = (self.lines() - self.offset - 1) as isize;
                if delta >= height {
                    delta -= height - 1;
                }
            }
            self.do_scroll(delta);
            return NavResult {
                moved: true,
                scrolled: true,
                prev_lineno,
                message: None,
            };
        }

        NavResult {
            moved: true,
            scrolled: false,
            prev_lineno,
            message: None,
        }
    }

    /// Shift the viewport without caring where the cursor was.
    pub fn scroll(&mut self, op: ScrollOp) -> NavResult {
        let prev_lineno = self.lineno;
        match op {
            ScrollOp::LineDown | ScrollOp::PageDown => {
                let mut step = if op == ScrollOp::PageDown {
                    self.height()
                } else {
                    1
                };
                if self.offset + step > self.lines() {
                    step = self.lines() - self.offset;
                }
                if step == 0 || self.offset + self.height() >= self.lines() {
                    return NavResult::blocked("Cannot scroll beyond the last line");
                }
                self.do_scroll(step as isize);
            }
            ScrollOp::LineUp | ScrollOp::PageUp => {
                let mut step = if op == ScrollOp::PageUp {
                    self.height()
                } else {
                    1
                };
                if step > self.offset {
                    step = self.offset;
                }
                if step == 0 {
                    return NavResult::blocked("Cannot scroll beyond the first line");
                }
                self.do_scroll(-(step as isize));
            }
        }
        NavResult {
            moved: true,
            scrolled: true,
            prev_lineno,
            message: None,
        }
    }

    /// Adjust the offset and pull the cursor back inside the viewport.
    pub fn do_scroll(&mut self, delta: isize) {
        let offset = self.offset as isize + delta;
        debug_assert!(offset >= 0 && (offset as usize) < self.lines().max(1));
        self.offset = offset.max(0) as usize;

        if self.lineno < self.offset {
            self.lineno = self.offset;
        } else if self.height() > 0 && self.lineno >= self.offset + self.height() {
            self.lineno = self.offset + self.height() - 1;
        }

        debug_assert!(self.lines() == 0 || self.lineno < self.lines());
    }

    // ------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------

    /// Title bar text: binding, position and load progress.
    pub fn title_text(&self) -> String {
        let mut title = if self.ref_name.is_empty() {
            format!("[{}]", self.id.name())
        } else {
            format!("[{}] {}", self.id.name(), self.ref_name)
        };

        if self.lines() > 0 || self.is_loading() {
            let lines = self.lines();
            let shown = (self.offset + self.height()).min(lines);
            let percent = if lines > 0 { shown * 100 / lines } else { 0 };
            title.push_str(&format!(
                " - {} {} of {} ({}%)",
                self.id.content_type(),
                self.lineno + 1,
                lines,
                percent
            ));
        }

        if self.is_loading() {
            if let Some(started) = self.start_time {
                let secs = started.elapsed().as_secs();
                // Three git seconds are a long time ...
                if secs > 2 {
                    title.push_str(&format!(" {secs}s"));
                }
            }
        }

        title
    }
}
