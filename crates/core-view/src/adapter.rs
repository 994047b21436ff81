//! Content adapters: per view-kind `read`, `draw`, `enter` and `grep`.
//!
//! An adapter is the only code that understands a view's wire format. The
//! pager adapter handles any classified text stream (diff, log, help and
//! pager proper); the tree adapter keeps `ls-tree` output sorted while it
//! streams in; the blob adapter is the pager with classification switched
//! off; the main adapter runs a small state machine over `--pretty=raw`
//! records.
//!
//! `enter` never opens a view itself: it mutates the shared context where
//! needed (tree path, blob ref) and reports what the dispatcher should
//! open. That keeps all display mutation in one place and the adapters
//! callable from tests without a terminal.

use std::cmp::Ordering;
use std::io::{self, Write};
use std::process::Command;

use core_model::commit::{AUTHOR_COLS, DATE_COLS};
use core_model::{Commit, LineEntry, LineKind, classify};
use core_render::{Gutter, Painter, expand_tabs_clip};
use core_text::{TAB_SIZE, width_fit};
use regex::Regex;
use tracing::trace;

use crate::context::Context;
use crate::loader::LoadError;
use crate::view::{View, ViewId};

/// Byte length of the fixed `<mode> <type> <sha>\t` prefix of a tree line.
const TREE_ATTR_SIZE: usize = "100644 blob ".len() + 40 + 1;
/// Byte offset of the object id inside a tree line or a `"commit "` line.
const TREE_ID_OFFSET: usize = "100644 blob ".len();
const COMMIT_ID_OFFSET: usize = "commit ".len();

/// How to open a view in response to `enter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    pub split: bool,
    /// Reload even when the view is current and its id unchanged.
    pub reload: bool,
}

/// What `enter` asks the dispatcher to do.
#[derive(Debug, Default)]
pub struct EnterOutcome {
    pub open: Option<(ViewId, OpenFlags)>,
    /// Scroll the entered view one line down afterwards, so Enter walks
    /// the log.
    pub scroll_after: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Pager,
    Main,
    Tree,
    Blob,
}

impl Adapter {
    /// Consume one decoded line into the view buffer.
    pub fn read(self, view: &mut View, ctx: &mut Context, line: String) -> Result<(), LoadError> {
        match self {
            Adapter::Pager => pager_read(view, ctx, line),
            Adapter::Main => main_read(view, ctx, line),
            Adapter::Tree => tree_read(view, ctx, line),
            Adapter::Blob => blob_read(view, line),
        }
    }

    /// Render the buffer line at window row `row`. Returns false past the
    /// end of the buffer (or for a half-parsed record), stopping a repaint
    /// sweep.
    pub fn draw<W: Write>(
        self,
        view: &mut View,
        ctx: &mut Context,
        painter: &mut Painter<W>,
        row: usize,
    ) -> io::Result<bool> {
        match self {
            Adapter::Main => main_draw(view, ctx, painter, row),
            _ => pager_draw(view, ctx, painter, row),
        }
    }

    /// React to Enter on the current line.
    pub fn enter(self, view: &mut View, ctx: &mut Context, is_primary: bool) -> EnterOutcome {
        match self {
            Adapter::Pager | Adapter::Blob => pager_enter(view),
            Adapter::Main => EnterOutcome {
                open: Some((
                    ViewId::Diff,
                    OpenFlags {
                        split: is_primary,
                        reload: false,
                    },
                )),
                scroll_after: false,
            },
            Adapter::Tree => tree_enter(view, ctx),
        }
    }

    /// Match the search pattern against one entry.
    pub fn grep(self, entry: &LineEntry, regex: &Regex) -> bool {
        match self {
            Adapter::Main => {
                let Some(commit) = entry.as_commit() else {
                    return false;
                };
                if regex.is_match(&commit.title) || regex.is_match(&commit.author) {
                    return true;
                }
                let date = commit.format_time();
                !date.is_empty() && regex.is_match(&date)
            }
            _ => match entry.as_text() {
                Some(text) if !text.is_empty() => regex.is_match(text),
                _ => false,
            },
        }
    }
}

// ----------------------------------------------------------------------
// Pager backend
// ----------------------------------------------------------------------

fn pager_read(view: &mut View, ctx: &mut Context, line: String) -> Result<(), LoadError> {
    let kind = classify(&line);
    let commit_id = (kind == LineKind::Commit
        && (view.id == ViewId::Diff || view.id == ViewId::Log))
        .then(|| line[COMMIT_ID_OFFSET..].to_owned());

    view.buffer.push(LineEntry::text(kind, line));

    if let Some(id) = commit_id {
        attach_refs(view, ctx, &id);
    }
    Ok(())
}

/// Synthesize the `Refs: ` line after a commit header. Tags wrap in
/// brackets; the diff view falls back to `git describe` when the refs give
/// the commit no tag name. Any failure just skips the line.
fn attach_refs(view: &mut View, ctx: &mut Context, id: &str) {
    let mut parts: Vec<String> = Vec::new();
    let mut has_tag = false;

    if let Some(handle) = ctx.refs.lookup(id) {
        for r in ctx.refs.refs_in(handle) {
            if r.is_tag {
                has_tag = true;
                parts.push(format!("[{}]", r.name));
            } else {
                parts.push(r.name.clone());
            }
        }
    }

    if view.id == ViewId::Diff && !has_tag {
        if let Some(described) = describe(id) {
            parts.push(described);
        }
    }

    if parts.is_empty() {
        return;
    }
    view.buffer
        .push(LineEntry::text(LineKind::PpRefs, format!("Refs: {}", parts.join(", "))));
}

/// One-shot `git describe` for a commit with no tag ref.
fn describe(id: &str) -> Option<String> {
    let output = Command::new("git").args(["describe", id]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let line = text.lines().next()?.trim();
    if line.is_empty() {
        trace!(target: "view", id, "describe came back empty");
        return None;
    }
    Some(line.to_owned())
}

fn pager_draw<W: Write>(
    view: &mut View,
    ctx: &mut Context,
    painter: &mut Painter<W>,
    row: usize,
) -> io::Result<bool> {
    let index = view.offset + row;
    let Some(entry) = view.buffer.get(index) else {
        return Ok(false);
    };
    let mut kind = entry.kind;
    let text = entry.as_text().unwrap_or("").to_owned();

    if index == view.lineno {
        // The cursor row publishes what it points at: a commit id for the
        // diff drill-down, a blob id for tree rows.
        match kind {
            LineKind::Commit if text.len() >= COMMIT_ID_OFFSET + 40 => {
                let id = &text[COMMIT_ID_OFFSET..COMMIT_ID_OFFSET + 40];
                view.ref_name = id.to_owned();
                ctx.ref_commit = id.to_owned();
            }
            LineKind::TreeDir | LineKind::TreeFile if text.len() >= TREE_ID_OFFSET + 40 => {
                let id = &text[TREE_ID_OFFSET..TREE_ID_OFFSET + 40];
                view.ref_name = id.to_owned();
                ctx.ref_blob = id.to_owned();
            }
            _ => {}
        }
        kind = LineKind::Cursor;
    }

    let region = view.window;
    painter.move_to(0, region.top + row as u16)?;
    painter.set_style(ctx.palette.style(kind))?;

    let width = region.cols as usize;
    let mut text_cols = width;

    if ctx.settings.line_number {
        let real_lineno = index + 1;
        let interval = ctx.settings.num_interval.max(1) as usize;
        let gutter = Gutter {
            digits: view.digits,
            number: (real_lineno == 1 || real_lineno % interval == 0).then_some(real_lineno),
        };
        painter.print(&gutter.render())?;
        text_cols = width.saturating_sub(gutter.cols());
    }

    let tab_size = if ctx.settings.line_number || ctx.settings.tab_size < TAB_SIZE {
        ctx.settings.tab_size
    } else {
        TAB_SIZE
    };
    let expanded = expand_tabs_clip(&text, tab_size, text_cols);
    let fit = width_fit(&expanded, text_cols);
    painter.print(&expanded[..fit.byte_len])?;
    painter.clear_to_eol()?;
    Ok(true)
}

fn pager_enter(view: &mut View) -> EnterOutcome {
    let split = view
        .buffer
        .get(view.lineno)
        .map(|entry| entry.kind == LineKind::Commit)
        .unwrap_or(false)
        && (view.id == ViewId::Log || view.id == ViewId::Pager);

    EnterOutcome {
        open: split.then_some((
            ViewId::Diff,
            OpenFlags {
                split: true,
                reload: false,
            },
        )),
        // Always scroll, so Enter walks the log while splitting open each
        // commit diff.
        scroll_after: true,
    }
}

// ----------------------------------------------------------------------
// Tree backend
// ----------------------------------------------------------------------

fn tree_name(text: &str) -> &str {
    &text[TREE_ATTR_SIZE..]
}

/// Directories before files, names in byte order within a class.
fn tree_compare(kind1: LineKind, name1: &str, kind2: LineKind, name2: &str) -> Ordering {
    if kind1 != kind2 {
        if kind1 == LineKind::TreeDir {
            return Ordering::Less;
        }
        return Ordering::Greater;
    }
    name1.cmp(name2)
}

fn tree_read(view: &mut View, ctx: &mut Context, text: String) -> Result<(), LoadError> {
    if text.len() <= TREE_ATTR_SIZE {
        return Err(LoadError::MalformedLine);
    }

    let kind = if text.as_bytes()["100644 ".len()] == b't' {
        LineKind::TreeDir
    } else {
        LineKind::TreeFile
    };
    let first_read = view.buffer.is_empty();

    if first_read {
        view.buffer.push(LineEntry::text(
            LineKind::Default,
            format!("Directory path /{}", ctx.opt_path),
        ));
        if !ctx.opt_path.is_empty() {
            // Link back to the parent directory.
            view.buffer.push(LineEntry::text(
                LineKind::TreeDir,
                format!("040000 tree {}\t..", view.ref_name),
            ));
        }
    }

    // Strip the browsed path prefix so only basenames render.
    let text = if ctx.opt_path.is_empty() {
        text
    } else {
        let (attr, name) = text.split_at(TREE_ATTR_SIZE);
        match name.strip_prefix(ctx.opt_path.as_str()) {
            Some(stripped) => format!("{attr}{stripped}"),
            None => text,
        }
    };

    // Skip the "Directory ..." header and the ".." link, then insert at
    // the first entry sorting strictly after the new one.
    let start = 1 + usize::from(!ctx.opt_path.is_empty());
    for pos in start..view.buffer.len() {
        let existing = &view.buffer[pos];
        let existing_name = existing.as_text().map(tree_name).unwrap_or("");
        if tree_compare(existing.kind, existing_name, kind, tree_name(&text))
            == Ordering::Greater
        {
            view.buffer.insert(pos, LineEntry::text(kind, text));
            return Ok(());
        }
    }

    view.buffer.push(LineEntry::text(kind, text));

    // Land the cursor on the first real entry, past the header.
    if first_read {
        view.lineno += 1;
    }
    Ok(())
}

/// Drop the last `<segment>/` of the browsed path.
fn pop_path_segment(path: &mut String) {
    if path.ends_with('/') {
        path.pop();
    }
    match path.rfind('/') {
        Some(pos) => path.truncate(pos + 1),
        None => path.clear(),
    }
}

fn tree_enter(view: &mut View, ctx: &mut Context) -> EnterOutcome {
    let Some(entry) = view.buffer.get(view.lineno) else {
        return EnterOutcome::default();
    };
    let text = entry.as_text().unwrap_or("").to_owned();

    match entry.kind {
        LineKind::TreeDir => {
            if view.lineno == 1 && !ctx.opt_path.is_empty() {
                pop_path_segment(&mut ctx.opt_path);
            } else if text.len() > TREE_ATTR_SIZE {
                ctx.opt_path.push_str(tree_name(&text));
                ctx.opt_path.push('/');
            }
            // Trees and subtrees share the commit id, so the view must
            // reload even though its binding looks unchanged.
            EnterOutcome {
                open: Some((
                    ViewId::Tree,
                    OpenFlags {
                        split: false,
                        reload: true,
                    },
                )),
                scroll_after: false,
            }
        }
        LineKind::TreeFile => {
            if text.len() >= TREE_ID_OFFSET + 40 {
                ctx.ref_blob = text[TREE_ID_OFFSET..TREE_ID_OFFSET + 40].to_owned();
            }
            EnterOutcome {
                open: Some((
                    ViewId::Blob,
                    OpenFlags {
                        split: true,
                        reload: false,
                    },
                )),
                scroll_after: false,
            }
        }
        _ => EnterOutcome::default(),
    }
}

// ----------------------------------------------------------------------
// Blob backend
// ----------------------------------------------------------------------

/// The pager read with classification switched off: blob bytes mean
/// whatever the file says, not what a diff marker would.
fn blob_read(view: &mut View, line: String) -> Result<(), LoadError> {
    view.buffer.push(LineEntry::text(LineKind::Default, line));
    Ok(())
}

// ----------------------------------------------------------------------
// Main backend
// ----------------------------------------------------------------------

fn main_read(view: &mut View, ctx: &mut Context, line: String) -> Result<(), LoadError> {
    match classify(&line) {
        LineKind::Commit => {
            let id = line[COMMIT_ID_OFFSET..].to_owned();
            let mut commit = Commit::new(&id);
            commit.refs = ctx.refs.lookup(&id);
            view.buffer.push(LineEntry::commit(commit));
        }
        LineKind::Author => {
            if let Some(commit) = view.buffer.last_mut().and_then(LineEntry::as_commit_mut) {
                commit.read_author(&line["author ".len()..]);
            }
        }
        _ => {
            if let Some(commit) = view.buffer.last_mut().and_then(LineEntry::as_commit_mut) {
                commit.read_message_line(&line);
            }
        }
    }
    Ok(())
}

/// Print clipped to the remaining width, advancing the column by the cells
/// actually used.
fn put_clipped<W: Write>(
    painter: &mut Painter<W>,
    col: &mut usize,
    width: usize,
    text: &str,
) -> io::Result<()> {
    if *col >= width {
        return Ok(());
    }
    let fit = width_fit(text, width - *col);
    painter.print(&text[..fit.byte_len])?;
    *col += fit.byte_len - fit.col_offset;
    Ok(())
}

fn main_draw<W: Write>(
    view: &mut View,
    ctx: &mut Context,
    painter: &mut Painter<W>,
    row: usize,
) -> io::Result<bool> {
    let index = view.offset + row;
    let Some(commit) = view.buffer.get(index).and_then(LineEntry::as_commit) else {
        return Ok(false);
    };
    // A record without its author line yet is not ready to render; stop the
    // sweep and let the next update tick finish it.
    if commit.author.is_empty() {
        return Ok(false);
    }

    let id = commit.id.clone();
    let author = commit.author.clone();
    let title = commit.title.clone();
    let date = commit.format_time();
    let refs = commit.refs;
    let graph: Vec<char> = commit.graph[..commit.graph_size].to_vec();

    let cursor = index == view.lineno;
    if cursor {
        view.ref_name = id.clone();
        ctx.ref_commit = id;
    }

    let region = view.window;
    let width = region.cols as usize;
    let row_y = region.top + row as u16;
    let palette = &ctx.palette;

    painter.move_to(0, row_y)?;
    painter.set_style(palette.style(if cursor {
        LineKind::Cursor
    } else {
        LineKind::MainDate
    }))?;

    let mut col = 0usize;
    put_clipped(painter, &mut col, width, &date)?;
    put_clipped(painter, &mut col, width, " ")?;

    col = DATE_COLS;
    if col < width {
        painter.move_to(col as u16, row_y)?;
    }
    if !cursor {
        painter.set_style(palette.style(LineKind::MainAuthor))?;
    }

    let fit = width_fit(&author, AUTHOR_COLS - 2);
    if fit.trimmed {
        let mut acol = col;
        put_clipped(painter, &mut acol, width, &author[..fit.byte_len])?;
        if !cursor {
            painter.set_style(palette.style(LineKind::MainDelim))?;
        }
        put_clipped(painter, &mut acol, width, "~")?;
    } else {
        let mut acol = col;
        put_clipped(painter, &mut acol, width, &author)?;
    }

    col += AUTHOR_COLS;
    if !cursor {
        painter.set_style(palette.style(LineKind::MainCommit))?;
    }

    if ctx.settings.rev_graph && !graph.is_empty() && col < width {
        painter.move_to(col as u16, row_y)?;
        let glyphs: String = graph.iter().collect();
        let mut gcol = col;
        put_clipped(painter, &mut gcol, width, &glyphs)?;
        col += graph.len() + 1;
    }

    if col < width {
        painter.move_to(col as u16, row_y)?;
    }

    if let Some(handle) = refs {
        let decorated: Vec<(String, bool)> = ctx
            .refs
            .refs_in(handle)
            .map(|r| (r.name.clone(), r.is_tag))
            .collect();
        for (name, is_tag) in decorated {
            if !cursor {
                painter.set_style(palette.style(if is_tag {
                    LineKind::MainTag
                } else {
                    LineKind::MainRef
                }))?;
            }
            put_clipped(painter, &mut col, width, &format!("[{name}]"))?;
            if !cursor {
                painter.set_style(palette.style(LineKind::MainCommit))?;
            }
            put_clipped(painter, &mut col, width, " ")?;
        }
    }

    if !cursor {
        painter.set_style(palette.style(LineKind::MainCommit))?;
    }
    put_clipped(painter, &mut col, width, &title)?;
    painter.clear_to_eol()?;
    Ok(true)
}
