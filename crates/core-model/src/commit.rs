//! Commit records for the main view.
//!
//! The main view consumes `log --pretty=raw` output. A record starts at a
//! `commit <id>` line and is filled in by the `author` line and the first
//! indented message line that follow; nothing mutates a record once the next
//! `commit` line has started a new one.

use chrono::{DateTime, NaiveDateTime};

use crate::refs::RefListId;

/// strftime-style layout of the date column in the main view.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Width of the date column, including its trailing space.
pub const DATE_COLS: usize = "2006-04-29 14:21 ".len();
/// Width of the author column.
pub const AUTHOR_COLS: usize = 20;
/// Capacity of the ancestry graphics array.
pub const REVGRAPH_SIZE: usize = 19;
/// Glyph marking a commit on the ancestry column.
pub const GRAPH_COMMIT: char = '├';

/// Fixed buffer sizes carried over from the wire format: titles and authors
/// are clipped, ids are full SHA-1 hex.
const TEXT_CAP: usize = 74;

#[derive(Debug)]
pub struct Commit {
    /// 40-hex SHA-1 id.
    pub id: String,
    /// First line of the commit message.
    pub title: String,
    /// Author name (or address when the name is empty).
    pub author: String,
    /// Author-local timestamp; `None` until a well-formed ident was seen.
    pub time: Option<NaiveDateTime>,
    /// Refs pointing at this commit, if any.
    pub refs: Option<RefListId>,
    /// Ancestry chain graphics.
    pub graph: [char; REVGRAPH_SIZE],
    pub graph_size: usize,
}

impl Commit {
    pub fn new(id: &str) -> Commit {
        let mut commit = Commit {
            id: id.to_owned(),
            title: String::new(),
            author: String::new(),
            time: None,
            refs: None,
            graph: [' '; REVGRAPH_SIZE],
            graph_size: 0,
        };
        commit.push_graph(GRAPH_COMMIT);
        commit
    }

    fn push_graph(&mut self, glyph: char) {
        if self.graph_size < REVGRAPH_SIZE {
            self.graph[self.graph_size] = glyph;
            self.graph_size += 1;
        }
    }

    /// Record the `author ` line payload (everything after the keyword).
    pub fn read_author(&mut self, ident: &str) {
        let (author, time) = parse_author_ident(ident);
        self.author = clip(author).to_owned();
        self.time = time;
    }

    /// Fill the title from a message line, if it qualifies and the title is
    /// still empty.
    pub fn read_message_line(&mut self, line: &str) {
        if !self.title.is_empty() {
            return;
        }
        if let Some(title) = title_candidate(line) {
            self.title = clip(title).to_owned();
        }
    }

    /// Date column text; empty when no timestamp was parsed.
    pub fn format_time(&self) -> String {
        match self.time {
            Some(time) => time.format(DATE_FORMAT).to_string(),
            None => String::new(),
        }
    }
}

/// A commit message line carries the title iff it is indented by exactly
/// four spaces and the fifth character is not whitespace.
pub fn title_candidate(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("    ")?;
    let first = rest.chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    Some(rest)
}

/// Parse `A U Thor <author@example.com> <epoch> ±HHMM`.
///
/// The name is what precedes `<`, right-trimmed; an empty name falls back to
/// the address, and a line without brackets yields `"Unknown"` with no
/// timestamp. The epoch is adjusted into the author's local time when the
/// zone is exactly five characters of `±HHMM`; any other zone shape leaves
/// the naive epoch untouched.
pub fn parse_author_ident(ident: &str) -> (&str, Option<NaiveDateTime>) {
    let Some(lt) = ident.find('<') else {
        return ("Unknown", None);
    };

    let name = ident[..lt].trim_end();
    let after = &ident[lt + 1..];
    let gt = after.find('>');

    let author = if !name.is_empty() {
        name
    } else {
        let email = match gt {
            Some(pos) => after[..pos].trim_end(),
            None => after.trim_end(),
        };
        if email.is_empty() { "Unknown" } else { email }
    };

    let Some(gt) = gt else {
        return (author, None);
    };

    let tail = &after[gt + 1..];
    let Some(tail) = tail.strip_prefix(' ') else {
        return (author, None);
    };

    let digits: &str = {
        let end = tail
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        &tail[..end]
    };
    let mut epoch: i64 = digits.parse().unwrap_or(0);

    if let Some(space) = tail.find(' ') {
        let zone = &tail[space + 1..];
        if let Some(offset) = parse_zone(zone) {
            epoch += offset;
        }
    }

    let time = DateTime::from_timestamp(epoch, 0).map(|dt| dt.naive_utc());
    (author, time)
}

/// `±HHMM` → signed offset in seconds; anything else is rejected.
fn parse_zone(zone: &str) -> Option<i64> {
    let bytes = zone.as_bytes();
    if bytes.len() != 5 || !(bytes[0] == b'+' || bytes[0] == b'-') {
        return None;
    }
    if !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let hours = i64::from(bytes[1] - b'0') * 10 + i64::from(bytes[2] - b'0');
    let minutes = i64::from(bytes[3] - b'0') * 10 + i64::from(bytes[4] - b'0');
    let offset = hours * 3600 + minutes * 60;

    Some(if bytes[0] == b'-' { -offset } else { offset })
}

/// Clip to the stored capacity on a character boundary.
fn clip(text: &str) -> &str {
    if text.len() <= TEXT_CAP {
        return text;
    }
    let mut end = TEXT_CAP;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
