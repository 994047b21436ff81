//! Incremental subprocess loading.
//!
//! Each loading view owns one [`Loader`]: the child process plus a detached
//! reader thread that forwards complete lines over an unbounded channel.
//! The thread does nothing but move bytes: every buffer mutation happens
//! on the event-loop thread when it drains the channel, so the engine stays
//! cooperatively single-threaded while reads never block the UI.
//!
//! Commands run through `sh -c`, which is what lets the default templates
//! carry `2>/dev/null` and lets prompt input be a full shell pipeline.
//! Closing a loader kills and reaps the child; a child that already exited
//! is just reaped. The reader thread ends on pipe EOF, on read error, or
//! when the channel's receiver is gone.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to run \"{cmd}\": {source}")]
    Spawn {
        cmd: String,
        source: std::io::Error,
    },
    #[error("malformed input line")]
    MalformedLine,
}

/// One parcel from the reader thread. Lines arrive without their trailing
/// newline and still in the source encoding.
#[derive(Debug)]
pub enum LoadEvent {
    Line(Vec<u8>),
    Eof,
    Failed(String),
}

pub struct Loader {
    rx: Receiver<LoadEvent>,
    child: Option<Child>,
}

impl Loader {
    /// Spawn `cmd` under `sh -c` and stream its stdout.
    pub fn spawn(cmd: &str) -> Result<Loader, LoadError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LoadError::Spawn {
                cmd: cmd.to_owned(),
                source,
            })?;

        debug!(target: "loader", cmd, pid = child.id(), "spawned");

        // The child keeps its handle here; only stdout moves to the thread.
        let stdout = child.stdout.take().expect("stdout was piped");
        let (tx, rx) = unbounded();
        thread::spawn(move || read_lines(stdout, &tx));

        Ok(Loader {
            rx,
            child: Some(child),
        })
    }

    /// Adopt the process's stdin as the line source (pager mode).
    pub fn from_stdin() -> Loader {
        let (tx, rx) = unbounded();
        thread::spawn(move || read_lines(std::io::stdin().lock(), &tx));
        Loader { rx, child: None }
    }

    /// Next pending event, if any. Never blocks.
    pub fn try_next(&mut self) -> Option<LoadEvent> {
        self.rx.try_recv().ok()
    }

    /// Kill (if still running) and reap the child. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            match child.wait() {
                Ok(status) => debug!(target: "loader", %status, "reaped"),
                Err(err) => warn!(target: "loader", %err, "reap failed"),
            }
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_lines(source: impl Read, tx: &Sender<LoadEvent>) {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                let _ = tx.send(LoadEvent::Eof);
                return;
            }
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if tx.send(LoadEvent::Line(line.clone())).is_err() {
                    // Receiver gone: the view reloaded or stopped loading.
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(LoadEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}

/// Fill a command template: each `%s` consumes the next argument; exhausted
/// arguments substitute as empty.
pub fn substitute_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut next = 0usize;

    while let Some(pos) = rest.find("%s") {
        out.push_str(&rest[..pos]);
        out.push_str(args.get(next).copied().unwrap_or(""));
        next += 1;
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Decode one raw line into text for the adapters. The declared commit
/// encoding is honored as far as a lossy conversion can: when the source
/// already is the terminal's UTF-8 the bytes pass through untouched, and
/// anything unrepresentable renders as the replacement character instead of
/// corrupting the stream.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain(loader: &mut Loader) -> (Vec<String>, bool) {
        let mut lines = Vec::new();
        let mut eof = false;
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            match loader.try_next() {
                Some(LoadEvent::Line(raw)) => lines.push(decode_line(&raw)),
                Some(LoadEvent::Eof) => {
                    eof = true;
                    break;
                }
                Some(LoadEvent::Failed(err)) => panic!("load failed: {err}"),
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        (lines, eof)
    }

    #[test]
    fn streams_lines_then_eof() {
        let mut loader = Loader::spawn("printf 'one\\ntwo\\n'").expect("spawn");
        let (lines, eof) = drain(&mut loader);
        assert_eq!(lines, ["one", "two"]);
        assert!(eof);
        loader.close();
    }

    #[test]
    fn last_line_without_newline_survives() {
        let mut loader = Loader::spawn("printf 'tail'").expect("spawn");
        let (lines, eof) = drain(&mut loader);
        assert_eq!(lines, ["tail"]);
        assert!(eof);
    }

    #[test]
    fn close_kills_a_running_child() {
        let mut loader = Loader::spawn("sleep 30").expect("spawn");
        let start = std::time::Instant::now();
        loader.close();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn failing_command_just_ends_the_stream() {
        // sh itself starts fine; the command fails and the pipe just ends.
        let mut loader = Loader::spawn("exit 7").expect("spawn");
        let (lines, eof) = drain(&mut loader);
        assert!(lines.is_empty());
        assert!(eof);
    }

    #[test]
    fn template_substitution() {
        assert_eq!(
            substitute_template("git show %s", &["abc"]),
            "git show abc"
        );
        assert_eq!(
            substitute_template("git ls-tree %s %s", &["abc", "src/"]),
            "git ls-tree abc src/"
        );
        assert_eq!(substitute_template("git log %s %s", &["x"]), "git log x ");
        assert_eq!(substitute_template("plain", &["x"]), "plain");
    }

    #[test]
    fn decode_is_lossy_but_total() {
        assert_eq!(decode_line(b"hello"), "hello");
        assert_eq!(decode_line(&[0xff, b'x']), "\u{fffd}x");
    }
}
