//! Command-line surface.
//!
//! Hand-rolled on purpose: the option grammar is tiny but its corners are
//! load-bearing. A short option takes its value only when attached (`-n5`
//! works, `-n 5` makes `5` the first forwarded argument), everything after
//! the first non-option is quoted and handed to the upstream git command,
//! and the `log`/`diff`/`show` keywords are forwarded *including*
//! themselves. Those rules don't map onto a declarative parser.

use core_config::{Settings, TAB_SIZE_CAP, leading_int};
use core_view::ViewId;

pub const USAGE: &str = concat!(
    "gitscope ",
    env!("CARGO_PKG_VERSION"),
    "\n\
\n\
Usage: gitscope [options]\n\
   or: gitscope [options] [--] [git log options]\n\
   or: gitscope [options] log  [git log options]\n\
   or: gitscope [options] diff [git diff options]\n\
   or: gitscope [options] show [git show options]\n\
   or: gitscope [options] <    [git command output]\n\
\n\
Options:\n\
  -l                          Start up in log view\n\
  -d                          Start up in diff view\n\
  -n[I], --line-number[=I]    Show line numbers with given interval\n\
  -b[N], --tab-size[=N]       Set number of spaces for tab expansion\n\
  --                          Mark end of gitscope options\n\
  -v, --version               Show version and exit\n\
  -h, --help                  Show help message and exit\n"
);

/// What startup should do once options are applied.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    /// `--version` / `--help`: output already printed, exit 0.
    Exit,
    Run(Startup),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Startup {
    pub initial: ViewId,
    /// Command override built from forwarded arguments.
    pub opt_cmd: Option<String>,
    /// Stdin is a pipe; start as a pager consuming it.
    pub stdin_pager: bool,
}

/// Match `-X<value>` or `--name[=value]`. The value is whatever trails the
/// option text; callers only honor it when it looks like what they expect,
/// which is how `-n` alone still toggles line numbers.
fn check_option<'a>(opt: &'a str, short: char, long: &str) -> Option<&'a str> {
    if let Some(rest) = opt.strip_prefix("--") {
        let tail = rest.strip_prefix(long)?;
        return Some(tail.strip_prefix('=').unwrap_or(""));
    }
    let rest = opt.strip_prefix('-')?;
    let tail = rest.strip_prefix(short)?;
    Some(tail)
}

fn starts_with_digit(value: &str) -> bool {
    value.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Quote one argv element for the shell: enclosed in `'…'`, with embedded
/// `'` and `!` escaped so the shell hands the token back verbatim.
pub fn sq_quote(buf: &mut String, src: &str) {
    buf.push('\'');
    for c in src.chars() {
        if c == '\'' || c == '!' {
            buf.push('\'');
            buf.push('\\');
            buf.push(c);
            buf.push('\'');
        } else {
            buf.push(c);
        }
    }
    buf.push('\'');
}

/// Parse `args` (without the program name), mutating `settings` in place.
/// `Err` carries the offending option for the usage message.
pub fn parse_options(
    args: &[String],
    settings: &mut Settings,
    stdin_is_tty: bool,
) -> Result<Parsed, String> {
    let mut initial = ViewId::Main;
    let mut forward_start = None;
    let mut i = 0;

    while i < args.len() {
        let opt = args[i].as_str();

        if opt == "-l" {
            initial = ViewId::Log;
            i += 1;
            continue;
        }
        if opt == "-d" {
            initial = ViewId::Diff;
            i += 1;
            continue;
        }

        if let Some(value) = check_option(opt, 'n', "line-number") {
            settings.line_number = true;
            if starts_with_digit(value) {
                settings.num_interval = leading_int(value) as u32;
            }
            i += 1;
            continue;
        }

        if let Some(value) = check_option(opt, 'b', "tab-size") {
            if starts_with_digit(value) {
                settings.tab_size = leading_int(value).max(0) as usize;
            }
            settings.tab_size = settings.tab_size.min(TAB_SIZE_CAP);
            i += 1;
            continue;
        }

        if check_option(opt, 'v', "version").is_some() {
            println!("gitscope version {}", env!("CARGO_PKG_VERSION"));
            return Ok(Parsed::Exit);
        }
        if check_option(opt, 'h', "help").is_some() {
            print!("{USAGE}");
            return Ok(Parsed::Exit);
        }

        if opt == "--" {
            forward_start = Some(i + 1);
            break;
        }

        if opt == "log" || opt == "diff" || opt == "show" {
            initial = if opt == "log" {
                ViewId::Log
            } else {
                ViewId::Diff
            };
            // The keyword itself is part of the forwarded command.
            forward_start = Some(i);
            break;
        }

        if !opt.is_empty() && !opt.starts_with('-') {
            forward_start = Some(i);
            break;
        }

        return Err(format!("unknown option '{opt}'"));
    }

    let forwarded = forward_start.map(|from| &args[from..]).unwrap_or(&[]);

    if !stdin_is_tty {
        return Ok(Parsed::Run(Startup {
            initial: ViewId::Pager,
            opt_cmd: None,
            stdin_pager: true,
        }));
    }

    let opt_cmd = if forwarded.is_empty() {
        None
    } else {
        let mut cmd = if initial == ViewId::Main {
            // XXX: This is vulnerable to the user overriding options
            // required for the main view parser.
            "git log --stat --pretty=raw".to_owned()
        } else {
            "git".to_owned()
        };
        for arg in forwarded {
            cmd.push(' ');
            sq_quote(&mut cmd, arg);
        }
        Some(cmd)
    };

    Ok(Parsed::Run(Startup {
        initial,
        opt_cmd,
        stdin_pager: false,
    }))
}
