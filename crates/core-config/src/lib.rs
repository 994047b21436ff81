//! Runtime settings and the user configuration file.
//!
//! The config file (`~/.gitscoperc`) is line-oriented. A line is blank, a
//! `#` comment, or one of three commands:
//!
//! ```text
//! color <line-kind> <fg> <bg> [attr]
//! set <name> = <value>
//! bind <keymap> <key> <request>
//! ```
//!
//! Errors never abort the load: each bad line is reported to stderr with its
//! line number and parsing continues, so one typo does not cost the user
//! their whole color scheme. A summary line follows when anything failed.
//! The file is read before the terminal enters raw mode, which is the only
//! reason stderr is still a usable channel here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use core_keymap::{Bindings, Key, Keymap, Request};
use core_model::{Attr, Color, LineKind, LineStyle, Palette};
use thiserror::Error;
use tracing::{debug, info};

/// Default interval between printed line numbers.
pub const NUMBER_INTERVAL: u32 = 1;
/// Hard cap for the `--tab-size` option.
pub const TAB_SIZE_CAP: usize = 8;

/// Option and state values consumed read-only by the view engine. Mutable
/// during startup (config file, then command line) and by the two runtime
/// toggles.
#[derive(Debug, Clone)]
pub struct Settings {
    pub line_number: bool,
    pub num_interval: u32,
    pub rev_graph: bool,
    pub tab_size: usize,
    pub commit_encoding: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            line_number: false,
            num_interval: NUMBER_INTERVAL,
            rev_graph: true,
            tab_size: TAB_SIZE_CAP,
            commit_encoding: "UTF-8".to_owned(),
        }
    }
}

/// One config line failed to parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Wrong number of arguments given to {0} command")]
    WrongArgumentCount(&'static str),
    #[error("Unknown color name")]
    UnknownColorName,
    #[error("Unknown color")]
    UnknownColor,
    #[error("Unknown attribute")]
    UnknownAttribute,
    #[error("No value assigned")]
    NoValueAssigned,
    #[error("Unknown variable name")]
    UnknownVariable,
    #[error("Unknown key map")]
    UnknownKeymap,
    #[error("Unknown key")]
    UnknownKey,
    #[error("Unknown request name")]
    UnknownRequest,
    #[error("Unknown option command")]
    UnknownCommand,
}

/// Everything the config file may mutate.
pub struct ConfigTargets<'a> {
    pub settings: &'a mut Settings,
    pub palette: &'a mut Palette,
    pub bindings: &'a mut Bindings,
}

/// Location of the user config file, from `$HOME`.
pub fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| Path::new(&home).join(".gitscoperc"))
}

/// Load the user config file into `targets`. A missing file is fine; an
/// unreadable file or unset `$HOME` is not. Per-line errors go to stderr and
/// do not fail the load.
pub fn load_user_config(targets: &mut ConfigTargets<'_>) -> anyhow::Result<()> {
    let path = user_config_path()
        .ok_or_else(|| anyhow::anyhow!("HOME is not set; cannot locate config file"))?;

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        // It's ok that the file doesn't exist.
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).map_err(anyhow::Error::from),
    };

    let errors = load_config_str(&content, targets, &mut |lineno, near, err| {
        eprintln!("Error on line {lineno}, near '{near}': {err}");
    });

    if errors > 0 {
        eprintln!("Errors while loading {}.", path.display());
    }
    info!(target: "config", path = %path.display(), errors, "user_config_loaded");
    Ok(())
}

/// Parse config text, applying every valid command. Returns the number of
/// failed lines; `report` receives each failure.
pub fn load_config_str(
    content: &str,
    targets: &mut ConfigTargets<'_>,
    report: &mut dyn FnMut(usize, &str, &ConfigError),
) -> usize {
    let mut errors = 0;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (command, value) = match line.split_once([' ', '\t']) {
            Some((command, value)) => (command, value.trim()),
            None => (line, ""),
        };

        // Comment markers can open anywhere; a leading one hides the line.
        if command.starts_with('#') {
            continue;
        }
        if let Some(err) = apply_line(command, value, targets) {
            report(idx + 1, command, &err);
            errors += 1;
        }
    }

    errors
}

fn apply_line(command: &str, value: &str, targets: &mut ConfigTargets<'_>) -> Option<ConfigError> {
    // Strip a trailing comment from the argument list.
    let value = match value.find('#') {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    };
    let argv: Vec<&str> = value.split_whitespace().collect();

    let result = match command {
        "color" => color_command(&argv, targets),
        "set" => set_command(&argv, targets),
        "bind" => bind_command(&argv, targets),
        _ => Err(ConfigError::UnknownCommand),
    };
    result.err()
}

/// Wants: object fgcolor bgcolor [attr]
fn color_command(argv: &[&str], targets: &mut ConfigTargets<'_>) -> Result<(), ConfigError> {
    if argv.len() != 3 && argv.len() != 4 {
        return Err(ConfigError::WrongArgumentCount("color"));
    }

    let kind = LineKind::from_name(argv[0]).ok_or(ConfigError::UnknownColorName)?;
    let fg = Color::from_name(argv[1]).ok_or(ConfigError::UnknownColor)?;
    let bg = Color::from_name(argv[2]).ok_or(ConfigError::UnknownColor)?;
    let attr = match argv.get(3) {
        Some(name) => Attr::from_name(name).ok_or(ConfigError::UnknownAttribute)?,
        None => targets.palette.style(kind).attr,
    };

    debug!(target: "config", kind = kind.name(), "color_override");
    targets.palette.set_style(kind, LineStyle { fg, bg, attr });
    Ok(())
}

/// Wants: name = value
fn set_command(argv: &[&str], targets: &mut ConfigTargets<'_>) -> Result<(), ConfigError> {
    if argv.len() != 3 {
        return Err(ConfigError::WrongArgumentCount("set"));
    }
    if argv[1] != "=" {
        return Err(ConfigError::NoValueAssigned);
    }

    let settings = &mut *targets.settings;
    match argv[0] {
        "show-rev-graph" => {
            settings.rev_graph = matches!(argv[2], "1" | "true" | "yes");
        }
        "line-number-interval" => {
            settings.num_interval = leading_int(argv[2]) as u32;
        }
        "tab-size" => {
            settings.tab_size = leading_int(argv[2]).max(0) as usize;
        }
        "commit-encoding" => {
            settings.commit_encoding = unquote(argv[2]).to_owned();
        }
        _ => return Err(ConfigError::UnknownVariable),
    }
    Ok(())
}

/// Wants: keymap key request
fn bind_command(argv: &[&str], targets: &mut ConfigTargets<'_>) -> Result<(), ConfigError> {
    if argv.len() != 3 {
        return Err(ConfigError::WrongArgumentCount("bind"));
    }

    let keymap = Keymap::from_name(argv[0]).ok_or(ConfigError::UnknownKeymap)?;
    let key = Key::from_name(argv[1]).ok_or(ConfigError::UnknownKey)?;
    let request = Request::from_name(argv[2]).ok_or(ConfigError::UnknownRequest)?;

    targets.bindings.add(keymap, key, request);
    Ok(())
}

/// `atoi` semantics: parse a leading optionally-signed integer, 0 on none.
pub fn leading_int(text: &str) -> i64 {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(&(b'+' | b'-'))) {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    text[..end].parse().unwrap_or(0)
}

/// Strip one level of single or double quotes; an unclosed quote keeps the
/// remainder.
fn unquote(value: &str) -> &str {
    let mut chars = value.chars();
    match chars.next() {
        Some(delim @ ('"' | '\'')) => {
            let inner = &value[1..];
            match inner.find(delim) {
                Some(pos) => &inner[..pos],
                None => inner,
            }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::LineKind;

    fn run(content: &str) -> (Settings, Palette, Bindings, Vec<(usize, ConfigError)>) {
        let mut settings = Settings::default();
        let mut palette = Palette::built_in();
        let mut bindings = Bindings::new();
        let mut failures = Vec::new();
        {
            let mut targets = ConfigTargets {
                settings: &mut settings,
                palette: &mut palette,
                bindings: &mut bindings,
            };
            load_config_str(content, &mut targets, &mut |lineno, _, err| {
                failures.push((lineno, err.clone()));
            });
        }
        (settings, palette, bindings, failures)
    }

    #[test]
    fn color_command_recolors_a_kind() {
        let (_, palette, _, failures) = run("color diff-header red black bold\n");
        assert!(failures.is_empty());
        let style = palette.style(LineKind::DiffHeader);
        assert_eq!(style.fg, Color::Red);
        assert_eq!(style.bg, Color::Black);
        assert_eq!(style.attr, Attr::Bold);
    }

    #[test]
    fn color_without_attr_keeps_existing_attr() {
        let (_, palette, _, failures) = run("color CURSOR yellow default\n");
        assert!(failures.is_empty());
        let style = palette.style(LineKind::Cursor);
        assert_eq!(style.fg, Color::Yellow);
        assert_eq!(style.attr, Attr::Bold);
    }

    #[test]
    fn set_commands() {
        let content = "\
set show-rev-graph = no
set line-number-interval = 5
set tab-size = 4
set commit-encoding = \"ISO-8859-1\"
";
        let (settings, _, _, failures) = run(content);
        assert!(failures.is_empty());
        assert!(!settings.rev_graph);
        assert_eq!(settings.num_interval, 5);
        assert_eq!(settings.tab_size, 4);
        assert_eq!(settings.commit_encoding, "ISO-8859-1");
    }

    #[test]
    fn set_accepts_single_quotes_and_bare_values() {
        let (settings, _, _, _) = run("set commit-encoding = 'KOI8-R'\n");
        assert_eq!(settings.commit_encoding, "KOI8-R");
        let (settings, _, _, _) = run("set commit-encoding = EUC-JP\n");
        assert_eq!(settings.commit_encoding, "EUC-JP");
    }

    #[test]
    fn bind_command_registers_binding() {
        let (_, _, bindings, failures) = run("bind generic P view-pager\n");
        assert!(failures.is_empty());
        assert_eq!(
            bindings.get(Keymap::Tree, Key::Char('P')),
            Some(Request::ViewPager)
        );
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let content = "\n# full comment\n   \t\nset tab-size = 2 # trailing\n";
        let (settings, _, _, failures) = run(content);
        assert!(failures.is_empty());
        assert_eq!(settings.tab_size, 2);
    }

    #[test]
    fn errors_carry_line_numbers_and_do_not_stop_the_load(){
        let content = "\
color nonsense red blue
set tab-size = 4
bind generic ZZ quit
";
        let (settings, _, _, failures) = run(content);
        assert_eq!(settings.tab_size, 4);
        assert_eq!(
            failures,
            vec![
                (1, ConfigError::UnknownColorName),
                (3, ConfigError::UnknownKey)
            ]
        );
    }

    #[test]
    fn wrong_argument_counts_are_rejected() {
        let (_, _, _, failures) = run("color diff-header red\nset tab-size 4\nbind generic q\n");
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].1, ConfigError::WrongArgumentCount("color"));
        assert_eq!(failures[1].1, ConfigError::WrongArgumentCount("set"));
        assert_eq!(failures[2].1, ConfigError::WrongArgumentCount("bind"));
    }

    #[test]
    fn set_without_equals_sign_is_rejected() {
        let (_, _, _, failures) = run("set tab-size to 4\n");
        assert_eq!(failures, vec![(1, ConfigError::NoValueAssigned)]);
    }

    #[test]
    fn unknown_command_is_reported() {
        let (_, _, _, failures) = run("frobnicate 1 2 3\n");
        assert_eq!(failures, vec![(1, ConfigError::UnknownCommand)]);
    }

    #[test]
    fn leading_int_is_atoi_shaped() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("42abc"), 42);
        assert_eq!(leading_int("-3"), -3);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int(""), 0);
    }

    // One test owns the HOME override: the loader resolves the config file
    // relative to it, and neither a missing file nor a half-broken one may
    // fail the load.
    #[test]
    fn user_config_loads_from_home_and_tolerates_errors() {
        let home = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("HOME", home.path());
        }

        let mut settings = Settings::default();
        let mut palette = Palette::built_in();
        let mut bindings = Bindings::new();
        let mut targets = ConfigTargets {
            settings: &mut settings,
            palette: &mut palette,
            bindings: &mut bindings,
        };

        // No file yet: fine.
        load_user_config(&mut targets).expect("missing file is not an error");

        std::fs::write(
            home.path().join(".gitscoperc"),
            "set tab-size = 3\ncolor bogus red red\nbind main G move-last-line\n",
        )
        .unwrap();
        load_user_config(&mut targets).expect("bad lines are not fatal");

        assert_eq!(settings.tab_size, 3);
        assert_eq!(
            bindings.get(Keymap::Main, Key::Char('G')),
            Some(Request::MoveLastLine)
        );
    }
}
