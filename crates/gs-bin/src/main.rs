//! gitscope entrypoint.
//!
//! Startup order matters: the config file and repository probes run (and
//! complain on stderr) before the terminal is taken over; everything after
//! `enter_guard` reports through the status line and the log file instead.
//! The guard restores the terminal on every exit path, including panics and
//! the error return that prints the fatal message.

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Once;

use anyhow::{Context as _, Result, anyhow};
use core_config::{ConfigTargets, Settings, load_user_config};
use core_keymap::Bindings;
use core_model::{Palette, RefIndex};
use core_terminal::{CrosstermBackend, TerminalBackend};
use core_view::{Context, ViewId};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod args;
mod bootstrap;
mod help;

use app::App;
use args::{Parsed, USAGE, parse_options};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // The terminal guard has already been dropped on this path.
            eprintln!("gitscope: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let mut settings = Settings::default();
    let mut palette = Palette::built_in();
    let mut bindings = Bindings::new();
    {
        let mut targets = ConfigTargets {
            settings: &mut settings,
            palette: &mut palette,
            bindings: &mut bindings,
        };
        load_user_config(&mut targets).context("Failed to load user config")?;
    }

    // Load the repo config so options can be overwritten from the command
    // line.
    bootstrap::load_repo_config(&mut settings).context("Failed to load repo config")?;

    let cli: Vec<String> = std::env::args().skip(1).collect();
    let startup = match parse_options(&cli, &mut settings, std::io::stdin().is_terminal()) {
        Ok(Parsed::Exit) => return Ok(ExitCode::SUCCESS),
        Ok(Parsed::Run(startup)) => startup,
        Err(err) => {
            eprintln!("gitscope: {err}\n\n{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut refs = RefIndex::new();
    bootstrap::load_refs(&mut refs).context("Failed to load refs")?;

    // Require a git repository unless running in pager mode.
    if refs.is_empty() && startup.initial != ViewId::Pager {
        return Err(anyhow!("Not a git repository"));
    }

    let mut ctx = Context::new(settings, palette, bindings, refs);
    ctx.opt_cmd = startup.opt_cmd;
    ctx.stdin_pending = startup.stdin_pager;

    let mut backend = CrosstermBackend::new();
    let size = backend.size().context("Failed to probe terminal size")?;
    let _terminal_guard = backend.enter_guard().context("Failed to set up terminal")?;

    let mut app = App::new(ctx, startup.initial, size);
    app.run()?;

    Ok(ExitCode::SUCCESS)
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("gitscope.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "gitscope.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => {
            info!(target: "runtime", "startup");
            Some(guard)
        }
        // Global subscriber already installed; drop the guard so the
        // writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}
