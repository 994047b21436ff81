//! Startup probes: ref enumeration and the repository config.
//!
//! Both run to completion before the terminal is taken over, so failures
//! can still go to stderr. The property streams are `<name><sep><value>`
//! lines; anything that does not split cleanly is skipped, matching how
//! forgiving the upstream commands' output has to be treated.

use std::process::Command;

use anyhow::{Context as _, Result};
use core_config::Settings;
use core_model::RefIndex;
use tracing::{debug, info};

const DEFAULT_LS_REMOTE: &str = "git ls-remote . 2>/dev/null";

fn run_capture(cmd: &str) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .with_context(|| format!("failed to run \"{cmd}\""))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Load the ref index from the enumeration command (overridable through
/// `GITSCOPE_LS_REMOTE`). Lines are `<id>\t<refname>`.
pub fn load_refs(refs: &mut RefIndex) -> Result<()> {
    let cmd = std::env::var("GITSCOPE_LS_REMOTE")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_LS_REMOTE.to_owned());

    for line in run_capture(&cmd)?.lines() {
        let Some((id, name)) = line.split_once('\t') else {
            continue;
        };
        refs.add(id.trim(), name.trim());
    }

    info!(target: "runtime", count = refs.len(), "refs_loaded");
    Ok(())
}

/// Pick the commit encoding out of the repository configuration.
pub fn load_repo_config(settings: &mut Settings) -> Result<()> {
    for line in run_capture("git config --list 2>/dev/null")?.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name == "i18n.commitencoding" && !value.is_empty() {
            debug!(target: "runtime", encoding = value, "commit_encoding");
            settings.commit_encoding = value.to_owned();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ls_remote_override_feeds_the_index() {
        // The override is any command printing `<id>\t<refname>` lines.
        // No other test in this binary touches the variable.
        unsafe {
            std::env::set_var(
                "GITSCOPE_LS_REMOTE",
                "printf 'aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\\trefs/heads/main\\n\
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\\trefs/tags/v1^{}\\n\
junk line without tab\\n'",
            );
        }
        let mut refs = RefIndex::new();
        load_refs(&mut refs).expect("load refs");
        unsafe {
            std::env::remove_var("GITSCOPE_LS_REMOTE");
        }
        assert_eq!(refs.len(), 2);
    }
}
