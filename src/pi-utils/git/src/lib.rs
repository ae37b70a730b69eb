//! Source-control probes for the pi permission gate.
//!
//! Settings scope selection needs to know whether the working directory sits
//! inside a git repository and where its root is. Everything here shells out
//! to `git` with a hard timeout so a wedged repository (network filesystem,
//! broken hooks) cannot stall session start.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Default timeout for git probes in seconds.
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 10;

fn git_timeout() -> Duration {
    std::env::var("PI_GIT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Run a git command in `cwd`, killing it if it exceeds the timeout.
fn run_git(args: &[&str], cwd: &Path) -> Option<std::process::Output> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + git_timeout();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().ok(),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(25)),
            Err(_) => return None,
        }
    }
}

/// Check whether a path is inside a git repository.
pub fn is_git_repo(path: &Path) -> bool {
    matches!(run_git(&["rev-parse", "--git-dir"], path), Some(o) if o.status.success())
}

/// Get the repository root containing `cwd`, if any.
pub fn repo_root(cwd: &Path) -> Option<PathBuf> {
    let output = run_git(&["rev-parse", "--show-toplevel"], cwd)?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Resolve the metadata directory for the repository rooted at `root`.
///
/// `<root>/.git` is usually a directory, but in worktrees and submodules it
/// is a pointer file of the form `gitdir: <path>`. Relative pointer targets
/// are resolved against the repository root. Returns `None` when neither
/// form is present.
pub fn resolve_git_dir(root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(".git");
    let meta = std::fs::metadata(&dot_git).ok()?;
    if meta.is_dir() {
        return Some(dot_git);
    }

    let contents = std::fs::read_to_string(&dot_git).ok()?;
    let target = contents.lines().next()?.strip_prefix("gitdir:")?.trim();
    if target.is_empty() {
        return None;
    }
    let target = PathBuf::from(target);
    if target.is_absolute() {
        Some(target)
    } else {
        Some(root.join(target))
    }
}
