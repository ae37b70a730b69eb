//! Command classification.
//!
//! `classify` attributes a required autonomy level and a dangerous flag to a
//! whole command line. It is pure and total over strings: tokenizer failures
//! and shell tricks collapse to the highest level instead of erroring.
//!
//! All tables hold pre-lowercased names; lookups go through
//! [`normalized_program`].

use pi_protocol::AutonomyLevel;
use serde::Serialize;

use crate::danger::{contains_fork_bomb, is_dangerous_segment};
use crate::tokenizer::{normalized_program, tokenize, ChainOp, Segment};
use crate::tricks::has_shell_tricks;

/// Classifier verdict for a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Minimum autonomy level at which the command auto-allows.
    pub required_level: AutonomyLevel,
    /// Dangerous commands prompt at every level except Bypassed.
    pub dangerous: bool,
}

impl Classification {
    fn new(required_level: AutonomyLevel, dangerous: bool) -> Self {
        Self {
            required_level,
            dangerous,
        }
    }
}

/// Programs that hand their arguments back to the shell.
const SHELL_EXECUTION_COMMANDS: &[&str] = &["eval", "exec", "source", "."];

/// Interpreters that make `anything | interpreter` remote-code execution.
const PIPE_TO_SHELL_INTERPRETERS: &[&str] = &[
    "bash", "sh", "zsh", "node", "python", "python3", "ruby", "perl",
];

/// Read-only programs: viewers, listing, search, info, process, env, docs,
/// pipeline utilities and shell tests.
const READ_ONLY_PROGRAMS: &[&str] = &[
    // file viewers
    "cat", "less", "more", "head", "tail", "bat", "tac",
    // listing and navigation
    "ls", "tree", "pwd", "dir", "cd", "pushd", "popd", "dirs",
    // search
    "grep", "egrep", "fgrep", "rg", "ag", "ack", "fd", "locate", "which", "whereis",
    // info
    "echo", "printf", "whoami", "id", "date", "cal", "uname", "hostname", "uptime", "type",
    "file", "stat", "wc", "du", "df", "free",
    // processes
    "ps", "top", "htop", "pgrep",
    // environment
    "env", "printenv", "set",
    // docs
    "man", "help", "info",
    // pipeline utilities
    "sort", "uniq", "cut", "awk", "sed", "tr", "column", "paste", "join", "comm", "diff",
    "cmp", "patch",
    // shell tests
    "test", "[", "[[", "true", "false",
];

/// Git subcommands that only read repository state.
const GIT_READ_SUBCOMMANDS: &[&str] = &[
    "status",
    "log",
    "diff",
    "show",
    "ls-files",
    "ls-tree",
    "cat-file",
    "rev-parse",
    "describe",
    "shortlog",
    "blame",
    "annotate",
    "whatchanged",
    "reflog",
    "fetch",
];

/// Git subcommands that are read-only in bare list mode but mutate with a
/// positional argument.
const GIT_LIST_SUBCOMMANDS: &[&str] = &["branch", "tag", "remote"];

/// Git subcommands with local, reversible effects.
const GIT_MEDIUM_SUBCOMMANDS: &[&str] = &[
    "add",
    "commit",
    "pull",
    "checkout",
    "switch",
    "branch",
    "merge",
    "rebase",
    "cherry-pick",
    "stash",
    "revert",
    "tag",
    "rm",
    "mv",
    "reset",
    "clone",
];

/// Read-only package manager subcommands, per tool.
const PKG_READ_SUBCOMMANDS: &[(&str, &[&str])] = &[
    (
        "npm",
        &[
            "list", "ls", "ll", "info", "view", "show", "outdated", "audit", "search", "ping",
            "docs", "explain", "why",
        ],
    ),
    ("yarn", &["list", "info", "outdated", "audit", "why", "licenses"]),
    ("pnpm", &["list", "ls", "outdated", "audit", "why", "licenses"]),
    ("bun", &["outdated"]),
    ("pip", &["list", "show", "freeze", "check", "search", "inspect"]),
    ("pip3", &["list", "show", "freeze", "check", "search", "inspect"]),
    (
        "cargo",
        &["tree", "metadata", "search", "pkgid", "locate-project", "verify-project"],
    ),
    ("go", &["version", "env", "list"]),
    ("gem", &["list", "info", "search", "outdated", "contents"]),
    ("bundle", &["list", "show", "outdated", "check", "info"]),
    ("composer", &["show", "info", "outdated", "search", "licenses", "status"]),
    ("poetry", &["show", "search", "check"]),
    ("conda", &["list", "info", "search"]),
    ("brew", &["list", "info", "search", "outdated", "deps"]),
];

/// Install/build/test subcommands of common toolchains, per tool.
const TOOLCHAIN_MEDIUM_SUBCOMMANDS: &[(&str, &[&str])] = &[
    (
        "npm",
        &[
            "install", "i", "ci", "update", "upgrade", "uninstall", "remove", "rebuild",
            "dedupe", "prune", "link", "init", "test", "t",
        ],
    ),
    (
        "yarn",
        &["install", "add", "remove", "upgrade", "up", "init", "link", "rebuild", "test"],
    ),
    (
        "pnpm",
        &["install", "i", "add", "remove", "update", "up", "link", "rebuild", "init", "test"],
    ),
    ("bun", &["install", "i", "add", "remove", "update", "link", "init", "test"]),
    ("pip", &["install", "uninstall", "download", "wheel"]),
    ("pip3", &["install", "uninstall", "download", "wheel"]),
    ("poetry", &["install", "add", "remove", "update", "lock", "build", "sync"]),
    ("conda", &["install", "remove", "update", "create", "env"]),
    ("uv", &["add", "remove", "sync", "lock", "venv", "pip", "build"]),
    (
        "cargo",
        &[
            "build", "b", "check", "c", "test", "t", "run", "r", "clippy", "fmt", "doc", "add",
            "remove", "update", "fetch", "bench", "clean", "new", "init",
        ],
    ),
    ("go", &["build", "test", "vet", "fmt", "get", "mod", "run", "generate", "clean"]),
    ("gem", &["install", "uninstall", "update", "build", "cleanup"]),
    ("bundle", &["install", "update", "add", "remove", "clean"]),
    (
        "composer",
        &["install", "update", "require", "remove", "dump-autoload", "dumpautoload"],
    ),
    ("mvn", &["compile", "test", "package", "install", "verify", "clean", "validate"]),
    ("gradle", &["build", "test", "assemble", "clean", "check", "classes"]),
    ("dotnet", &["build", "test", "restore", "run", "publish", "clean", "pack"]),
    ("flutter", &["build", "test", "analyze", "clean", "pub"]),
    ("dart", &["analyze", "test", "compile", "format", "fix", "pub"]),
    ("swift", &["build", "test", "run", "package"]),
    ("mix", &["deps.get", "compile", "test", "format", "clean"]),
    ("cabal", &["build", "test", "update", "configure", "clean"]),
    ("stack", &["build", "test", "setup", "clean"]),
];

/// Linters and formatters: local effects only, whatever the arguments.
const LINTER_PROGRAMS: &[&str] = &[
    "eslint", "prettier", "black", "flake8", "mypy", "pyright", "tsc", "rubocop",
];

/// Test runners.
const TEST_RUNNER_PROGRAMS: &[&str] = &["jest", "mocha", "vitest", "pytest", "rspec", "phpunit"];

/// Local file operations.
const LOCAL_FILE_OPS: &[&str] = &["mkdir", "touch", "cp", "mv", "ln"];

/// Database migration tooling.
const DB_MIGRATION_PROGRAMS: &[&str] = &["prisma", "sequelize", "typeorm"];

/// Package managers whose `run <script>` goes through the script rule.
const SCRIPT_RUNNERS: &[&str] = &["npm", "yarn", "pnpm", "bun"];

/// Scripts safe to run at Medium, by exact name.
const SAFE_SCRIPTS: &[&str] = &[
    "build",
    "compile",
    "test",
    "lint",
    "format",
    "fmt",
    "check",
    "typecheck",
    "type-check",
    "types",
    "validate",
    "verify",
    "prepare",
    "prepublish",
    "prepublishOnly",
    "prepack",
    "postpack",
    "clean",
];

/// Prefixes marking a script safe.
const SAFE_SCRIPT_PREFIXES: &[&str] = &["build", "test", "lint", "format", "check", "type"];

/// Scripts that start long-running or serving processes, by exact name.
const UNSAFE_SCRIPTS: &[&str] = &[
    "start", "dev", "develop", "serve", "server", "watch", "preview",
];

/// Prefixes marking a script unsafe.
const UNSAFE_SCRIPT_PREFIXES: &[&str] = &["start", "dev", "serve", "watch"];

/// Remote-infrastructure tools: always High, whatever the subcommand.
const REMOTE_INFRA_PROGRAMS: &[&str] = &["kubectl", "helm", "terraform", "pulumi", "ansible"];

/// Remote-copy and remote-shell programs.
const REMOTE_SHELL_PROGRAMS: &[&str] = &["ssh", "scp", "rsync"];

/// `find` arguments that turn it into a writer or executor.
const FIND_MUTATING_ARGS: &[&str] = &["-exec", "-execdir", "-ok", "-okdir", "-delete"];

/// `xargs` options that consume a value.
const XARGS_VALUE_OPTIONS: &[char] = &['I', 'd', 'E', 'L', 'n', 'P', 's', 'a'];

/// Classify a raw command line.
pub fn classify(command: &str) -> Classification {
    let raw = command.trim();
    if has_shell_tricks(raw) {
        return Classification::new(AutonomyLevel::High, false);
    }
    let Ok(line) = tokenize(raw) else {
        // Unparseable input is treated like a shell trick.
        return Classification::new(AutonomyLevel::High, false);
    };
    if contains_fork_bomb(raw) {
        return Classification::new(AutonomyLevel::High, true);
    }

    // A redirection to a real file raises the floor to Low.
    let mut level = if line.writes_files {
        AutonomyLevel::Low
    } else {
        AutonomyLevel::Minimal
    };
    let mut dangerous = false;

    for segment in &line.segments {
        let c = classify_segment(segment);
        level = level.max(c.required_level);
        dangerous |= c.dangerous;
    }

    // Piping into a shell interpreter is remote-code execution territory
    // (`curl ... | sh`). Applies to `|` only.
    for (i, op) in line.operators.iter().enumerate() {
        if *op == ChainOp::Pipe {
            let next = normalized_program(line.segments[i + 1].program());
            if PIPE_TO_SHELL_INTERPRETERS.contains(&next.as_str()) {
                level = AutonomyLevel::High;
            }
        }
    }

    Classification::new(level, dangerous)
}

/// Classify a single pipeline segment.
fn classify_segment(segment: &Segment) -> Classification {
    let cmd = normalized_program(segment.program());

    if SHELL_EXECUTION_COMMANDS.contains(&cmd.as_str()) {
        return Classification::new(AutonomyLevel::High, false);
    }
    if is_dangerous_segment(&cmd, segment) {
        return Classification::new(AutonomyLevel::High, true);
    }
    if is_minimal_segment(&cmd, segment) {
        return Classification::new(AutonomyLevel::Minimal, false);
    }
    if is_medium_segment(&cmd, segment) {
        return Classification::new(AutonomyLevel::Medium, false);
    }
    if is_high_segment(&cmd, segment) {
        return Classification::new(AutonomyLevel::High, false);
    }
    // Unknown commands are conservative by design.
    Classification::new(AutonomyLevel::High, false)
}

/// First argument that does not look like a flag.
fn first_positional(segment: &Segment) -> Option<&str> {
    segment
        .args()
        .iter()
        .map(String::as_str)
        .find(|a| !a.starts_with('-'))
}

fn is_minimal_segment(cmd: &str, segment: &Segment) -> bool {
    // Version checks are harmless whatever the program.
    if segment
        .words
        .iter()
        .any(|w| w == "--version" || w == "-v" || w == "-V")
    {
        return true;
    }

    match cmd {
        "git" => {
            let Some(sub) = first_positional(segment) else {
                return true; // bare `git` prints usage
            };
            if GIT_READ_SUBCOMMANDS.contains(&sub) {
                return true;
            }
            if GIT_LIST_SUBCOMMANDS.contains(&sub) {
                // `git branch` lists; `git branch feature-x` mutates.
                let after_sub = segment
                    .args()
                    .iter()
                    .skip_while(|a| a.as_str() != sub)
                    .skip(1);
                return after_sub
                    .filter(|a| !a.starts_with('-'))
                    .count()
                    == 0;
            }
            false
        }
        "find" => !segment
            .args()
            .iter()
            .any(|a| FIND_MUTATING_ARGS.contains(&a.as_str())),
        "xargs" => xargs_target_is_read_only(segment),
        "tee" => segment
            .args()
            .iter()
            .filter(|a| !a.starts_with('-'))
            .all(|a| a == "/dev/null"),
        _ => {
            if READ_ONLY_PROGRAMS.contains(&cmd) {
                return true;
            }
            if let Some(sub) = first_positional(segment) {
                if let Some((_, subs)) = PKG_READ_SUBCOMMANDS.iter().find(|(tool, _)| *tool == cmd)
                {
                    return subs.contains(&sub);
                }
            }
            false
        }
    }
}

/// `xargs` is read-only only when the command it will run is itself
/// read-only (or absent, which defaults to `echo`).
fn xargs_target_is_read_only(segment: &Segment) -> bool {
    let mut args = segment.args().iter().map(String::as_str);
    while let Some(arg) = args.next() {
        if let Some(opts) = arg.strip_prefix('-') {
            if opts.starts_with('-') {
                continue; // long options are flags here
            }
            let mut chars = opts.chars();
            if let Some(first) = chars.next() {
                if XARGS_VALUE_OPTIONS.contains(&first) && chars.next().is_none() {
                    // Detached value: `-I {}` consumes the next token.
                    let _ = args.next();
                }
                // Attached values (`-n1`) are already part of this token.
            }
            continue;
        }
        let target = normalized_program(arg);
        return READ_ONLY_PROGRAMS.contains(&target.as_str());
    }
    true // bare `xargs` defaults to echo
}

fn is_medium_segment(cmd: &str, segment: &Segment) -> bool {
    if LINTER_PROGRAMS.contains(&cmd)
        || TEST_RUNNER_PROGRAMS.contains(&cmd)
        || LOCAL_FILE_OPS.contains(&cmd)
        || DB_MIGRATION_PROGRAMS.contains(&cmd)
    {
        return true;
    }

    if cmd == "git" {
        let Some(sub) = first_positional(segment) else {
            return false;
        };
        if !GIT_MEDIUM_SUBCOMMANDS.contains(&sub) {
            return false;
        }
        // `git reset --hard` throws work away; that one is High.
        if sub == "reset" && segment.args().iter().any(|a| a == "--hard") {
            return false;
        }
        return true;
    }

    let Some(sub) = first_positional(segment) else {
        return false;
    };

    if SCRIPT_RUNNERS.contains(&cmd) && sub == "run" {
        return run_script_is_safe(segment);
    }

    TOOLCHAIN_MEDIUM_SUBCOMMANDS
        .iter()
        .any(|(tool, subs)| *tool == cmd && subs.contains(&sub))
}

/// `npm run <script>` and friends: safe scripts are Medium, serving or
/// unknown scripts are High.
fn run_script_is_safe(segment: &Segment) -> bool {
    let mut positionals = segment
        .args()
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with('-'));
    let _run = positionals.next();
    let Some(script) = positionals.next() else {
        return true; // bare `npm run` just lists scripts
    };

    if UNSAFE_SCRIPTS.contains(&script) {
        return false;
    }
    if SAFE_SCRIPTS.contains(&script) {
        return true;
    }
    if UNSAFE_SCRIPT_PREFIXES.iter().any(|p| script.starts_with(p)) {
        return false;
    }
    if SAFE_SCRIPT_PREFIXES.iter().any(|p| script.starts_with(p)) {
        return true;
    }
    false // unknown script: conservative
}

/// Explicitly High segments. Classification falls through to High for
/// unknown programs anyway; this enumerates the known cases.
fn is_high_segment(cmd: &str, segment: &Segment) -> bool {
    match cmd {
        "git" => matches!(first_positional(segment), Some("push"))
            || (matches!(first_positional(segment), Some("reset"))
                && segment.args().iter().any(|a| a == "--hard")),
        "curl" | "wget" => true,
        "bash" | "sh" | "zsh" => segment
            .args()
            .iter()
            .any(|a| a.contains("http://") || a.contains("https://")),
        "docker" => matches!(first_positional(segment), Some("push" | "login" | "logout")),
        _ => {
            REMOTE_INFRA_PROGRAMS.contains(&cmd) || REMOTE_SHELL_PROGRAMS.contains(&cmd)
        }
    }
}
