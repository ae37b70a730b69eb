//! Dangerous command detection.
//!
//! A dangerous command always requires confirmation, at every autonomy level
//! except Bypassed. Detection is per pipeline segment, with one raw-string
//! check for the fork-bomb fingerprint (its punctuation does not survive
//! segmentation intact).

use crate::tokenizer::Segment;

/// Classic fork-bomb spellings, with and without inner spaces.
const FORK_BOMB_FINGERPRINTS: &[&str] = &[":(){ :|:& };:", ":(){:|:&};:"];

/// System-state programs that are never safe to run unattended.
const SYSTEM_STATE_COMMANDS: &[&str] = &["shutdown", "reboot", "halt", "poweroff", "init"];

/// Disk partitioning and formatting programs.
const DISK_COMMANDS: &[&str] = &["fdisk", "parted", "format"];

/// Check the raw command string for a fork-bomb fingerprint.
pub(crate) fn contains_fork_bomb(raw: &str) -> bool {
    FORK_BOMB_FINGERPRINTS.iter().any(|f| raw.contains(f))
}

/// Check whether a segment is dangerous. `cmd` is the normalised program.
pub(crate) fn is_dangerous_segment(cmd: &str, segment: &Segment) -> bool {
    match cmd {
        "sudo" => true,
        "rm" => rm_has_force_and_recursive(segment),
        "chmod" => segment
            .args()
            .iter()
            .any(|a| a.contains("777") || a.contains("a+rwx")),
        "dd" => segment.args().iter().any(|a| a.starts_with("of=/dev/")),
        _ => {
            DISK_COMMANDS.contains(&cmd)
                || cmd.starts_with("mkfs")
                || SYSTEM_STATE_COMMANDS.contains(&cmd)
        }
    }
}

/// `rm` is dangerous only with both a force and a recursive flag, in any
/// spelling: `-rf`, `-fr`, `-r -f`, `--recursive --force`, `-Rf`.
fn rm_has_force_and_recursive(segment: &Segment) -> bool {
    let mut force = false;
    let mut recursive = false;
    for arg in segment.args() {
        match arg.as_str() {
            "--force" => force = true,
            "--recursive" => recursive = true,
            _ => {
                if let Some(bundle) = arg.strip_prefix('-') {
                    if !bundle.starts_with('-') {
                        for flag in bundle.chars() {
                            match flag {
                                'f' => force = true,
                                'r' | 'R' => recursive = true,
                                _ => {}
                            }
                        }
                    }
                }
            }
        }
    }
    force && recursive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn segment(cmd: &str) -> Segment {
        tokenize(cmd).unwrap().segments.remove(0)
    }

    #[test]
    fn test_rm_flag_spellings() {
        for cmd in [
            "rm -rf dir",
            "rm -fr dir",
            "rm -r -f dir",
            "rm -Rf dir",
            "rm --recursive --force dir",
            "rm --force -r dir",
        ] {
            assert!(is_dangerous_segment("rm", &segment(cmd)), "{cmd}");
        }
        for cmd in ["rm -r dir", "rm -f file", "rm file", "rm --force file"] {
            assert!(!is_dangerous_segment("rm", &segment(cmd)), "{cmd}");
        }
    }

    #[test]
    fn test_chmod_world_writable() {
        assert!(is_dangerous_segment("chmod", &segment("chmod 777 f")));
        assert!(is_dangerous_segment("chmod", &segment("chmod 0777 f")));
        assert!(is_dangerous_segment("chmod", &segment("chmod a+rwx f")));
        assert!(!is_dangerous_segment("chmod", &segment("chmod 644 f")));
        assert!(!is_dangerous_segment("chmod", &segment("chmod u+x f")));
    }

    #[test]
    fn test_dd_device_target() {
        assert!(is_dangerous_segment(
            "dd",
            &segment("dd if=/dev/zero of=/dev/sda")
        ));
        assert!(!is_dangerous_segment(
            "dd",
            &segment("dd if=in.img of=out.img")
        ));
    }

    #[test]
    fn test_disk_and_system_state_commands() {
        for cmd in ["fdisk", "parted", "format", "mkfs", "mkfs.ext4", "shutdown", "reboot"] {
            assert!(is_dangerous_segment(cmd, &segment("x")), "{cmd}");
        }
        assert!(!is_dangerous_segment("mkdir", &segment("x")));
    }

    #[test]
    fn test_fork_bomb_fingerprint() {
        assert!(contains_fork_bomb(":(){ :|:& };:"));
        assert!(contains_fork_bomb("true; :(){:|:&};:"));
        assert!(!contains_fork_bomb("echo hello"));
    }
}
