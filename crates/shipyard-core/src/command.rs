//! Concrete command lines for each operation kind.
//!
//! Everything here is pure: it turns project fields and configuration into
//! a program + argv. Spawning happens in the server's task runner.

use crate::config::DeployGroup;
use crate::error::{Result, ShipyardError};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run `script` through the platform shell. Used for operator-supplied
    /// scripts that rely on shell syntax (`&&`, pipes, env expansion).
    pub fn shell(script: impl Into<String>) -> Self {
        #[cfg(windows)]
        {
            Self::new("cmd", ["/C".to_string(), script.into()])
        }
        #[cfg(not(windows))]
        {
            Self::new("sh", ["-c".to_string(), script.into()])
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source control
// ---------------------------------------------------------------------------

/// `git clone -- <url> .`, run inside the fresh working directory.
pub fn clone(git_url: &str) -> CommandLine {
    CommandLine::new("git", ["clone", "--", git_url, "."])
}

pub fn update() -> CommandLine {
    CommandLine::shell("git fetch && git pull")
}

pub fn fetch() -> CommandLine {
    CommandLine::new("git", ["fetch"])
}

pub fn checkout(branch: &str) -> Result<CommandLine> {
    validate_branch(branch)?;
    Ok(CommandLine::new("git", ["checkout", branch]))
}

fn branch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._/][A-Za-z0-9._/-]*$").expect("branch regex is valid")
    })
}

/// A branch name must not be readable as a git option and must not escape
/// the ref namespace.
pub fn validate_branch(branch: &str) -> Result<()> {
    if branch.starts_with('-') || branch.contains("..") || !branch_re().is_match(branch) {
        return Err(ShipyardError::InvalidBranch(branch.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Build / deploy
// ---------------------------------------------------------------------------

pub fn build(script: &str) -> CommandLine {
    CommandLine::shell(script)
}

/// `<tool> -avz <src> <host>:<path>`
pub fn deploy(group: &DeployGroup, src: &Path) -> CommandLine {
    CommandLine::new(
        group.tool.clone(),
        [
            "-avz".to_string(),
            src.display().to_string(),
            group.destination(),
        ],
    )
}
