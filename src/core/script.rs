// src/core/script.rs — Load the scripted agent's playbook with a priority chain

use std::path::{Path, PathBuf};

use crate::infra::paths;

const DEFAULT_SCRIPT: &str = include_str!("../../templates/SCRIPT.md");
const MAX_SCRIPT_CHARS: usize = 20_000;

/// The loaded playbook driving the scripted role.
#[derive(Debug, Clone)]
pub struct Script {
    pub raw: String,
    pub source: ScriptSource,
}

/// Where the script was loaded from.
#[derive(Debug, Clone)]
pub enum ScriptSource {
    /// Built-in template
    Default,
    /// ~/.scrimmage/SCRIPT.md (user-edited)
    UserFile(PathBuf),
    /// Explicit --script path
    Explicit(PathBuf),
}

impl std::fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::UserFile(p) => write!(f, "user:{}", p.display()),
            Self::Explicit(p) => write!(f, "file:{}", p.display()),
        }
    }
}

/// Load the script with priority: explicit path > user file > default.
/// An explicit path that cannot be read is an error; a missing user file
/// silently falls through to the built-in.
pub fn load_script(explicit: Option<&Path>) -> std::io::Result<Script> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        return Ok(Script {
            raw: truncate(&content, MAX_SCRIPT_CHARS),
            source: ScriptSource::Explicit(path.into()),
        });
    }

    let user_script = paths::script_path();
    if user_script.exists() {
        if let Ok(content) = std::fs::read_to_string(&user_script) {
            return Ok(Script {
                raw: truncate(&content, MAX_SCRIPT_CHARS),
                source: ScriptSource::UserFile(user_script),
            });
        }
    }

    Ok(Script {
        raw: DEFAULT_SCRIPT.to_string(),
        source: ScriptSource::Default,
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
