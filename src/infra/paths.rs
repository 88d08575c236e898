// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the SCRIMMAGE_HOME environment variable for isolation.
// When SCRIMMAGE_HOME is set, all config and data live under that directory.
// When unset, config uses ~/.scrimmage/ and data uses XDG_DATA_HOME/scrimmage.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<ProjectDirs> = OnceLock::new();

fn project_dirs() -> &'static ProjectDirs {
    PROJECT_DIRS.get_or_init(|| {
        ProjectDirs::from("", "", "scrimmage").expect("Could not determine home directory")
    })
}

/// Returns the SCRIMMAGE_HOME override, if set.
fn scrimmage_home() -> Option<PathBuf> {
    std::env::var_os("SCRIMMAGE_HOME").map(PathBuf::from)
}

/// Configuration directory: $SCRIMMAGE_HOME/ or ~/.scrimmage/
pub fn config_dir() -> PathBuf {
    if let Some(home) = scrimmage_home() {
        return home;
    }
    dirs_home().join(".scrimmage")
}

/// Data directory: $SCRIMMAGE_HOME/data/ or XDG_DATA_HOME/scrimmage
pub fn data_dir() -> PathBuf {
    if let Some(home) = scrimmage_home() {
        return home.join("data");
    }
    project_dirs().data_local_dir().to_path_buf()
}

/// Home directory
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .expect("Could not determine home directory")
        .home_dir()
        .to_path_buf()
}

/// Database path
pub fn db_path() -> PathBuf {
    data_dir().join("scrimmage.db")
}

/// Script file path: the scripted agent's playbook (user-editable)
pub fn script_path() -> PathBuf {
    config_dir().join("SCRIPT.md")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Ensure all required directories exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    let dirs = [config_dir(), data_dir()];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await?;
    }

    Ok(())
}
