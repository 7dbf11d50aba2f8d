use crate::error::{Result, SettingsError};
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

fn no_home() -> SettingsError {
    SettingsError::Store("Could not determine the user data directory".to_string())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "settingskit", "settingskit").ok_or_else(no_home)
}

/// A settings file path in the user's application-data directory.
///
/// `directory` may use `/` or `\` to name subdirectories.
pub fn app_data_path(directory: &str, file_name: &str) -> Result<PathBuf> {
    let base = BaseDirs::new().ok_or_else(no_home)?;
    Ok(join_directory(base.data_dir(), directory).join(file_name))
}

fn join_directory(base: &Path, directory: &str) -> PathBuf {
    directory
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |path, part| path.join(part))
}

/// Where directory-backed registry hives live unless configured otherwise.
pub fn default_registry_root() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("registry"))
}

/// Where `config.json` for the command-line tool lives.
pub fn default_config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}
