use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the save directory.
pub const SAVE_DIR_ENV: &str = "TRIGFORGE_SAVE_DIR";
pub const PRIMARY_FILE: &str = "CCLocalLevels.dat";
pub const BACKUP_FILE: &str = "CCLocalLevels2.dat";

/// The game's two local-levels container files. Reads use the primary file;
/// saves write both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePaths {
    pub dir: PathBuf,
}

impl SavePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the save directory from the environment or the platform's
    /// local data directory.
    pub fn detect() -> Self {
        Self::new(detect_save_dir())
    }

    pub fn primary(&self) -> PathBuf {
        self.dir.join(PRIMARY_FILE)
    }

    pub fn backup(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    pub fn all(&self) -> [PathBuf; 2] {
        [self.primary(), self.backup()]
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn detect_save_dir() -> PathBuf {
    if let Some(dir) = env::var_os(SAVE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    let mut candidates = Vec::new();
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("GeometryDash"));
    }
    if let Some(home) = dirs::home_dir() {
        // Steam on Linux runs the game under Proton
        candidates.push(home.join(
            ".steam/steam/steamapps/compatdata/322170/pfx/drive_c/users/steamuser/AppData/Local/GeometryDash",
        ));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_hang_off_the_directory() {
        let paths = SavePaths::new("/saves");
        assert_eq!(paths.primary(), PathBuf::from("/saves/CCLocalLevels.dat"));
        assert_eq!(paths.backup(), PathBuf::from("/saves/CCLocalLevels2.dat"));
        assert_eq!(paths.all().len(), 2);
    }
}
