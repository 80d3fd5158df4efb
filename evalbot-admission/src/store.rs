//! Persistent list store for admin and ban lists

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Line-per-entry persistence for the admin and ban lists.
///
/// Failures are surfaced so the controller can log them; the controller
/// always keeps the last known in-memory state authoritative.
pub trait ListStore: Send + Sync {
    fn load_admins(&self) -> io::Result<Vec<String>>;
    fn load_banned(&self) -> io::Result<Vec<String>>;
    fn save_admins(&self, admins: &[String]) -> io::Result<()>;
    fn save_banned(&self, banned: &[String]) -> io::Result<()>;
}

/// File-backed store, one entry per line. A missing file is an empty list.
pub struct FileListStore {
    admin_path: PathBuf,
    ban_path: PathBuf,
}

impl FileListStore {
    pub fn new(admin_path: impl Into<PathBuf>, ban_path: impl Into<PathBuf>) -> Self {
        Self {
            admin_path: admin_path.into(),
            ban_path: ban_path.into(),
        }
    }

    fn load(path: &PathBuf) -> io::Result<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn save(path: &PathBuf, entries: &[String]) -> io::Result<()> {
        let mut contents = entries.join("\n");
        contents.push('\n');
        std::fs::write(path, contents)
    }
}

impl ListStore for FileListStore {
    fn load_admins(&self) -> io::Result<Vec<String>> {
        Self::load(&self.admin_path)
    }

    fn load_banned(&self) -> io::Result<Vec<String>> {
        Self::load(&self.ban_path)
    }

    fn save_admins(&self, admins: &[String]) -> io::Result<()> {
        Self::save(&self.admin_path, admins)
    }

    fn save_banned(&self, banned: &[String]) -> io::Result<()> {
        Self::save(&self.ban_path, banned)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryListStore {
    lists: Mutex<(Vec<String>, Vec<String>)>,
}

impl ListStore for MemoryListStore {
    fn load_admins(&self) -> io::Result<Vec<String>> {
        Ok(self.lists.lock().unwrap().0.clone())
    }

    fn load_banned(&self) -> io::Result<Vec<String>> {
        Ok(self.lists.lock().unwrap().1.clone())
    }

    fn save_admins(&self, admins: &[String]) -> io::Result<()> {
        self.lists.lock().unwrap().0 = admins.to_vec();
        Ok(())
    }

    fn save_banned(&self, banned: &[String]) -> io::Result<()> {
        self.lists.lock().unwrap().1 = banned.to_vec();
        Ok(())
    }
}
