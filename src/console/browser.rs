//! File-browser dialog state for picking the run's input source on the backend host.

use crate::model::FileEntry;
use std::path::Path;

/// What the controller must do after the user picks an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// A directory was chosen: list it and keep the dialog open.
    Relist(String),
    /// A file was chosen: it becomes the input source and the dialog closes.
    Picked(String),
    Nothing,
}

#[derive(Debug, Clone, Default)]
pub struct FileBrowser {
    pub open: bool,
    pub path: String,
    pub entries: Vec<FileEntry>,
    pub selected: usize,
    pub loading: bool,
}

impl FileBrowser {
    /// Open the dialog at `path`; the caller issues the listing request.
    pub fn open_at(&mut self, path: &str) -> String {
        self.open = true;
        self.navigate(path)
    }

    pub fn close(&mut self) {
        self.open = false;
        self.loading = false;
    }

    fn navigate(&mut self, path: &str) -> String {
        self.path = path.to_string();
        self.entries.clear();
        self.selected = 0;
        self.loading = true;
        self.path.clone()
    }

    /// Install a listing. Listings for a path other than the current one are stale.
    pub fn on_listing(&mut self, path: &str, mut entries: Vec<FileEntry>) {
        if !self.open || path != self.path {
            tracing::debug!(path, current = %self.path, "dropping stale directory listing");
            return;
        }
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        let mut all = Vec::with_capacity(entries.len() + 1);
        all.push(FileEntry {
            name: "..".into(),
            path: parent_of(&self.path),
            is_dir: true,
            extension: None,
        });
        all.extend(entries);
        self.entries = all;
        self.selected = 0;
        self.loading = false;
    }

    pub fn move_selection(&mut self, down: bool) {
        if self.entries.is_empty() {
            return;
        }
        if down {
            self.selected = (self.selected + 1).min(self.entries.len() - 1);
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    pub fn select_current(&mut self) -> BrowserOutcome {
        match self.entries.get(self.selected).cloned() {
            Some(entry) => self.select(&entry),
            None => BrowserOutcome::Nothing,
        }
    }

    pub fn select(&mut self, entry: &FileEntry) -> BrowserOutcome {
        if entry.is_dir {
            BrowserOutcome::Relist(self.navigate(&entry.path))
        } else {
            self.close();
            BrowserOutcome::Picked(entry.path.clone())
        }
    }
}

fn parent_of(path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        if let Some(parent) = p.parent() {
            return parent.to_string_lossy().into_owned();
        }
        return path.to_string();
    }
    p.join("..").to_string_lossy().into_owned()
}
