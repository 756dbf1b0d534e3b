use shared::domain::FileId;

/// Checked files, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<FileId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `file_id`, or unchecks it if it was already checked.
    /// Returns whether it is checked afterwards.
    pub fn toggle(&mut self, file_id: FileId) -> bool {
        if let Some(pos) = self.ids.iter().position(|id| *id == file_id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(file_id);
            true
        }
    }

    pub fn contains(&self, file_id: FileId) -> bool {
        self.ids.contains(&file_id)
    }

    /// Drops ids no longer present in `available`, e.g. after a delete.
    pub fn retain_available(&mut self, available: &[FileId]) {
        self.ids.retain(|id| available.contains(id));
    }

    pub fn ids(&self) -> &[FileId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<FileId> for Selection {
    fn from_iter<I: IntoIterator<Item = FileId>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for id in iter {
            if !selection.contains(id) {
                selection.ids.push(id);
            }
        }
        selection
    }
}
