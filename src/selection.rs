use std::collections::HashSet;

use crate::record::{Record, RecordId};

/// Ids the user has checked for a bulk action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: HashSet<RecordId>,
}

impl Selection {
    pub fn toggle(&mut self, id: RecordId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Selection becomes exactly the ids of the given page.
    pub fn select_page(&mut self, page_ids: impl IntoIterator<Item = RecordId>) {
        self.ids = page_ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &HashSet<RecordId> {
        &self.ids
    }

    /// True if the page has rows and every one of them is selected.
    pub fn all_selected(&self, page_ids: &[RecordId]) -> bool {
        !page_ids.is_empty() && page_ids.iter().all(|id| self.ids.contains(id))
    }

    /// Drop ids of records that are gone from the store.
    pub fn retain_existing(&mut self, records: &[Record]) {
        let existing: HashSet<RecordId> = records.iter().map(Record::id).collect();
        self.ids.retain(|id| existing.contains(id));
    }
}
