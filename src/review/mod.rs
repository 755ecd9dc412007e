//! Human review of extracted action items.
//!
//! A `ReviewSession` holds the candidate set produced by one analysis run.
//! Items keep their presentation order for the whole session; selection,
//! edits, and deletes are the only mutations, and approval returns the
//! selected subset without consuming the session.

use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::backlog::{ActionItem, ActionItemPatch, ItemType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("action item {0} not found in this review session")]
    ItemNotFound(Uuid),
    #[error("no action items selected")]
    NothingSelected,
}

/// Per-type counts of the current candidate set, for the review header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TypeTally {
    pub epics: usize,
    pub features: usize,
    pub stories: usize,
    pub tasks: usize,
}

pub struct ReviewSession {
    items: Vec<ActionItem>,
    selected: HashSet<Uuid>,
}

impl ReviewSession {
    /// Open a session over a fresh candidate set. Every item starts
    /// selected.
    pub fn new(items: Vec<ActionItem>) -> Self {
        let selected = items.iter().map(|item| item.id).collect();
        Self { items, selected }
    }

    pub fn items(&self) -> &[ActionItem] {
        &self.items
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Flip one item's selection. Unknown ids are a no-op so a stale click
    /// after a delete cannot fail the session.
    pub fn toggle_select(&mut self, id: Uuid) {
        if !self.items.iter().any(|item| item.id == id) {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Replace an item's editable fields in one step. Identity, selection
    /// state, and position are unchanged.
    pub fn edit(&mut self, id: Uuid, patch: ActionItemPatch) -> Result<(), ReviewError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(ReviewError::ItemNotFound(id))?;

        item.item_type = patch.item_type;
        item.title = patch.title;
        item.description = patch.description;
        item.priority = patch.priority;
        item.assignee = patch.assignee;
        item.due_date = patch.due_date;
        Ok(())
    }

    /// Remove an item from the session entirely.
    pub fn delete(&mut self, id: Uuid) -> Result<(), ReviewError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Err(ReviewError::ItemNotFound(id));
        }
        self.selected.remove(&id);
        Ok(())
    }

    /// The selected items, in presentation order. Fails when nothing is
    /// selected so the caller never materializes an empty batch.
    pub fn approve(&self) -> Result<Vec<ActionItem>, ReviewError> {
        if self.selected.is_empty() {
            return Err(ReviewError::NothingSelected);
        }

        Ok(self
            .items
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .cloned()
            .collect())
    }

    pub fn tally(&self) -> TypeTally {
        let mut tally = TypeTally::default();
        for item in &self.items {
            match item.item_type {
                ItemType::Epic => tally.epics += 1,
                ItemType::Feature => tally.features += 1,
                ItemType::Story => tally.stories += 1,
                ItemType::Task => tally.tasks += 1,
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::Priority;

    fn item(item_type: ItemType, title: &str) -> ActionItem {
        ActionItem {
            id: Uuid::new_v4(),
            item_type,
            title: title.to_string(),
            description: title.to_string(),
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            status: Some("planning".to_string()),
        }
    }

    fn patch(item_type: ItemType, title: &str) -> ActionItemPatch {
        ActionItemPatch {
            item_type,
            title: title.to_string(),
            description: title.to_string(),
            priority: Priority::High,
            assignee: Some("lead@example.com".to_string()),
            due_date: None,
        }
    }

    #[test]
    fn test_all_items_start_selected() {
        let items = vec![item(ItemType::Story, "a"), item(ItemType::Task, "b")];
        let session = ReviewSession::new(items.clone());

        assert_eq!(session.selected_count(), 2);
        assert!(session.is_selected(items[0].id));
        assert!(session.is_selected(items[1].id));
    }

    #[test]
    fn test_toggle_deselects_and_reselects() {
        let items = vec![item(ItemType::Story, "a")];
        let id = items[0].id;
        let mut session = ReviewSession::new(items);

        session.toggle_select(id);
        assert!(!session.is_selected(id));
        session.toggle_select(id);
        assert!(session.is_selected(id));
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let mut session = ReviewSession::new(vec![item(ItemType::Story, "a")]);
        session.toggle_select(Uuid::new_v4());
        assert_eq!(session.selected_count(), 1);
    }

    #[test]
    fn test_edit_replaces_fields_keeps_identity_and_order() {
        let items = vec![item(ItemType::Story, "first"), item(ItemType::Story, "second")];
        let id = items[0].id;
        let mut session = ReviewSession::new(items);

        session.edit(id, patch(ItemType::Epic, "reworked")).unwrap();

        let edited = &session.items()[0];
        assert_eq!(edited.id, id);
        assert_eq!(edited.item_type, ItemType::Epic);
        assert_eq!(edited.title, "reworked");
        assert_eq!(edited.priority, Priority::High);
        assert!(session.is_selected(id));
        assert_eq!(session.items()[1].title, "second");
    }

    #[test]
    fn test_edit_missing_item_fails() {
        let mut session = ReviewSession::new(vec![item(ItemType::Task, "a")]);
        let missing = Uuid::new_v4();
        assert_eq!(
            session.edit(missing, patch(ItemType::Task, "x")),
            Err(ReviewError::ItemNotFound(missing))
        );
    }

    #[test]
    fn test_delete_removes_from_both_sets() {
        let items = vec![item(ItemType::Task, "a"), item(ItemType::Task, "b")];
        let id = items[0].id;
        let mut session = ReviewSession::new(items);

        session.delete(id).unwrap();
        assert_eq!(session.items().len(), 1);
        assert!(!session.is_selected(id));
        assert_eq!(session.selected_count(), 1);
    }

    #[test]
    fn test_approve_returns_selected_in_presentation_order() {
        let items = vec![
            item(ItemType::Epic, "a"),
            item(ItemType::Story, "b"),
            item(ItemType::Task, "c"),
        ];
        let skipped = items[1].id;
        let mut session = ReviewSession::new(items);
        session.toggle_select(skipped);

        let approved = session.approve().unwrap();
        assert_eq!(approved.len(), 2);
        assert_eq!(approved[0].title, "a");
        assert_eq!(approved[1].title, "c");
    }

    #[test]
    fn test_approve_with_nothing_selected_fails() {
        let items = vec![item(ItemType::Task, "a")];
        let id = items[0].id;
        let mut session = ReviewSession::new(items);
        session.toggle_select(id);

        assert_eq!(session.approve(), Err(ReviewError::NothingSelected));
    }

    #[test]
    fn test_approve_does_not_consume_session() {
        let session = ReviewSession::new(vec![item(ItemType::Task, "a")]);
        session.approve().unwrap();
        session.approve().unwrap();
        assert_eq!(session.items().len(), 1);
    }

    #[test]
    fn test_tally_counts_per_type() {
        let session = ReviewSession::new(vec![
            item(ItemType::Epic, "a"),
            item(ItemType::Task, "b"),
            item(ItemType::Task, "c"),
        ]);

        assert_eq!(
            session.tally(),
            TypeTally {
                epics: 1,
                features: 0,
                stories: 0,
                tasks: 2,
            }
        );
    }
}
