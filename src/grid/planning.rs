use thiserror::Error;

use crate::{models::FocusBlock, repository::Repository};

use super::projector::Slot;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("block label must not be empty")]
    EmptyLabel,
    #[error("slot has already ended")]
    SlotInPast,
    #[error("no slot at day {day_index}, hour {hour}")]
    UnknownSlot { day_index: usize, hour: u32 },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Edit form for one hour slot: either planning a new block or relabelling the block
/// that already starts exactly at `start_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockForm {
    pub start_time: i64,
    pub label: String,
    pub existing_id: Option<String>,
}

impl BlockForm {
    /// Open the form for the slot `[start_time, end_time)`. Fails for slots that have
    /// already ended.
    pub fn open(
        start_time: i64,
        end_time: i64,
        now_ms: i64,
        blocks: &[FocusBlock],
        last_label: &str,
    ) -> Result<Self, PlanError> {
        if end_time <= now_ms {
            return Err(PlanError::SlotInPast);
        }

        // Exact start match only; a block merely overlapping the slot is not edited.
        let existing = blocks.iter().find(|block| block.start_time == start_time);
        Ok(Self {
            start_time,
            label: existing
                .map(|block| block.label.clone())
                .unwrap_or_else(|| last_label.to_string()),
            existing_id: existing.map(|block| block.id.clone()),
        })
    }

    pub fn for_slot(
        slot: &Slot,
        now_ms: i64,
        blocks: &[FocusBlock],
        last_label: &str,
    ) -> Result<Self, PlanError> {
        Self::open(slot.start_time, slot.end_time, now_ms, blocks, last_label)
    }

    pub fn is_existing(&self) -> bool {
        self.existing_id.is_some()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn trimmed_label(&self) -> Result<&str, PlanError> {
        let label = self.label.trim();
        if label.is_empty() {
            Err(PlanError::EmptyLabel)
        } else {
            Ok(label)
        }
    }

    /// Upsert keyed by `(existing_id, start_time)`. Whitespace-only labels are
    /// rejected before anything is written.
    pub async fn save(&self, repository: &Repository) -> Result<FocusBlock, PlanError> {
        let label = self.trimmed_label()?;
        let block = repository
            .upsert_block(self.existing_id.as_deref(), self.start_time, label)
            .await?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    const T: i64 = 1_700_000_000_000;
    const HOUR: i64 = 3_600_000;

    fn repository() -> Repository {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn past_slot_cannot_be_opened() {
        let result = BlockForm::open(T, T + HOUR, T + HOUR, &[], "Deep Work");
        assert!(matches!(result, Err(PlanError::SlotInPast)));
    }

    #[test]
    fn current_slot_opens_with_last_label() {
        let form = BlockForm::open(T, T + HOUR, T + 10, &[], "Reading").expect("open");
        assert_eq!(form.label, "Reading");
        assert!(!form.is_existing());
    }

    #[test]
    fn prefills_from_block_with_exact_start() {
        let blocks = vec![
            FocusBlock::planned("shifted".into(), T + 60_000, "Shifted".into()),
            FocusBlock::planned("exact".into(), T, "Exact".into()),
        ];
        let form = BlockForm::open(T, T + HOUR, T - HOUR, &blocks, "Deep Work").expect("open");
        assert_eq!(form.label, "Exact");
        assert_eq!(form.existing_id.as_deref(), Some("exact"));
    }

    #[test]
    fn overlapping_block_is_not_prefilled() {
        let blocks = vec![FocusBlock::planned("b".into(), T + 60_000, "Shifted".into())];
        let form = BlockForm::open(T, T + HOUR, T - HOUR, &blocks, "Deep Work").expect("open");
        assert_eq!(form.label, "Deep Work");
        assert!(form.existing_id.is_none());
    }

    #[tokio::test]
    async fn whitespace_label_is_rejected_without_writing() {
        let repository = repository();
        let mut form = BlockForm::open(T, T + HOUR, T - HOUR, &[], "Deep Work").expect("open");
        form.set_label("   ");

        assert!(matches!(form.save(&repository).await, Err(PlanError::EmptyLabel)));
        assert!(repository.blocks().is_empty());
    }

    #[tokio::test]
    async fn save_trims_and_creates_then_updates() {
        let repository = repository();
        let mut form = BlockForm::open(T, T + HOUR, T - HOUR, &[], "Deep Work").expect("open");
        form.set_label("  Study  ");
        let created = form.save(&repository).await.expect("create");
        assert_eq!(created.label, "Study");
        assert_eq!(created.end_time, T + HOUR);

        let mut edit =
            BlockForm::open(T, T + HOUR, T - HOUR, &repository.blocks(), "Deep Work").expect("open");
        assert!(edit.is_existing());
        edit.set_label("Review");
        let updated = edit.save(&repository).await.expect("update");

        assert_eq!(updated.id, created.id);
        assert_eq!(repository.blocks(), vec![updated]);
    }
}
