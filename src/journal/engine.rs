//! Journal entry engine
//!
//! Validates, creates, posts, and reverses journal entries. The state
//! machine is strict: `Draft → Posted` exactly once, `Posted → Reversed`
//! via a mirror entry, nothing else. Entries are balanced at creation time
//! and never mutated after posting; reversal preserves the original as an
//! audit record.

use tracing::debug;

use crate::journal::NewJournalEntry;
use crate::period::PeriodManager;
use crate::projection::rows_for_entry;
use crate::traits::LedgerStore;
use crate::types::*;
use crate::utils::validation::validate_entry_description;

/// Creates, posts, and reverses journal entries for all owners
pub struct JournalEngine<S: LedgerStore> {
    storage: S,
    periods: PeriodManager<S>,
}

impl<S: LedgerStore + Clone> JournalEngine<S> {
    pub fn new(storage: S) -> Self {
        Self {
            periods: PeriodManager::new(storage.clone()),
            storage,
        }
    }

    /// Create a journal entry in `Draft` status.
    ///
    /// Validates the line set (≥2 one-sided lines, balanced at the minor
    /// unit) and every referenced account (owned, active, not a header),
    /// then assigns the owner's next entry number. Draft entries are not
    /// reflected in the ledger projection.
    pub async fn create_entry(
        &mut self,
        owner: OwnerId,
        new_entry: NewJournalEntry,
    ) -> LedgerResult<JournalEntry> {
        validate_entry_description(&new_entry.description)?;
        validate_line_set(&new_entry.lines)?;
        self.validate_line_accounts(owner, &new_entry.lines).await?;

        let entry_number = self.storage.next_entry_number(owner).await?;
        let now = chrono::Utc::now().naive_utc();
        let entry = JournalEntry {
            id: uuid::Uuid::new_v4(),
            owner_id: owner,
            entry_number,
            entry_date: new_entry.entry_date,
            description: new_entry.description,
            reference: new_entry.reference,
            source_type: new_entry.source_type,
            source_id: new_entry.source_id,
            status: EntryStatus::Draft,
            lines: new_entry.lines,
            created_at: now,
            updated_at: now,
        };
        self.storage.save_entry(&entry).await?;
        debug!(entry = %entry.id, number = entry.entry_number, "created draft journal entry");
        Ok(entry)
    }

    /// Replace a draft entry's content. The entry number is kept; posted and
    /// reversed entries are immutable.
    pub async fn update_draft_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
        new_entry: NewJournalEntry,
    ) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(id, owner).await?;
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be edited",
                entry.entry_number, entry.status
            )));
        }

        validate_entry_description(&new_entry.description)?;
        validate_line_set(&new_entry.lines)?;
        self.validate_line_accounts(owner, &new_entry.lines).await?;

        entry.entry_date = new_entry.entry_date;
        entry.description = new_entry.description;
        entry.reference = new_entry.reference;
        entry.source_type = new_entry.source_type;
        entry.source_id = new_entry.source_id;
        entry.lines = new_entry.lines;
        entry.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_entry(&entry).await?;
        Ok(entry)
    }

    /// Delete a draft entry. Its entry number is never reused. Posted and
    /// reversed entries can never be deleted.
    pub async fn delete_draft_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<()> {
        let entry = self.get_entry_required(id, owner).await?;
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be deleted",
                entry.entry_number, entry.status
            )));
        }
        self.storage.delete_entry(owner, id).await
    }

    /// Post a draft entry: the period gate is consulted, then the status
    /// flip and the ledger projection rows land atomically via the store.
    pub async fn post_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<JournalEntry> {
        self.post_entry_inner(id, owner, true).await
    }

    /// Posting path for the year-end closing entry, which must land in a
    /// period that chronological close has already shut.
    pub(crate) async fn post_entry_bypassing_period_gate(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<JournalEntry> {
        self.post_entry_inner(id, owner, false).await
    }

    async fn post_entry_inner(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
        check_period: bool,
    ) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(id, owner).await?;
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be posted",
                entry.entry_number, entry.status
            )));
        }

        if check_period {
            self.periods.ensure_postable(owner, entry.entry_date).await?;
        }

        let rows = rows_for_entry(&entry);
        self.storage.apply_posting(owner, entry.id, rows).await?;
        entry.status = EntryStatus::Posted;
        debug!(entry = %entry.id, number = entry.entry_number, "posted journal entry");
        Ok(entry)
    }

    /// Reverse a posted entry.
    ///
    /// Creates a new, immediately posted entry dated `reversal_date` with
    /// every line's debit and credit swapped, and flips the original to
    /// `Reversed`. The original is never mutated beyond its status; both
    /// entries remain queryable forever. Only `Posted` entries can be
    /// reversed, so a second reversal of the same entry is rejected.
    pub async fn reverse_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
        reversal_date: chrono::NaiveDate,
    ) -> LedgerResult<JournalEntry> {
        let original = self.get_entry_required(id, owner).await?;
        if original.status != EntryStatus::Posted {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be reversed",
                original.entry_number, original.status
            )));
        }

        self.periods.ensure_postable(owner, reversal_date).await?;

        let lines = original
            .lines
            .iter()
            .map(|line| JournalEntryLine {
                account_id: line.account_id,
                debit_amount: line.credit_amount.clone(),
                credit_amount: line.debit_amount.clone(),
                tax_code: line.tax_code.clone(),
                tax_amount: line.tax_amount.clone(),
                description: line.description.clone(),
            })
            .collect();

        let entry_number = self.storage.next_entry_number(owner).await?;
        let now = chrono::Utc::now().naive_utc();
        let reversal = JournalEntry {
            id: uuid::Uuid::new_v4(),
            owner_id: owner,
            entry_number,
            entry_date: reversal_date,
            description: format!("Reversal of {}", original.description),
            reference: original.reference.clone(),
            source_type: original.source_type,
            source_id: original.source_id.clone(),
            status: EntryStatus::Posted,
            lines,
            created_at: now,
            updated_at: now,
        };

        let rows = rows_for_entry(&reversal);
        self.storage
            .apply_reversal(owner, original.id, &reversal, rows)
            .await?;
        debug!(
            original = %original.id,
            reversal = %reversal.id,
            "reversed journal entry"
        );
        Ok(reversal)
    }

    /// Get an entry by id
    pub async fn get_entry(
        &self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_entry(owner, id).await
    }

    /// Get an entry by id, erroring if missing
    pub async fn get_entry_required(
        &self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<JournalEntry> {
        self.storage
            .get_entry(owner, id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("journal entry {id}")))
    }

    /// All entries for an owner, ordered by entry number
    pub async fn list_entries(&self, owner: OwnerId) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_entries(owner).await
    }

    /// Every line must target an existing, active, non-header account owned
    /// by the caller
    async fn validate_line_accounts(
        &self,
        owner: OwnerId,
        lines: &[JournalEntryLine],
    ) -> LedgerResult<()> {
        for line in lines {
            let account = self
                .storage
                .get_account(owner, line.account_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::NotFound(format!("account {}", line.account_id))
                })?;
            if account.is_header {
                return Err(LedgerError::HeaderPosting(format!(
                    "'{}' ({})",
                    account.name, account.code
                )));
            }
            if !account.is_active {
                return Err(LedgerError::Validation(format!(
                    "account '{}' is inactive",
                    account.code
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::EntryBuilder;
    use crate::period::PeriodManager;
    use crate::registry::AccountRegistry;
    use crate::utils::MemoryStore;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use uuid::Uuid;

    struct Fixture {
        engine: JournalEngine<MemoryStore>,
        store: MemoryStore,
        owner: OwnerId,
        receivable: Account,
        revenue: Account,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut registry = AccountRegistry::new(store.clone());
        let receivable = registry
            .create_account(
                owner,
                "1200",
                "Accounts Receivable",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await
            .unwrap();
        let revenue = registry
            .create_account(
                owner,
                "4000",
                "Sales Revenue",
                AccountType::Revenue,
                NormalBalance::Credit,
                None,
                false,
            )
            .await
            .unwrap();
        Fixture {
            engine: JournalEngine::new(store.clone()),
            store,
            owner,
            receivable,
            revenue,
        }
    }

    fn simple_entry(fix: &Fixture, day: u32, amount: i64) -> NewJournalEntry {
        EntryBuilder::new(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            "Invoice issued",
        )
        .debit(fix.receivable.id, BigDecimal::from(amount))
        .credit(fix.revenue.id, BigDecimal::from(amount))
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers() {
        let mut fix = fixture().await;
        let first = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 100))
            .await
            .unwrap();
        let second = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 2, 200))
            .await
            .unwrap();
        assert_eq!(first.entry_number, 1);
        assert_eq!(second.entry_number, 2);
        assert_eq!(first.status, EntryStatus::Draft);
    }

    #[tokio::test]
    async fn draft_is_not_in_projection_until_posted() {
        let mut fix = fixture().await;
        let entry = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 500))
            .await
            .unwrap();

        let rows = fix
            .store
            .ledger_rows(fix.owner, None, None, None)
            .await
            .unwrap();
        assert!(rows.is_empty());

        fix.engine.post_entry(entry.id, fix.owner).await.unwrap();
        let rows = fix
            .store
            .ledger_rows(fix.owner, None, None, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn header_account_rejected_at_creation() {
        let mut fix = fixture().await;
        let mut registry = AccountRegistry::new(fix.store.clone());
        let header = registry
            .create_account(
                fix.owner,
                "1000",
                "Current Assets",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                true,
            )
            .await
            .unwrap();

        let new_entry = EntryBuilder::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Posting to header",
        )
        .debit(header.id, BigDecimal::from(100))
        .credit(fix.revenue.id, BigDecimal::from(100))
        .build()
        .unwrap();

        let result = fix.engine.create_entry(fix.owner, new_entry).await;
        assert!(matches!(result, Err(LedgerError::HeaderPosting(_))));
    }

    #[tokio::test]
    async fn posting_twice_is_rejected() {
        let mut fix = fixture().await;
        let entry = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 100))
            .await
            .unwrap();
        fix.engine.post_entry(entry.id, fix.owner).await.unwrap();
        let again = fix.engine.post_entry(entry.id, fix.owner).await;
        assert!(matches!(again, Err(LedgerError::InvalidState(_))));
    }

    #[tokio::test]
    async fn posting_into_closed_period_fails() {
        let mut fix = fixture().await;
        let entry = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 15, 100))
            .await
            .unwrap();

        let mut periods = PeriodManager::new(fix.store.clone());
        periods
            .close_period(fix.owner, 2024, 3, None, None)
            .await
            .unwrap();

        let result = fix.engine.post_entry(entry.id, fix.owner).await;
        assert!(matches!(
            result,
            Err(LedgerError::PeriodClosed { year: 2024, month: 3 })
        ));

        // Reopening with a reason unblocks the posting.
        periods
            .reopen_period(fix.owner, 2024, 3, "late invoice")
            .await
            .unwrap();
        assert!(fix.engine.post_entry(entry.id, fix.owner).await.is_ok());
    }

    #[tokio::test]
    async fn reversal_swaps_sides_and_is_terminal() {
        let mut fix = fixture().await;
        let entry = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 750))
            .await
            .unwrap();
        fix.engine.post_entry(entry.id, fix.owner).await.unwrap();

        let reversal = fix
            .engine
            .reverse_entry(
                entry.id,
                fix.owner,
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(reversal.status, EntryStatus::Posted);
        assert!(reversal.description.starts_with("Reversal of"));
        assert_eq!(reversal.lines[0].credit_amount, BigDecimal::from(750));
        assert_eq!(reversal.lines[1].debit_amount, BigDecimal::from(750));

        let original = fix
            .engine
            .get_entry_required(entry.id, fix.owner)
            .await
            .unwrap();
        assert_eq!(original.status, EntryStatus::Reversed);

        // Re-reversing the original is rejected; reversing the mirror works.
        let again = fix
            .engine
            .reverse_entry(
                entry.id,
                fix.owner,
                NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            )
            .await;
        assert!(matches!(again, Err(LedgerError::InvalidState(_))));
    }

    #[tokio::test]
    async fn drafts_are_editable_and_deletable_posted_are_not() {
        let mut fix = fixture().await;
        let entry = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 100))
            .await
            .unwrap();

        let updated = fix
            .engine
            .update_draft_entry(entry.id, fix.owner, simple_entry(&fix, 2, 900))
            .await
            .unwrap();
        assert_eq!(updated.entry_number, entry.entry_number);
        assert_eq!(updated.total_debits(), BigDecimal::from(900));

        fix.engine.post_entry(entry.id, fix.owner).await.unwrap();
        assert!(matches!(
            fix.engine
                .update_draft_entry(entry.id, fix.owner, simple_entry(&fix, 3, 10))
                .await,
            Err(LedgerError::InvalidState(_))
        ));
        assert!(matches!(
            fix.engine.delete_draft_entry(entry.id, fix.owner).await,
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn entry_numbers_survive_draft_deletion() {
        let mut fix = fixture().await;
        let first = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 1, 100))
            .await
            .unwrap();
        fix.engine
            .delete_draft_entry(first.id, fix.owner)
            .await
            .unwrap();
        let second = fix
            .engine
            .create_entry(fix.owner, simple_entry(&fix, 2, 100))
            .await
            .unwrap();
        // Deleted draft's number is never reused.
        assert_eq!(second.entry_number, 2);
    }
}
