//! Storage abstraction for the ledger engine
//!
//! Everything the engine persists goes through [`LedgerStore`], so the core
//! works with any relational or in-memory backend. Implementations carry the
//! atomicity contract: the three write seams marked *atomic* below must be
//! all-or-nothing and serialized per owner. [`crate::utils::MemoryStore`]
//! is the reference implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the ledger engine.
///
/// All reads and writes are owner-scoped; an id belonging to a different
/// owner behaves exactly like a missing record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // --- chart of accounts ---

    /// Save a newly created account
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by id
    async fn get_account(&self, owner: OwnerId, id: AccountId) -> LedgerResult<Option<Account>>;

    /// Find an account by its owner-unique code
    async fn find_account_by_code(
        &self,
        owner: OwnerId,
        code: &str,
    ) -> LedgerResult<Option<Account>>;

    /// List accounts for an owner, optionally filtered by type
    async fn list_accounts(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>>;

    /// Update an existing account
    async fn update_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Physically delete an account. Dependency checks (postings, children)
    /// are the registry's job, not the store's.
    async fn delete_account(&mut self, owner: OwnerId, id: AccountId) -> LedgerResult<()>;

    /// True if any journal entry line, in any status, references the account
    async fn account_has_lines(&self, owner: OwnerId, id: AccountId) -> LedgerResult<bool>;

    // --- journal entries ---

    /// Allocate the next entry number for an owner.
    ///
    /// *Atomic*: two concurrent calls for the same owner must never return
    /// the same number. Backed by a serialized counter or database sequence,
    /// never read-then-increment in application code.
    async fn next_entry_number(&mut self, owner: OwnerId) -> LedgerResult<i64>;

    /// Save a newly created journal entry
    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Get a journal entry by id
    async fn get_entry(
        &self,
        owner: OwnerId,
        id: JournalEntryId,
    ) -> LedgerResult<Option<JournalEntry>>;

    /// List all journal entries for an owner, ordered by entry number
    async fn list_entries(&self, owner: OwnerId) -> LedgerResult<Vec<JournalEntry>>;

    /// Update a journal entry (draft edits only; callers enforce status)
    async fn update_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Delete a journal entry (draft only; callers enforce status)
    async fn delete_entry(&mut self, owner: OwnerId, id: JournalEntryId) -> LedgerResult<()>;

    /// Commit a posting: flip the entry to `Posted`, append the given ledger
    /// rows, and recompute running balances for every affected account.
    ///
    /// *Atomic*: either the status flip and all rows land, or nothing does.
    /// The stored entry's `Draft` status must be re-checked inside the same
    /// transaction and the commit rejected with `InvalidState` otherwise —
    /// the caller's status read happens outside the seam and may lose a race
    /// against a concurrent post of the same entry.
    async fn apply_posting(
        &mut self,
        owner: OwnerId,
        entry_id: JournalEntryId,
        rows: Vec<LedgerTransaction>,
    ) -> LedgerResult<()>;

    /// Commit a reversal: save the mirror entry as `Posted` with its ledger
    /// rows, and flip the original to `Reversed`.
    ///
    /// *Atomic*: the mirror and the original's status change land together.
    /// The original's `Posted` status must be re-checked inside the same
    /// transaction so only one of two racing reversals can win.
    async fn apply_reversal(
        &mut self,
        owner: OwnerId,
        original_id: JournalEntryId,
        reversal: &JournalEntry,
        rows: Vec<LedgerTransaction>,
    ) -> LedgerResult<()>;

    // --- general ledger projection ---

    /// Regenerate the owner's entire set of ledger rows from the in-ledger
    /// entry history, returning the number of rows written. Implementations
    /// use [`crate::projection::project_entries`] for the row computation.
    ///
    /// *Atomic*: the snapshot of entries, the recomputation, and the swap all
    /// happen in one transaction excluding concurrent postings for the same
    /// owner, so a posting committing mid-rebuild can never be erased.
    async fn rebuild_ledger(&mut self, owner: OwnerId) -> LedgerResult<usize>;

    /// Ledger rows for an owner, optionally restricted to one account and a
    /// date window, ordered by (entry_date, entry_number, line_no)
    async fn ledger_rows(
        &self,
        owner: OwnerId,
        account_id: Option<AccountId>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<LedgerTransaction>>;

    // --- accounting periods ---

    /// Get the explicit period record, if one exists. Absence means Open.
    async fn get_period(
        &self,
        owner: OwnerId,
        year: i32,
        month: u32,
    ) -> LedgerResult<Option<AccountingPeriod>>;

    /// Insert or update a period record
    async fn save_period(&mut self, period: &AccountingPeriod) -> LedgerResult<()>;

    /// List all explicit period records for an owner
    async fn list_periods(&self, owner: OwnerId) -> LedgerResult<Vec<AccountingPeriod>>;

    // --- depreciation schedules ---

    /// Save a scheduled depreciation record
    async fn save_depreciation_record(&mut self, record: &DepreciationRecord) -> LedgerResult<()>;

    /// Get one depreciation record by id
    async fn get_depreciation_record(
        &self,
        owner: OwnerId,
        id: Uuid,
    ) -> LedgerResult<Option<DepreciationRecord>>;

    /// List depreciation records, optionally for a single fixed asset,
    /// ordered by (fixed_asset_id, period_index)
    async fn list_depreciation_records(
        &self,
        owner: OwnerId,
        fixed_asset_id: Option<Uuid>,
    ) -> LedgerResult<Vec<DepreciationRecord>>;

    /// Update a depreciation record's status/links
    async fn update_depreciation_record(
        &mut self,
        record: &DepreciationRecord,
    ) -> LedgerResult<()>;
}
