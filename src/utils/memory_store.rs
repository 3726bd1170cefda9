//! In-memory storage implementation for testing and embedding

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::projection::{project_entries, recompute_running, sort_rows};
use crate::traits::LedgerStore;
use crate::types::*;

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    entries: HashMap<JournalEntryId, JournalEntry>,
    ledgers: HashMap<OwnerId, Vec<LedgerTransaction>>,
    periods: HashMap<(OwnerId, i32, u32), AccountingPeriod>,
    depreciation: HashMap<Uuid, DepreciationRecord>,
    entry_counters: HashMap<OwnerId, i64>,
}

impl Inner {
    /// Recompute running balances for the given accounts over the owner's
    /// sorted ledger rows
    fn reproject_accounts(&mut self, owner: OwnerId, account_ids: &[AccountId]) {
        let accounts: Vec<Account> = account_ids
            .iter()
            .filter_map(|id| self.accounts.get(id))
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect();
        let rows = self.ledgers.entry(owner).or_default();
        sort_rows(rows);
        for account in &accounts {
            recompute_running(account, rows);
        }
    }
}

/// In-memory [`LedgerStore`] backed by a single `RwLock`.
///
/// The one write lock doubles as the owner-level serialization point the
/// engine relies on: entry numbering, posting commits, and full ledger
/// rebuilds all take it exclusively, so none of them can interleave.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.inner
            .write()
            .unwrap()
            .accounts
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn get_account(&self, owner: OwnerId, id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .accounts
            .get(&id)
            .filter(|a| a.owner_id == owner)
            .cloned())
    }

    async fn find_account_by_code(
        &self,
        owner: OwnerId,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .accounts
            .values()
            .find(|a| a.owner_id == owner && a.code == code)
            .cloned())
    }

    async fn list_accounts(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        let inner = self.inner.read().unwrap();
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.owner_id == owner)
            .filter(|a| account_type.is_none_or(|t| a.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.accounts.get(&account.id) {
            Some(existing) if existing.owner_id == account.owner_id => {
                inner.accounts.insert(account.id, account.clone());
                Ok(())
            }
            _ => Err(LedgerError::NotFound(format!("account {}", account.id))),
        }
    }

    async fn delete_account(&mut self, owner: OwnerId, id: AccountId) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.accounts.get(&id) {
            Some(existing) if existing.owner_id == owner => {
                inner.accounts.remove(&id);
                Ok(())
            }
            _ => Err(LedgerError::NotFound(format!("account {id}"))),
        }
    }

    async fn account_has_lines(&self, owner: OwnerId, id: AccountId) -> LedgerResult<bool> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .entries
            .values()
            .filter(|e| e.owner_id == owner)
            .any(|e| e.lines.iter().any(|l| l.account_id == id)))
    }

    async fn next_entry_number(&mut self, owner: OwnerId) -> LedgerResult<i64> {
        let mut inner = self.inner.write().unwrap();
        // Seed from the highest existing number so imported histories keep
        // their numbering monotonic.
        let seed = inner
            .entries
            .values()
            .filter(|e| e.owner_id == owner)
            .map(|e| e.entry_number)
            .max()
            .unwrap_or(0);
        let counter = inner.entry_counters.entry(owner).or_insert(seed);
        *counter += 1;
        Ok(*counter)
    }

    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        self.inner
            .write()
            .unwrap()
            .entries
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(
        &self,
        owner: OwnerId,
        id: JournalEntryId,
    ) -> LedgerResult<Option<JournalEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .entries
            .get(&id)
            .filter(|e| e.owner_id == owner)
            .cloned())
    }

    async fn list_entries(&self, owner: OwnerId) -> LedgerResult<Vec<JournalEntry>> {
        let inner = self.inner.read().unwrap();
        let mut entries: Vec<JournalEntry> = inner
            .entries
            .values()
            .filter(|e| e.owner_id == owner)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.entry_number);
        Ok(entries)
    }

    async fn update_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.entries.get(&entry.id) {
            Some(existing) if existing.owner_id == entry.owner_id => {
                inner.entries.insert(entry.id, entry.clone());
                Ok(())
            }
            _ => Err(LedgerError::NotFound(format!(
                "journal entry {}",
                entry.id
            ))),
        }
    }

    async fn delete_entry(&mut self, owner: OwnerId, id: JournalEntryId) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.entries.get(&id) {
            Some(existing) if existing.owner_id == owner => {
                inner.entries.remove(&id);
                Ok(())
            }
            _ => Err(LedgerError::NotFound(format!("journal entry {id}"))),
        }
    }

    async fn apply_posting(
        &mut self,
        owner: OwnerId,
        entry_id: JournalEntryId,
        rows: Vec<LedgerTransaction>,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();

        let entry = inner
            .entries
            .get_mut(&entry_id)
            .filter(|e| e.owner_id == owner)
            .ok_or_else(|| LedgerError::NotFound(format!("journal entry {entry_id}")))?;
        // Re-checked under the write lock: the engine's earlier read may be
        // stale when two posts race for the same entry.
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be posted",
                entry.entry_number, entry.status
            )));
        }
        entry.status = EntryStatus::Posted;
        entry.updated_at = chrono::Utc::now().naive_utc();

        let affected: Vec<AccountId> = rows.iter().map(|r| r.account_id).collect();
        inner.ledgers.entry(owner).or_default().extend(rows);
        inner.reproject_accounts(owner, &affected);
        Ok(())
    }

    async fn apply_reversal(
        &mut self,
        owner: OwnerId,
        original_id: JournalEntryId,
        reversal: &JournalEntry,
        rows: Vec<LedgerTransaction>,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();

        let original = inner
            .entries
            .get_mut(&original_id)
            .filter(|e| e.owner_id == owner)
            .ok_or_else(|| LedgerError::NotFound(format!("journal entry {original_id}")))?;
        // Same stale-read hazard as apply_posting: only one of two racing
        // reversals may win.
        if original.status != EntryStatus::Posted {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is {:?} and cannot be reversed",
                original.entry_number, original.status
            )));
        }
        original.status = EntryStatus::Reversed;
        original.updated_at = chrono::Utc::now().naive_utc();

        inner.entries.insert(reversal.id, reversal.clone());

        let affected: Vec<AccountId> = rows.iter().map(|r| r.account_id).collect();
        inner.ledgers.entry(owner).or_default().extend(rows);
        inner.reproject_accounts(owner, &affected);
        Ok(())
    }

    async fn rebuild_ledger(&mut self, owner: OwnerId) -> LedgerResult<usize> {
        // Snapshot, recompute, and swap under one write lock so a posting
        // can never commit inside the rebuild window and get erased.
        let mut inner = self.inner.write().unwrap();

        let accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect();
        let mut entries: Vec<JournalEntry> = inner
            .entries
            .values()
            .filter(|e| e.owner_id == owner && e.status.is_in_ledger())
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.entry_number);

        let rows = project_entries(&accounts, &entries)?;
        let count = rows.len();
        inner.ledgers.insert(owner, rows);
        Ok(count)
    }

    async fn ledger_rows(
        &self,
        owner: OwnerId,
        account_id: Option<AccountId>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<LedgerTransaction>> {
        let inner = self.inner.read().unwrap();
        let mut rows: Vec<LedgerTransaction> = inner
            .ledgers
            .get(&owner)
            .map(|rows| {
                rows.iter()
                    .filter(|r| account_id.is_none_or(|id| r.account_id == id))
                    .filter(|r| start_date.is_none_or(|d| r.entry_date >= d))
                    .filter(|r| end_date.is_none_or(|d| r.entry_date <= d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn get_period(
        &self,
        owner: OwnerId,
        year: i32,
        month: u32,
    ) -> LedgerResult<Option<AccountingPeriod>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .periods
            .get(&(owner, year, month))
            .cloned())
    }

    async fn save_period(&mut self, period: &AccountingPeriod) -> LedgerResult<()> {
        self.inner.write().unwrap().periods.insert(
            (period.owner_id, period.year, period.month),
            period.clone(),
        );
        Ok(())
    }

    async fn list_periods(&self, owner: OwnerId) -> LedgerResult<Vec<AccountingPeriod>> {
        let inner = self.inner.read().unwrap();
        let mut periods: Vec<AccountingPeriod> = inner
            .periods
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect();
        periods.sort_by_key(|p| (p.year, p.month));
        Ok(periods)
    }

    async fn save_depreciation_record(&mut self, record: &DepreciationRecord) -> LedgerResult<()> {
        self.inner
            .write()
            .unwrap()
            .depreciation
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get_depreciation_record(
        &self,
        owner: OwnerId,
        id: Uuid,
    ) -> LedgerResult<Option<DepreciationRecord>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .depreciation
            .get(&id)
            .filter(|r| r.owner_id == owner)
            .cloned())
    }

    async fn list_depreciation_records(
        &self,
        owner: OwnerId,
        fixed_asset_id: Option<Uuid>,
    ) -> LedgerResult<Vec<DepreciationRecord>> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<DepreciationRecord> = inner
            .depreciation
            .values()
            .filter(|r| r.owner_id == owner)
            .filter(|r| fixed_asset_id.is_none_or(|id| r.fixed_asset_id == id))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.fixed_asset_id, r.period_index));
        Ok(records)
    }

    async fn update_depreciation_record(
        &mut self,
        record: &DepreciationRecord,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.depreciation.get(&record.id) {
            Some(existing) if existing.owner_id == record.owner_id => {
                inner.depreciation.insert(record.id, record.clone());
                Ok(())
            }
            _ => Err(LedgerError::NotFound(format!(
                "depreciation record {}",
                record.id
            ))),
        }
    }
}
