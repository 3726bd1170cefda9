//! General ledger projection
//!
//! Posted journal entry lines are materialized into [`LedgerTransaction`]
//! rows with per-account running balances so statement queries never touch
//! raw entries. The projection is derived data: [`LedgerProjector::rebuild`]
//! regenerates it from scratch at any time, and the pure helpers here are
//! shared with store implementations so the incremental path (applied on
//! every posting) and the full rebuild cannot drift apart.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::traits::LedgerStore;
use crate::types::*;

/// Query window for a single account's general ledger
#[derive(Debug, Clone)]
pub struct GeneralLedgerQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for GeneralLedgerQuery {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Rebuilds and queries the materialized general ledger
pub struct LedgerProjector<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> LedgerProjector<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Delete and regenerate every ledger row for the owner from the full
    /// posted-entry history, in (entry_date, entry_number) order.
    ///
    /// Idempotent: two consecutive rebuilds produce identical row sets
    /// (row ids aside, which are regenerated). The whole snapshot-recompute-
    /// swap runs inside the store's `rebuild_ledger` seam, which excludes
    /// concurrent postings for the same owner for its full duration. Returns
    /// the number of rows written.
    pub async fn rebuild(&mut self, owner: OwnerId) -> LedgerResult<usize> {
        self.storage.rebuild_ledger(owner).await
    }

    /// Paginated, date-ordered ledger rows with running balance for one account
    pub async fn get_general_ledger(
        &self,
        account_id: AccountId,
        owner: OwnerId,
        query: &GeneralLedgerQuery,
    ) -> LedgerResult<Vec<LedgerTransaction>> {
        self.storage
            .get_account(owner, account_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("account {account_id}")))?;

        let rows = self
            .storage
            .ledger_rows(owner, Some(account_id), query.start_date, query.end_date)
            .await?;

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

/// Movement of a single (debit, credit) pair signed on the account's normal
/// side: debit-normal accounts grow with debits, credit-normal with credits.
pub fn signed_movement(
    normal_balance: NormalBalance,
    debit: &BigDecimal,
    credit: &BigDecimal,
) -> BigDecimal {
    match normal_balance {
        NormalBalance::Debit => debit - credit,
        NormalBalance::Credit => credit - debit,
    }
}

/// Build the ledger rows for one entry, one per line, running balances unset.
/// Callers recompute running balances for the affected accounts afterwards.
pub fn rows_for_entry(entry: &JournalEntry) -> Vec<LedgerTransaction> {
    entry
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| LedgerTransaction {
            id: Uuid::new_v4(),
            owner_id: entry.owner_id,
            account_id: line.account_id,
            journal_entry_id: entry.id,
            entry_number: entry.entry_number,
            line_no: i as u32,
            entry_date: entry.entry_date,
            description: line.description.clone().or_else(|| {
                if entry.description.is_empty() {
                    None
                } else {
                    Some(entry.description.clone())
                }
            }),
            debit: line.debit_amount.clone(),
            credit: line.credit_amount.clone(),
            running_balance: BigDecimal::from(0),
        })
        .collect()
}

/// Project a full set of in-ledger entries into sorted rows with running
/// balances. Rows are ordered by (entry_date, entry_number, line_no); each
/// account's running balance is seeded with its opening balance.
pub fn project_entries(
    accounts: &[Account],
    entries: &[JournalEntry],
) -> LedgerResult<Vec<LedgerTransaction>> {
    let mut rows: Vec<LedgerTransaction> = entries.iter().flat_map(rows_for_entry).collect();
    sort_rows(&mut rows);

    for account in accounts {
        recompute_running(account, &mut rows);
    }

    // A row targeting an unknown account means the entry history and the
    // chart of accounts disagree; surface it instead of projecting garbage.
    if let Some(row) = rows
        .iter()
        .find(|r| !accounts.iter().any(|a| a.id == r.account_id))
    {
        return Err(LedgerError::Storage(format!(
            "ledger row references unknown account {}",
            row.account_id
        )));
    }

    Ok(rows)
}

/// Canonical projection order
pub fn sort_rows(rows: &mut [LedgerTransaction]) {
    rows.sort_by(|a, b| {
        (a.entry_date, a.entry_number, a.line_no).cmp(&(b.entry_date, b.entry_number, b.line_no))
    });
}

/// Recompute one account's running balances over already-sorted rows
pub fn recompute_running(account: &Account, rows: &mut [LedgerTransaction]) {
    let mut running = account.opening_balance.clone();
    for row in rows.iter_mut().filter(|r| r.account_id == account.id) {
        running += signed_movement(account.normal_balance, &row.debit, &row.credit);
        row.running_balance = running.clone();
    }
}
