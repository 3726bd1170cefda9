//! Main ledger orchestrator that coordinates all accounting subsystems

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::info;

use crate::depreciation::{DepreciationAccounts, DepreciationManager};
use crate::integration::{IntegrationAccounts, JournalIntegration};
use crate::journal::{EntryBuilder, JournalEngine, NewJournalEntry};
use crate::period::PeriodManager;
use crate::projection::{GeneralLedgerQuery, LedgerProjector};
use crate::registry::{AccountNode, AccountPatch, AccountRegistry};
use crate::statements::{
    BalanceSheet, ComparativeBalanceSheet, ComparativeIncomeStatement, IncomeStatement,
    StatementBuilder, TrialBalance,
};
use crate::traits::LedgerStore;
use crate::types::*;

/// Result of a year-end close
#[derive(Debug, Clone)]
pub struct YearEndClose {
    pub fiscal_year: i32,
    pub net_income: BigDecimal,
    /// Absent when the year had no revenue or expense movements
    pub closing_entry: Option<JournalEntry>,
    pub locked_periods: u32,
}

/// Ledger system facade: one entry point over the account registry, journal
/// engine, period manager, projector, and statement builder, all sharing a
/// storage backend.
pub struct Ledger<S: LedgerStore> {
    storage: S,
    accounts: AccountRegistry<S>,
    journal: JournalEngine<S>,
    periods: PeriodManager<S>,
    projector: LedgerProjector<S>,
    statements: StatementBuilder<S>,
}

impl<S: LedgerStore + Clone> Ledger<S> {
    /// Create a ledger over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            accounts: AccountRegistry::new(storage.clone()),
            journal: JournalEngine::new(storage.clone()),
            periods: PeriodManager::new(storage.clone()),
            projector: LedgerProjector::new(storage.clone()),
            statements: StatementBuilder::new(storage.clone()),
            storage,
        }
    }

    /// Depreciation manager bound to the same storage
    pub fn depreciation(&self, accounts: DepreciationAccounts) -> DepreciationManager<S> {
        DepreciationManager::new(self.storage.clone(), accounts)
    }

    /// Document integration surface bound to the same storage
    pub fn integration(&self, accounts: IntegrationAccounts) -> JournalIntegration<S> {
        JournalIntegration::new(self.storage.clone(), accounts)
    }

    // Chart of accounts

    #[allow(clippy::too_many_arguments)]
    pub async fn create_account(
        &mut self,
        owner: OwnerId,
        code: &str,
        name: &str,
        account_type: AccountType,
        normal_balance: NormalBalance,
        parent_id: Option<AccountId>,
        is_header: bool,
    ) -> LedgerResult<Account> {
        self.accounts
            .create_account(owner, code, name, account_type, normal_balance, parent_id, is_header)
            .await
    }

    pub async fn get_account(
        &self,
        id: AccountId,
        owner: OwnerId,
    ) -> LedgerResult<Option<Account>> {
        self.accounts.get_account(id, owner).await
    }

    pub async fn list_accounts(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        self.accounts.list_accounts(owner, account_type).await
    }

    pub async fn update_account(
        &mut self,
        id: AccountId,
        owner: OwnerId,
        patch: AccountPatch,
    ) -> LedgerResult<Account> {
        self.accounts.update_account(id, owner, patch).await
    }

    pub async fn set_opening_balance(
        &mut self,
        id: AccountId,
        owner: OwnerId,
        amount: BigDecimal,
        as_of: NaiveDate,
    ) -> LedgerResult<Account> {
        self.accounts.set_opening_balance(id, owner, amount, as_of).await
    }

    pub async fn delete_account(&mut self, id: AccountId, owner: OwnerId) -> LedgerResult<()> {
        self.accounts.delete_account(id, owner).await
    }

    pub async fn get_account_tree(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<AccountNode>> {
        self.accounts.get_account_tree(owner, account_type).await
    }

    pub async fn get_account_balance(
        &self,
        id: AccountId,
        owner: OwnerId,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        self.accounts.get_account_balance(id, owner, as_of_date).await
    }

    // Journal entries

    pub async fn create_entry(
        &mut self,
        owner: OwnerId,
        new_entry: NewJournalEntry,
    ) -> LedgerResult<JournalEntry> {
        self.journal.create_entry(owner, new_entry).await
    }

    pub async fn update_draft_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
        new_entry: NewJournalEntry,
    ) -> LedgerResult<JournalEntry> {
        self.journal.update_draft_entry(id, owner, new_entry).await
    }

    pub async fn delete_draft_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<()> {
        self.journal.delete_draft_entry(id, owner).await
    }

    pub async fn post_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<JournalEntry> {
        self.journal.post_entry(id, owner).await
    }

    pub async fn reverse_entry(
        &mut self,
        id: JournalEntryId,
        owner: OwnerId,
        reversal_date: NaiveDate,
    ) -> LedgerResult<JournalEntry> {
        self.journal.reverse_entry(id, owner, reversal_date).await
    }

    pub async fn get_entry(
        &self,
        id: JournalEntryId,
        owner: OwnerId,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.journal.get_entry(id, owner).await
    }

    pub async fn list_entries(&self, owner: OwnerId) -> LedgerResult<Vec<JournalEntry>> {
        self.journal.list_entries(owner).await
    }

    // Accounting periods

    pub async fn get_period_status(
        &self,
        owner: OwnerId,
        year: i32,
        month: u32,
    ) -> LedgerResult<PeriodStatus> {
        self.periods.get_period_status(owner, year, month).await
    }

    pub async fn can_post_to_date(&self, owner: OwnerId, date: NaiveDate) -> LedgerResult<bool> {
        self.periods.can_post_to_date(owner, date).await
    }

    pub async fn close_period(
        &mut self,
        owner: OwnerId,
        year: i32,
        month: u32,
        closed_by: Option<&str>,
        notes: Option<&str>,
    ) -> LedgerResult<AccountingPeriod> {
        self.periods.close_period(owner, year, month, closed_by, notes).await
    }

    pub async fn reopen_period(
        &mut self,
        owner: OwnerId,
        year: i32,
        month: u32,
        reason: &str,
    ) -> LedgerResult<AccountingPeriod> {
        self.periods.reopen_period(owner, year, month, reason).await
    }

    // General ledger

    pub async fn rebuild_ledger(&mut self, owner: OwnerId) -> LedgerResult<usize> {
        self.projector.rebuild(owner).await
    }

    pub async fn get_general_ledger(
        &self,
        account_id: AccountId,
        owner: OwnerId,
        query: &GeneralLedgerQuery,
    ) -> LedgerResult<Vec<LedgerTransaction>> {
        self.projector.get_general_ledger(account_id, owner, query).await
    }

    // Financial statements

    pub async fn get_trial_balance(
        &self,
        owner: OwnerId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<TrialBalance> {
        self.statements.trial_balance(owner, as_of_date).await
    }

    pub async fn get_profit_and_loss(
        &self,
        owner: OwnerId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement> {
        self.statements.profit_and_loss(owner, start_date, end_date).await
    }

    pub async fn get_profit_and_loss_comparative(
        &self,
        owner: OwnerId,
        current: (NaiveDate, NaiveDate),
        prior: (NaiveDate, NaiveDate),
    ) -> LedgerResult<ComparativeIncomeStatement> {
        self.statements
            .profit_and_loss_comparative(owner, current, prior)
            .await
    }

    pub async fn get_balance_sheet(
        &self,
        owner: OwnerId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        self.statements.balance_sheet(owner, as_of_date).await
    }

    pub async fn get_balance_sheet_comparative(
        &self,
        owner: OwnerId,
        current_date: NaiveDate,
        prior_date: NaiveDate,
    ) -> LedgerResult<ComparativeBalanceSheet> {
        self.statements
            .balance_sheet_comparative(owner, current_date, prior_date)
            .await
    }

    /// Close a fiscal year.
    ///
    /// Verifies the trial balance as of December 31, posts one closing entry
    /// that zeroes every revenue and expense movement of the year into the
    /// given retained-earnings account, and locks all twelve periods. The
    /// closing entry lands in December even when chronological period close
    /// has already shut it; locked periods cannot be reopened afterwards.
    ///
    /// A year with no revenue or expense movements locks its periods without
    /// posting an entry.
    pub async fn year_end_close(
        &mut self,
        owner: OwnerId,
        fiscal_year: i32,
        retained_earnings_account_id: AccountId,
        closed_by: Option<&str>,
    ) -> LedgerResult<YearEndClose> {
        let year_start = NaiveDate::from_ymd_opt(fiscal_year, 1, 1)
            .ok_or_else(|| LedgerError::Validation(format!("invalid fiscal year {fiscal_year}")))?;
        let year_end = NaiveDate::from_ymd_opt(fiscal_year, 12, 31)
            .ok_or_else(|| LedgerError::Validation(format!("invalid fiscal year {fiscal_year}")))?;

        let trial = self.statements.trial_balance(owner, year_end).await?;
        if !trial.is_balanced {
            return Err(LedgerError::UnbalancedTrialBalance {
                debits: trial.total_debits,
                credits: trial.total_credits,
            });
        }

        let retained = self
            .accounts
            .get_account_required(retained_earnings_account_id, owner)
            .await?;
        if retained.account_type != AccountType::Equity {
            return Err(LedgerError::Validation(format!(
                "retained earnings account '{}' must be an equity account",
                retained.code
            )));
        }
        if !retained.is_postable() || !retained.is_active {
            return Err(LedgerError::Validation(format!(
                "retained earnings account '{}' is not postable",
                retained.code
            )));
        }

        let pnl = self
            .statements
            .profit_and_loss(owner, year_start, year_end)
            .await?;

        let closing_entry = if pnl.revenue.is_empty() && pnl.expenses.is_empty() {
            None
        } else {
            let zero = BigDecimal::from(0);
            let mut builder = EntryBuilder::new(
                year_end,
                format!("Year-end closing entry for fiscal year {fiscal_year}"),
            );
            // Zero each account against its accumulated movement: revenue
            // carries credit balances so positive movements are debited away,
            // expenses the other way around.
            for item in &pnl.revenue {
                if item.amount > zero {
                    builder = builder.debit(item.account.id, item.amount.clone());
                } else if item.amount < zero {
                    builder = builder.credit(item.account.id, item.amount.abs());
                }
            }
            for item in &pnl.expenses {
                if item.amount > zero {
                    builder = builder.credit(item.account.id, item.amount.clone());
                } else if item.amount < zero {
                    builder = builder.debit(item.account.id, item.amount.abs());
                }
            }
            if pnl.net_income > zero {
                builder = builder.credit(retained.id, pnl.net_income.clone());
            } else if pnl.net_income < zero {
                builder = builder.debit(retained.id, pnl.net_income.abs());
            }

            let entry = self.journal.create_entry(owner, builder.build()?).await?;
            let posted = self
                .journal
                .post_entry_bypassing_period_gate(entry.id, owner)
                .await?;
            Some(posted)
        };

        for month in 1..=12 {
            self.periods
                .lock_period(owner, fiscal_year, month, closed_by)
                .await?;
        }

        info!(
            %owner,
            fiscal_year,
            net_income = %pnl.net_income,
            "fiscal year closed"
        );
        Ok(YearEndClose {
            fiscal_year,
            net_income: pnl.net_income,
            closing_entry,
            locked_periods: 12,
        })
    }
}
