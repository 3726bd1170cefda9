//! Financial statement builder
//!
//! Pure read side: trial balance, profit & loss, and balance sheet are all
//! computed from the materialized ledger rows plus the chart of accounts.
//! Nothing here mutates state, and nothing reads raw source documents.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::projection::signed_movement;
use crate::traits::LedgerStore;
use crate::types::*;

/// One account's balance on a trial balance, shown on its debit or credit
/// side. A negative balance flips to the opposite column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account: Account,
    pub debit_balance: Option<BigDecimal>,
    pub credit_balance: Option<BigDecimal>,
}

/// Trial balance as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of_date: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    /// Health check: true when total debits equal total credits
    pub is_balanced: bool,
}

/// An account with a signed amount, used by P&L and balance sheet sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account: Account,
    pub amount: BigDecimal,
}

/// Profit and loss for a date window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenue: Vec<AccountAmount>,
    pub expenses: Vec<AccountAmount>,
    pub total_revenue: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_income: BigDecimal,
}

/// Two income statements side by side (e.g. this quarter vs. last)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeIncomeStatement {
    pub current: IncomeStatement,
    pub prior: IncomeStatement,
}

/// Balance sheet as of a date.
///
/// `net_income` is revenue minus expenses over all activity up to the date;
/// it folds into `total_equity` so the accounting equation holds before the
/// year has been formally closed into retained earnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<AccountAmount>,
    pub liabilities: Vec<AccountAmount>,
    pub equity: Vec<AccountAmount>,
    pub net_income: BigDecimal,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    /// True when assets equal liabilities plus equity
    pub is_balanced: bool,
}

/// Two balance sheets side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeBalanceSheet {
    pub current: BalanceSheet,
    pub prior: BalanceSheet,
}

/// Computes financial statements from the projected ledger
pub struct StatementBuilder<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> StatementBuilder<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Signed balance per account as of a date: the last projected running
    /// balance on or before the date, falling back to the opening balance
    /// for accounts with no rows yet.
    async fn balances_as_of(
        &self,
        owner: OwnerId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<(Vec<Account>, HashMap<AccountId, BigDecimal>)> {
        let accounts = self.storage.list_accounts(owner, None).await?;
        let rows = self
            .storage
            .ledger_rows(owner, None, None, Some(as_of_date))
            .await?;

        // Rows arrive sorted, so the last write per account wins.
        let mut balances: HashMap<AccountId, BigDecimal> = HashMap::new();
        for row in &rows {
            balances.insert(row.account_id, row.running_balance.clone());
        }

        for account in &accounts {
            if balances.contains_key(&account.id) {
                continue;
            }
            let opening_applies = account
                .opening_balance_date
                .is_none_or(|d| d <= as_of_date);
            if opening_applies {
                balances.insert(account.id, account.opening_balance.clone());
            }
        }

        Ok((accounts, balances))
    }

    /// Trial balance: every postable account's signed balance as of the
    /// date, split into debit and credit columns. Callers may assert
    /// `total_debits == total_credits` as a system health check.
    pub async fn trial_balance(
        &self,
        owner: OwnerId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<TrialBalance> {
        let (accounts, balances) = self.balances_as_of(owner, as_of_date).await?;

        let zero = BigDecimal::from(0);
        let mut rows = Vec::new();
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in accounts.into_iter().filter(|a| !a.is_header) {
            let balance = balances.get(&account.id).cloned().unwrap_or_else(|| zero.clone());

            // A negative balance sits on the opposite side of the normal one.
            let side = if balance >= zero {
                account.normal_balance
            } else {
                match account.normal_balance {
                    NormalBalance::Debit => NormalBalance::Credit,
                    NormalBalance::Credit => NormalBalance::Debit,
                }
            };
            let magnitude = balance.abs();

            let row = match side {
                NormalBalance::Debit => {
                    total_debits += &magnitude;
                    TrialBalanceRow {
                        account,
                        debit_balance: Some(magnitude),
                        credit_balance: None,
                    }
                }
                NormalBalance::Credit => {
                    total_credits += &magnitude;
                    TrialBalanceRow {
                        account,
                        debit_balance: None,
                        credit_balance: Some(magnitude),
                    }
                }
            };
            rows.push(row);
        }

        let is_balanced = round_to_minor(&total_debits) == round_to_minor(&total_credits);
        Ok(TrialBalance {
            as_of_date,
            rows,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Profit and loss: posted revenue and expense movements within the
    /// window, grouped by account. Net income = revenue − expenses.
    pub async fn profit_and_loss(
        &self,
        owner: OwnerId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement> {
        let accounts = self.storage.list_accounts(owner, None).await?;
        let rows = self
            .storage
            .ledger_rows(owner, None, Some(start_date), Some(end_date))
            .await?;

        let mut movements: HashMap<AccountId, BigDecimal> = HashMap::new();
        for account in &accounts {
            let movement: BigDecimal = rows
                .iter()
                .filter(|r| r.account_id == account.id)
                .map(|r| signed_movement(account.normal_balance, &r.debit, &r.credit))
                .sum();
            if movement != BigDecimal::from(0) {
                movements.insert(account.id, movement);
            }
        }

        let section = |account_type: AccountType| -> Vec<AccountAmount> {
            accounts
                .iter()
                .filter(|a| a.account_type == account_type)
                .filter_map(|a| {
                    movements.get(&a.id).map(|m| AccountAmount {
                        account: a.clone(),
                        amount: m.clone(),
                    })
                })
                .collect()
        };

        let revenue = section(AccountType::Revenue);
        let expenses = section(AccountType::Expense);
        let total_revenue: BigDecimal = revenue.iter().map(|r| &r.amount).sum();
        let total_expenses: BigDecimal = expenses.iter().map(|r| &r.amount).sum();
        let net_income = &total_revenue - &total_expenses;

        Ok(IncomeStatement {
            start_date,
            end_date,
            revenue,
            expenses,
            total_revenue,
            total_expenses,
            net_income,
        })
    }

    /// P&L for two windows side by side
    pub async fn profit_and_loss_comparative(
        &self,
        owner: OwnerId,
        current: (NaiveDate, NaiveDate),
        prior: (NaiveDate, NaiveDate),
    ) -> LedgerResult<ComparativeIncomeStatement> {
        Ok(ComparativeIncomeStatement {
            current: self.profit_and_loss(owner, current.0, current.1).await?,
            prior: self.profit_and_loss(owner, prior.0, prior.1).await?,
        })
    }

    /// Balance sheet as of a date. For a consistently maintained ledger
    /// `assets == liabilities + equity`, with un-closed net income folded
    /// into equity.
    pub async fn balance_sheet(
        &self,
        owner: OwnerId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        let (accounts, balances) = self.balances_as_of(owner, as_of_date).await?;

        let zero = BigDecimal::from(0);
        let section = |account_type: AccountType| -> Vec<AccountAmount> {
            accounts
                .iter()
                .filter(|a| !a.is_header && a.account_type == account_type)
                .filter_map(|a| {
                    let balance = balances.get(&a.id).cloned()?;
                    if balance == zero {
                        return None;
                    }
                    Some(AccountAmount {
                        account: a.clone(),
                        amount: balance,
                    })
                })
                .collect()
        };

        let assets = section(AccountType::Asset);
        let liabilities = section(AccountType::Liability);
        let equity = section(AccountType::Equity);

        let earnings = |account_type: AccountType| -> BigDecimal {
            accounts
                .iter()
                .filter(|a| a.account_type == account_type)
                .filter_map(|a| balances.get(&a.id))
                .sum()
        };
        let net_income = earnings(AccountType::Revenue) - earnings(AccountType::Expense);

        let total_assets: BigDecimal = assets.iter().map(|a| &a.amount).sum();
        let total_liabilities: BigDecimal = liabilities.iter().map(|a| &a.amount).sum();
        let equity_accounts: BigDecimal = equity.iter().map(|a| &a.amount).sum();
        let total_equity = &equity_accounts + &net_income;

        let is_balanced = round_to_minor(&total_assets)
            == round_to_minor(&(&total_liabilities + &total_equity));

        Ok(BalanceSheet {
            as_of_date,
            assets,
            liabilities,
            equity,
            net_income,
            total_assets,
            total_liabilities,
            total_equity,
            is_balanced,
        })
    }

    /// Balance sheet for two dates side by side
    pub async fn balance_sheet_comparative(
        &self,
        owner: OwnerId,
        current_date: NaiveDate,
        prior_date: NaiveDate,
    ) -> LedgerResult<ComparativeBalanceSheet> {
        Ok(ComparativeBalanceSheet {
            current: self.balance_sheet(owner, current_date).await?,
            prior: self.balance_sheet(owner, prior_date).await?,
        })
    }
}
