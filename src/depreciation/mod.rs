//! Fixed-asset depreciation schedules
//!
//! A producer for the journal engine, not an invariant system of its own:
//! schedules are computed up front, one record per monthly period, and each
//! record is posted as a balanced two-line entry (debit Depreciation
//! Expense, credit Accumulated Depreciation) dated at period end.

use bigdecimal::BigDecimal;
use chrono::{Months, NaiveDate};
use tracing::warn;
use uuid::Uuid;

use crate::journal::{EntryBuilder, JournalEngine};
use crate::traits::LedgerStore;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

const DECLINING_FACTOR: u32 = 3; // 1.5 expressed as 3/2
const DOUBLE_DECLINING_FACTOR: u32 = 2;

/// One computed period of a depreciation preview
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SchedulePeriod {
    pub period_index: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount: BigDecimal,
    pub accumulated: BigDecimal,
    /// Cost minus accumulated depreciation at period end; never drops below
    /// salvage value
    pub net_book_value: BigDecimal,
}

/// Accounts the posted entries target
#[derive(Debug, Clone)]
pub struct DepreciationAccounts {
    pub expense_account_id: AccountId,
    pub accumulated_account_id: AccountId,
}

/// Outcome of a bulk posting run: per-asset isolation means failures are
/// counted and skipped, never rolled back across records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkPostReport {
    pub processed: usize,
    pub failed: usize,
}

/// Compute a depreciation schedule. Pure: no storage, no side effects.
///
/// Straight line spreads `(cost − salvage) / useful_life_months` evenly with
/// the final period absorbing the rounding remainder, so the schedule sums
/// to exactly cost − salvage. The declining-balance methods apply their rate
/// to net book value each period, clamped so NBV never drops below salvage;
/// their final period also settles at salvage exactly.
pub fn preview_schedule(
    cost: &BigDecimal,
    salvage: &BigDecimal,
    useful_life_months: u32,
    method: DepreciationMethod,
    start_date: NaiveDate,
) -> LedgerResult<Vec<SchedulePeriod>> {
    validate_positive_amount(cost)?;
    if *salvage < BigDecimal::from(0) {
        return Err(LedgerError::Validation(
            "salvage value must not be negative".to_string(),
        ));
    }
    if salvage >= cost {
        return Err(LedgerError::Validation(
            "salvage value must be less than cost".to_string(),
        ));
    }
    if useful_life_months == 0 {
        return Err(LedgerError::Validation(
            "useful life must be at least one month".to_string(),
        ));
    }

    let depreciable = cost - salvage;
    let amounts = match method {
        DepreciationMethod::StraightLine => straight_line_amounts(&depreciable, useful_life_months),
        DepreciationMethod::DecliningBalance => declining_amounts(
            cost,
            salvage,
            useful_life_months,
            &(BigDecimal::from(DECLINING_FACTOR) / BigDecimal::from(2)),
        ),
        DepreciationMethod::DoubleDecliningBalance => declining_amounts(
            cost,
            salvage,
            useful_life_months,
            &BigDecimal::from(DOUBLE_DECLINING_FACTOR),
        ),
    };

    let mut periods = Vec::with_capacity(useful_life_months as usize);
    let mut accumulated = BigDecimal::from(0);
    for (i, amount) in amounts.into_iter().enumerate() {
        let period_start = start_date
            .checked_add_months(Months::new(i as u32))
            .ok_or_else(|| LedgerError::Validation("schedule exceeds calendar range".to_string()))?;
        let period_end = start_date
            .checked_add_months(Months::new(i as u32 + 1))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| LedgerError::Validation("schedule exceeds calendar range".to_string()))?;

        accumulated += &amount;
        periods.push(SchedulePeriod {
            period_index: i as u32,
            period_start,
            period_end,
            amount,
            accumulated: accumulated.clone(),
            net_book_value: cost - &accumulated,
        });
    }

    Ok(periods)
}

/// Even spread at minor-unit precision; earlier periods take the rounded
/// amount, the final period takes whatever remains.
fn straight_line_amounts(depreciable: &BigDecimal, months: u32) -> Vec<BigDecimal> {
    let per_period = round_to_minor(&(depreciable / BigDecimal::from(months)));
    let mut amounts = Vec::with_capacity(months as usize);
    let mut remaining = depreciable.clone();

    for _ in 0..months.saturating_sub(1) {
        let amount = per_period.clone().min(remaining.clone());
        remaining -= &amount;
        amounts.push(amount);
    }
    amounts.push(remaining);
    amounts
}

/// Rate applied to net book value each month, clamped at salvage; the final
/// period settles the remaining NBV down to salvage.
fn declining_amounts(
    cost: &BigDecimal,
    salvage: &BigDecimal,
    months: u32,
    factor: &BigDecimal,
) -> Vec<BigDecimal> {
    let rate = factor / BigDecimal::from(months);
    let zero = BigDecimal::from(0);
    let mut amounts = Vec::with_capacity(months as usize);
    let mut nbv = cost.clone();

    for i in 0..months {
        let headroom = &nbv - salvage;
        let amount = if i == months - 1 {
            headroom
        } else {
            round_to_minor(&(&nbv * &rate)).min(headroom).max(zero.clone())
        };
        nbv -= &amount;
        amounts.push(amount);
    }
    amounts
}

/// Persists schedules and posts them through the journal engine
pub struct DepreciationManager<S: LedgerStore> {
    storage: S,
    engine: JournalEngine<S>,
    accounts: DepreciationAccounts,
}

impl<S: LedgerStore + Clone> DepreciationManager<S> {
    pub fn new(storage: S, accounts: DepreciationAccounts) -> Self {
        Self {
            engine: JournalEngine::new(storage.clone()),
            storage,
            accounts,
        }
    }

    /// Generate and persist the full schedule for an asset on activation,
    /// one `Scheduled` record per period
    #[allow(clippy::too_many_arguments)]
    pub async fn create_schedule(
        &mut self,
        owner: OwnerId,
        fixed_asset_id: Uuid,
        cost: &BigDecimal,
        salvage: &BigDecimal,
        useful_life_months: u32,
        method: DepreciationMethod,
        start_date: NaiveDate,
    ) -> LedgerResult<Vec<DepreciationRecord>> {
        let existing = self
            .storage
            .list_depreciation_records(owner, Some(fixed_asset_id))
            .await?;
        if !existing.is_empty() {
            return Err(LedgerError::Conflict(format!(
                "asset {fixed_asset_id} already has a depreciation schedule"
            )));
        }

        let periods = preview_schedule(cost, salvage, useful_life_months, method, start_date)?;
        let mut records = Vec::with_capacity(periods.len());
        for period in periods {
            let record = DepreciationRecord {
                id: Uuid::new_v4(),
                owner_id: owner,
                fixed_asset_id,
                period_index: period.period_index,
                period_start: period.period_start,
                period_end: period.period_end,
                amount: period.amount,
                status: DepreciationStatus::Scheduled,
                journal_entry_id: None,
                notes: None,
            };
            self.storage.save_depreciation_record(&record).await?;
            records.push(record);
        }
        Ok(records)
    }

    /// Schedule for one asset, ordered by period
    pub async fn get_schedule(
        &self,
        owner: OwnerId,
        fixed_asset_id: Uuid,
    ) -> LedgerResult<Vec<DepreciationRecord>> {
        self.storage
            .list_depreciation_records(owner, Some(fixed_asset_id))
            .await
    }

    /// Post one scheduled period: a two-line entry dated at period end,
    /// created and posted through the journal engine (so period locking and
    /// balance validation apply), then linked back to the record.
    pub async fn post_period(
        &mut self,
        owner: OwnerId,
        depreciation_id: Uuid,
    ) -> LedgerResult<DepreciationRecord> {
        let mut record = self.get_record_required(owner, depreciation_id).await?;
        if record.status != DepreciationStatus::Scheduled {
            return Err(LedgerError::InvalidState(format!(
                "depreciation record {} is {:?} and cannot be posted",
                record.id, record.status
            )));
        }
        validate_positive_amount(&record.amount)?;

        let new_entry = EntryBuilder::new(
            record.period_end,
            format!(
                "Depreciation for asset {} period {}",
                record.fixed_asset_id,
                record.period_index + 1
            ),
        )
        .source(SourceType::FixedAssetDepreciation, record.id.to_string())
        .debit(self.accounts.expense_account_id, record.amount.clone())
        .credit(self.accounts.accumulated_account_id, record.amount.clone())
        .build()?;

        let entry = self.engine.create_entry(owner, new_entry).await?;
        let posted = self.engine.post_entry(entry.id, owner).await?;

        record.status = DepreciationStatus::Posted;
        record.journal_entry_id = Some(posted.id);
        self.storage.update_depreciation_record(&record).await?;
        Ok(record)
    }

    /// Post every scheduled period ending on or before `as_of`, across all
    /// assets. Each record posts in isolation: one failure is logged and
    /// skipped, the run continues, and the report carries the counts.
    pub async fn post_due(&mut self, owner: OwnerId, as_of: NaiveDate) -> LedgerResult<BulkPostReport> {
        let due: Vec<DepreciationRecord> = self
            .storage
            .list_depreciation_records(owner, None)
            .await?
            .into_iter()
            .filter(|r| r.status == DepreciationStatus::Scheduled && r.period_end <= as_of)
            .collect();

        let mut report = BulkPostReport::default();
        for record in due {
            match self.post_period(owner, record.id).await {
                Ok(_) => report.processed += 1,
                Err(error) => {
                    warn!(
                        record = %record.id,
                        asset = %record.fixed_asset_id,
                        %error,
                        "skipping depreciation period after posting failure"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Skip a scheduled period. One-way: a skipped period never re-enters
    /// the schedule and is excluded from subsequent balance calculations.
    pub async fn skip_period(
        &mut self,
        owner: OwnerId,
        depreciation_id: Uuid,
        notes: Option<&str>,
    ) -> LedgerResult<DepreciationRecord> {
        let mut record = self.get_record_required(owner, depreciation_id).await?;
        if record.status != DepreciationStatus::Scheduled {
            return Err(LedgerError::InvalidState(format!(
                "depreciation record {} is {:?} and cannot be skipped",
                record.id, record.status
            )));
        }
        record.status = DepreciationStatus::Skipped;
        if let Some(notes) = notes {
            record.notes = Some(notes.to_string());
        }
        self.storage.update_depreciation_record(&record).await?;
        Ok(record)
    }

    async fn get_record_required(
        &self,
        owner: OwnerId,
        id: Uuid,
    ) -> LedgerResult<DepreciationRecord> {
        self.storage
            .get_depreciation_record(owner, id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("depreciation record {id}")))
    }
}
