//! Accounting period management
//!
//! Periods are keyed by (owner, year, month) and implicitly open until a
//! record says otherwise. Closed periods reject postings but can be reopened
//! with a documented reason; locked periods are the result of a year-end
//! close and stay locked. Periods close in chronological order so a closed
//! month can never sit on top of an open earlier one.

use chrono::{Datelike, NaiveDate};

use crate::traits::LedgerStore;
use crate::types::*;

/// Manages open/closed/locked status per accounting period
pub struct PeriodManager<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> PeriodManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Status of one period; Open when no record exists
    pub async fn get_period_status(
        &self,
        owner: OwnerId,
        year: i32,
        month: u32,
    ) -> LedgerResult<PeriodStatus> {
        Ok(self
            .storage
            .get_period(owner, year, month)
            .await?
            .map(|p| p.status)
            .unwrap_or(PeriodStatus::Open))
    }

    /// True if entries dated within the containing period may be posted
    pub async fn can_post_to_date(&self, owner: OwnerId, date: NaiveDate) -> LedgerResult<bool> {
        let status = self
            .get_period_status(owner, date.year(), date.month())
            .await?;
        Ok(status.can_post())
    }

    /// Posting gate used by the journal engine
    pub(crate) async fn ensure_postable(&self, owner: OwnerId, date: NaiveDate) -> LedgerResult<()> {
        if self.can_post_to_date(owner, date).await? {
            Ok(())
        } else {
            Err(LedgerError::PeriodClosed {
                year: date.year(),
                month: date.month(),
            })
        }
    }

    /// Close a period.
    ///
    /// Fails with `AlreadyClosed` if the period is closed or locked, and with
    /// `OpenPriorPeriod` if any earlier period back to the owner's first
    /// activity is still open — periods close strictly in order.
    pub async fn close_period(
        &mut self,
        owner: OwnerId,
        year: i32,
        month: u32,
        closed_by: Option<&str>,
        notes: Option<&str>,
    ) -> LedgerResult<AccountingPeriod> {
        validate_month(month)?;

        let existing = self.storage.get_period(owner, year, month).await?;
        if let Some(ref period) = existing {
            if period.status != PeriodStatus::Open {
                return Err(LedgerError::AlreadyClosed { year, month });
            }
        }

        self.ensure_prior_periods_closed(owner, year, month).await?;

        let mut period =
            existing.unwrap_or_else(|| AccountingPeriod::open(owner, year, month));
        period.status = PeriodStatus::Closed;
        period.closed_at = Some(chrono::Utc::now().naive_utc());
        period.closed_by = closed_by.map(str::to_string);
        if let Some(notes) = notes {
            period.notes = Some(notes.to_string());
        }
        self.storage.save_period(&period).await?;
        Ok(period)
    }

    /// Reopen a closed period. Requires a non-empty reason, which is kept in
    /// the period notes as an audit trail. Locked periods cannot be reopened.
    pub async fn reopen_period(
        &mut self,
        owner: OwnerId,
        year: i32,
        month: u32,
        reason: &str,
    ) -> LedgerResult<AccountingPeriod> {
        validate_month(month)?;

        if reason.trim().is_empty() {
            return Err(LedgerError::Validation(
                "reopening a period requires a reason".to_string(),
            ));
        }

        let mut period = self
            .storage
            .get_period(owner, year, month)
            .await?
            .ok_or_else(|| {
                LedgerError::InvalidState(format!("period {year}-{month:02} is not closed"))
            })?;

        match period.status {
            PeriodStatus::Locked => return Err(LedgerError::LockedPeriod { year, month }),
            PeriodStatus::Open => {
                return Err(LedgerError::InvalidState(format!(
                    "period {year}-{month:02} is not closed"
                )))
            }
            PeriodStatus::Closed => {}
        }

        period.status = PeriodStatus::Open;
        period.closed_at = None;
        period.closed_by = None;
        period.notes = Some(match period.notes.take() {
            Some(existing) => format!("{existing}; reopened: {reason}"),
            None => format!("reopened: {reason}"),
        });
        self.storage.save_period(&period).await?;
        Ok(period)
    }

    /// Lock one period as part of a year-end close. Crate-internal: locking
    /// is only ever driven by the close itself.
    pub(crate) async fn lock_period(
        &mut self,
        owner: OwnerId,
        year: i32,
        month: u32,
        closed_by: Option<&str>,
    ) -> LedgerResult<AccountingPeriod> {
        let mut period = self
            .storage
            .get_period(owner, year, month)
            .await?
            .unwrap_or_else(|| AccountingPeriod::open(owner, year, month));
        if period.status != PeriodStatus::Locked {
            period.status = PeriodStatus::Locked;
            period.closed_at = Some(chrono::Utc::now().naive_utc());
            period.closed_by = closed_by.map(str::to_string);
        }
        self.storage.save_period(&period).await?;
        Ok(period)
    }

    /// Every period from the owner's first activity up to (but excluding)
    /// the target must already be closed or locked. First activity is the
    /// earlier of the first explicit period record and the first journal
    /// entry date; with no activity at all there is nothing prior to check.
    async fn ensure_prior_periods_closed(
        &self,
        owner: OwnerId,
        year: i32,
        month: u32,
    ) -> LedgerResult<()> {
        let first_record = self
            .storage
            .list_periods(owner)
            .await?
            .into_iter()
            .map(|p| (p.year, p.month))
            .min();
        let first_entry = self
            .storage
            .list_entries(owner)
            .await?
            .iter()
            .map(|e| (e.entry_date.year(), e.entry_date.month()))
            .min();

        let start = match (first_record, first_entry) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return Ok(()),
        };

        let (mut y, mut m) = start;
        while (y, m) < (year, month) {
            let status = self.get_period_status(owner, y, m).await?;
            if status == PeriodStatus::Open {
                return Err(LedgerError::OpenPriorPeriod { year: y, month: m });
            }
            (y, m) = next_month(y, m);
        }
        Ok(())
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn validate_month(month: u32) -> LedgerResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStore;
    use uuid::Uuid;

    fn manager() -> (PeriodManager<MemoryStore>, OwnerId) {
        (PeriodManager::new(MemoryStore::new()), Uuid::new_v4())
    }

    #[tokio::test]
    async fn periods_default_to_open() {
        let (manager, owner) = manager();
        assert_eq!(
            manager.get_period_status(owner, 2024, 1).await.unwrap(),
            PeriodStatus::Open
        );
        assert!(manager
            .can_post_to_date(owner, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn close_then_reclose_fails() {
        let (mut manager, owner) = manager();
        manager
            .close_period(owner, 2024, 1, Some("alex"), None)
            .await
            .unwrap();
        assert_eq!(
            manager.get_period_status(owner, 2024, 1).await.unwrap(),
            PeriodStatus::Closed
        );
        assert!(matches!(
            manager.close_period(owner, 2024, 1, None, None).await,
            Err(LedgerError::AlreadyClosed { .. })
        ));
    }

    #[tokio::test]
    async fn periods_close_in_chronological_order() {
        let (mut manager, owner) = manager();
        manager.close_period(owner, 2024, 1, None, None).await.unwrap();

        // February skipped: closing March must fail on February.
        let result = manager.close_period(owner, 2024, 3, None, None).await;
        assert!(matches!(
            result,
            Err(LedgerError::OpenPriorPeriod { year: 2024, month: 2 })
        ));

        manager.close_period(owner, 2024, 2, None, None).await.unwrap();
        manager.close_period(owner, 2024, 3, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn reopen_requires_reason_and_rejects_locked() {
        let (mut manager, owner) = manager();
        manager.close_period(owner, 2024, 1, None, None).await.unwrap();

        assert!(matches!(
            manager.reopen_period(owner, 2024, 1, "  ").await,
            Err(LedgerError::Validation(_))
        ));

        let reopened = manager
            .reopen_period(owner, 2024, 1, "missed vendor bill")
            .await
            .unwrap();
        assert_eq!(reopened.status, PeriodStatus::Open);
        assert!(reopened.notes.unwrap().contains("missed vendor bill"));

        manager.lock_period(owner, 2024, 1, None).await.unwrap();
        assert!(matches!(
            manager.reopen_period(owner, 2024, 1, "audit").await,
            Err(LedgerError::LockedPeriod { .. })
        ));
    }

    #[tokio::test]
    async fn closed_period_blocks_posting_date() {
        let (mut manager, owner) = manager();
        manager.close_period(owner, 2024, 1, None, None).await.unwrap();
        assert!(!manager
            .can_post_to_date(owner, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .await
            .unwrap());
        assert!(manager
            .can_post_to_date(owner, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .await
            .unwrap());
    }
}
