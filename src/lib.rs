//! # Ledger Core
//!
//! A double-entry ledger and accounting-period engine: chart of accounts,
//! journal entries with a strict draft/posted/reversed lifecycle, monthly
//! period locking, a materialized general ledger, financial statements,
//! depreciation schedules, and adapters that turn business documents into
//! postings.
//!
//! ## Features
//!
//! - **Double-entry bookkeeping**: Entries are balanced at the minor unit or
//!   rejected at creation, never at posting
//! - **Chart of accounts**: Hierarchical accounts with header/postable split
//!   and per-owner code uniqueness
//! - **Accounting periods**: Chronological month close, audited reopen, and
//!   year-end close with period locking
//! - **General ledger**: Materialized per-account rows with running balances,
//!   rebuildable from the posted history at any time
//! - **Financial reporting**: Trial balance, profit & loss, and balance sheet
//!   with comparative variants
//! - **Depreciation**: Straight-line and declining-balance schedules posted
//!   through the journal engine
//! - **Storage abstraction**: Database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_core::{Ledger, MemoryStore, AccountType, NormalBalance, EntryBuilder};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() -> ledger_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStore::new());
//! let owner = Uuid::new_v4();
//!
//! let cash = ledger
//!     .create_account(owner, "1000", "Cash", AccountType::Asset,
//!         NormalBalance::Debit, None, false)
//!     .await?;
//! let revenue = ledger
//!     .create_account(owner, "4000", "Sales Revenue", AccountType::Revenue,
//!         NormalBalance::Credit, None, false)
//!     .await?;
//!
//! let entry = ledger
//!     .create_entry(
//!         owner,
//!         EntryBuilder::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), "Cash sale")
//!             .debit(cash.id, BigDecimal::from(1000))
//!             .credit(revenue.id, BigDecimal::from(1000))
//!             .build()?,
//!     )
//!     .await?;
//! ledger.post_entry(entry.id, owner).await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod depreciation;
pub mod integration;
pub mod journal;
pub mod period;
pub mod projection;
pub mod registry;
pub mod statements;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Ledger, YearEndClose};
pub use journal::*;
pub use period::PeriodManager;
pub use projection::{GeneralLedgerQuery, LedgerProjector};
pub use registry::{AccountNode, AccountPatch, AccountRegistry};
pub use statements::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStore;
