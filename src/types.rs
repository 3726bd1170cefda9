//! Core types and data structures for the ledger engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owning tenant of every record in the system. All operations are scoped to
/// exactly one owner; nothing in this crate spans owners.
pub type OwnerId = Uuid;
/// Identifier of an account in the chart of accounts.
pub type AccountId = Uuid;
/// Identifier of a journal entry.
pub type JournalEntryId = Uuid;

/// Account classifications following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// What the business owns (Cash, Receivables, Equipment, etc.)
    Asset,
    /// What the business owes (Payables, Loans, Tax collected, etc.)
    Liability,
    /// Owner's interest in the business (Capital, Retained Earnings)
    Equity,
    /// Money earned by the business
    Revenue,
    /// Costs incurred by the business
    Expense,
}

impl AccountType {
    /// The side on which this account type conventionally increases.
    /// Assets and Expenses carry debit balances; Liabilities, Equity and
    /// Revenue carry credit balances.
    pub fn conventional_balance(&self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }
}

/// The two sides of double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

/// A node in the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    /// Alphanumeric code, unique per owner (e.g. "1200")
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Must agree with `account_type.conventional_balance()`; enforced at creation
    pub normal_balance: NormalBalance,
    /// Optional parent in the account tree; the parent must be a header account
    pub parent_id: Option<AccountId>,
    /// Header accounts are structural grouping nodes and can never be posted to
    pub is_header: bool,
    pub is_active: bool,
    /// System accounts are protected from deletion and reclassification
    pub is_system_account: bool,
    /// Synthetic balance predating any journal entry, signed on the normal side
    pub opening_balance: BigDecimal,
    pub opening_balance_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new postable or header account with its conventional normal balance
    pub fn new(
        owner_id: OwnerId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        parent_id: Option<AccountId>,
        is_header: bool,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            code: code.into(),
            name: name.into(),
            account_type,
            normal_balance: account_type.conventional_balance(),
            parent_id,
            is_header,
            is_active: true,
            is_system_account: false,
            opening_balance: BigDecimal::from(0),
            opening_balance_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if journal entry lines may target this account
    pub fn is_postable(&self) -> bool {
        !self.is_header && self.is_active
    }
}

/// What produced a journal entry. A closed set: new producers get a variant,
/// not a free-form tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Invoice,
    Bill,
    BankTransaction,
    Manual,
    CreditNote,
    DebitNote,
    FixedAssetDepreciation,
}

/// Journal entry lifecycle.
///
/// `Draft → Posted` happens exactly once; `Posted → Reversed` creates a
/// mirror entry and is terminal. No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
    Reversed,
}

impl EntryStatus {
    /// True once the entry's lines participate in ledger balances.
    /// Reversed originals stay in the ledger; their mirror cancels them.
    pub fn is_in_ledger(&self) -> bool {
        matches!(self, EntryStatus::Posted | EntryStatus::Reversed)
    }
}

/// A single debit or credit within a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub account_id: AccountId,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub tax_code: Option<String>,
    pub tax_amount: Option<BigDecimal>,
    pub description: Option<String>,
}

impl JournalEntryLine {
    pub fn debit(account_id: AccountId, amount: BigDecimal) -> Self {
        Self {
            account_id,
            debit_amount: amount,
            credit_amount: BigDecimal::from(0),
            tax_code: None,
            tax_amount: None,
            description: None,
        }
    }

    pub fn credit(account_id: AccountId, amount: BigDecimal) -> Self {
        Self {
            account_id,
            debit_amount: BigDecimal::from(0),
            credit_amount: amount,
            tax_code: None,
            tax_amount: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A line must be exactly one of a debit or a credit, never both or neither
    pub fn is_one_sided(&self) -> bool {
        let zero = BigDecimal::from(0);
        (self.debit_amount > zero && self.credit_amount == zero)
            || (self.credit_amount > zero && self.debit_amount == zero)
    }
}

/// A complete journal entry owning its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub owner_id: OwnerId,
    /// Monotonic per owner, assigned at creation, never reused
    pub entry_number: i64,
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source_type: SourceType,
    /// Opaque link to the producing document, if any
    pub source_id: Option<String>,
    pub status: EntryStatus,
    pub lines: Vec<JournalEntryLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl JournalEntry {
    pub fn total_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit_amount).sum()
    }

    pub fn total_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit_amount).sum()
    }

    /// Balanced to the minor currency unit
    pub fn is_balanced(&self) -> bool {
        round_to_minor(&self.total_debits()) == round_to_minor(&self.total_credits())
    }

    /// Structural validation: at least two lines, each strictly one-sided
    /// with non-negative amounts, and debits equal to credits. Account-level
    /// checks (existence, header, active) belong to the journal engine.
    pub fn validate_lines(&self) -> LedgerResult<()> {
        validate_line_set(&self.lines)
    }
}

/// Structural validation of a line set, shared by the entry builder and the
/// journal engine: at least two lines, each strictly one-sided with
/// non-negative amounts, and debits equal to credits at the minor unit.
pub fn validate_line_set(lines: &[JournalEntryLine]) -> LedgerResult<()> {
    if lines.len() < 2 {
        return Err(LedgerError::Validation(
            "journal entry must have at least two lines".to_string(),
        ));
    }

    let zero = BigDecimal::from(0);
    for line in lines {
        if line.debit_amount < zero || line.credit_amount < zero {
            return Err(LedgerError::Validation(
                "line amounts must not be negative".to_string(),
            ));
        }
        if !line.is_one_sided() {
            return Err(LedgerError::Validation(
                "each line must be exactly one of a debit or a credit".to_string(),
            ));
        }
    }

    let debits: BigDecimal = lines.iter().map(|l| &l.debit_amount).sum();
    let credits: BigDecimal = lines.iter().map(|l| &l.credit_amount).sum();
    if round_to_minor(&debits) != round_to_minor(&credits) {
        return Err(LedgerError::UnbalancedEntry { debits, credits });
    }

    Ok(())
}

/// Status of an accounting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Open for postings; the default when no record exists
    Open,
    /// Closed by a user; reopenable with a reason
    Closed,
    /// Locked by year-end close; not reopenable
    Locked,
}

impl PeriodStatus {
    pub fn can_post(&self) -> bool {
        matches!(self, PeriodStatus::Open)
    }
}

/// Explicit status record for one (owner, year, month) period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub owner_id: OwnerId,
    pub year: i32,
    pub month: u32,
    pub status: PeriodStatus,
    pub closed_at: Option<NaiveDateTime>,
    pub closed_by: Option<String>,
    pub notes: Option<String>,
}

impl AccountingPeriod {
    pub fn open(owner_id: OwnerId, year: i32, month: u32) -> Self {
        Self {
            owner_id,
            year,
            month,
            status: PeriodStatus::Open,
            closed_at: None,
            closed_by: None,
            notes: None,
        }
    }
}

/// Materialized general-ledger row, one per posted journal entry line.
///
/// Derived data: always reconstructable from the posted entry history and
/// never a source of truth. `running_balance` is signed on the account's
/// normal side and seeded with the account's opening balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub account_id: AccountId,
    pub journal_entry_id: JournalEntryId,
    pub entry_number: i64,
    /// Position of the line within its entry, for stable ordering
    pub line_no: u32,
    pub entry_date: NaiveDate,
    pub description: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub running_balance: BigDecimal,
}

/// Supported depreciation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    DecliningBalance,
    DoubleDecliningBalance,
}

/// Lifecycle of one scheduled depreciation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepreciationStatus {
    Scheduled,
    Posted,
    Skipped,
}

/// One period of a fixed asset's depreciation schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationRecord {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub fixed_asset_id: Uuid,
    /// Zero-based index within the asset's schedule
    pub period_index: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount: BigDecimal,
    pub status: DepreciationStatus,
    /// Set once the period has been posted through the journal engine
    pub journal_entry_id: Option<JournalEntryId>,
    pub notes: Option<String>,
}

/// Round an amount to the minor currency unit (two decimal places).
/// All debit/credit equality checks happen at this precision.
pub fn round_to_minor(amount: &BigDecimal) -> BigDecimal {
    amount.round(2)
}

/// Errors that can occur in the ledger engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("entry is not balanced: debits = {debits}, credits = {credits}")]
    UnbalancedEntry {
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("cannot post to header account: {0}")]
    HeaderPosting(String),
    #[error("invalid state transition: {0}")]
    InvalidState(String),
    #[error("accounting period {year}-{month:02} is closed")]
    PeriodClosed { year: i32, month: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("accounting period {year}-{month:02} is already closed")]
    AlreadyClosed { year: i32, month: u32 },
    #[error("accounting period {year}-{month:02} is locked and cannot be reopened")]
    LockedPeriod { year: i32, month: u32 },
    #[error("prior accounting period {year}-{month:02} is still open")]
    OpenPriorPeriod { year: i32, month: u32 },
    #[error("trial balance out of balance before close: debits = {debits}, credits = {credits}")]
    UnbalancedTrialBalance {
        debits: BigDecimal,
        credits: BigDecimal,
    },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
