//! Builder for journal entries prior to creation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Everything needed to create a journal entry. The engine assigns identity,
/// entry number, and status at creation time.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source_type: SourceType,
    pub source_id: Option<String>,
    pub lines: Vec<JournalEntryLine>,
}

/// Fluent builder for [`NewJournalEntry`]
#[derive(Debug)]
pub struct EntryBuilder {
    draft: NewJournalEntry,
}

impl EntryBuilder {
    pub fn new(entry_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            draft: NewJournalEntry {
                entry_date,
                description: description.into(),
                reference: None,
                source_type: SourceType::Manual,
                source_id: None,
                lines: Vec::new(),
            },
        }
    }

    /// Set the reference (invoice number, check number, etc.)
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.draft.reference = Some(reference.into());
        self
    }

    /// Link the entry to the document that produced it
    pub fn source(mut self, source_type: SourceType, source_id: impl Into<String>) -> Self {
        self.draft.source_type = source_type;
        self.draft.source_id = Some(source_id.into());
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account_id: AccountId, amount: BigDecimal) -> Self {
        self.draft.lines.push(JournalEntryLine::debit(account_id, amount));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account_id: AccountId, amount: BigDecimal) -> Self {
        self.draft
            .lines
            .push(JournalEntryLine::credit(account_id, amount));
        self
    }

    /// Add a fully specified line
    pub fn line(mut self, line: JournalEntryLine) -> Self {
        self.draft.lines.push(line);
        self
    }

    /// Validate the line set and produce the entry payload
    pub fn build(self) -> LedgerResult<NewJournalEntry> {
        validate_line_set(&self.draft.lines)?;
        Ok(self.draft)
    }
}
