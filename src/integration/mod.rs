//! Adapters that translate business documents into posted journal entries
//!
//! Document services call these fire-and-forget: a ledger failure must never
//! block or roll back the document that produced it, so every adapter catches
//! core errors, logs them, and reports the outcome instead of propagating.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::warn;

use crate::journal::{EntryBuilder, JournalEngine, NewJournalEntry};
use crate::traits::LedgerStore;
use crate::types::*;

/// Account codes the adapters post against. Defaults follow the standard
/// numbering of the seeded chart; owners with custom charts override them.
#[derive(Debug, Clone)]
pub struct IntegrationAccounts {
    pub cash_code: String,
    pub accounts_receivable_code: String,
    pub tax_recoverable_code: String,
    pub accounts_payable_code: String,
    pub tax_payable_code: String,
    pub sales_code: String,
    pub expense_code: String,
}

impl Default for IntegrationAccounts {
    fn default() -> Self {
        Self {
            cash_code: "1000".to_string(),
            accounts_receivable_code: "1200".to_string(),
            tax_recoverable_code: "1150".to_string(),
            accounts_payable_code: "2000".to_string(),
            tax_payable_code: "2150".to_string(),
            sales_code: "4000".to_string(),
            expense_code: "5000".to_string(),
        }
    }
}

/// One line item on an invoice or credit note
#[derive(Debug, Clone)]
pub struct InvoiceItem {
    pub description: String,
    pub amount: BigDecimal,
    pub tax_amount: BigDecimal,
}

/// Sales invoice as the invoicing service hands it over
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub id: String,
    pub serial_number: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub items: Vec<InvoiceItem>,
}

impl InvoiceDocument {
    fn subtotal(&self) -> BigDecimal {
        self.items.iter().map(|i| &i.amount).sum()
    }

    fn tax_amount(&self) -> BigDecimal {
        self.items.iter().map(|i| &i.tax_amount).sum()
    }
}

/// Vendor bill
#[derive(Debug, Clone)]
pub struct BillDocument {
    pub id: String,
    pub bill_number: String,
    pub date: NaiveDate,
    pub vendor_name: String,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total: BigDecimal,
}

/// What document a payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSource {
    Invoice,
    Bill,
}

/// Payment received against an invoice or made against a bill
#[derive(Debug, Clone)]
pub struct PaymentDocument {
    pub source_type: PaymentSource,
    pub source_id: String,
    pub source_number: String,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub party_name: String,
}

/// Credit note issued to a client; reverses invoice conventions
#[derive(Debug, Clone)]
pub struct CreditNoteDocument {
    pub id: String,
    pub serial_number: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub items: Vec<InvoiceItem>,
}

impl CreditNoteDocument {
    fn subtotal(&self) -> BigDecimal {
        self.items.iter().map(|i| &i.amount).sum()
    }

    fn tax_amount(&self) -> BigDecimal {
        self.items.iter().map(|i| &i.tax_amount).sum()
    }
}

/// Debit note issued to a vendor; reverses bill conventions
#[derive(Debug, Clone)]
pub struct DebitNoteDocument {
    pub id: String,
    pub note_number: String,
    pub date: NaiveDate,
    pub vendor_name: String,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total: BigDecimal,
}

/// Result handed back to the producing service. Failure carries a message
/// for async surfacing; it is never an error to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationOutcome {
    pub success: bool,
    pub entry_id: Option<JournalEntryId>,
    pub error: Option<String>,
}

impl IntegrationOutcome {
    fn posted(entry_id: JournalEntryId) -> Self {
        Self {
            success: true,
            entry_id: Some(entry_id),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            entry_id: None,
            error: Some(error.into()),
        }
    }
}

/// The single surface document services post through
pub struct JournalIntegration<S: LedgerStore> {
    storage: S,
    engine: JournalEngine<S>,
    accounts: IntegrationAccounts,
}

impl<S: LedgerStore + Clone> JournalIntegration<S> {
    pub fn new(storage: S, accounts: IntegrationAccounts) -> Self {
        Self {
            engine: JournalEngine::new(storage.clone()),
            storage,
            accounts,
        }
    }

    /// Gate for producers: owners that never set up a chart of accounts get
    /// no journal entries at all.
    pub async fn has_chart_of_accounts(&self, owner: OwnerId) -> bool {
        match self.storage.list_accounts(owner, None).await {
            Ok(accounts) => !accounts.is_empty(),
            Err(error) => {
                warn!(%owner, %error, "chart of accounts lookup failed");
                false
            }
        }
    }

    /// Invoice: debit Accounts Receivable for the total, credit Sales for
    /// the subtotal, credit Tax Payable for the collected tax.
    pub async fn create_invoice_journal_entry(
        &mut self,
        owner: OwnerId,
        document: &InvoiceDocument,
    ) -> IntegrationOutcome {
        let subtotal = document.subtotal();
        let tax = document.tax_amount();
        let total = &subtotal + &tax;

        let result = async {
            let receivable = self
                .account_by_code(owner, &self.accounts.accounts_receivable_code.clone())
                .await?;
            let sales = self.account_by_code(owner, &self.accounts.sales_code.clone()).await?;

            let mut builder = EntryBuilder::new(
                document.date,
                format!("Invoice {} to {}", document.serial_number, document.client_name),
            )
            .reference(document.serial_number.clone())
            .source(SourceType::Invoice, document.id.clone())
            .debit(receivable, total)
            .credit(sales, subtotal);
            if tax > BigDecimal::from(0) {
                let tax_payable = self
                    .account_by_code(owner, &self.accounts.tax_payable_code.clone())
                    .await?;
                builder = builder.credit(tax_payable, tax);
            }
            self.create_and_post(owner, builder.build()?).await
        }
        .await;

        self.outcome("invoice", &document.id, owner, result)
    }

    /// Bill: debit Expense for the subtotal, debit Tax Recoverable for the
    /// paid tax, credit Accounts Payable for the total.
    pub async fn create_bill_journal_entry(
        &mut self,
        owner: OwnerId,
        document: &BillDocument,
    ) -> IntegrationOutcome {
        let result = async {
            let expense = self.account_by_code(owner, &self.accounts.expense_code.clone()).await?;
            let payable = self
                .account_by_code(owner, &self.accounts.accounts_payable_code.clone())
                .await?;

            let mut builder = EntryBuilder::new(
                document.date,
                format!("Bill {} from {}", document.bill_number, document.vendor_name),
            )
            .reference(document.bill_number.clone())
            .source(SourceType::Bill, document.id.clone())
            .debit(expense, document.subtotal.clone());
            if document.tax_amount > BigDecimal::from(0) {
                let recoverable = self
                    .account_by_code(owner, &self.accounts.tax_recoverable_code.clone())
                    .await?;
                builder = builder.debit(recoverable, document.tax_amount.clone());
            }
            builder = builder.credit(payable, document.total.clone());
            self.create_and_post(owner, builder.build()?).await
        }
        .await;

        self.outcome("bill", &document.id, owner, result)
    }

    /// Payment against an invoice moves Accounts Receivable to Cash; a
    /// payment against a bill moves Cash to Accounts Payable.
    pub async fn create_payment_journal_entry(
        &mut self,
        owner: OwnerId,
        document: &PaymentDocument,
    ) -> IntegrationOutcome {
        let result = async {
            let cash = self.account_by_code(owner, &self.accounts.cash_code.clone()).await?;
            let (debit_account, credit_account, description) = match document.source_type {
                PaymentSource::Invoice => {
                    let receivable = self
                        .account_by_code(owner, &self.accounts.accounts_receivable_code.clone())
                        .await?;
                    (
                        cash,
                        receivable,
                        format!(
                            "Payment received from {} for invoice {}",
                            document.party_name, document.source_number
                        ),
                    )
                }
                PaymentSource::Bill => {
                    let payable = self
                        .account_by_code(owner, &self.accounts.accounts_payable_code.clone())
                        .await?;
                    (
                        payable,
                        cash,
                        format!(
                            "Payment made to {} for bill {}",
                            document.party_name, document.source_number
                        ),
                    )
                }
            };

            let entry = EntryBuilder::new(document.date, description)
                .reference(document.source_number.clone())
                .source(SourceType::BankTransaction, document.source_id.clone())
                .debit(debit_account, document.amount.clone())
                .credit(credit_account, document.amount.clone())
                .build()?;
            self.create_and_post(owner, entry).await
        }
        .await;

        self.outcome("payment", &document.source_id, owner, result)
    }

    /// Credit note: the invoice entry with sides swapped.
    pub async fn create_credit_note_journal_entry(
        &mut self,
        owner: OwnerId,
        document: &CreditNoteDocument,
    ) -> IntegrationOutcome {
        let subtotal = document.subtotal();
        let tax = document.tax_amount();
        let total = &subtotal + &tax;

        let result = async {
            let receivable = self
                .account_by_code(owner, &self.accounts.accounts_receivable_code.clone())
                .await?;
            let sales = self.account_by_code(owner, &self.accounts.sales_code.clone()).await?;

            let mut builder = EntryBuilder::new(
                document.date,
                format!(
                    "Credit note {} to {}",
                    document.serial_number, document.client_name
                ),
            )
            .reference(document.serial_number.clone())
            .source(SourceType::CreditNote, document.id.clone())
            .debit(sales, subtotal);
            if tax > BigDecimal::from(0) {
                let tax_payable = self
                    .account_by_code(owner, &self.accounts.tax_payable_code.clone())
                    .await?;
                builder = builder.debit(tax_payable, tax);
            }
            builder = builder.credit(receivable, total);
            self.create_and_post(owner, builder.build()?).await
        }
        .await;

        self.outcome("credit note", &document.id, owner, result)
    }

    /// Debit note: the bill entry with sides swapped.
    pub async fn create_debit_note_journal_entry(
        &mut self,
        owner: OwnerId,
        document: &DebitNoteDocument,
    ) -> IntegrationOutcome {
        let result = async {
            let expense = self.account_by_code(owner, &self.accounts.expense_code.clone()).await?;
            let payable = self
                .account_by_code(owner, &self.accounts.accounts_payable_code.clone())
                .await?;

            let mut builder = EntryBuilder::new(
                document.date,
                format!(
                    "Debit note {} to {}",
                    document.note_number, document.vendor_name
                ),
            )
            .reference(document.note_number.clone())
            .source(SourceType::DebitNote, document.id.clone())
            .debit(payable, document.total.clone())
            .credit(expense, document.subtotal.clone());
            if document.tax_amount > BigDecimal::from(0) {
                let recoverable = self
                    .account_by_code(owner, &self.accounts.tax_recoverable_code.clone())
                    .await?;
                builder = builder.credit(recoverable, document.tax_amount.clone());
            }
            self.create_and_post(owner, builder.build()?).await
        }
        .await;

        self.outcome("debit note", &document.id, owner, result)
    }

    async fn account_by_code(&self, owner: OwnerId, code: &str) -> LedgerResult<AccountId> {
        self.storage
            .find_account_by_code(owner, code)
            .await?
            .map(|account| account.id)
            .ok_or_else(|| LedgerError::NotFound(format!("account with code {code}")))
    }

    async fn create_and_post(
        &mut self,
        owner: OwnerId,
        new_entry: NewJournalEntry,
    ) -> LedgerResult<JournalEntryId> {
        let entry = self.engine.create_entry(owner, new_entry).await?;
        match self.engine.post_entry(entry.id, owner).await {
            Ok(posted) => Ok(posted.id),
            Err(error) => {
                // Fire-and-forget producers never retry, so a draft that
                // failed to post would sit around forever.
                if let Err(cleanup) = self.engine.delete_draft_entry(entry.id, owner).await {
                    warn!(%owner, entry = %entry.id, %cleanup, "draft cleanup failed");
                }
                Err(error)
            }
        }
    }

    fn outcome(
        &self,
        kind: &str,
        document_id: &str,
        owner: OwnerId,
        result: LedgerResult<JournalEntryId>,
    ) -> IntegrationOutcome {
        match result {
            Ok(entry_id) => IntegrationOutcome::posted(entry_id),
            Err(error) => {
                warn!(%owner, document = document_id, %error, "{kind} journal entry failed");
                IntegrationOutcome::failed(error.to_string())
            }
        }
    }
}
