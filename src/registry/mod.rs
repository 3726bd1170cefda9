//! Account Registry: the chart of accounts
//!
//! Owns account creation, updates, deletion, the account tree, and
//! point-in-time balances. Accounts form a forest: header accounts group,
//! postable accounts receive journal entry lines. The registry enforces
//! code uniqueness per owner, the normal-balance convention, and acyclicity
//! of the parent chain.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::projection::signed_movement;
use crate::traits::LedgerStore;
use crate::types::*;
use crate::utils::validation::{validate_account_code, validate_account_name};

/// Partial update for an account. `parent_id` is doubly optional: `None`
/// leaves the parent untouched, `Some(None)` detaches the account.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub parent_id: Option<Option<AccountId>>,
    pub is_header: Option<bool>,
    pub is_active: Option<bool>,
}

/// One node of the account forest returned by [`AccountRegistry::get_account_tree`]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AccountNode {
    pub account: Account,
    pub children: Vec<AccountNode>,
}

/// Manages the chart of accounts for all owners
pub struct AccountRegistry<S: LedgerStore> {
    storage: S,
}

impl<S: LedgerStore> AccountRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a new account.
    ///
    /// Fails if the code is taken for this owner, if `normal_balance`
    /// disagrees with the account type's conventional side, or if the parent
    /// is missing or not a header account.
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
        validate_account_code(code)?;
        validate_account_name(name)?;

        if normal_balance != account_type.conventional_balance() {
            return Err(LedgerError::Validation(format!(
                "{account_type:?} accounts must carry a {:?} normal balance",
                account_type.conventional_balance()
            )));
        }

        if self
            .storage
            .find_account_by_code(owner, code)
            .await?
            .is_some()
        {
            return Err(LedgerError::Validation(format!(
                "account code '{code}' already exists"
            )));
        }

        if let Some(parent_id) = parent_id {
            let parent = self
                .storage
                .get_account(owner, parent_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::Validation(format!("parent account {parent_id} does not exist"))
                })?;
            if !parent.is_header {
                return Err(LedgerError::Validation(format!(
                    "parent account '{}' is not a header account",
                    parent.code
                )));
            }
        }

        let account = Account::new(owner, code, name, account_type, parent_id, is_header);
        self.storage.save_account(&account).await?;
        Ok(account)
    }

    /// Get an account by id
    pub async fn get_account(
        &self,
        id: AccountId,
        owner: OwnerId,
    ) -> LedgerResult<Option<Account>> {
        self.storage.get_account(owner, id).await
    }

    /// Get an account by id, erroring if missing
    pub async fn get_account_required(
        &self,
        id: AccountId,
        owner: OwnerId,
    ) -> LedgerResult<Account> {
        self.storage
            .get_account(owner, id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))
    }

    /// List accounts, optionally filtered by type, ordered by code
    pub async fn list_accounts(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(owner, account_type).await
    }

    /// Apply a partial update to an account.
    ///
    /// Rejects parent reassignments that would introduce a cycle, code
    /// collisions, reclassification of system accounts, and turning an
    /// account with postings into a header.
    pub async fn update_account(
        &mut self,
        id: AccountId,
        owner: OwnerId,
        patch: AccountPatch,
    ) -> LedgerResult<Account> {
        let mut account = self.get_account_required(id, owner).await?;

        if let Some(code) = patch.code {
            if code != account.code {
                validate_account_code(&code)?;
                if self
                    .storage
                    .find_account_by_code(owner, &code)
                    .await?
                    .is_some()
                {
                    return Err(LedgerError::Validation(format!(
                        "account code '{code}' already exists"
                    )));
                }
                account.code = code;
            }
        }

        if let Some(name) = patch.name {
            validate_account_name(&name)?;
            account.name = name;
        }

        if let Some(account_type) = patch.account_type {
            if account_type != account.account_type {
                if account.is_system_account {
                    return Err(LedgerError::Conflict(
                        "system accounts cannot be reclassified".to_string(),
                    ));
                }
                account.account_type = account_type;
                account.normal_balance = account_type.conventional_balance();
            }
        }

        if let Some(is_header) = patch.is_header {
            if is_header && !account.is_header && self.storage.account_has_lines(owner, id).await? {
                return Err(LedgerError::Conflict(
                    "account has postings and cannot become a header".to_string(),
                ));
            }
            account.is_header = is_header;
        }

        if let Some(is_active) = patch.is_active {
            account.is_active = is_active;
        }

        if let Some(new_parent) = patch.parent_id {
            if let Some(parent_id) = new_parent {
                if parent_id == id {
                    return Err(LedgerError::Validation(
                        "account cannot be its own parent".to_string(),
                    ));
                }
                let parent = self
                    .storage
                    .get_account(owner, parent_id)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::Validation(format!(
                            "parent account {parent_id} does not exist"
                        ))
                    })?;
                if !parent.is_header {
                    return Err(LedgerError::Validation(format!(
                        "parent account '{}' is not a header account",
                        parent.code
                    )));
                }
                self.ensure_no_cycle(owner, id, parent_id).await?;
            }
            account.parent_id = new_parent;
        }

        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;
        Ok(account)
    }

    /// Record a synthetic opening balance predating any journal entry,
    /// signed on the account's normal side
    pub async fn set_opening_balance(
        &mut self,
        id: AccountId,
        owner: OwnerId,
        amount: BigDecimal,
        as_of: NaiveDate,
    ) -> LedgerResult<Account> {
        let mut account = self.get_account_required(id, owner).await?;
        account.opening_balance = amount;
        account.opening_balance_date = Some(as_of);
        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;
        Ok(account)
    }

    /// Delete an account. Rejected while any journal entry line references
    /// it or while child accounts exist; system accounts are never deletable.
    pub async fn delete_account(&mut self, id: AccountId, owner: OwnerId) -> LedgerResult<()> {
        let account = self.get_account_required(id, owner).await?;

        if account.is_system_account {
            return Err(LedgerError::Conflict(
                "system accounts cannot be deleted".to_string(),
            ));
        }

        if self.storage.account_has_lines(owner, id).await? {
            return Err(LedgerError::Conflict("account has postings".to_string()));
        }

        let all = self.storage.list_accounts(owner, None).await?;
        if all.iter().any(|a| a.parent_id == Some(id)) {
            return Err(LedgerError::Conflict("account has children".to_string()));
        }

        self.storage.delete_account(owner, id).await
    }

    /// The account forest, children grouped under parents and ordered by
    /// code, optionally filtered by account type
    pub async fn get_account_tree(
        &self,
        owner: OwnerId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<AccountNode>> {
        let accounts = self.storage.list_accounts(owner, account_type).await?;

        // Accounts whose parent is filtered out (or missing) become roots.
        let ids: std::collections::HashSet<AccountId> = accounts.iter().map(|a| a.id).collect();
        let roots: Vec<&Account> = accounts
            .iter()
            .filter(|a| a.parent_id.is_none_or(|p| !ids.contains(&p)))
            .collect();

        Ok(roots
            .into_iter()
            .map(|root| Self::build_node(root, &accounts))
            .collect())
    }

    fn build_node(account: &Account, accounts: &[Account]) -> AccountNode {
        let children = accounts
            .iter()
            .filter(|a| a.parent_id == Some(account.id))
            .map(|child| Self::build_node(child, accounts))
            .collect();
        AccountNode {
            account: account.clone(),
            children,
        }
    }

    /// Signed balance of one account as of a date: opening balance plus the
    /// sum of posted line movements on the account's normal side. Draft
    /// entries never count; reversed pairs cancel out.
    pub async fn get_account_balance(
        &self,
        id: AccountId,
        owner: OwnerId,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let account = self.get_account_required(id, owner).await?;

        let opening_applies = match (account.opening_balance_date, as_of_date) {
            (Some(opening), Some(as_of)) => opening <= as_of,
            _ => true,
        };
        let mut balance = if opening_applies {
            account.opening_balance.clone()
        } else {
            BigDecimal::from(0)
        };

        let entries = self.storage.list_entries(owner).await?;
        for entry in entries
            .iter()
            .filter(|e| e.status.is_in_ledger())
            .filter(|e| as_of_date.is_none_or(|d| e.entry_date <= d))
        {
            for line in entry.lines.iter().filter(|l| l.account_id == id) {
                balance += signed_movement(
                    account.normal_balance,
                    &line.debit_amount,
                    &line.credit_amount,
                );
            }
        }

        Ok(balance)
    }

    /// Walk the ancestor chain of the proposed parent; reject if it reaches
    /// the account being re-parented. The store cannot prevent cycles, so
    /// this check runs on every parent reassignment.
    async fn ensure_no_cycle(
        &self,
        owner: OwnerId,
        account_id: AccountId,
        new_parent: AccountId,
    ) -> LedgerResult<()> {
        let mut seen = std::collections::HashSet::new();
        let mut current = Some(new_parent);

        while let Some(id) = current {
            if id == account_id {
                return Err(LedgerError::Validation(
                    "parent assignment would create a cycle in the account tree".to_string(),
                ));
            }
            if !seen.insert(id) {
                // Pre-existing cycle in stored data; stop walking.
                break;
            }
            current = self
                .storage
                .get_account(owner, id)
                .await?
                .and_then(|a| a.parent_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStore;
    use uuid::Uuid;

    fn registry() -> (AccountRegistry<MemoryStore>, OwnerId) {
        (AccountRegistry::new(MemoryStore::new()), Uuid::new_v4())
    }

    #[tokio::test]
    async fn creates_account_with_conventional_balance() {
        let (mut registry, owner) = registry();
        let account = registry
            .create_account(
                owner,
                "1200",
                "Accounts Receivable",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await
            .unwrap();
        assert_eq!(account.code, "1200");
        assert!(account.is_postable());
    }

    #[tokio::test]
    async fn rejects_unconventional_normal_balance() {
        let (mut registry, owner) = registry();
        let result = registry
            .create_account(
                owner,
                "4000",
                "Sales Revenue",
                AccountType::Revenue,
                NormalBalance::Debit,
                None,
                false,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_duplicate_code_per_owner() {
        let (mut registry, owner) = registry();
        registry
            .create_account(
                owner,
                "1000",
                "Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await
            .unwrap();
        let dup = registry
            .create_account(
                owner,
                "1000",
                "Cash Again",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await;
        assert!(matches!(dup, Err(LedgerError::Validation(_))));

        // Same code under another owner is fine.
        let other = Uuid::new_v4();
        assert!(registry
            .create_account(
                other,
                "1000",
                "Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn parent_must_be_header() {
        let (mut registry, owner) = registry();
        let leaf = registry
            .create_account(
                owner,
                "1000",
                "Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                false,
            )
            .await
            .unwrap();
        let result = registry
            .create_account(
                owner,
                "1010",
                "Petty Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                Some(leaf.id),
                false,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn parent_reassignment_cannot_create_cycle() {
        let (mut registry, owner) = registry();
        let top = registry
            .create_account(
                owner,
                "1000",
                "Current Assets",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                true,
            )
            .await
            .unwrap();
        let mid = registry
            .create_account(
                owner,
                "1100",
                "Bank Accounts",
                AccountType::Asset,
                NormalBalance::Debit,
                Some(top.id),
                true,
            )
            .await
            .unwrap();

        // top under mid would make top its own ancestor
        let result = registry
            .update_account(
                top.id,
                owner,
                AccountPatch {
                    parent_id: Some(Some(mid.id)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_blocked_by_children_and_postings() {
        let (mut registry, owner) = registry();
        let parent = registry
            .create_account(
                owner,
                "1000",
                "Current Assets",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                true,
            )
            .await
            .unwrap();
        let child = registry
            .create_account(
                owner,
                "1010",
                "Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                Some(parent.id),
                false,
            )
            .await
            .unwrap();

        let blocked = registry.delete_account(parent.id, owner).await;
        assert!(matches!(blocked, Err(LedgerError::Conflict(_))));

        registry.delete_account(child.id, owner).await.unwrap();
        registry.delete_account(parent.id, owner).await.unwrap();
    }

    #[tokio::test]
    async fn tree_groups_children_under_parents() {
        let (mut registry, owner) = registry();
        let header = registry
            .create_account(
                owner,
                "1000",
                "Current Assets",
                AccountType::Asset,
                NormalBalance::Debit,
                None,
                true,
            )
            .await
            .unwrap();
        registry
            .create_account(
                owner,
                "1010",
                "Cash",
                AccountType::Asset,
                NormalBalance::Debit,
                Some(header.id),
                false,
            )
            .await
            .unwrap();
        registry
            .create_account(
                owner,
                "2000",
                "Accounts Payable",
                AccountType::Liability,
                NormalBalance::Credit,
                None,
                false,
            )
            .await
            .unwrap();

        let forest = registry.get_account_tree(owner, None).await.unwrap();
        assert_eq!(forest.len(), 2);
        let assets = forest.iter().find(|n| n.account.code == "1000").unwrap();
        assert_eq!(assets.children.len(), 1);
        assert_eq!(assets.children[0].account.code, "1010");

        let assets_only = registry
            .get_account_tree(owner, Some(AccountType::Asset))
            .await
            .unwrap();
        assert_eq!(assets_only.len(), 1);
    }
}
