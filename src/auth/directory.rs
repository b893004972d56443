// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity store: the system of record for account state and roles.
//!
//! The gates only ask two questions of it, through [`IdentityStore`]:
//! is this account disabled, and what is its role right now.
//!
//! Accounts come in two kinds that live in separate tables with the same
//! shape. Emails ending in the local suffix (default `@local`) are
//! portal-local accounts; everything else is a directory (SSO) account.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::roles::Role;

/// Default email suffix of local accounts.
pub const DEFAULT_LOCAL_SUFFIX: &str = "@local";

/// Identity store failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load identity seed: {0}")]
    Seed(String),
}

/// Read-only view of the identity system of record.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Whether the account is disabled. Unknown accounts are not disabled.
    async fn is_account_disabled(&self, email: &str) -> Result<bool, DirectoryError>;

    /// The role of record, or `None` if the account does not exist.
    async fn authoritative_role(&self, email: &str) -> Result<Option<Role>, DirectoryError>;
}

/// Which table an account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Local,
    Directory,
}

impl AccountKind {
    pub fn classify(email: &str, local_suffix: &str) -> Self {
        if !local_suffix.is_empty() && email.to_ascii_lowercase().ends_with(local_suffix) {
            AccountKind::Local
        } else {
            AccountKind::Directory
        }
    }
}

/// One account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub email: String,
    pub role: Role,
    pub disabled: bool,
}

#[derive(Debug, Deserialize)]
struct SeedRecord {
    email: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Default)]
struct Tables {
    local: HashMap<String, AccountRecord>,
    directory: HashMap<String, AccountRecord>,
}

impl Tables {
    fn table(&self, kind: AccountKind) -> &HashMap<String, AccountRecord> {
        match kind {
            AccountKind::Local => &self.local,
            AccountKind::Directory => &self.directory,
        }
    }

    fn table_mut(&mut self, kind: AccountKind) -> &mut HashMap<String, AccountRecord> {
        match kind {
            AccountKind::Local => &mut self.local,
            AccountKind::Directory => &mut self.directory,
        }
    }
}

/// In-memory identity store with local and directory tables.
pub struct InMemoryDirectory {
    local_suffix: String,
    tables: RwLock<Tables>,
}

impl InMemoryDirectory {
    pub fn new(local_suffix: impl Into<String>) -> Self {
        Self {
            local_suffix: local_suffix.into().to_ascii_lowercase(),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Load accounts from a JSON array of `{email, role, disabled}`.
    pub fn from_seed_file(
        path: impl AsRef<Path>,
        local_suffix: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DirectoryError::Seed(format!("{}: {e}", path.as_ref().display())))?;
        let records: Vec<SeedRecord> =
            serde_json::from_str(&raw).map_err(|e| DirectoryError::Seed(e.to_string()))?;

        let local_suffix = local_suffix.into().to_ascii_lowercase();
        let mut tables = Tables::default();
        for seed in records {
            let record = AccountRecord {
                email: normalize_email(&seed.email),
                role: Role::canonicalize(&seed.role),
                disabled: seed.disabled,
            };
            let kind = AccountKind::classify(&record.email, &local_suffix);
            tables.table_mut(kind).insert(record.email.clone(), record);
        }

        Ok(Self {
            local_suffix,
            tables: RwLock::new(tables),
        })
    }

    /// Insert or replace an account.
    pub async fn upsert(&self, email: &str, role: Role, disabled: bool) {
        let email = normalize_email(email);
        let kind = self.kind_of(&email);
        let record = AccountRecord {
            email: email.clone(),
            role,
            disabled,
        };
        self.tables.write().await.table_mut(kind).insert(email, record);
    }

    /// Flip the disabled flag. Returns false if the account is unknown.
    pub async fn set_disabled(&self, email: &str, disabled: bool) -> bool {
        self.update(email, |record| record.disabled = disabled).await
    }

    /// Change the role of record. Returns false if the account is unknown.
    pub async fn set_role(&self, email: &str, role: Role) -> bool {
        self.update(email, |record| record.role = role).await
    }

    pub async fn get(&self, email: &str) -> Option<AccountRecord> {
        let email = normalize_email(email);
        let kind = self.kind_of(&email);
        self.tables.read().await.table(kind).get(&email).cloned()
    }

    pub async fn len(&self) -> usize {
        let tables = self.tables.read().await;
        tables.local.len() + tables.directory.len()
    }

    async fn update(&self, email: &str, apply: impl FnOnce(&mut AccountRecord)) -> bool {
        let email = normalize_email(email);
        let kind = self.kind_of(&email);
        match self.tables.write().await.table_mut(kind).get_mut(&email) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }

    fn kind_of(&self, email: &str) -> AccountKind {
        AccountKind::classify(email, &self.local_suffix)
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_SUFFIX)
    }
}

#[async_trait]
impl IdentityStore for InMemoryDirectory {
    async fn is_account_disabled(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self.get(email).await.is_some_and(|record| record.disabled))
    }

    async fn authoritative_role(&self, email: &str) -> Result<Option<Role>, DirectoryError> {
        Ok(self.get(email).await.map(|record| record.role))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
