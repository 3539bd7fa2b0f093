//! In-memory collaborator implementations for testing and development
//!
//! Production deployments supply their own numbering, account directory, and
//! notification services; these defaults keep the core usable without them.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::traits::{AccountResolver, NotificationSender, VoucherNumbering};
use crate::types::*;

/// Sequential per-type voucher numbering: "<PREFIX>/<zero-padded counter>"
#[derive(Debug, Clone)]
pub struct SequenceNumbering {
    counters: Arc<RwLock<HashMap<VoucherType, u64>>>,
}

impl SequenceNumbering {
    /// Create a numbering service starting every type at 1
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for SequenceNumbering {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoucherNumbering for SequenceNumbering {
    async fn next_number(&mut self, voucher_type: VoucherType) -> VoucherResult<String> {
        let mut counters = self.counters.write().unwrap();
        let counter = counters.entry(voucher_type).or_insert(0);
        *counter += 1;
        Ok(format!("{}/{:04}", voucher_type.prefix(), counter))
    }
}

/// Static account directory resolving references against registered names
#[derive(Debug, Clone, Default)]
pub struct StaticAccountDirectory {
    customers: HashMap<String, String>,
    suppliers: HashMap<String, String>,
    ledger_accounts: HashSet<String>,
}

impl StaticAccountDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer id with its display name
    pub fn with_customer(mut self, id: &str, name: &str) -> Self {
        self.customers.insert(id.to_string(), name.to_string());
        self
    }

    /// Register a supplier id with its display name
    pub fn with_supplier(mut self, id: &str, name: &str) -> Self {
        self.suppliers.insert(id.to_string(), name.to_string());
        self
    }

    /// Register a ledger account name
    pub fn with_ledger_account(mut self, name: &str) -> Self {
        self.ledger_accounts.insert(name.to_string());
        self
    }
}

#[async_trait]
impl AccountResolver for StaticAccountDirectory {
    async fn resolve(&self, account: &AccountRef) -> VoucherResult<String> {
        let resolved = match account {
            AccountRef::Customer(id) => self.customers.get(id).cloned(),
            AccountRef::Supplier(id) => self.suppliers.get(id).cloned(),
            AccountRef::LedgerAccount(name) => {
                self.ledger_accounts.contains(name).then(|| name.clone())
            }
        };
        resolved.ok_or_else(|| VoucherError::AccountNotFound(account.id().to_string()))
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Notification sender that records messages instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<SentNotification>>>,
}

impl RecordingNotifier {
    /// Create a recorder with no messages
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> VoucherResult<()> {
        self.sent.write().unwrap().push(SentNotification {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
