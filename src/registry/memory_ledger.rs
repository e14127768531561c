use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{CommitOutcome, CommitReceipt, Ledger, RegistryEntry};
use crate::address::Address;
use crate::error::{Error, Result};

/// 内存账本，检查与写入在同一把写锁内完成
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<Address, RegistryEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 条目数量
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Address, RegistryEntry>>> {
        self.entries.read().map_err(|_| Error::LedgerUnavailable("内存账本锁已中毒".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Address, RegistryEntry>>> {
        self.entries.write().map_err(|_| Error::LedgerUnavailable("内存账本锁已中毒".to_string()))
    }
}

impl Ledger for MemoryLedger {
    fn conditional_create(&self, address: &Address, entry: RegistryEntry) -> Result<CommitOutcome> {
        let mut entries = self.write()?;
        if let Some(existing) = entries.get(address) {
            return Ok(CommitOutcome::AlreadyExists(existing.clone()));
        }
        let receipt = CommitReceipt::for_entry(&entry)?;
        entries.insert(*address, entry.clone());
        Ok(CommitOutcome::Created { entry, receipt })
    }

    fn get(&self, address: &Address) -> Result<Option<RegistryEntry>> {
        Ok(self.read()?.get(address).cloned())
    }
}
