use std::path::Path;

use heed::types::{Bytes, SerdeBincode};
use heed::{Database, Env, EnvOpenOptions, WithTls};
use log::info;

use super::{CommitOutcome, CommitReceipt, Ledger, RegistryEntry};
use crate::address::Address;
use crate::error::{Error, Result};

/// 基于 lmdb 的账本
///
/// lmdb 同一时间只允许一个写事务，因此在写事务内先查询再写入即满足条件创建的原子性。
pub struct LmdbLedger {
    /// lmdb env，此处使用了 Thread Local Storage 提升速度
    env: Env<WithTls>,
    /// 地址 -> 条目
    db_entry: Database<Bytes, SerdeBincode<RegistryEntry>>,
}

impl LmdbLedger {
    /// 打开账本目录，不存在时创建
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .map_err(|e| Error::LedgerUnavailable(format!("无法创建 {}: {e}", path.display())))?;
        info!("打开账本: {}", path.display());

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 34) // 16GiB 的地址空间，实际占用随数据增长
                .max_dbs(1)
                .open(path)?
        };
        let mut txn = env.write_txn()?;
        let db_entry = env.create_database(&mut txn, Some("entry"))?;
        txn.commit()?;
        Ok(Self { env, db_entry })
    }

    /// 条目数量
    pub fn len(&self) -> Result<u64> {
        let txn = self.env.read_txn()?;
        Ok(self.db_entry.len(&txn)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Ledger for LmdbLedger {
    fn conditional_create(&self, address: &Address, entry: RegistryEntry) -> Result<CommitOutcome> {
        let mut txn = self.env.write_txn()?;
        if let Some(existing) = self.db_entry.get(&txn, address.as_ref())? {
            // 未提交的写事务在 drop 时回滚
            return Ok(CommitOutcome::AlreadyExists(existing));
        }
        let receipt = CommitReceipt::for_entry(&entry)?;
        self.db_entry.put(&mut txn, address.as_ref(), &entry)?;
        txn.commit()?;
        Ok(CommitOutcome::Created { entry, receipt })
    }

    fn get(&self, address: &Address) -> Result<Option<RegistryEntry>> {
        let txn = self.env.read_txn()?;
        Ok(self.db_entry.get(&txn, address.as_ref())?)
    }
}
