mod entry;
mod lmdb_ledger;
mod memory_ledger;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

pub use self::entry::*;
pub use self::lmdb_ledger::LmdbLedger;
pub use self::memory_ledger::MemoryLedger;
use crate::address::{Address, AddressDeriver, DerivedAddress};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::metrics;

/// 条件创建的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// 地址上原本没有条目，已写入
    Created { entry: RegistryEntry, receipt: CommitReceipt },
    /// 地址上已有条目，未写入
    AlreadyExists(RegistryEntry),
}

/// 外部账本，以地址为键的提交日志
///
/// `conditional_create` 必须是原子的：检查地址是否存在与写入必须在同一个临界区内完成，
/// 并发提交同一地址时只有一个能得到 `Created`。
pub trait Ledger: Send + Sync {
    fn conditional_create(&self, address: &Address, entry: RegistryEntry) -> Result<CommitOutcome>;

    fn get(&self, address: &Address) -> Result<Option<RegistryEntry>>;
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn conditional_create(&self, address: &Address, entry: RegistryEntry) -> Result<CommitOutcome> {
        (**self).conditional_create(address, entry)
    }

    fn get(&self, address: &Address) -> Result<Option<RegistryEntry>> {
        (**self).get(address)
    }
}

/// 注册附带的元数据
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub provenance: Provenance,
    /// 可选的辅助种子，哈希后参与地址推导
    pub seed: Option<String>,
}

/// 注册成功的结果
#[derive(Debug, Clone)]
pub struct Registration {
    pub entry: RegistryEntry,
    pub receipt: CommitReceipt,
}

/// 指纹注册表
///
/// 自身不持有可变状态，只负责推导地址、构造条目并交给账本提交。
pub struct FingerprintRegistry<L> {
    ledger: L,
    deriver: AddressDeriver,
}

impl<L: Ledger> FingerprintRegistry<L> {
    pub fn new(ledger: L, deriver: AddressDeriver) -> Self {
        Self { ledger, deriver }
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// 计算指纹对应的地址
    pub fn address_of(&self, fingerprint: &Fingerprint, seed: Option<&str>) -> Result<DerivedAddress> {
        self.deriver.derive_with_seed(&fingerprint.combined, seed)
    }

    /// 注册指纹
    ///
    /// 相同内容总是推导出相同地址，已存在时返回 `DuplicateFingerprint` 并带上已有条目。
    /// 先查询只是快速路径，最终以账本的条件创建结果为准。
    pub fn register(&self, fingerprint: &Fingerprint, metadata: Metadata) -> Result<Registration> {
        metadata.provenance.validate()?;
        let DerivedAddress { address, bump } = self.address_of(fingerprint, metadata.seed.as_deref())?;

        if let Some(existing) = self.ledger.get(&address)? {
            return Err(self.reject_existing(fingerprint, existing));
        }

        let entry = RegistryEntry::pending(address, bump, *fingerprint, metadata.provenance, now());
        match self.ledger.conditional_create(&address, entry)? {
            CommitOutcome::Created { entry, receipt } => {
                info!("注册指纹 {} -> {address} (bump = {bump})", fingerprint.combined);
                metrics::inc_registration("created");
                metrics::observe_bump(bump);
                Ok(Registration { entry, receipt })
            }
            CommitOutcome::AlreadyExists(existing) => Err(self.reject_existing(fingerprint, existing)),
        }
    }

    /// 查询地址上的条目
    pub fn lookup(&self, address: &Address) -> Result<RegistryEntry> {
        self.ledger.get(address)?.ok_or_else(|| Error::NotFound(address.to_string()))
    }

    fn reject_existing(&self, fingerprint: &Fingerprint, existing: RegistryEntry) -> Error {
        let stored = &existing.fingerprint;
        let err = if stored.same_content(fingerprint) {
            warn!("指纹重复提交: {} 已注册于 {}", fingerprint.combined, existing.address);
            Error::DuplicateFingerprint(Box::new(existing))
        } else if stored.scheme != fingerprint.scheme {
            Error::SchemeMismatch {
                stored: stored.scheme.to_string(),
                submitted: fingerprint.scheme.to_string(),
            }
        } else {
            warn!("地址 {} 上的条目指纹不一致", existing.address);
            Error::FingerprintMismatch(format!(
                "地址 {} 已存储指纹 {}，提交指纹 {}",
                existing.address, stored.combined, fingerprint.combined
            ))
        };
        metrics::inc_registration(err.kind().as_str());
        err
    }
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::hash_seed;
    use crate::vector::Vector;

    fn fingerprint() -> Fingerprint {
        let image = Vector::new(vec![0., 3., 4.]).unwrap();
        let text = Vector::new(vec![1., 0., 0.]).unwrap();
        Fingerprint::compute(&image, &text).fingerprint
    }

    fn registry() -> FingerprintRegistry<MemoryLedger> {
        FingerprintRegistry::new(MemoryLedger::new(), AddressDeriver::default())
    }

    #[test]
    fn test_register_then_duplicate() {
        let registry = registry();
        let fp = fingerprint();

        let first = registry.register(&fp, Metadata::default()).unwrap();
        assert_eq!(first.entry.verdict, Verdict::Pending);
        assert_eq!(first.entry.canon_score.get(), 0);
        assert_eq!(first.entry.bump, 253);
        assert_eq!(first.entry.address.to_string(), "BCqcy93X3Vo7to5aeFbFLfEYK9FciXmzGn8t4CDDFxcP");

        let err = registry.register(&fp, Metadata::default()).unwrap_err();
        match err {
            Error::DuplicateFingerprint(existing) => assert_eq!(*existing, first.entry),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(registry.ledger().len().unwrap(), 1);
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        let fp = fingerprint();
        let address = registry.address_of(&fp, None).unwrap().address;
        assert!(matches!(registry.lookup(&address), Err(Error::NotFound(_))));

        let registration = registry.register(&fp, Metadata::default()).unwrap();
        assert_eq!(registry.lookup(&address).unwrap(), registration.entry);
    }

    #[test]
    fn test_seed_changes_address() {
        let registry = registry();
        let fp = fingerprint();
        let a = registry.register(&fp, Metadata::default()).unwrap();
        let metadata = Metadata { seed: Some("campaign-7".to_string()), ..Default::default() };
        let b = registry.register(&fp, metadata).unwrap();
        assert_ne!(a.entry.address, b.entry.address);
        assert_eq!(b.entry.bump, 252);
    }

    #[test]
    fn test_conflicting_entry_at_address() {
        let registry = registry();
        let fp = fingerprint();
        let derived = registry.address_of(&fp, None).unwrap();
        let other = Fingerprint { combined: hash_seed("other"), ..fp };
        let planted =
            RegistryEntry::pending(derived.address, derived.bump, other, Provenance::default(), 0);
        registry.ledger().conditional_create(&derived.address, planted).unwrap();

        let err = registry.register(&fp, Metadata::default()).unwrap_err();
        assert!(matches!(err, Error::FingerprintMismatch(_)));
    }

    /// 绕过快速路径的账本，模拟查询与创建之间被其他提交者抢先
    struct RacingLedger {
        inner: MemoryLedger,
    }

    impl Ledger for RacingLedger {
        fn conditional_create(&self, address: &Address, entry: RegistryEntry) -> Result<CommitOutcome> {
            self.inner.conditional_create(address, entry)
        }

        fn get(&self, _address: &Address) -> Result<Option<RegistryEntry>> {
            Ok(None)
        }
    }

    #[test]
    fn test_conditional_create_is_final_arbiter() {
        let registry = FingerprintRegistry::new(
            RacingLedger { inner: MemoryLedger::new() },
            AddressDeriver::default(),
        );
        let fp = fingerprint();
        registry.register(&fp, Metadata::default()).unwrap();
        let err = registry.register(&fp, Metadata::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DuplicateFingerprint);
    }
}
