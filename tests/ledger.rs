use std::sync::{Arc, Barrier};
use std::thread;

use memecanon::Error;
use memecanon::address::AddressDeriver;
use memecanon::fingerprint::{Fingerprint, hash_seed};
use memecanon::registry::*;
use memecanon::vector::Vector;
use rstest::*;
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

#[fixture]
fn fingerprint() -> Fingerprint {
    let image = Vector::new(vec![0., 3., 4.]).unwrap();
    let text = Vector::new(vec![1., 0., 0.]).unwrap();
    Fingerprint::compute(&image, &text).fingerprint
}

fn provenance(submitter: &str) -> Provenance {
    Provenance {
        submitter: submitter.to_string(),
        content_locator: "ipfs://content".to_string(),
        metadata_locator: "ipfs://metadata".to_string(),
    }
}

#[rstest]
fn test_conditional_create(temp_dir: TempDir, fingerprint: Fingerprint) {
    let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
    assert!(ledger.is_empty().unwrap());

    let derived = AddressDeriver::default().derive(&[fingerprint.combined]).unwrap();
    let entry = RegistryEntry::pending(derived.address, derived.bump, fingerprint, provenance("a"), 1);

    let outcome = ledger.conditional_create(&derived.address, entry.clone()).unwrap();
    let CommitOutcome::Created { entry: created, receipt } = outcome else {
        panic!("expected a new entry");
    };
    assert_eq!(created, entry);
    assert_eq!(receipt, CommitReceipt::for_entry(&entry).unwrap());
    assert_eq!(receipt.as_str().len(), 64);

    // 第二次写入不会覆盖已有条目
    let other = RegistryEntry::pending(derived.address, derived.bump, fingerprint, provenance("b"), 2);
    let outcome = ledger.conditional_create(&derived.address, other).unwrap();
    assert_eq!(outcome, CommitOutcome::AlreadyExists(entry.clone()));

    assert_eq!(ledger.get(&derived.address).unwrap(), Some(entry));
    assert_eq!(ledger.len().unwrap(), 1);
}

#[rstest]
fn test_reopen(temp_dir: TempDir, fingerprint: Fingerprint) {
    let address = {
        let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
        let registry = FingerprintRegistry::new(ledger, AddressDeriver::default());
        let metadata = Metadata { provenance: provenance("alice"), seed: None };
        registry.register(&fingerprint, metadata).unwrap().entry.address
    };

    let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
    let registry = FingerprintRegistry::new(ledger, AddressDeriver::default());
    let entry = registry.lookup(&address).unwrap();
    assert_eq!(entry.fingerprint, fingerprint);
    assert_eq!(entry.provenance.submitter, "alice");
    assert_eq!(entry.verdict, Verdict::Pending);

    let err = registry.register(&fingerprint, Metadata::default()).unwrap_err();
    assert!(matches!(err, Error::DuplicateFingerprint(_)));
}

#[rstest]
fn test_missing_address(temp_dir: TempDir) {
    let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
    let registry = FingerprintRegistry::new(ledger, AddressDeriver::default());
    let address = AddressDeriver::default().derive(&[hash_seed("nothing")]).unwrap().address;
    assert!(matches!(registry.lookup(&address), Err(Error::NotFound(_))));
}

#[rstest]
fn test_concurrent_register(temp_dir: TempDir, fingerprint: Fingerprint) {
    const N: usize = 8;

    let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
    let registry = Arc::new(FingerprintRegistry::new(ledger, AddressDeriver::default()));
    let barrier = Arc::new(Barrier::new(N));

    let handles = (0..N)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let metadata = Metadata { provenance: provenance(&format!("user-{i}")), seed: None };
                barrier.wait();
                registry.register(&fingerprint, metadata)
            })
        })
        .collect::<Vec<_>>();

    let results = handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>();
    let created = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results.iter().filter(|r| matches!(r, Err(Error::DuplicateFingerprint(_)))).count();
    assert_eq!(created, 1);
    assert_eq!(duplicates, N - 1);
    assert_eq!(registry.ledger().len().unwrap(), 1);
}

#[rstest]
fn test_provenance_too_long(temp_dir: TempDir, fingerprint: Fingerprint) {
    let ledger = LmdbLedger::open(temp_dir.path()).unwrap();
    let registry = FingerprintRegistry::new(ledger, AddressDeriver::default());
    let metadata = Metadata {
        provenance: Provenance { content_locator: "x".repeat(101), ..provenance("a") },
        seed: None,
    };
    let err = registry.register(&fingerprint, metadata).unwrap_err();
    assert!(matches!(err, Error::InvalidProvenance(_)));
    assert!(registry.ledger().is_empty().unwrap());
}
