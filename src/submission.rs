//! 一次提交的完整处理流程：校验摘要、计算指纹、推导地址、注册

use crate::error::Result;
use crate::fingerprint::{Digest, Fingerprint, Fingerprinted};
use crate::registry::{FingerprintRegistry, Ledger, Metadata, Registration};
use crate::vector::Vector;

/// 一次提交
#[derive(Debug, Clone)]
pub struct Submission {
    pub image: Vector,
    pub text: Vector,
    /// 客户端计算的图片摘要，提供时必须与图片向量一致
    pub image_hash: Option<Digest>,
    pub metadata: Metadata,
}

/// 处理结果
#[derive(Debug, Clone)]
pub struct Processed {
    pub text: Vector,
    pub fingerprinted: Fingerprinted,
    pub registration: Registration,
}

/// 处理一次提交
pub fn process<L: Ledger>(registry: &FingerprintRegistry<L>, submission: Submission) -> Result<Processed> {
    let fingerprinted = Fingerprint::compute(&submission.image, &submission.text);
    if let Some(claimed) = &submission.image_hash {
        fingerprinted.fingerprint.verify_image_digest(claimed)?;
    }
    let registration = registry.register(&fingerprinted.fingerprint, submission.metadata)?;
    Ok(Processed { text: submission.text, fingerprinted, registration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressDeriver;
    use crate::error::Error;
    use crate::fingerprint::{hash_seed, hash_vector};
    use crate::registry::MemoryLedger;

    fn submission(image_hash: Option<Digest>) -> Submission {
        Submission {
            image: Vector::new(vec![0., 3., 4.]).unwrap(),
            text: Vector::new(vec![1., 0., 0.]).unwrap(),
            image_hash,
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn test_process() {
        let registry = FingerprintRegistry::new(MemoryLedger::new(), AddressDeriver::default());
        let processed = process(&registry, submission(Some(hash_vector(&[0., 3., 4.])))).unwrap();
        assert_eq!(processed.fingerprinted.combined.as_slice(), &[0., 0.6, 0.8, 1., 0., 0.]);
        assert_eq!(processed.registration.entry.fingerprint, processed.fingerprinted.fingerprint);
    }

    #[test]
    fn test_process_rejects_wrong_image_hash() {
        let registry = FingerprintRegistry::new(MemoryLedger::new(), AddressDeriver::default());
        let err = process(&registry, submission(Some(hash_seed("forged")))).unwrap_err();
        assert!(matches!(err, Error::FingerprintMismatch(_)));
        assert!(registry.ledger().is_empty().unwrap());
    }
}
