// Coupon code generation
//
// Codes are 12 characters drawn uniformly from A-Z0-9. A candidate is accepted
// only if no stored coupon (soft-deleted included) and no earlier code of the
// same batch already uses it. Each batch draws from its own entropy-seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::store::{StoreError, UnitOfWork};

pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 12;

const DEFAULT_MAX_ATTEMPTS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CodeGenerationError {
    #[error("No unique coupon code found after {0} attempts")]
    Exhausted(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Draw a single candidate code
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Whether `code` has the shape of a generated coupon code
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Issues globally unique coupon codes
#[derive(Debug, Clone, Copy)]
pub struct CouponCodeGenerator {
    max_attempts_per_code: usize,
}

impl Default for CouponCodeGenerator {
    fn default() -> Self {
        Self {
            max_attempts_per_code: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl CouponCodeGenerator {
    pub fn new(max_attempts_per_code: usize) -> Self {
        Self {
            max_attempts_per_code: max_attempts_per_code.max(1),
        }
    }

    /// Issue `count` distinct codes unused anywhere in the store
    ///
    /// # Returns
    /// Codes in generation order
    pub async fn issue_codes(
        &self,
        uow: &mut dyn UnitOfWork,
        count: usize,
    ) -> Result<Vec<String>, CodeGenerationError> {
        let mut rng = StdRng::from_entropy();
        self.issue_codes_with(&mut rng, uow, count).await
    }

    /// Same as `issue_codes` with a caller-supplied RNG
    pub async fn issue_codes_with<R: Rng + Send>(
        &self,
        rng: &mut R,
        uow: &mut dyn UnitOfWork,
        count: usize,
    ) -> Result<Vec<String>, CodeGenerationError> {
        let mut batch: HashSet<String> = HashSet::with_capacity(count);
        let mut codes = Vec::with_capacity(count);

        for _ in 0..count {
            let code = self.next_unique(rng, uow, &batch).await?;
            batch.insert(code.clone());
            codes.push(code);
        }

        Ok(codes)
    }

    async fn next_unique<R: Rng + Send>(
        &self,
        rng: &mut R,
        uow: &mut dyn UnitOfWork,
        batch: &HashSet<String>,
    ) -> Result<String, CodeGenerationError> {
        for attempt in 1..=self.max_attempts_per_code {
            let candidate = random_code(rng);
            if batch.contains(&candidate) {
                tracing::debug!(attempt, "Coupon code collided within batch, redrawing");
                continue;
            }
            if uow.coupon_code_exists(&candidate).await? {
                tracing::debug!(attempt, "Coupon code already in use, redrawing");
                continue;
            }
            return Ok(candidate);
        }

        Err(CodeGenerationError::Exhausted(self.max_attempts_per_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupons::NewCoupon;
    use crate::store::{MemoryStore, Store};
    use chrono::Utc;
    use rand::rngs::mock::StepRng;
    use rust_decimal_macros::dec;

    #[test]
    fn test_random_code_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let code = random_code(&mut rng);
            assert!(is_well_formed(&code), "bad code {}", code);
        }
    }

    #[test]
    fn test_is_well_formed_rejects_bad_codes() {
        assert!(is_well_formed("ABCDEF123456"));
        assert!(!is_well_formed("abcdef123456"));
        assert!(!is_well_formed("ABCDEF12345"));
        assert!(!is_well_formed("ABCDEF12345-"));
    }

    #[tokio::test]
    async fn test_batch_codes_are_distinct() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let generator = CouponCodeGenerator::default();

        let codes = generator.issue_codes(uow.as_mut(), 50).await.unwrap();
        let unique: HashSet<&String> = codes.iter().collect();

        assert_eq!(codes.len(), 50);
        assert_eq!(unique.len(), 50);
    }

    #[tokio::test]
    async fn test_batch_collision_is_caught() {
        // A constant RNG yields the same candidate every time
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let generator = CouponCodeGenerator::new(5);
        let mut rng = StepRng::new(0, 0);

        let first = generator
            .issue_codes_with(&mut rng, uow.as_mut(), 1)
            .await
            .unwrap();
        assert_eq!(first, vec!["AAAAAAAAAAAA".to_string()]);

        let result = generator.issue_codes_with(&mut rng, uow.as_mut(), 2).await;
        assert!(matches!(result, Err(CodeGenerationError::Exhausted(5))));
    }

    #[tokio::test]
    async fn test_stored_code_is_skipped() {
        let mut probe = StdRng::seed_from_u64(7);
        let taken = random_code(&mut probe);
        let next = random_code(&mut probe);

        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let now = Utc::now();
        uow.insert_coupons(&[NewCoupon {
            code: taken.clone(),
            user_id: 1,
            offer_id: 1,
            reservation_id: 1,
            price_paid: dec!(1.00),
            purchased_at: now,
            expires_at: now,
        }])
        .await
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let codes = CouponCodeGenerator::default()
            .issue_codes_with(&mut rng, uow.as_mut(), 1)
            .await
            .unwrap();

        assert_eq!(codes, vec![next]);
        assert_ne!(codes[0], taken);
    }

    #[tokio::test]
    async fn test_zero_count_issues_nothing() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let codes = CouponCodeGenerator::default()
            .issue_codes(uow.as_mut(), 0)
            .await
            .unwrap();
        assert!(codes.is_empty());
    }
}
