//! Bucketing of unit identifiers for percentage rollouts.
//!
//! The hash function and bucket space are part of the external contract: every cooperating
//! implementation must place the same `(salt, unit_id)` pair into the same bucket.
use sha2::{Digest, Sha256};

/// Size of the bucket space used for rule pass percentages.
pub const TOTAL_BUCKETS: u64 = 10_000;

/// Size of the bucket space used by `user_bucket` conditions.
pub const USER_BUCKET_SPACE: u64 = 1_000;

/// Maps a unit identifier to a bucket.
pub trait Sharder {
    /// Stable 64-bit hash of `input`.
    fn hash(&self, input: &str) -> u64;

    /// Bucket in `[0, total_buckets)` of `unit_id` under `salt`.
    fn get_bucket(&self, salt: &str, unit_id: &str, total_buckets: u64) -> u64 {
        self.hash(&format!("{salt}.{unit_id}")) % total_buckets
    }
}

/// The default (and only) sharder. Takes the first 8 bytes of SHA-256 as a big-endian `u64`.
pub struct Sha256Sharder;

impl Sharder for Sha256Sharder {
    fn hash(&self, input: &str) -> u64 {
        let digest = Sha256::digest(input.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}

/// Return `true` if `bucket` falls under `pass_percentage`.
///
/// Percentages are compared in a fixed-point domain (hundredths of a percent) so that every
/// implementation agrees on bucket boundaries regardless of floating-point rounding.
pub fn passes_percentage(bucket: u64, pass_percentage: f64) -> bool {
    let threshold = (pass_percentage.clamp(0.0, 100.0) * 100.0).round() as u64;
    bucket < threshold
}

#[cfg(test)]
mod tests {
    use super::{passes_percentage, Sha256Sharder, Sharder, TOTAL_BUCKETS, USER_BUCKET_SPACE};

    // Parity vectors shared with other implementations.
    #[test]
    fn hash_matches_reference_vectors() {
        assert_eq!(Sha256Sharder.hash("s1.user-1"), 17107523173934821465);
        assert_eq!(Sha256Sharder.hash("s1.user-2"), 1516311855041890725);
        assert_eq!(Sha256Sharder.hash("spec_salt.user-1"), 2062817896564794844);
    }

    #[test]
    fn bucket_matches_reference_vectors() {
        let cases = [
            ("s1", "user-1", 1465),
            ("s1", "user-2", 725),
            ("s1", "user-3", 7433),
            ("s1", "user-4", 1808),
            ("s1", "user-5", 8891),
            ("s1", "user-6", 4699),
            ("spec_salt", "user-1", 4844),
            ("r2salt", "user-1", 5700),
        ];
        for (salt, unit_id, expected) in cases {
            assert_eq!(
                Sha256Sharder.get_bucket(salt, unit_id, TOTAL_BUCKETS),
                expected,
                "{salt}.{unit_id}"
            );
        }
    }

    #[test]
    fn user_bucket_space() {
        assert_eq!(
            Sha256Sharder.get_bucket("bucket_salt", "user-1", USER_BUCKET_SPACE),
            403
        );
        assert_eq!(
            Sha256Sharder.get_bucket("bucket_salt", "user-2", USER_BUCKET_SPACE),
            398
        );
    }

    #[test]
    fn bucket_is_deterministic() {
        for i in 0..100 {
            let unit_id = format!("user-{i}");
            let first = Sha256Sharder.get_bucket("salt", &unit_id, TOTAL_BUCKETS);
            let second = Sha256Sharder.get_bucket("salt", &unit_id, TOTAL_BUCKETS);
            assert_eq!(first, second);
            assert!(first < TOTAL_BUCKETS);
        }
    }

    #[test]
    fn percentage_bounds() {
        assert!(passes_percentage(0, 100.0));
        assert!(passes_percentage(9_999, 100.0));
        assert!(!passes_percentage(0, 0.0));
        assert!(!passes_percentage(5_000, 50.0));
        assert!(passes_percentage(4_999, 50.0));
    }

    #[test]
    fn fractional_percentage_uses_fixed_point() {
        // 0.29 * 100 is 28.999999999999996 in floating point.
        assert!(passes_percentage(28, 0.29));
        assert!(!passes_percentage(29, 0.29));
        assert!(passes_percentage(3_332, 33.33));
        assert!(!passes_percentage(3_333, 33.33));
    }
}
