//! Unit and version helpers.

use std::cmp::Ordering;

use crate::error::{ProvisionError, Result};

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Convert a size in megabytes (MiB) to bytes.
///
/// Task options carry memory sizes in MB; both backend generations want bytes.
/// Sizes that do not fit in a `u64` byte count are rejected.
pub fn megabytes_to_bytes(mb: u64) -> Result<u64> {
    mb.checked_mul(BYTES_PER_MIB).ok_or_else(|| {
        ProvisionError::InvalidConfig(format!("{} MB does not fit in a 64-bit byte count", mb))
    })
}

/// Numeric value of one dotted version component.
///
/// Only the leading digits count, so `0-rc1` reads as 0 and `beta` as 0.
fn component_value(component: &str) -> u64 {
    let digits: String = component
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Compare two dotted version strings component by component.
///
/// The shorter version is padded with zero components, so `3.5` equals `3.5.0.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = a.split('.').map(component_value).collect();
    let right: Vec<u64> = b.split('.').map(component_value).collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Whether `reported` is the same as or newer than `threshold`.
pub fn version_at_least(reported: &str, threshold: &str) -> bool {
    compare_versions(reported, threshold) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_megabytes_to_bytes() {
        assert_eq!(megabytes_to_bytes(0).unwrap(), 0);
        assert_eq!(megabytes_to_bytes(1024).unwrap(), 1_073_741_824);
        assert_eq!(megabytes_to_bytes(2048).unwrap(), 2_147_483_648);
    }

    #[test]
    fn test_megabytes_to_bytes_scales_back() {
        for mb in [0u64, 1, 7, 512, 1023, 65536, 1 << 20] {
            assert_eq!(megabytes_to_bytes(mb).unwrap() / (1024 * 1024), mb);
        }
    }

    #[test]
    fn test_megabytes_to_bytes_overflow() {
        let max_mb = u64::MAX / (1024 * 1024);
        assert_eq!(megabytes_to_bytes(max_mb).unwrap() / (1024 * 1024), max_mb);

        assert!(matches!(
            megabytes_to_bytes(max_mb + 1),
            Err(ProvisionError::InvalidConfig(_))
        ));
        assert!(megabytes_to_bytes(u64::MAX).is_err());
    }

    #[test]
    fn test_version_threshold_is_inclusive() {
        assert!(version_at_least("3.5.5.0", "3.5.5.0"));
        assert!(!version_at_least("3.5.0.0", "3.5.5.0"));
        assert!(version_at_least("3.6", "3.5.5.0"));
        assert!(version_at_least("4.0.0.0", "3.5.5.0"));
    }

    #[test]
    fn test_version_padding() {
        assert_eq!(compare_versions("3.5", "3.5.0.0"), Ordering::Equal);
        assert!(!version_at_least("3.5", "3.5.5.0"));
        assert!(version_at_least("3.5.5", "3.5.5.0"));
    }

    #[test]
    fn test_version_components_are_numeric() {
        // "3.10" is newer than "3.9", which a string comparison would get wrong
        assert!(version_at_least("3.10.0.0", "3.9.0.0"));
        assert_eq!(compare_versions("4.2.0-rc1", "4.2.0"), Ordering::Equal);
    }
}
