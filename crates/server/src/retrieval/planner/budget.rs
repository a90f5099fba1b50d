//! Pre-fusion result budget.

use toolscout_core::MAX_TOTAL_RESULTS;

/// Clamp each request to `[1, 200]`, then shrink them until their sum fits
/// the 200-result budget.
///
/// Requests are first scaled proportionally (floor, minimum 1); any excess
/// left by the minimum is trimmed from the largest request.
#[must_use]
pub fn allocate(requests: &[usize]) -> Vec<usize> {
    let mut sizes: Vec<usize> = requests
        .iter()
        .map(|r| (*r).clamp(1, MAX_TOTAL_RESULTS))
        .collect();
    let total: usize = sizes.iter().sum();
    if total <= MAX_TOTAL_RESULTS {
        return sizes;
    }

    for size in &mut sizes {
        *size = (*size * MAX_TOTAL_RESULTS / total).max(1);
    }

    while sizes.iter().sum::<usize>() > MAX_TOTAL_RESULTS {
        let Some(largest) = sizes.iter_mut().max_by_key(|s| **s) else {
            break;
        };
        if *largest <= 1 {
            break;
        }
        *largest -= 1;
    }
    sizes
}

/// Scale a request by a refinement boost factor, never below the original.
#[must_use]
pub fn boosted(size: usize, boost: f64) -> usize {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (size as f64 * boost.max(1.0)).round() as usize;
    scaled.max(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_within_budget_is_untouched() {
        assert_eq!(allocate(&[70, 40, 50]), vec![70, 40, 50]);
    }

    #[test]
    fn test_oversized_request_is_clamped() {
        assert_eq!(allocate(&[1000]), vec![200]);
        assert_eq!(allocate(&[0]), vec![1]);
    }

    #[test]
    fn test_scaled_proportionally() {
        let sizes = allocate(&[150, 150, 100]);
        assert_eq!(sizes.iter().sum::<usize>(), 200);
        assert_eq!(sizes, vec![75, 75, 50]);
    }

    #[test]
    fn test_boosted() {
        assert_eq!(boosted(70, 1.5), 105);
        assert_eq!(boosted(70, 0.5), 70);
    }

    proptest! {
        #[test]
        fn allocation_never_exceeds_budget(requests in proptest::collection::vec(0usize..5000, 0..120)) {
            let sizes = allocate(&requests);
            prop_assert_eq!(sizes.len(), requests.len());
            prop_assert!(sizes.iter().all(|s| *s >= 1));
            if requests.len() <= MAX_TOTAL_RESULTS {
                prop_assert!(sizes.iter().sum::<usize>() <= MAX_TOTAL_RESULTS);
            }
        }
    }
}
