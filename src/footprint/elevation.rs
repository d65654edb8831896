//! Percentile reduction of elevation sample pools
//!
//! Sample pools are reduced with a nearest-rank order statistic, selected
//! in O(n) expected time rather than by sorting the pool.

/// Select the k-th smallest element (0-based) in O(n) expected time
///
/// The slice is reordered in place. Deterministic for a fixed multiset:
/// the selected value is the unique k-th order statistic.
pub fn quickselect(values: &mut [i32], k: usize) -> i32 {
    debug_assert!(k < values.len());
    let mut lo = 0usize;
    let mut hi = values.len() - 1;
    loop {
        if lo == hi {
            return values[lo];
        }
        let pivot = median_of_three(values, lo, hi);
        let p = partition(values, lo, hi, pivot);
        if k == p {
            return values[k];
        } else if k < p {
            hi = p - 1;
        } else {
            lo = p + 1;
        }
    }
}

fn median_of_three(values: &[i32], lo: usize, hi: usize) -> i32 {
    let mid = lo + (hi - lo) / 2;
    let (a, b, c) = (values[lo], values[mid], values[hi]);
    if (a <= b && b <= c) || (c <= b && b <= a) {
        b
    } else if (b <= a && a <= c) || (c <= a && a <= b) {
        a
    } else {
        c
    }
}

fn partition(values: &mut [i32], lo: usize, hi: usize, pivot: i32) -> usize {
    // Hoare-style three-way split around the pivot value; returns an index
    // holding the pivot so the caller can recurse on one side only.
    let mut i = lo;
    let mut lt = lo;
    let mut gt = hi;
    while i <= gt {
        if values[i] < pivot {
            values.swap(i, lt);
            lt += 1;
            i += 1;
        } else if values[i] > pivot {
            values.swap(i, gt);
            if gt == 0 {
                break;
            }
            gt -= 1;
        } else {
            i += 1;
        }
    }
    lt
}

/// Nearest-rank percentile of a sample pool; `p` in [0, 1]
///
/// Returns `None` for an empty pool. The rank is `floor(len * p)` clamped
/// to the last element, matching nearest-rank semantics at p = 1.0.
pub fn percentile_of(values: &mut Vec<i32>, p: f64) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let k = ((values.len() as f64 * p) as usize).min(values.len() - 1);
    Some(quickselect(values, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quickselect_matches_sort() {
        let base = vec![412, -3, 88, 7, 7, 950, 12, 0, -120, 33];
        let mut sorted = base.clone();
        sorted.sort();
        for k in 0..base.len() {
            let mut work = base.clone();
            assert_eq!(quickselect(&mut work, k), sorted[k], "k = {}", k);
        }
    }

    #[test]
    fn test_percentile_monotonic() {
        // increasing the rank never decreases the reduced height
        let base = vec![150, 90, 310, 310, 205, 87, 99, 402];
        let mut last = i32::MIN;
        for i in 0..=10 {
            let p = i as f64 / 10.0;
            let mut pool = base.clone();
            let v = percentile_of(&mut pool, p).unwrap();
            assert!(v >= last, "percentile {} regressed: {} < {}", p, v, last);
            last = v;
        }
    }

    #[test]
    fn test_percentile_bounds() {
        let mut pool = vec![5, 1, 9];
        assert_eq!(percentile_of(&mut pool.clone(), 0.0), Some(1));
        assert_eq!(percentile_of(&mut pool, 1.0), Some(9));
        assert_eq!(percentile_of(&mut Vec::new(), 0.5), None);
    }

    #[test]
    fn test_percentile_deterministic() {
        let mut a = vec![4, 4, 2, 2, 8, 8];
        let mut b = vec![8, 2, 4, 8, 2, 4];
        assert_eq!(percentile_of(&mut a, 0.5), percentile_of(&mut b, 0.5));
    }
}
