//! Exponential backoff with full jitter: `base * 2^attempts`, clamped to a
//! ceiling, then uniformly jittered across `[0, computed]` (§4.6).

use std::time::Duration;

use rand::Rng;

pub fn backoff(attempts: i32, base_secs: u64, ceiling_secs: u64) -> Duration {
    let exponent = attempts.max(0) as u32;
    let raw = base_secs.saturating_mul(1u64.checked_shl(exponent.min(63)).unwrap_or(u64::MAX));
    let capped = raw.min(ceiling_secs).max(base_secs.min(ceiling_secs));
    let jittered = rand::thread_rng().gen_range(0..=capped);
    Duration::from_secs(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_ceiling() {
        for attempts in 0..20 {
            let d = backoff(attempts, 1, 300);
            assert!(d.as_secs() <= 300);
        }
    }

    #[test]
    fn grows_with_attempts_on_average() {
        // not a precise growth assertion (jitter), just sanity on bounds.
        let small = backoff(1, 1, 300);
        let large_ceiling = backoff(10, 1, 300);
        assert!(small.as_secs() <= 2);
        assert!(large_ceiling.as_secs() <= 300);
    }

    #[test]
    fn zero_attempts_still_bounded_by_base() {
        let d = backoff(0, 1, 300);
        assert!(d.as_secs() <= 1);
    }
}
