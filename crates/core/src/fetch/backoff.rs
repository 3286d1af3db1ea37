use std::time::Duration;

use rand::Rng;

/// Delay before retry number `retry` (0-based): `base * 2^retry` with ±30% jitter.
pub fn backoff_delay(retry: u32, base: Duration) -> Duration {
    // Cap the exponent so a misconfigured base can't overflow
    let capped = retry.min(10);
    let delay = base.saturating_mul(2_u32.saturating_pow(capped));

    let jitter = rand::thread_rng().gen_range(0.7..1.3);
    delay.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let base = Duration::from_millis(100);

        let d0 = backoff_delay(0, base).as_millis();
        let d1 = backoff_delay(1, base).as_millis();
        let d2 = backoff_delay(2, base).as_millis();

        assert!((69..=130).contains(&d0));
        assert!((139..=260).contains(&d1));
        assert!((279..=520).contains(&d2));
    }

    #[test]
    fn test_backoff_cap() {
        let base = Duration::from_millis(1);
        let high = backoff_delay(40, base).as_millis();
        assert!((715..=1332).contains(&high));
    }

    #[test]
    fn test_zero_base_is_zero() {
        assert_eq!(backoff_delay(3, Duration::ZERO), Duration::ZERO);
    }
}
