//! Randomized blocking waits between steps.

use std::time::Duration;

use rand::Rng;

use crate::config::DelayRange;

/// Draw a delay uniformly from `range`, in whole seconds.
pub fn draw_delay<R: Rng + ?Sized>(range: &DelayRange, rng: &mut R) -> Duration {
    let (low, high) = if range.min_secs <= range.max_secs {
        (range.min_secs, range.max_secs)
    } else {
        (range.max_secs, range.min_secs)
    };
    Duration::from_secs(rng.gen_range(low..=high))
}

/// Sleep for a random duration within `range`.
pub async fn cooldown(range: &DelayRange, reason: &str) {
    let delay = draw_delay(range, &mut rand::thread_rng());
    if delay.is_zero() {
        return;
    }
    tracing::info!(secs = delay.as_secs(), reason, "Waiting");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_range() {
        let range = DelayRange::new(45, 90);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let d = draw_delay(&range, &mut rng).as_secs();
            assert!((45..=90).contains(&d));
        }
    }

    #[test]
    fn test_zero_range() {
        assert!(draw_delay(&DelayRange::ZERO, &mut rand::thread_rng()).is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_sleeps() {
        let start = tokio::time::Instant::now();
        cooldown(&DelayRange::new(60, 60), "test").await;
        assert_eq!(start.elapsed().as_secs(), 60);
    }
}
