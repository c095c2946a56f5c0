//! Simulated work: fixed delays and CPU burns that show up in traces and
//! profiles.

use std::time::{Duration, Instant};

/// Park the calling task for `ms` milliseconds. 0 returns immediately.
pub async fn delay(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Spin a blocking-pool thread for `duration`. Returns the number of rounds
/// run, so the loop cannot be optimized away.
pub async fn burn_cpu(duration: Duration) -> Result<u64, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || spin(duration)).await
}

fn spin(duration: Duration) -> u64 {
    let deadline = Instant::now() + duration;
    let mut acc: u64 = 0;
    let mut rounds: u64 = 0;
    while Instant::now() < deadline {
        for i in 0..10_000u64 {
            acc = acc.wrapping_mul(6364136223846793005).wrapping_add(i);
        }
        rounds += 1;
    }
    std::hint::black_box(acc);
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let start = Instant::now();
        delay(0).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_delay_waits() {
        let start = Instant::now();
        delay(30).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_burn_cpu_runs_for_duration() {
        let start = Instant::now();
        let rounds = burn_cpu(Duration::from_millis(20)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(rounds > 0);
    }
}
