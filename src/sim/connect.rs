//! Establishing the simulator session at startup

use std::time::Duration;

use crate::error::{Error, Result};

use super::source::SimSource;

/// Progress is logged at info level every this many attempts
const ATTEMPTS_PER_PROGRESS_LOG: u32 = 10;

/// Open a session, retrying every `retry_interval` until `timeout` elapses
///
/// The first attempt is made immediately. Returns
/// [`Error::ConnectTimeout`] if no attempt succeeded before the deadline.
pub async fn connect_with_retry<S: SimSource + ?Sized>(
    sim: &S,
    name: &str,
    retry_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    tracing::info!(name = name, "Trying to establish a connection with the simulator");

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(retry_interval);
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                tracing::error!(attempts = attempts, "Connection to simulator timed out");
                return Err(Error::ConnectTimeout(timeout));
            }
            _ = ticker.tick() => {
                attempts += 1;
                match sim.open(name) {
                    Ok(()) => {
                        tracing::info!(attempts = attempts, "Connected to simulator");
                        return Ok(());
                    }
                    Err(e) if attempts % ATTEMPTS_PER_PROGRESS_LOG == 0 => {
                        tracing::info!(attempts = attempts, error = %e, "Connection attempts");
                    }
                    Err(e) => {
                        tracing::debug!(
                            attempts = attempts,
                            error = %e,
                            "Connection attempt failed"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ConnectInfo, MemorySimSource};

    #[tokio::test(start_paused = true)]
    async fn test_connects_after_retries() {
        let (sim, _events) = MemorySimSource::new(ConnectInfo::default());
        sim.refuse_opens(3);

        connect_with_retry(&sim, "relay", Duration::from_secs(1), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(sim.is_connected());
        assert_eq!(sim.open_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let (sim, _events) = MemorySimSource::new(ConnectInfo::default());
        sim.refuse_opens(u32::MAX);

        let result =
            connect_with_retry(&sim, "relay", Duration::from_secs(1), Duration::from_millis(5500))
                .await;

        assert!(matches!(result, Err(Error::ConnectTimeout(_))));
        assert!(!sim.is_connected());
        // attempts at t = 0, 1, 2, 3, 4, 5
        assert_eq!(sim.open_attempts(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let (sim, _events) = MemorySimSource::new(ConnectInfo::default());
        tokio_test::assert_ok!(
            connect_with_retry(&sim, "relay", Duration::from_secs(1), Duration::from_secs(1)).await
        );
        assert_eq!(sim.open_attempts(), 1);
    }
}
