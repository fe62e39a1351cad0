use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "trivai";

/// How many pings to try before a connection attempt gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRetry {
    /// Pings before the attempt fails.
    pub max_attempts: u32,
    /// Wait after the first failed ping; doubles from there.
    pub initial_delay: Duration,
    /// Upper bound on the wait between pings.
    pub max_delay: Duration,
}

impl PingRetry {
    /// One ping, no waiting. Reconnects use it since the storage supervisor does its own backoff.
    pub const ONCE: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    pub(super) fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

impl Default for PingRetry {
    /// Startup waits a few seconds for a database that is still booting.
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Where the MongoDB store connects and how patiently.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding the users, games and scores collections.
    pub database_name: String,
    /// Ping policy for the first connection.
    pub startup_retry: PingRetry,
}

impl MongoConfig {
    /// Parse a connection string; the database defaults to `trivai`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri { source })?;

        Ok(Self {
            options,
            database_name,
            startup_retry: PingRetry::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_delays_double_up_to_the_cap() {
        let retry = PingRetry::default();
        assert_eq!(retry.next_delay(retry.initial_delay), Duration::from_millis(500));
        assert_eq!(retry.next_delay(Duration::from_secs(4)), Duration::from_secs(5));
        assert_eq!(PingRetry::ONCE.max_attempts, 1);
    }
}
