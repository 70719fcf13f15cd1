use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{info, warn};

use super::error::{MongoDaoError, MongoResult};

/// How often and how patiently the first ping is retried while the server
/// comes up. Delays double from `initial_delay` up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pings attempted before giving up.
    pub max_attempts: u32,
    /// Pause after the first failure.
    pub initial_delay: Duration,
    /// Ceiling of the pause between two attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Pause before each retry, in order.
    fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.initial_delay.min(max_delay)), move |delay| {
            Some((*delay * 2).min(max_delay))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Build a client for `database_name` and wait until the server answers a ping.
pub(crate) async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
    retry: &RetryPolicy,
) -> MongoResult<Database> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut delays = retry.delays();
    let mut attempts = 0;
    loop {
        attempts += 1;
        let err = match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => break,
            Err(err) => err,
        };
        let Some(delay) = delays.next() else {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        };
        warn!(attempts, ?delay, error = %err, "MongoDB ping failed; retrying");
        sleep(delay).await;
    }

    info!(database = database_name, attempts, "connected to MongoDB");
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_up_to_the_ceiling() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        };
        let delays: Vec<_> = policy.delays().map(|delay| delay.as_millis()).collect();
        assert_eq!(delays, [1000, 2000, 3000, 3000, 3000]);
    }

    #[test]
    fn a_single_attempt_never_waits() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delays().count(), 0);
        assert_eq!(RetryPolicy::default().delays().count(), 9);
    }
}
