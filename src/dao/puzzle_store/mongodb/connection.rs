use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const MAX_PING_ATTEMPTS: u32 = 10;
const INITIAL_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Build a client from the options and ping the target database until it
/// answers, backing off exponentially between attempts.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = INITIAL_PING_DELAY;

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(err) => {
                attempts += 1;
                if attempts >= MAX_PING_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts,
                        source: err,
                    });
                }
                debug!(attempts, "initial MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_PING_DELAY);
            }
        }
    }
}
