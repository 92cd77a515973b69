use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use tracing::{error, info};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// r2d2 opens its minimum idle connections while building, so a bad
/// `DATABASE_URL` fails here rather than on the first request.
pub fn establish_pool(database_url: &str, max_size: u32) -> Result<DbPool, PoolError> {
    info!("Opening database pool ({} connections)", max_size);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    match Pool::builder().max_size(max_size).build(manager) {
        Ok(pool) => {
            info!("Database pool established successfully");
            Ok(pool)
        }
        Err(e) => {
            error!("Failed to establish database pool: {}", e);
            Err(e)
        }
    }
}
