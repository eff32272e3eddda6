//! # Slateboard DB
//!
//! Database connection pool initialization for the Slateboard API.
//!
//! The scheduling core keeps no in-memory state between requests; every
//! conflict check reads current store state through this pool.

use std::env;

/// Initializes a PostgreSQL connection pool.
///
/// Reads the connection string from the `DATABASE_URL` environment
/// variable. The returned pool is cheaply cloneable and is placed into
/// the application state for use in request handlers.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection fails. This
/// function is called once during startup, before the server accepts
/// traffic.
pub async fn init_db_pool() -> sqlx::PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    sqlx::PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
