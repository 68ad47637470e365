//! PostgreSQL source and destination adapters

pub mod client;
pub mod destination;
pub mod source;

pub use client::PgClient;
pub use destination::PostgresDestination;
pub use source::PostgresSource;
