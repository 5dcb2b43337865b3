//! Concrete collaborator implementations.

pub mod sqlx;

pub use self::sqlx::{SqlxDatabase, SqlxTransaction, install_drivers};
