// Player store adapters.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryPlayerStore;
pub use postgres::PostgresPlayerStore;
