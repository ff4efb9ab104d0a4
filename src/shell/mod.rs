// Composition root.
//
// Responsibilities
// - Read config from the environment.
// - Pick concrete adapters: PostgreSQL when DATABASE_URL is set, in memory otherwise.
// - Seed the in-memory catalog and address book.
// - Wire adapters into use case handlers and the HTTP router.
// - Spawn and stop the background workers.

pub mod config;
pub mod http;
pub mod seed;
pub mod state;
pub mod workers;
