// Shared test fixtures, compiled only for tests.

pub mod addresses;
pub mod catalog;
pub mod orders;
pub mod state;
