//! Shared services used by NoteMark front ends.

mod database;

pub use database::DatabaseService;
