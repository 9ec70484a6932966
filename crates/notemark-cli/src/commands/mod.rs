pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod config;
pub mod delete;
pub mod edit;
pub mod interval;
pub mod journal;
pub mod list;
pub mod sync;
