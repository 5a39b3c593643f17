//! Subcommands.

pub mod categories;
pub mod config;
pub mod confirm;
pub mod documents;
pub mod import;
pub mod interpret;
pub mod models;
pub mod parse;
pub mod rule;
pub mod suggest;
