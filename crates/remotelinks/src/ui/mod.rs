//! Command-line and terminal front end.

pub mod app;
pub mod cli;
pub mod picker;
