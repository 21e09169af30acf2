//! Core domain types shared by the resolver and the selector.

pub mod errors;
pub mod model;
