//! Application layer: providers, remote discovery, and selection.

pub mod gerrit;
pub mod provider;
pub mod remotes;
pub mod repository;
pub mod selector;

#[cfg(test)]
pub(crate) mod test_support;
