// src/storage/mod.rs
pub mod encrypted;
mod identity_store;

pub use encrypted::{EncryptedStore, StorageError};
pub use identity_store::IdentityStore;

#[cfg(test)]
pub use identity_store::MockIdentityStore;
