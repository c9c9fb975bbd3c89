//! Credential protection.
//!
//! The database password is held in a `Zeroizing` container, cleared on drop
//! and never printed by `Debug` or `Display`.

mod credentials;

pub use credentials::Credentials;
