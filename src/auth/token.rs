//! Token secrets and the per-actor grants that carry them.

pub mod grant;
pub mod secret;
