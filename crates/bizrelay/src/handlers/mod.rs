//! Request handlers.

pub mod email;
pub mod meta;
pub mod registry;
