//! Read entities definitions.

pub mod session;
pub mod transaction;
