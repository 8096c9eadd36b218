//! Data exports for accounting.

mod payments;

pub use payments::*;
