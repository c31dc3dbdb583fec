#[cfg(feature = "csv")]
/// This module provides a CSV item reader and writer built on record channels.
pub mod csv;
