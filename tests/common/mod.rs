#![allow(dead_code)]

pub mod mocks;

pub use mocks::{MockFile, MockSource};

use std::{env::temp_dir, path::PathBuf};

use rand::distr::{Alphanumeric, SampleString};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A path in the temp directory that no other test uses.
pub fn temp_csv_path() -> PathBuf {
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    temp_dir().join(format!("{}.csv", file_name))
}
