/// Item reader and writer contracts.
pub mod item;
