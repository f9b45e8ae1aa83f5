//! Data structures shared across the acquisition and load pipeline

pub mod dataset;
pub mod value;

pub use dataset::TabularDataset;
pub use value::Value;
