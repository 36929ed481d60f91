pub mod domain;
pub mod queries;

pub use domain::{Columns, Dataset, Device, HourCategory, Reading};
