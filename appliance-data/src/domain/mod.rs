pub mod dataset;
pub mod device;
pub mod reading;

pub use dataset::{Columns, Dataset};
pub use device::{Device, ParseDeviceError};
pub use reading::{HourCategory, Reading};
