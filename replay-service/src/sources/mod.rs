pub mod appliance_csv;
pub mod replay;

pub use appliance_csv::{ApplianceCsvLoader, DataLocation};
pub use replay::{ReplaySource, Window};
