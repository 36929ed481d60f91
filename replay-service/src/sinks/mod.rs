pub mod dashboard;

pub use dashboard::{frame_channel, DashboardSink, FrameReceiver, FrameSender};
