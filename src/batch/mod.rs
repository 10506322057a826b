pub mod client;
pub mod poll;
pub mod results;
pub mod submit;

pub use client::{BatchClient, BatchInfo, BatchStatus, HttpBatchClient, RecordingBatchClient};
