//! Video decoding: open a container, pick its best video stream, decode with
//! hardware acceleration where available, filter by picture type, colour
//! convert to RGB24, and hand frames off through a [`frametrace_queue::FrameQueue`].

mod decoder;
mod error;
mod filter;
mod hwaccel;
pub mod seek;

pub use decoder::Decoder;
pub use error::DecodeError;
pub use filter::FrameFilter;
