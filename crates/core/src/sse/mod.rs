//! Server-sent event framing.
//!
//! - [`reader`]: chunk-tolerant frame parser
//! - [`stream`]: byte stream to frame stream adapter
//! - [`encode`]: frames back to wire text

pub mod encode;
pub mod reader;
pub mod stream;

pub use reader::{Frame, FrameReader, DONE_MARKER};
