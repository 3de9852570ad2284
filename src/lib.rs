//! Markov Match: a deterministic, resumable football match stream.
//!
//! Each call advances a match by one simulated minute. All match state
//! travels in an opaque continuation token, so the engine itself keeps
//! nothing between calls: the same seed and token always produce the same
//! minute, events, narrative and next token.
//!
//! ```no_run
//! use markov_match::core::pipeline::MatchStream;
//! use markov_match::core::request::MinuteRequest;
//!
//! let stream = MatchStream::builder().build()?;
//! let mut request = MinuteRequest::new(42).teams("Rovers", "United");
//! while let Ok(response) = stream.next_minute(&request) {
//!     for line in &response.minute_summary.narrative {
//!         println!("{line}");
//!     }
//!     request.token = Some(response.minute_summary.token);
//! }
//! # Ok::<(), markov_match::core::pipeline::StreamError>(())
//! ```

pub mod core;
pub mod schema;

pub use crate::core::pipeline::{MatchStream, StreamError};
pub use crate::core::request::MinuteRequest;
pub use crate::schema::summary::{MinuteResponse, MinuteSummary};
