//! Loading, merging, summarising and plotting of network clock stamp logs.
//!
//! Input files carry a `%`-prefixed header naming the stream type and its
//! fields, followed by whitespace separated rows. See [`data`] for the
//! loader and merger, [`stats`] for summaries and [`plots`] for figures.

pub mod color;
pub mod data;
pub mod error;
pub mod plots;
pub mod stats;

pub use error::{Error, Result};
