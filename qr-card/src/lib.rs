//! Printable table cards: a QR code for a venue/table URI composited onto a
//! labeled background, saved under a name derived from the URI.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod fonts;
pub mod ids;
pub mod naming;
pub mod pipeline;

pub use config::CardConfig;
pub use error::{CardError, Result};
pub use pipeline::Pipeline;
