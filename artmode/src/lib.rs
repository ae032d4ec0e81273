//! Client for the art-mode channel of a Samsung Frame TV.
//!
//! A [`Session`] owns one websocket to the TV, performs the two-step channel
//! handshake, then runs strictly lockstep request/response exchanges. The
//! protocol operations ([`Session::list_content`], [`Session::upload_image`],
//! [`Session::delete_images`]) are thin wrappers over [`Session::request`].
//!
//! Wire encoding lives in the `frames` crate.

pub mod config;
pub mod error;
pub mod ops;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use error::ArtModeError;
pub use ops::{ContentItem, ImageFormat};
pub use session::{Expect, Session, SessionState};
pub use transport::{Transport, TransportError, WsTransport};
