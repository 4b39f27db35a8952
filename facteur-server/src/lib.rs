//! facteur server: the per-connection SMTP session
//!
//! The embedder owns the listening socket; every accepted stream is handed
//! to [`handle_connection`] together with a [`Handler`] carrying the
//! application policy.

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

mod log_channels {
    pub const AUTH: &str = "server::receiver::auth";
    pub const BODY: &str = "server::receiver::body";
    pub const CONNECTION: &str = "server::receiver::connection";
    pub const TRANSACTION: &str = "server::receiver::transaction";
}

mod handler;
mod receiver;

pub use handler::{AuthDecision, ConnectDecision, DisconnectReason, Handler};
pub use receiver::{handle_connection, AbstractIO, Connection, ConnectionKind};

/// re-exported module
pub mod re {
    pub use tokio;
    pub use tokio_rustls;
}
