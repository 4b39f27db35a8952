//! facteur common definitions

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

mod reply;
mod reply_code;

/// identifiers of the configurable smtp replies
pub mod codes_id;

/// mailbox address and RFC 5321 path parsing
pub mod address;

/// SASL credentials and the CRAM-MD5 digest helper
pub mod auth;

/// smtp envelop produced by one mail transaction
pub mod envelop;

/// smtp command parsing
pub mod event;

/// ESMTP capability set advertised on EHLO
pub mod extensions;

/// the message produced by a completed transaction
pub mod mail_context;

/// SASL mechanisms supported by the auth extension
pub mod mechanism;

/// states of the smtp transaction
pub mod state;

pub use codes_id::CodesID;
pub use reply::Reply;
pub use reply_code::ReplyCode;

/// re-exported dependencies, shared by the whole workspace
pub mod re {
    pub use anyhow;
    pub use base64;
    pub use log;
    pub use strum;
}
