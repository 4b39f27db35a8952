//! facteur configuration

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

mod builder;
mod config;
mod default;
mod log4rs_helper;
mod parser;
mod rustls_helper;

#[cfg(test)]
mod tests;

pub use builder::Builder;
pub use config::{
    Config, ConfigServer, ConfigServerInterfaces, ConfigServerLogs, ConfigServerSMTP,
    ConfigServerSMTPAuth, ConfigServerSMTPError, ConfigServerSMTPTimeoutClient, ConfigServerTls,
    TlsSecurityLevel,
};
pub use log4rs_helper::get_log4rs_config;
pub use rustls_helper::get_rustls_config;

/// re-exported dependencies, shared by the whole workspace
pub mod re {
    pub use humantime_serde;
    pub use log4rs;
    pub use rustls;
    pub use rustls_pemfile;
    pub use semver;
}
