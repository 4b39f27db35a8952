/*
 * facteur mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

use facteur_common::{mechanism::Mechanism, CodesID, Reply};

use crate::builder::{Builder, WantsVersion};

///
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(
        serialize_with = "crate::parser::semver::serialize",
        deserialize_with = "crate::parser::semver::deserialize"
    )]
    pub version_requirement: semver::VersionReq,
    #[serde(default)]
    pub server: ConfigServer,
}

impl Config {
    /// start a staged builder producing a validated [`Config`]
    #[must_use]
    pub const fn builder() -> Builder<WantsVersion> {
        Builder {
            state: WantsVersion(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServer {
    // TODO: parse valid fqdn
    #[serde(default = "ConfigServer::hostname")]
    pub domain: String,
    #[serde(default)]
    pub interfaces: ConfigServerInterfaces,
    #[serde(default)]
    pub logs: ConfigServerLogs,
    pub tls: Option<ConfigServerTls>,
    #[serde(default)]
    pub smtp: ConfigServerSMTP,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerInterfaces {
    #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
    pub addr: Vec<std::net::SocketAddr>,
    #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
    pub addr_submission: Vec<std::net::SocketAddr>,
    #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
    pub addr_submissions: Vec<std::net::SocketAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerLogs {
    #[serde(default = "ConfigServerLogs::default_filepath")]
    pub filepath: std::path::PathBuf,
    #[serde(default = "ConfigServerLogs::default_format")]
    pub format: String,
    #[serde(default)]
    pub level: std::collections::BTreeMap<String, log::LevelFilter>,
}

/// If a TLS configuration is provided, configure how the connection should
/// be treated
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum TlsSecurityLevel {
    /// Connection may stay in plain text for the whole transaction
    ///
    /// Connection may upgrade at any moment with a TLS tunnel (using
    /// the STARTTLS mechanism)
    May,
    /// Connection must be under a TLS tunnel (using the STARTTLS mechanism
    /// or using port 465)
    Encrypt,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerTls {
    pub security_level: TlsSecurityLevel,
    #[serde(default = "ConfigServerTls::default_preempt_cipherlist")]
    pub preempt_cipherlist: bool,
    #[serde(with = "humantime_serde")]
    #[serde(default = "ConfigServerTls::default_handshake_timeout")]
    pub handshake_timeout: std::time::Duration,
    #[serde(
        serialize_with = "crate::parser::tls_certificate::serialize",
        deserialize_with = "crate::parser::tls_certificate::deserialize"
    )]
    pub certificate: rustls::Certificate,
    #[serde(
        serialize_with = "crate::parser::tls_private_key::serialize",
        deserialize_with = "crate::parser::tls_private_key::deserialize"
    )]
    pub private_key: rustls::PrivateKey,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSMTPError {
    pub soft_count: i64,
    pub hard_count: i64,
    #[serde(with = "humantime_serde")]
    pub delay: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSMTPTimeoutClient {
    #[serde(with = "humantime_serde")]
    pub connect: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub helo: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub mail_from: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub rcpt_to: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub data: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSMTPAuth {
    /// Reject any MAIL command issued by a client that did not authenticate
    #[serde(default = "ConfigServerSMTPAuth::default_must_be_authenticated")]
    pub must_be_authenticated: bool,
    /// Accept password-bearing mechanisms on a connection that is not under
    /// TLS; a warning is logged every time it happens
    #[serde(default = "ConfigServerSMTPAuth::default_enable_dangerous_mechanism_in_clair")]
    pub enable_dangerous_mechanism_in_clair: bool,
    /// Mechanisms advertised in the `AUTH` capability, in order
    #[serde(default = "ConfigServerSMTPAuth::default_mechanisms")]
    pub mechanisms: Vec<Mechanism>,
    /// Number of times a client may cancel an exchange before the
    /// connection closes, `-1` to never give up
    #[serde(default = "ConfigServerSMTPAuth::default_attempt_count_max")]
    pub attempt_count_max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSMTP {
    #[serde(default = "ConfigServerSMTP::default_rcpt_count_max")]
    pub rcpt_count_max: usize,
    #[serde(default = "ConfigServerSMTP::default_disable_ehlo")]
    pub disable_ehlo: bool,
    /// The advertised `SIZE` value and the cap enforced during DATA
    #[serde(default = "ConfigServerSMTP::default_message_size_max")]
    pub message_size_max: u64,
    #[serde(default)]
    pub error: ConfigServerSMTPError,
    #[serde(default)]
    pub timeout_client: ConfigServerSMTPTimeoutClient,
    #[serde(default = "ConfigServerSMTP::default_codes")]
    pub codes: std::collections::BTreeMap<CodesID, Reply>,
    pub auth: Option<ConfigServerSMTPAuth>,
}
