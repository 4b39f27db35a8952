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
use crate::config::{
    ConfigServerSMTPAuth, ConfigServerSMTPError, ConfigServerSMTPTimeoutClient, ConfigServerTls,
};
use facteur_common::{CodesID, Reply};

///
pub struct WantsVersion(pub(crate) ());

///
pub struct WantsServer {
    #[allow(dead_code)]
    pub(crate) parent: WantsVersion,
    pub(super) version_requirement: semver::VersionReq,
}

///
pub struct WantsInterfaces {
    pub(crate) parent: WantsServer,
    pub(super) domain: String,
}

///
pub struct WantsLogs {
    pub(crate) parent: WantsInterfaces,
    pub(super) addr: Vec<std::net::SocketAddr>,
    pub(super) addr_submission: Vec<std::net::SocketAddr>,
    pub(super) addr_submissions: Vec<std::net::SocketAddr>,
}

///
pub struct WantsTls {
    pub(crate) parent: WantsLogs,
    pub(super) filepath: std::path::PathBuf,
    pub(super) format: String,
    pub(super) level: std::collections::BTreeMap<String, log::LevelFilter>,
}

///
pub struct WantsSmtpOptions {
    pub(crate) parent: WantsTls,
    pub(super) tls: Option<ConfigServerTls>,
}

///
pub struct WantsSmtpError {
    pub(crate) parent: WantsSmtpOptions,
    pub(super) rcpt_count_max: usize,
    pub(super) disable_ehlo: bool,
    pub(super) message_size_max: u64,
    pub(super) timeout_client: ConfigServerSMTPTimeoutClient,
}

///
pub struct WantsSmtpCodes {
    pub(crate) parent: WantsSmtpError,
    pub(super) error: ConfigServerSMTPError,
}

///
pub struct WantsAuth {
    pub(crate) parent: WantsSmtpCodes,
    pub(super) codes: std::collections::BTreeMap<CodesID, Reply>,
}

///
pub struct WantsValidate {
    pub(crate) parent: WantsAuth,
    pub(super) auth: Option<ConfigServerSMTPAuth>,
}
