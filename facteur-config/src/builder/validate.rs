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
use super::wants::{
    WantsAuth, WantsInterfaces, WantsLogs, WantsServer, WantsSmtpCodes, WantsSmtpError,
    WantsSmtpOptions, WantsTls, WantsValidate,
};
use super::Builder;
use crate::config::{
    Config, ConfigServer, ConfigServerInterfaces, ConfigServerLogs, ConfigServerSMTP,
};
use facteur_common::{re::anyhow, CodesID};

impl Builder<WantsValidate> {
    /// assemble the configuration, substituting `{domain}` in the codes table
    ///
    /// # Errors
    ///
    /// * a reply is missing from the codes table
    pub fn validate(self) -> anyhow::Result<Config> {
        let WantsValidate { parent, auth } = self.state;
        let WantsAuth { parent, codes } = parent;
        let WantsSmtpCodes { parent, error } = parent;
        let WantsSmtpError {
            parent,
            rcpt_count_max,
            disable_ehlo,
            message_size_max,
            timeout_client,
        } = parent;
        let WantsSmtpOptions { parent, tls } = parent;
        let WantsTls {
            parent,
            filepath,
            format,
            level,
        } = parent;
        let WantsLogs {
            parent,
            addr,
            addr_submission,
            addr_submissions,
        } = parent;
        let WantsInterfaces { parent, domain } = parent;
        let WantsServer {
            version_requirement,
            ..
        } = parent;

        let mut codes = codes;
        anyhow::ensure!(
            <CodesID as strum::IntoEnumIterator>::iter().all(|i| codes.contains_key(&i)),
            "a reply is missing from the codes table"
        );
        for reply in codes.values_mut() {
            let text = reply.text().replace("{domain}", &domain);
            reply.set(text);
        }

        Ok(Config {
            version_requirement,
            server: ConfigServer {
                domain,
                interfaces: ConfigServerInterfaces {
                    addr,
                    addr_submission,
                    addr_submissions,
                },
                logs: ConfigServerLogs {
                    filepath,
                    format,
                    level,
                },
                tls,
                smtp: ConfigServerSMTP {
                    rcpt_count_max,
                    disable_ehlo,
                    message_size_max,
                    error,
                    timeout_client,
                    codes,
                    auth,
                },
            },
        })
    }
}
