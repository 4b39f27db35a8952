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
// this produces just too much false positive in this file
#![allow(clippy::missing_const_for_fn)]

use super::wants::{
    WantsAuth, WantsInterfaces, WantsLogs, WantsServer, WantsSmtpCodes, WantsSmtpError,
    WantsSmtpOptions, WantsTls, WantsValidate, WantsVersion,
};
use super::Builder;
use crate::config::{
    ConfigServer, ConfigServerLogs, ConfigServerSMTP, ConfigServerSMTPAuth, ConfigServerSMTPError,
    ConfigServerSMTPTimeoutClient, ConfigServerTls, TlsSecurityLevel,
};
use crate::parser::{tls_certificate, tls_private_key};
use facteur_common::{
    mechanism::Mechanism,
    re::anyhow::{self, Context},
    CodesID, Reply,
};

impl Builder<WantsVersion> {
    /// # Panics
    ///
    /// * CARGO_PKG_VERSION is not valid
    #[must_use]
    pub fn with_current_version(self) -> Builder<WantsServer> {
        self.with_version_str(env!("CARGO_PKG_VERSION")).unwrap()
    }

    /// # Errors
    ///
    /// * `version_requirement` is not a valid format
    pub fn with_version_str(
        self,
        version_requirement: &str,
    ) -> anyhow::Result<Builder<WantsServer>> {
        semver::VersionReq::parse(version_requirement)
            .with_context(|| format!("version is not valid: '{version_requirement}'"))
            .map(|version_requirement| Builder::<WantsServer> {
                state: WantsServer {
                    parent: self.state,
                    version_requirement,
                },
            })
    }
}

impl Builder<WantsServer> {
    ///
    #[must_use]
    pub fn with_hostname(self) -> Builder<WantsInterfaces> {
        self.with_server_name(&ConfigServer::hostname())
    }

    ///
    #[must_use]
    pub fn with_debug_server_info(self) -> Builder<WantsInterfaces> {
        self.with_server_name("debug.com")
    }

    ///
    #[must_use]
    pub fn with_server_name(self, domain: &str) -> Builder<WantsInterfaces> {
        Builder::<WantsInterfaces> {
            state: WantsInterfaces {
                parent: self.state,
                domain: domain.to_string(),
            },
        }
    }
}

impl Builder<WantsInterfaces> {
    ///
    #[must_use]
    pub fn with_ipv4_localhost(self) -> Builder<WantsLogs> {
        self.with_interfaces(
            vec!["127.0.0.1:25".parse().expect("valid address")],
            vec!["127.0.0.1:587".parse().expect("valid address")],
            vec!["127.0.0.1:465".parse().expect("valid address")],
        )
    }

    ///
    #[must_use]
    pub fn with_interfaces(
        self,
        addr: Vec<std::net::SocketAddr>,
        addr_submission: Vec<std::net::SocketAddr>,
        addr_submissions: Vec<std::net::SocketAddr>,
    ) -> Builder<WantsLogs> {
        Builder::<WantsLogs> {
            state: WantsLogs {
                parent: self.state,
                addr,
                addr_submission,
                addr_submissions,
            },
        }
    }
}

impl Builder<WantsLogs> {
    ///
    #[must_use]
    pub fn with_default_logs_settings(self) -> Builder<WantsTls> {
        self.with_logs_settings(
            ConfigServerLogs::default_filepath(),
            &ConfigServerLogs::default_format(),
            std::collections::BTreeMap::default(),
        )
    }

    ///
    #[must_use]
    pub fn with_logs_settings(
        self,
        filepath: impl Into<std::path::PathBuf>,
        format: &str,
        level: std::collections::BTreeMap<String, log::LevelFilter>,
    ) -> Builder<WantsTls> {
        Builder::<WantsTls> {
            state: WantsTls {
                parent: self.state,
                filepath: filepath.into(),
                format: format.to_string(),
                level,
            },
        }
    }
}

impl Builder<WantsTls> {
    ///
    #[must_use]
    pub fn without_tls_support(self) -> Builder<WantsSmtpOptions> {
        Builder::<WantsSmtpOptions> {
            state: WantsSmtpOptions {
                parent: self.state,
                tls: None,
            },
        }
    }

    /// opportunistic STARTTLS with safe rustls defaults
    ///
    /// # Errors
    ///
    /// * certificate or private key file cannot be read
    pub fn with_safe_tls_config(
        self,
        certificate: &str,
        private_key: &str,
    ) -> anyhow::Result<Builder<WantsSmtpOptions>> {
        Ok(Builder::<WantsSmtpOptions> {
            state: WantsSmtpOptions {
                parent: self.state,
                tls: Some(ConfigServerTls {
                    security_level: TlsSecurityLevel::May,
                    preempt_cipherlist: ConfigServerTls::default_preempt_cipherlist(),
                    handshake_timeout: ConfigServerTls::default_handshake_timeout(),
                    certificate: tls_certificate::from_string(certificate)?,
                    private_key: tls_private_key::from_string(private_key)?,
                }),
            },
        })
    }
}

impl Builder<WantsSmtpOptions> {
    ///
    #[must_use]
    pub fn with_default_smtp_options(self) -> Builder<WantsSmtpError> {
        self.with_smtp_options(
            ConfigServerSMTP::default_rcpt_count_max(),
            ConfigServerSMTP::default_disable_ehlo(),
            ConfigServerSMTP::default_message_size_max(),
        )
    }

    ///
    #[must_use]
    pub fn with_smtp_options(
        self,
        rcpt_count_max: usize,
        disable_ehlo: bool,
        message_size_max: u64,
    ) -> Builder<WantsSmtpError> {
        Builder::<WantsSmtpError> {
            state: WantsSmtpError {
                parent: self.state,
                rcpt_count_max,
                disable_ehlo,
                message_size_max,
                timeout_client: ConfigServerSMTPTimeoutClient::default(),
            },
        }
    }
}

impl Builder<WantsSmtpError> {
    ///
    #[must_use]
    pub fn with_default_smtp_error_handler(self) -> Builder<WantsSmtpCodes> {
        self.with_smtp_error_handler(
            ConfigServerSMTPError::default().soft_count,
            ConfigServerSMTPError::default().hard_count,
            ConfigServerSMTPError::default().delay,
        )
    }

    ///
    #[must_use]
    pub fn with_smtp_error_handler(
        self,
        soft_count: i64,
        hard_count: i64,
        delay: std::time::Duration,
    ) -> Builder<WantsSmtpCodes> {
        Builder::<WantsSmtpCodes> {
            state: WantsSmtpCodes {
                parent: self.state,
                error: ConfigServerSMTPError {
                    soft_count,
                    hard_count,
                    delay,
                },
            },
        }
    }
}

impl Builder<WantsSmtpCodes> {
    ///
    #[must_use]
    pub fn with_default_smtp_codes(self) -> Builder<WantsAuth> {
        self.with_smtp_codes(std::collections::BTreeMap::default())
    }

    /// merge the provided replies over the defaults
    #[must_use]
    pub fn with_smtp_codes(
        self,
        codes: std::collections::BTreeMap<CodesID, Reply>,
    ) -> Builder<WantsAuth> {
        let mut out = ConfigServerSMTP::default_codes();
        out.extend(codes);
        Builder::<WantsAuth> {
            state: WantsAuth {
                parent: self.state,
                codes: out,
            },
        }
    }
}

impl Builder<WantsAuth> {
    ///
    #[must_use]
    pub fn without_auth(self) -> Builder<WantsValidate> {
        Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                auth: None,
            },
        }
    }

    ///
    #[must_use]
    pub fn with_auth(
        self,
        must_be_authenticated: bool,
        enable_dangerous_mechanism_in_clair: bool,
        mechanisms: Vec<Mechanism>,
        attempt_count_max: i64,
    ) -> Builder<WantsValidate> {
        Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                auth: Some(ConfigServerSMTPAuth {
                    must_be_authenticated,
                    enable_dangerous_mechanism_in_clair,
                    mechanisms,
                    attempt_count_max,
                }),
            },
        }
    }
}
