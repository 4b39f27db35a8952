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
    ConfigServer, ConfigServerInterfaces, ConfigServerLogs, ConfigServerSMTP,
    ConfigServerSMTPAuth, ConfigServerSMTPError, ConfigServerSMTPTimeoutClient, ConfigServerTls,
};
use facteur_common::{mechanism::Mechanism, CodesID, Reply};

impl Default for ConfigServer {
    fn default() -> Self {
        Self {
            domain: Self::hostname(),
            interfaces: ConfigServerInterfaces::default(),
            logs: ConfigServerLogs::default(),
            tls: None,
            smtp: ConfigServerSMTP::default(),
        }
    }
}

impl ConfigServer {
    pub(crate) fn hostname() -> String {
        hostname::get()
            .map_or_else(
                |_| None,
                |name| name.to_str().map(str::to_string),
            )
            .unwrap_or_else(|| "localhost".to_string())
    }
}

impl Default for ConfigServerInterfaces {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            addr_submission: Self::default_addr_submission(),
            addr_submissions: Self::default_addr_submissions(),
        }
    }
}

impl ConfigServerInterfaces {
    pub(crate) fn default_addr() -> Vec<std::net::SocketAddr> {
        vec!["0.0.0.0:25".parse().expect("valid address")]
    }

    pub(crate) fn default_addr_submission() -> Vec<std::net::SocketAddr> {
        vec!["0.0.0.0:587".parse().expect("valid address")]
    }

    pub(crate) fn default_addr_submissions() -> Vec<std::net::SocketAddr> {
        vec!["0.0.0.0:465".parse().expect("valid address")]
    }
}

impl Default for ConfigServerLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            format: Self::default_format(),
            level: std::collections::BTreeMap::default(),
        }
    }
}

impl ConfigServerLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        std::path::PathBuf::from_iter(["/", "var", "log", "facteur", "facteur.log"])
    }

    pub(crate) fn default_format() -> String {
        "{d} {l} - {m}{n}".to_string()
    }
}

impl ConfigServerTls {
    pub(crate) const fn default_preempt_cipherlist() -> bool {
        false
    }

    pub(crate) const fn default_handshake_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(1)
    }
}

impl Default for ConfigServerSMTPError {
    fn default() -> Self {
        Self {
            soft_count: 5,
            hard_count: 10,
            delay: std::time::Duration::from_millis(1000),
        }
    }
}

impl Default for ConfigServerSMTPTimeoutClient {
    fn default() -> Self {
        let idle = std::time::Duration::from_secs(3 * 60);
        Self {
            connect: idle,
            helo: idle,
            mail_from: idle,
            rcpt_to: idle,
            data: idle,
        }
    }
}

impl ConfigServerSMTPAuth {
    pub(crate) const fn default_must_be_authenticated() -> bool {
        false
    }

    pub(crate) const fn default_enable_dangerous_mechanism_in_clair() -> bool {
        false
    }

    pub(crate) fn default_mechanisms() -> Vec<Mechanism> {
        vec![Mechanism::Plain, Mechanism::Login, Mechanism::CramMd5]
    }

    pub(crate) const fn default_attempt_count_max() -> i64 {
        -1
    }
}

impl Default for ConfigServerSMTPAuth {
    fn default() -> Self {
        Self {
            must_be_authenticated: Self::default_must_be_authenticated(),
            enable_dangerous_mechanism_in_clair: Self::default_enable_dangerous_mechanism_in_clair(
            ),
            mechanisms: Self::default_mechanisms(),
            attempt_count_max: Self::default_attempt_count_max(),
        }
    }
}

impl Default for ConfigServerSMTP {
    fn default() -> Self {
        Self {
            rcpt_count_max: Self::default_rcpt_count_max(),
            disable_ehlo: Self::default_disable_ehlo(),
            message_size_max: Self::default_message_size_max(),
            error: ConfigServerSMTPError::default(),
            timeout_client: ConfigServerSMTPTimeoutClient::default(),
            codes: Self::default_codes(),
            auth: None,
        }
    }
}

impl ConfigServerSMTP {
    pub(crate) const fn default_rcpt_count_max() -> usize {
        1000
    }

    pub(crate) const fn default_disable_ehlo() -> bool {
        false
    }

    pub(crate) const fn default_message_size_max() -> u64 {
        10_485_670
    }

    pub(crate) fn default_codes() -> std::collections::BTreeMap<CodesID, Reply> {
        let codes: std::collections::BTreeMap<CodesID, &'static str> = [
            (CodesID::Greetings, "220 {domain} Service ready"),
            (CodesID::Closing, "221 Bye"),
            (CodesID::Helo, "250 {domain}"),
            (CodesID::DataStart, "354 enter mail, end with line containing only '.'"),
            (CodesID::Ok, "250 Ok"),
            (CodesID::MailOk, "250 sender Ok"),
            (CodesID::RcptOk, "250 recipient Ok"),
            (CodesID::UnrecognizedCommand, "500 Command unrecognized"),
            (CodesID::SyntaxErrorParams, "501 Syntax error in parameters or arguments"),
            (CodesID::SyntaxHelo, "501 Syntax: HELO hostname"),
            (CodesID::SyntaxEhlo, "501 Syntax: EHLO hostname"),
            (CodesID::SyntaxMailFrom, "501 Syntax: MAIL FROM:<address>"),
            (CodesID::SyntaxRcptTo, "501 Syntax: RCPT TO:<address>"),
            (CodesID::BadSenderAddress, "501 Bad sender address syntax"),
            (CodesID::BadRcptAddress, "501 Bad recipient address syntax"),
            (CodesID::NoParametersAllowed, "501 Syntax error (no parameters allowed)"),
            (CodesID::Unimplemented, "502 Command not implemented"),
            (CodesID::BadSequence, "503 Bad sequence of commands"),
            (CodesID::HeloFirst, "503 Error: send HELO/EHLO first"),
            (CodesID::EhloFirst, "503 Error: send EHLO first"),
            (CodesID::NestedMail, "503 Error: Nested MAIL command"),
            (CodesID::NeedMail, "503 Error: need MAIL command"),
            (CodesID::NeedRcpt, "503 Error: need RCPT command"),
            (CodesID::TlsNotAvailable, "454 TLS negotiation failed"),
            (CodesID::TlsAlreadyActive, "500 TLS already negotiated"),
            (CodesID::TlsRequired, "530 Must issue a STARTTLS command first"),
            (CodesID::AuthSucceeded, "235 Authentication successful."),
            (CodesID::AuthNotImplemented, "502 Error: AUTH not implemented"),
            (CodesID::AuthMechNotSupported, "504 Unrecognized authentication type"),
            (
                CodesID::AuthClientMustNotStart,
                "501 5.7.0 Client must not start with this mechanism",
            ),
            (
                CodesID::AuthMechanismMustBeEncrypted,
                "538 5.7.11 Encryption required for requested authentication mechanism",
            ),
            (CodesID::AuthInvalidCredentials, "535 Authentication failed."),
            (CodesID::AuthRequired, "530 5.7.0 Authentication required"),
            (CodesID::AuthClientCanceled, "501 Authentication canceled by client"),
            (CodesID::AuthErrorDecode64, "501 5.5.2 Invalid, not base64"),
            (CodesID::AuthMalformed, "535 authentication failed (#5.7.1)"),
            (CodesID::TooManyError, "451 Too many errors from the client"),
            (CodesID::Timeout, "421 Error: timeout exceeded"),
            (
                CodesID::TooManyRecipients,
                "452 Requested action not taken: to many recipients",
            ),
            (CodesID::TooLarge, "552 Message too large"),
        ]
        .into_iter()
        .collect();

        let out = codes
            .into_iter()
            .map(|(id, reply)| {
                (
                    id,
                    Reply::parse_str(reply).expect("default smtp codes are well formed"),
                )
            })
            .collect::<std::collections::BTreeMap<_, _>>();

        assert!(
            <CodesID as strum::IntoEnumIterator>::iter().all(|i| out.contains_key(&i)),
            "missing codes in default values"
        );
        out
    }
}
