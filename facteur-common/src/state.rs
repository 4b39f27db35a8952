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
use crate::mechanism::Mechanism;

/// State of the SMTP transaction
#[derive(Debug, Eq, PartialEq, Clone)]
#[allow(clippy::module_name_repetitions)]
pub enum StateSMTP {
    /// After the TCP/IP socket has been accepted
    Connect,
    /// After receiving a HELO/EHLO command
    Helo,
    /// After receiving a STARTTLS command, right before the handshake
    NegotiationTLS,
    /// After receiving an AUTH command, the SASL exchange takes over
    Authentication(Mechanism, Option<Vec<u8>>),
    /// After receiving a MAIL command
    MailFrom,
    /// After receiving a RCPT command
    RcptTo,
    /// After receiving a DATA command, the body receiver takes over
    Data,
    /// After receiving a QUIT command, or when the peer went away
    Stop,
}

impl std::fmt::Display for StateSMTP {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Helo => "helo",
            Self::NegotiationTLS => "starttls",
            Self::Authentication(..) => "auth",
            Self::MailFrom => "mail",
            Self::RcptTo => "rcpt",
            Self::Data => "data",
            Self::Stop => "stop",
        })
    }
}
