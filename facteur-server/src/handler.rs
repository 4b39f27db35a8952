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
use facteur_common::{
    address::Address, auth::Credentials, extensions::Extensions, mail_context::MailContext,
    Reply, ReplyCode,
};

/// What to do with a freshly accepted connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectDecision {
    /// greet the client, with a custom banner text or the configured one
    Accept {
        /// text of the `220` greeting, without the code
        banner: Option<String>,
    },
    /// send this reply and close
    Reject {
        /// the goodbye line, typically a `554`
        reply: Reply,
    },
    /// close without sending anything
    Ignore,
}

/// Verdict of the application on a completed SASL exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    ///
    Accepted,
    ///
    Rejected,
    /// the application does not verify credentials at all
    NotImplemented,
}

/// Why the session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// the client sent QUIT
    Quit,
    /// the transport reached end of file
    PeerClosed,
    /// the connection was refused by [`Handler::on_connect`]
    Refused,
    /// no byte received within the idle timeout
    Timeout,
    /// unrecoverable protocol or transport failure
    Error,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Quit => "quit",
            Self::PeerClosed => "peer closed",
            Self::Refused => "refused",
            Self::Timeout => "timeout",
            Self::Error => "error",
        })
    }
}

/// The application side of a session: every envelope event is offered to it
/// before the server commits, and the completed message is handed to
/// [`Handler::on_data`].
///
/// The handler owns its per-session state; the session calls its methods
/// strictly in protocol order and never concurrently.
#[async_trait::async_trait]
pub trait Handler: Send {
    /// a connection has been accepted, decide whether to greet it
    async fn on_connect(
        &mut self,
        server_name: &str,
        session_count: usize,
        peer_addr: std::net::SocketAddr,
    ) -> ConnectDecision {
        let _ = (server_name, session_count, peer_addr);
        ConnectDecision::Accept { banner: None }
    }

    /// the client identified with HELO
    async fn on_helo(&mut self, domain: &str) -> Result<(), Reply> {
        let _ = domain;
        Ok(())
    }

    /// the client identified with EHLO; the offered capability set may be
    /// altered, whatever is returned gets advertised
    async fn on_ehlo(&mut self, domain: &str, extensions: Extensions) -> Result<Extensions, Reply> {
        let _ = domain;
        Ok(extensions)
    }

    /// a MAIL command passed parsing, accept or refuse the sender
    async fn on_mail(&mut self, reverse_path: &Address) -> Result<(), Reply> {
        let _ = reverse_path;
        Ok(())
    }

    /// an ESMTP parameter of MAIL the server itself does not know;
    /// `false` refuses it
    async fn on_mail_param(&mut self, param: &str) -> bool {
        let _ = param;
        false
    }

    /// a RCPT command passed parsing, accept or refuse the recipient
    async fn on_rcpt(&mut self, forward_path: &Address) -> Result<(), Reply> {
        let _ = forward_path;
        Ok(())
    }

    /// an ESMTP parameter of RCPT the server itself does not know;
    /// `false` refuses it
    async fn on_rcpt_param(&mut self, param: &str) -> bool {
        let _ = param;
        false
    }

    /// the message is complete; `Ok` carries the queue reference echoed to
    /// the client as `250 queued as <reference>`, `Err` is sent verbatim
    async fn on_data(&mut self, mail: &MailContext) -> Result<String, Reply>;

    /// the transaction has been aborted with RSET
    async fn on_rset(&mut self) {}

    /// answer a VRFY query
    async fn on_vrfy(&mut self, query: &str) -> Reply {
        let _ = query;
        Reply::new(
            ReplyCode::Code { code: 252 },
            "VRFY disabled by policy, just send some mail",
        )
    }

    /// decide the outcome of a SASL exchange
    async fn on_auth(&mut self, credentials: &Credentials) -> AuthDecision {
        let _ = credentials;
        AuthDecision::NotImplemented
    }

    /// a verb the server does not recognize; the returned reply is sent
    /// verbatim
    async fn on_unknown(&mut self, verb: &str, argument: &str) -> Reply {
        let _ = (verb, argument);
        Reply::new(ReplyCode::Code { code: 500 }, "Command unrecognized")
    }

    /// the session is over; called exactly once on every exit path, before
    /// the transport is released
    async fn on_terminate(&mut self, reason: &DisconnectReason) {
        let _ = reason;
    }
}
