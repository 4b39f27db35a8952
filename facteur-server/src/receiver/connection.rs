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
use crate::{log_channels, receiver::AbstractIO};
use facteur_common::{
    auth::Credentials, extensions::Extensions, re::anyhow, CodesID, Reply,
};
use facteur_config::Config;

/// how the server reacts to tls interaction for this connection
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionKind {
    /// connection may use STARTTLS
    Opportunistic,
    /// Opportunistic and enforced security (auth)
    Submission,
    /// within TLS from the first byte
    Tunneled,
}

/// Instance containing connection to the server's information
pub struct Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    /// server's port kind
    pub kind: ConnectionKind,
    /// local greeting name, immutable for the connection's lifetime
    pub server_name: String,
    /// connection timestamp
    pub timestamp: std::time::SystemTime,
    /// is still alive
    pub is_alive: bool,
    /// did the peer leave with QUIT
    pub client_quit: bool,
    /// server's configuration
    pub config: std::sync::Arc<Config>,
    /// peer socket address
    pub client_addr: std::net::SocketAddr,
    /// number of sessions alive when this one was accepted, for the handler
    pub session_count: usize,
    /// number of errors the client made so far
    pub error_count: i64,
    /// is under tls (tunneled or opportunistic), monotone
    pub is_secured: bool,
    /// has completed a SASL exchange (AUTH)
    pub is_authenticated: bool,
    /// number of times an AUTH exchange has been canceled
    pub authentication_attempt: i64,
    /// what the client authenticated with, stamped on every envelop
    pub credentials: Option<Credentials>,
    /// the capability set advertised on the last EHLO
    pub extensions: Extensions,
    /// per-connection randomness (message ids, CRAM challenges)
    pub rng: fastrand::Rng,
    /// abstraction of the stream
    pub inner: AbstractIO<S>,
}

impl<S> Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub fn new(
        kind: ConnectionKind,
        client_addr: std::net::SocketAddr,
        config: std::sync::Arc<Config>,
        inner: S,
    ) -> Self {
        Self {
            kind,
            server_name: config.server.domain.clone(),
            timestamp: std::time::SystemTime::now(),
            is_alive: true,
            client_quit: false,
            config,
            client_addr,
            session_count: 0,
            error_count: 0,
            is_secured: false,
            is_authenticated: false,
            authentication_attempt: 0,
            credentials: None,
            extensions: Extensions::default(),
            rng: fastrand::Rng::new(),
            inner: AbstractIO::new(inner),
        }
    }

    /// rebuild the connection around an upgraded stream, carrying the
    /// session identity over; the advertised capability set starts over
    #[allow(clippy::too_many_arguments)]
    pub fn new_with(
        kind: ConnectionKind,
        server_name: String,
        timestamp: std::time::SystemTime,
        config: std::sync::Arc<Config>,
        client_addr: std::net::SocketAddr,
        session_count: usize,
        error_count: i64,
        is_secured: bool,
        is_authenticated: bool,
        authentication_attempt: i64,
        credentials: Option<Credentials>,
        inner: S,
    ) -> Self {
        Self {
            kind,
            server_name,
            timestamp,
            is_alive: true,
            client_quit: false,
            config,
            client_addr,
            session_count,
            error_count,
            is_secured,
            is_authenticated,
            authentication_attempt,
            credentials,
            extensions: Extensions::default(),
            rng: fastrand::Rng::new(),
            inner: AbstractIO::new(inner),
        }
    }
}

impl<S> Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    /// look up the configured reply for an id
    ///
    /// # Panics
    ///
    /// * the reply is missing, and thus config is ill-formed
    #[must_use]
    pub fn reply_of(&self, id: CodesID) -> Reply {
        self.config
            .server
            .smtp
            .codes
            .get(&id)
            .unwrap_or_else(|| panic!("ill-formed configuration: missing reply '{id:?}'"))
            .clone()
    }

    /// send a configured reply to the client
    ///
    /// # Errors
    ///
    /// * internal connection writer error
    /// * the hard error count has been reached
    pub async fn send_code(&mut self, id: CodesID) -> anyhow::Result<()> {
        log::info!(target: log_channels::CONNECTION, "sending code={id:?}");
        let reply = self.reply_of(id);
        self.send_reply(&reply).await
    }

    /// send a reply to the client, tracking the error counters
    ///
    /// # Errors
    ///
    /// * internal connection writer error
    /// * the hard error count has been reached
    pub async fn send_reply(&mut self, reply: &Reply) -> anyhow::Result<()> {
        if !reply.code().is_error() {
            return self.send(&reply.fold()).await;
        }

        self.error_count += 1;

        let hard_error = self.config.server.smtp.error.hard_count;
        let soft_error = self.config.server.smtp.error.soft_count;

        if hard_error != -1 && self.error_count >= hard_error {
            let too_many = self.reply_of(CodesID::TooManyError).fold();

            let mut response = reply.fold();
            if response.len() > 4 {
                response.replace_range(3..4, "-");
            }
            response.push_str(&too_many);
            self.send(&response).await?;

            anyhow::bail!("{:?}", CodesID::TooManyError)
        }

        self.send(&reply.fold()).await?;

        if soft_error != -1 && self.error_count >= soft_error {
            tokio::time::sleep(self.config.server.smtp.error.delay).await;
        }
        Ok(())
    }

    /// Send a buffer
    ///
    /// # Errors
    ///
    /// * internal connection writer error
    pub async fn send(&mut self, reply: &str) -> anyhow::Result<()> {
        log::info!(target: log_channels::CONNECTION, "send=\"{reply:?}\"");
        tokio::io::AsyncWriteExt::write_all(&mut self.inner.inner, reply.as_bytes()).await?;
        tokio::io::AsyncWriteExt::flush(&mut self.inner.inner).await?;
        Ok(())
    }

    /// read a line from the client
    ///
    /// # Errors
    ///
    /// * timed-out
    /// * stream's error
    pub async fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> std::io::Result<Option<std::string::String>> {
        self.inner.next_line(Some(timeout)).await
    }
}
