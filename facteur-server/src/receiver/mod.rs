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
use self::auth_exchange::{on_authentication, AuthExchangeError};
use self::transaction::{Transaction, TransactionResult};
use crate::handler::{ConnectDecision, DisconnectReason, Handler};
use facteur_common::{mail_context::MailContext, re::anyhow, CodesID, Reply, ReplyCode};

mod auth_exchange;
mod body;
mod connection;
mod io;
pub(crate) mod transaction;

pub use connection::{Connection, ConnectionKind};
pub use io::AbstractIO;

/// Drive one accepted connection from banner to termination.
///
/// `tls_config` carries the rustls parameters backing the handshake of the
/// STARTTLS capability and of tunneled connections; a session whose
/// configuration advertises the capability answers `454` without it. The
/// handler's `on_terminate` runs exactly once on every exit path, before
/// the transport is released.
///
/// # Errors
///
/// * the transport failed
/// * the idle timeout elapsed
/// * the client kept sending errors past the hard count
pub async fn handle_connection<S, H>(
    conn: Connection<S>,
    tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    handler: &mut H,
) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    match handle_connection_inner(conn, tls_config, handler).await {
        Ok(reason) => {
            handler.on_terminate(&reason).await;
            Ok(())
        }
        Err(error) => {
            let reason = if error
                .downcast_ref::<std::io::Error>()
                .map_or(false, |e| e.kind() == std::io::ErrorKind::TimedOut)
            {
                DisconnectReason::Timeout
            } else {
                DisconnectReason::Error
            };
            handler.on_terminate(&reason).await;
            Err(error)
        }
    }
}

async fn handle_connection_inner<S, H>(
    mut conn: Connection<S>,
    tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    handler: &mut H,
) -> anyhow::Result<DisconnectReason>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    if let ConnectionKind::Tunneled = conn.kind {
        return upgrade_to_tls(conn, tls_config, handler).await;
    }

    if let Some(reason) = greet(&mut conn, handler).await? {
        return Ok(reason);
    }

    let mut helo_domain = None;

    while conn.is_alive {
        match Transaction::receive(&mut conn, &helo_domain, handler).await? {
            TransactionResult::Nothing => {}
            TransactionResult::Mail(mail) => {
                forward_mail(&mut conn, handler, &mail, &mut helo_domain).await?;
            }
            TransactionResult::TlsUpgrade if tls_config.is_none() => {
                conn.send_code(CodesID::TlsNotAvailable).await?;
                conn.send_code(CodesID::Closing).await?;
                return Ok(DisconnectReason::Error);
            }
            TransactionResult::TlsUpgrade => {
                return upgrade_to_tls(conn, tls_config, handler).await;
            }
            TransactionResult::Authentication(helo_pre_auth, mechanism, initial_response) => {
                handle_auth(
                    &mut conn,
                    handler,
                    helo_pre_auth,
                    mechanism,
                    initial_response,
                    &mut helo_domain,
                )
                .await?;
            }
        }
    }

    Ok(if conn.client_quit {
        DisconnectReason::Quit
    } else {
        DisconnectReason::PeerClosed
    })
}

// NOTE: same loop as handle_connection_inner; unifying them would make the
// upgrade recurse on its own output type
async fn handle_connection_secured<S, H>(
    mut conn: Connection<tokio_rustls::server::TlsStream<S>>,
    handler: &mut H,
) -> anyhow::Result<DisconnectReason>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    if let ConnectionKind::Tunneled = conn.kind {
        if let Some(reason) = greet(&mut conn, handler).await? {
            return Ok(reason);
        }
    }

    let mut helo_domain = None;

    while conn.is_alive {
        match Transaction::receive(&mut conn, &helo_domain, handler).await? {
            TransactionResult::Nothing => {}
            TransactionResult::Mail(mail) => {
                forward_mail(&mut conn, handler, &mail, &mut helo_domain).await?;
            }
            TransactionResult::TlsUpgrade => {
                anyhow::bail!("tls upgrade issued over an already secured connection")
            }
            TransactionResult::Authentication(helo_pre_auth, mechanism, initial_response) => {
                handle_auth(
                    &mut conn,
                    handler,
                    helo_pre_auth,
                    mechanism,
                    initial_response,
                    &mut helo_domain,
                )
                .await?;
            }
        }
    }

    Ok(if conn.client_quit {
        DisconnectReason::Quit
    } else {
        DisconnectReason::PeerClosed
    })
}

async fn greet<S, H>(
    conn: &mut Connection<S>,
    handler: &mut H,
) -> anyhow::Result<Option<DisconnectReason>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    let server_name = conn.server_name.clone();
    match handler
        .on_connect(&server_name, conn.session_count, conn.client_addr)
        .await
    {
        ConnectDecision::Accept { banner: None } => {
            conn.send_code(CodesID::Greetings).await?;
            Ok(None)
        }
        ConnectDecision::Accept { banner: Some(text) } => {
            conn.send_reply(&Reply::new(ReplyCode::Code { code: 220 }, text))
                .await?;
            Ok(None)
        }
        ConnectDecision::Reject { reply } => {
            conn.send_reply(&reply).await?;
            Ok(Some(DisconnectReason::Refused))
        }
        ConnectDecision::Ignore => Ok(Some(DisconnectReason::Refused)),
    }
}

async fn forward_mail<S, H>(
    conn: &mut Connection<S>,
    handler: &mut H,
    mail: &MailContext,
    helo_domain: &mut Option<String>,
) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    *helo_domain = Some(mail.envelop.helo.clone());

    match handler.on_data(mail).await {
        Ok(reference) => {
            conn.send_reply(&Reply::new(
                ReplyCode::Code { code: 250 },
                format!("queued as {reference}"),
            ))
            .await
        }
        Err(reply) => conn.send_reply(&reply).await,
    }
}

async fn handle_auth<S, H>(
    conn: &mut Connection<S>,
    handler: &mut H,
    helo_pre_auth: String,
    mechanism: facteur_common::mechanism::Mechanism,
    initial_response: Option<Vec<u8>>,
    helo_domain: &mut Option<String>,
) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    match on_authentication(conn, handler, mechanism, initial_response).await {
        Ok(()) => {}
        Err(AuthExchangeError::Failed) => {
            conn.send_code(CodesID::AuthInvalidCredentials).await?;
        }
        Err(AuthExchangeError::Canceled) => {
            conn.authentication_attempt += 1;

            let retries_max = conn
                .config
                .server
                .smtp
                .auth
                .as_ref()
                .map_or(-1, |auth| auth.attempt_count_max);
            if retries_max != -1 && conn.authentication_attempt > retries_max {
                conn.send_code(CodesID::AuthRequired).await?;
                anyhow::bail!("authentication attempt maximum {retries_max} reached");
            }
            conn.send_code(CodesID::AuthClientCanceled).await?;
        }
        Err(AuthExchangeError::Aborted) => {}
        Err(AuthExchangeError::Malformed) => {
            conn.send_code(CodesID::AuthMalformed).await?;
        }
        Err(AuthExchangeError::InvalidBase64) => {
            conn.send_code(CodesID::AuthErrorDecode64).await?;
        }
        Err(AuthExchangeError::Timeout(e)) => {
            conn.send_code(CodesID::Timeout).await?;
            anyhow::bail!(e)
        }
        Err(AuthExchangeError::Other(e)) => anyhow::bail!(e),
    }

    *helo_domain = Some(helo_pre_auth);
    Ok(())
}

async fn upgrade_to_tls<S, H>(
    conn: Connection<S>,
    tls_config: Option<std::sync::Arc<rustls::ServerConfig>>,
    handler: &mut H,
) -> anyhow::Result<DisconnectReason>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    let handshake_timeout = conn
        .config
        .server
        .tls
        .as_ref()
        .ok_or_else(|| {
            anyhow::anyhow!("tls upgrade requested but the server has no tls configuration")
        })?
        .handshake_timeout;

    let tls_config = tls_config.ok_or_else(|| {
        anyhow::anyhow!("tls upgrade requested but no rustls parameters were provided")
    })?;

    let acceptor = tokio_rustls::TlsAcceptor::from(tls_config);

    let Connection {
        kind,
        server_name,
        timestamp,
        config,
        client_addr,
        session_count,
        error_count,
        authentication_attempt,
        inner,
        ..
    } = conn;

    // taking the bare stream out of the framer drops whatever the client
    // pipelined in clair before the handshake
    let tls_stream = tokio::time::timeout(handshake_timeout, acceptor.accept(inner.inner))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::TimedOut, e))?
        .map_err(|e| anyhow::anyhow!("TLS handshake failed: {e}"))?;

    log::info!(
        target: crate::log_channels::CONNECTION,
        "{client_addr} upgraded to tls"
    );

    // whatever was authenticated in clair dies with the clair channel; only
    // the attempt counter survives the upgrade
    let secured_conn = Connection::new_with(
        kind,
        server_name,
        timestamp,
        config,
        client_addr,
        session_count,
        error_count,
        true,
        false,
        authentication_attempt,
        None,
        tls_stream,
    );

    handle_connection_secured(secured_conn, handler).await
}
