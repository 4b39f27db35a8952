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
use crate::handler::{AuthDecision, Handler};
use crate::log_channels;
use crate::receiver::Connection;
use facteur_common::{auth::Credentials, mechanism::Mechanism, re::anyhow, CodesID};

// base64 of "Username:" and "Password:", the LOGIN prompts
const LOGIN_USERNAME_PROMPT: &str = "334 VXNlcm5hbWU6\r\n";
const LOGIN_PASSWORD_PROMPT: &str = "334 UGFzc3dvcmQ6\r\n";

/// Result of the AUTH command
#[must_use]
pub enum AuthExchangeError {
    /// authentication rejected by the application (or not verified at all)
    Failed,
    /// the client stopped the exchange with `*`
    Canceled,
    /// a reply has already been sent, drop the exchange and carry on
    Aborted,
    /// the decoded payload has the wrong shape
    Malformed,
    ///
    InvalidBase64,
    /// no response within the read timeout
    Timeout(std::io::Error),
    ///
    Other(anyhow::Error),
}

async fn read_response<S>(
    conn: &mut Connection<S>,
    timeout: std::time::Duration,
) -> Result<Vec<u8>, AuthExchangeError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    match conn.read(timeout).await {
        Ok(Some(line)) => {
            if line.trim() == "*" {
                return Err(AuthExchangeError::Canceled);
            }
            base64::decode(line.trim()).map_err(|_| AuthExchangeError::InvalidBase64)
        }
        Ok(None) => Err(AuthExchangeError::Other(anyhow::anyhow!(
            "eof during the authentication exchange"
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(AuthExchangeError::Timeout(e)),
        Err(e) => Err(AuthExchangeError::Other(anyhow::anyhow!(e))),
    }
}

fn decode_initial_response(initial_response: Vec<u8>) -> Result<Vec<u8>, AuthExchangeError> {
    // "=" stands for an empty initial response
    if initial_response == b"=" {
        return Ok(vec![]);
    }
    base64::decode(&initial_response).map_err(|_| AuthExchangeError::InvalidBase64)
}

// authzid \0 authcid \0 passwd, the authzid may be absent
fn split_plain_payload(payload: &[u8]) -> Result<(String, String), AuthExchangeError> {
    let fields = payload.split(|b| *b == b'\0').collect::<Vec<_>>();
    let (authid, authpass) = match fields.as_slice() {
        [_, authid, authpass] | [authid, authpass] => (authid, authpass),
        _ => return Err(AuthExchangeError::Malformed),
    };
    Ok((
        String::from_utf8(authid.to_vec()).map_err(|_| AuthExchangeError::Malformed)?,
        String::from_utf8(authpass.to_vec()).map_err(|_| AuthExchangeError::Malformed)?,
    ))
}

pub async fn on_authentication<S, H>(
    conn: &mut Connection<S>,
    handler: &mut H,
    mechanism: Mechanism,
    initial_response: Option<Vec<u8>>,
) -> Result<(), AuthExchangeError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    H: Handler + Send,
{
    if mechanism.must_be_under_tls() && !conn.is_secured {
        if conn
            .config
            .server
            .smtp
            .auth
            .as_ref()
            .map_or(false, |auth| auth.enable_dangerous_mechanism_in_clair)
        {
            log::warn!(
                target: log_channels::AUTH,
                "an unsecured AUTH mechanism ({mechanism}) is used on a non-encrypted connection!"
            );
        } else {
            conn.send_code(CodesID::AuthMechanismMustBeEncrypted)
                .await
                .map_err(AuthExchangeError::Other)?;
            return Err(AuthExchangeError::Aborted);
        }
    }

    if !mechanism.client_first() && initial_response.is_some() {
        conn.send_code(CodesID::AuthClientMustNotStart)
            .await
            .map_err(AuthExchangeError::Other)?;
        return Err(AuthExchangeError::Aborted);
    }

    let timeout = conn.config.server.smtp.timeout_client.helo;

    let credentials = match mechanism {
        Mechanism::Plain => {
            let payload = match initial_response {
                Some(initial_response) => decode_initial_response(initial_response)?,
                None => {
                    conn.send("334 \r\n")
                        .await
                        .map_err(AuthExchangeError::Other)?;
                    read_response(conn, timeout).await?
                }
            };
            let (authid, authpass) = split_plain_payload(&payload)?;
            Credentials::Verify { authid, authpass }
        }
        Mechanism::Login => {
            conn.send(LOGIN_USERNAME_PROMPT)
                .await
                .map_err(AuthExchangeError::Other)?;
            let authid = String::from_utf8(read_response(conn, timeout).await?)
                .map_err(|_| AuthExchangeError::Malformed)?;

            conn.send(LOGIN_PASSWORD_PROMPT)
                .await
                .map_err(AuthExchangeError::Other)?;
            let authpass = String::from_utf8(read_response(conn, timeout).await?)
                .map_err(|_| AuthExchangeError::Malformed)?;

            Credentials::Verify { authid, authpass }
        }
        Mechanism::CramMd5 => {
            let challenge = format!(
                "<{}.{}@{}>",
                conn.rng.u32(..),
                conn.rng.u32(..),
                conn.server_name
            );
            conn.send(&format!("334 {}\r\n", base64::encode(&challenge)))
                .await
                .map_err(AuthExchangeError::Other)?;

            let response = String::from_utf8(read_response(conn, timeout).await?)
                .map_err(|_| AuthExchangeError::Malformed)?;
            let (authid, digest) = response
                .split_once(' ')
                .ok_or(AuthExchangeError::Malformed)?;

            Credentials::Challenge {
                authid: authid.to_string(),
                challenge,
                digest: digest.to_string(),
            }
        }
    };

    match handler.on_auth(&credentials).await {
        AuthDecision::Accepted => {
            conn.send_code(CodesID::AuthSucceeded)
                .await
                .map_err(AuthExchangeError::Other)?;
            conn.is_authenticated = true;
            conn.credentials = Some(credentials);
            Ok(())
        }
        AuthDecision::Rejected | AuthDecision::NotImplemented => Err(AuthExchangeError::Failed),
    }
}
