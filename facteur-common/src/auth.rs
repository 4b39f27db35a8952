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
use hmac::Mac;

/// What the client sent to prove its identity, handed to the application
/// for the actual verdict
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Credentials {
    /// the client sent the password itself (PLAIN, LOGIN)
    Verify {
        /// authentication identity
        authid: String,
        /// password
        authpass: String,
    },
    /// the client answered a server challenge (CRAM-MD5)
    Challenge {
        /// authentication identity
        authid: String,
        /// the challenge issued by the server, decoded form
        challenge: String,
        /// lowercase hex HMAC-MD5 digest computed by the client
        digest: String,
    },
}

impl Credentials {
    /// the identity the client claims
    #[must_use]
    pub fn authid(&self) -> &str {
        match self {
            Self::Verify { authid, .. } | Self::Challenge { authid, .. } => authid,
        }
    }
}

/// Compute the CRAM-MD5 response digest for a challenge, rendered as
/// lowercase hex (RFC 2195)
///
/// # Panics
///
/// * never: HMAC-MD5 accepts keys of any length
#[must_use]
pub fn cram_md5_digest(challenge: &str, secret: &str) -> String {
    let mut mac = <hmac::Hmac<md5::Md5> as Mac>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(challenge.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
