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
use crate::config::unsafe_auth_config;
use crate::receiver::TEST_QUEUE_REFERENCE;
use crate::test_receiver;
use facteur_common::{
    auth::{cram_md5_digest, Credentials},
    mail_context::MailContext,
    Reply,
};
use facteur_server::{AuthDecision, Handler};

mod basic;
mod cram;

const TEST_USERNAME: &str = "username";
const TEST_PASSWORD: &str = "PaSSw0rd";

/// verifies `username` / `PaSSw0rd` the way an application would
pub struct TestAuthHandler;

#[async_trait::async_trait]
impl Handler for TestAuthHandler {
    async fn on_auth(&mut self, credentials: &Credentials) -> AuthDecision {
        let valid = match credentials {
            Credentials::Verify { authid, authpass } => {
                authid == TEST_USERNAME && authpass == TEST_PASSWORD
            }
            Credentials::Challenge {
                authid,
                challenge,
                digest,
            } => authid == TEST_USERNAME && *digest == cram_md5_digest(challenge, TEST_PASSWORD),
        };
        if valid {
            AuthDecision::Accepted
        } else {
            AuthDecision::Rejected
        }
    }

    async fn on_data(&mut self, ctx: &MailContext) -> Result<String, Reply> {
        assert!(ctx.envelop.credentials.is_some());
        Ok(TEST_QUEUE_REFERENCE.to_string())
    }
}

const EHLO_WITH_AUTH: &str = concat!(
    "250-testserver.com\r\n",
    "250-SIZE 10485670\r\n",
    "250-8BITMIME\r\n",
    "250-PIPELINING\r\n",
    "250 AUTH PLAIN LOGIN CRAM-MD5\r\n",
);

#[tokio::test]
async fn plain_with_initial_response() {
    let auth_line = format!(
        "AUTH PLAIN {}\r\n",
        base64::encode(format!("\0{TEST_USERNAME}\0{TEST_PASSWORD}"))
    );

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        [
            "EHLO client.com\r\n",
            auth_line.as_str(),
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "235 Authentication successful.\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn plain_with_prompt() {
    let payload = format!(
        "{}\r\n",
        base64::encode(format!("\0{TEST_USERNAME}\0{TEST_PASSWORD}"))
    );

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        [
            "EHLO client.com\r\n",
            "AUTH PLAIN\r\n",
            payload.as_str(),
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "334 \r\n",
            "235 Authentication successful.\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn login() {
    let username = format!("{}\r\n", base64::encode(TEST_USERNAME));
    let password = format!("{}\r\n", base64::encode(TEST_PASSWORD));

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        [
            "EHLO client.com\r\n",
            "AUTH LOGIN\r\n",
            username.as_str(),
            password.as_str(),
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "334 VXNlcm5hbWU6\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "235 Authentication successful.\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn wrong_password_keeps_the_session() {
    let auth_line = format!(
        "AUTH PLAIN {}\r\n",
        base64::encode(format!("\0{TEST_USERNAME}\0not-the-password"))
    );

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        [
            "EHLO client.com\r\n",
            auth_line.as_str(),
            "MAIL FROM:<john@doe>\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "535 Authentication failed.\r\n",
            "250 sender Ok\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}
