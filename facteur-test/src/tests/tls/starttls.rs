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
use super::{test_starttls, tls_auth_config};
use crate::config::tls_config;
use crate::receiver::DefaultMailHandler;
use crate::test_receiver;
use crate::tests::auth::TestAuthHandler;

// base64 of "\0username\0PaSSw0rd", the credential TestAuthHandler accepts
const AUTH_PLAIN_LINE: &str = "AUTH PLAIN AHVzZXJuYW1lAFBhU1N3MHJk\r\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn simple() {
    let (client, server) = test_starttls(
        tls_config(),
        DefaultMailHandler,
        &["EHLO client.com\r\n", "STARTTLS\r\n"],
        &[
            "EHLO client.com\r\n",
            "MAIL FROM:<foo@bar>\r\n",
            "RCPT TO:<bar@foo>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ],
        &[
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250-PIPELINING",
            "250 STARTTLS",
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250 PIPELINING",
            "250 sender Ok",
            "250 recipient Ok",
            "354 enter mail, end with line containing only '.'",
            "250 queued as 00000000",
            "221 Bye",
        ],
    )
    .await;

    assert!(client.is_ok());
    assert!(server.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn double_starttls() {
    let (client, server) = test_starttls(
        tls_config(),
        DefaultMailHandler,
        &["EHLO client.com\r\n", "STARTTLS\r\n"],
        &["EHLO secured.client.com\r\n", "STARTTLS\r\n", "QUIT\r\n"],
        &[
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250-PIPELINING",
            "250 STARTTLS",
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250 PIPELINING",
            "500 TLS already negotiated",
            "221 Bye",
        ],
    )
    .await;

    assert!(client.is_ok());
    assert!(server.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn authentication_does_not_survive_the_upgrade() {
    let (client, server) = test_starttls(
        tls_auth_config(),
        TestAuthHandler,
        &["EHLO client.com\r\n", AUTH_PLAIN_LINE, "STARTTLS\r\n"],
        &[
            "EHLO client.com\r\n",
            "MAIL FROM:<foo@bar>\r\n",
            AUTH_PLAIN_LINE,
            "MAIL FROM:<foo@bar>\r\n",
            "QUIT\r\n",
        ],
        &[
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250-PIPELINING",
            "250-STARTTLS",
            "250 AUTH PLAIN LOGIN CRAM-MD5",
            "235 Authentication successful.",
            "220 testserver.com Service ready",
            "250-testserver.com",
            "250-SIZE 10485670",
            "250-8BITMIME",
            "250-PIPELINING",
            "250 AUTH PLAIN LOGIN CRAM-MD5",
            // the clair-side credential died with the clair channel
            "530 5.7.0 Authentication required",
            "235 Authentication successful.",
            "250 sender Ok",
            "221 Bye",
        ],
    )
    .await;

    assert!(client.is_ok());
    assert!(server.is_ok());
}

#[tokio::test]
async fn no_rustls_parameters_provided() {
    // the capability is advertised out of the config, but the embedder gave
    // the session nothing to handshake with
    assert!(test_receiver! {
        with_config => crate::config::tls_config(),
        ["EHLO foobar\r\n", "STARTTLS\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-SIZE 10485670\r\n",
            "250-8BITMIME\r\n",
            "250-PIPELINING\r\n",
            "250 STARTTLS\r\n",
            "220 testserver.com Service ready\r\n",
            "454 TLS negotiation failed\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}
