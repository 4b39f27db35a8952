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
use super::{TestAuthHandler, EHLO_WITH_AUTH, TEST_PASSWORD, TEST_USERNAME};
use crate::config::unsafe_auth_config;
use crate::test_receiver;
use facteur_common::mechanism::Mechanism;

#[tokio::test]
async fn auth_before_ehlo() {
    assert!(test_receiver! {
        with_config => unsafe_auth_config(),
        ["AUTH LOGIN\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "503 Error: send EHLO first\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn auth_without_the_capability() {
    // no auth configured at all, EHLO does not advertise AUTH
    assert!(test_receiver! {
        ["EHLO client.com\r\n", "AUTH LOGIN\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-SIZE 10485670\r\n",
            "250-8BITMIME\r\n",
            "250 PIPELINING\r\n",
            "502 Error: AUTH not implemented\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn mechanism_not_advertised() {
    let mut config = unsafe_auth_config();
    config
        .server
        .smtp
        .auth
        .as_mut()
        .unwrap()
        .mechanisms = vec![Mechanism::Plain];

    assert!(test_receiver! {
        with_config => config,
        ["EHLO client.com\r\n", "AUTH LOGIN\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-SIZE 10485670\r\n",
            "250-8BITMIME\r\n",
            "250-PIPELINING\r\n",
            "250 AUTH PLAIN\r\n",
            "504 Unrecognized authentication type\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn mechanism_unknown_to_the_server() {
    assert!(test_receiver! {
        with_config => unsafe_auth_config(),
        ["EHLO client.com\r\n", "AUTH GSSAPI\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "504 Unrecognized authentication type\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn client_cancels_the_exchange() {
    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        ["EHLO client.com\r\n", "AUTH LOGIN\r\n", "*\r\n", "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "334 VXNlcm5hbWU6\r\n",
            "501 Authentication canceled by client\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn cancel_past_the_attempt_count() {
    let mut config = unsafe_auth_config();
    config
        .server
        .smtp
        .auth
        .as_mut()
        .unwrap()
        .attempt_count_max = 1;

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => config,
        [
            "EHLO client.com\r\n",
            "AUTH LOGIN\r\n",
            "*\r\n",
            "AUTH LOGIN\r\n",
            "*\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "334 VXNlcm5hbWU6\r\n",
            "501 Authentication canceled by client\r\n",
            "334 VXNlcm5hbWU6\r\n",
            "530 5.7.0 Authentication required\r\n",
        ]
        .concat()
    }
    .is_err());
}

#[tokio::test]
async fn initial_response_is_not_base64() {
    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => unsafe_auth_config(),
        ["EHLO client.com\r\n", "AUTH PLAIN !!!\r\n", "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "501 5.5.2 Invalid, not base64\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn payload_with_the_wrong_shape() {
    let auth_line = format!("AUTH PLAIN {}\r\n", base64::encode("no separators here"));

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
            "535 authentication failed (#5.7.1)\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn login_must_not_start_with_a_response() {
    let auth_line = format!("AUTH LOGIN {}\r\n", base64::encode(TEST_USERNAME));

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
            "501 5.7.0 Client must not start with this mechanism\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn password_mechanism_refused_in_clair() {
    let mut config = unsafe_auth_config();
    config
        .server
        .smtp
        .auth
        .as_mut()
        .unwrap()
        .enable_dangerous_mechanism_in_clair = false;

    let auth_line = format!(
        "AUTH PLAIN {}\r\n",
        base64::encode(format!("\0{TEST_USERNAME}\0{TEST_PASSWORD}"))
    );

    assert!(test_receiver! {
        on_mail => &mut TestAuthHandler,
        with_config => config,
        [
            "EHLO client.com\r\n",
            auth_line.as_str(),
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "538 5.7.11 Encryption required for requested authentication mechanism\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn second_auth_is_rejected() {
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
            auth_line.as_str(),
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            EHLO_WITH_AUTH,
            "235 Authentication successful.\r\n",
            "503 Bad sequence of commands\r\n",
            "221 Bye\r\n",
        ]
        .concat()
    }
    .is_ok());
}
