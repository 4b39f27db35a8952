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
use super::{TestAuthHandler, TEST_PASSWORD, TEST_USERNAME};
use crate::config::unsafe_auth_config;
use facteur_common::auth::cram_md5_digest;
use facteur_server::{handle_connection, AbstractIO, Connection, ConnectionKind};

async fn read_multiline_reply<S>(io: &mut AbstractIO<S>) -> Vec<String>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    let mut output = vec![];
    loop {
        let line = io.next_line(None).await.unwrap().unwrap();
        output.push(line);
        if output.last().unwrap().chars().nth(3) != Some('-') {
            return output;
        }
    }
}

async fn send<S>(io: &mut AbstractIO<S>, line: &str)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    tokio::io::AsyncWriteExt::write_all(&mut io.inner, line.as_bytes())
        .await
        .unwrap();
}

// the challenge is freshly random per session, so the exchange runs over a
// real socket with a real client side instead of a canned transcript
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cram_md5() {
    let socket_server = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = socket_server.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, client_addr) = socket_server.accept().await.unwrap();
        let conn = Connection::new(
            ConnectionKind::Opportunistic,
            client_addr,
            std::sync::Arc::new(unsafe_auth_config()),
            stream,
        );
        handle_connection(conn, None, &mut TestAuthHandler).await
    });

    let client = tokio::spawn(async move {
        let mut io = AbstractIO::new(tokio::net::TcpStream::connect(server_addr).await.unwrap());

        assert_eq!(
            read_multiline_reply(&mut io).await,
            vec!["220 testserver.com Service ready".to_string()]
        );

        send(&mut io, "EHLO client.com\r\n").await;
        assert_eq!(
            read_multiline_reply(&mut io).await.last().unwrap(),
            "250 AUTH PLAIN LOGIN CRAM-MD5"
        );

        send(&mut io, "AUTH CRAM-MD5\r\n").await;
        let challenge_line = io.next_line(None).await.unwrap().unwrap();
        let challenge = String::from_utf8(
            base64::decode(challenge_line.strip_prefix("334 ").unwrap()).unwrap(),
        )
        .unwrap();
        assert!(challenge.starts_with('<'));
        assert!(challenge.ends_with("@testserver.com>"));

        let digest = cram_md5_digest(&challenge, TEST_PASSWORD);
        send(
            &mut io,
            &format!(
                "{}\r\n",
                base64::encode(format!("{TEST_USERNAME} {digest}"))
            ),
        )
        .await;
        assert_eq!(
            io.next_line(None).await.unwrap().unwrap(),
            "235 Authentication successful."
        );

        send(&mut io, "QUIT\r\n").await;
        assert_eq!(io.next_line(None).await.unwrap().unwrap(), "221 Bye");
    });

    let (client, server) = tokio::join!(client, server);
    client.unwrap();
    server.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cram_md5_wrong_digest() {
    let socket_server = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = socket_server.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, client_addr) = socket_server.accept().await.unwrap();
        let conn = Connection::new(
            ConnectionKind::Opportunistic,
            client_addr,
            std::sync::Arc::new(unsafe_auth_config()),
            stream,
        );
        handle_connection(conn, None, &mut TestAuthHandler).await
    });

    let client = tokio::spawn(async move {
        let mut io = AbstractIO::new(tokio::net::TcpStream::connect(server_addr).await.unwrap());

        read_multiline_reply(&mut io).await;
        send(&mut io, "EHLO client.com\r\n").await;
        read_multiline_reply(&mut io).await;

        send(&mut io, "AUTH CRAM-MD5\r\n").await;
        let challenge_line = io.next_line(None).await.unwrap().unwrap();
        assert!(challenge_line.starts_with("334 "));

        send(
            &mut io,
            &format!(
                "{}\r\n",
                base64::encode(format!(
                    "{TEST_USERNAME} 00000000000000000000000000000000"
                ))
            ),
        )
        .await;
        assert_eq!(
            io.next_line(None).await.unwrap().unwrap(),
            "535 Authentication failed."
        );

        send(&mut io, "QUIT\r\n").await;
        assert_eq!(io.next_line(None).await.unwrap().unwrap(), "221 Bye");
    });

    let (client, server) = tokio::join!(client, server);
    client.unwrap();
    server.unwrap().unwrap();
}
