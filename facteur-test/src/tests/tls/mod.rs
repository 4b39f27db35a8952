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
mod starttls;

use facteur_common::mechanism::Mechanism;
use facteur_config::{get_rustls_config, Config};
use facteur_server::{handle_connection, AbstractIO, Connection, ConnectionKind, Handler};

/// STARTTLS plus an AUTH capability that insists on authenticated senders
fn tls_auth_config() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name("testserver.com")
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .with_safe_tls_config(crate::config::TEST_SERVER_CERT, crate::config::TEST_SERVER_KEY)
        .unwrap()
        .with_default_smtp_options()
        .with_default_smtp_error_handler()
        .with_default_smtp_codes()
        .with_auth(
            true,
            true,
            vec![Mechanism::Plain, Mechanism::Login, Mechanism::CramMd5],
            -1,
        )
        .validate()
        .unwrap()
}

fn client_tls_config() -> std::sync::Arc<rustls::ClientConfig> {
    let mut reader: &[u8] = crate::get_tls_file::get_certificate().as_bytes();

    let pem = rustls_pemfile::certs(&mut reader)
        .unwrap()
        .into_iter()
        .map(rustls::Certificate)
        .collect::<Vec<_>>();

    let mut root_store = rustls::RootCertStore::empty();
    for i in pem {
        root_store.add(&i).unwrap();
    }

    std::sync::Arc::new(
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}

// two tasks over a real socket so the handshake runs concurrently
async fn test_starttls<H>(
    server_config: Config,
    mut handler: H,
    clair_smtp_input: &'static [&str],
    secured_smtp_input: &'static [&str],
    expected_output: &'static [&str],
) -> (anyhow::Result<()>, anyhow::Result<()>)
where
    H: Handler + Send + 'static,
{
    let socket_server = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = socket_server.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, client_addr) = socket_server.accept().await.unwrap();

        let config = std::sync::Arc::new(server_config);
        let rustls_config = std::sync::Arc::new(
            get_rustls_config(config.server.tls.as_ref().unwrap()).unwrap(),
        );

        let conn = Connection::new(ConnectionKind::Opportunistic, client_addr, config, stream);
        handle_connection(conn, Some(rustls_config), &mut handler).await
    });

    let connector = tokio_rustls::TlsConnector::from(client_tls_config());

    let client = tokio::spawn(async move {
        let mut stream = AbstractIO::new(
            tokio::net::TcpStream::connect(server_addr).await.unwrap(),
        );

        let mut output = vec![];
        let mut input = clair_smtp_input.iter().copied();

        loop {
            let line = stream.next_line(None).await.unwrap().unwrap();
            output.push(line);
            if output.last().unwrap().chars().nth(3) == Some('-') {
                continue;
            }
            match input.next() {
                Some(line) => {
                    tokio::io::AsyncWriteExt::write_all(&mut stream.inner, line.as_bytes())
                        .await
                        .unwrap();
                }
                None => break,
            }
        }

        let mut stream = AbstractIO::new(
            connector
                .connect(
                    rustls::ServerName::try_from("testserver.com").unwrap(),
                    stream.inner,
                )
                .await?,
        );

        let mut input = secured_smtp_input.iter().copied();

        tokio::io::AsyncWriteExt::write_all(&mut stream.inner, input.next().unwrap().as_bytes())
            .await
            .unwrap();

        loop {
            let line = stream.next_line(None).await.unwrap().unwrap();
            output.push(line);
            if output.last().unwrap().chars().nth(3) == Some('-') {
                continue;
            }
            match input.next() {
                Some(line) => {
                    tokio::io::AsyncWriteExt::write_all(&mut stream.inner, line.as_bytes())
                        .await
                        .unwrap();
                }
                None => break,
            }
        }
        while let Ok(Some(last)) = stream.next_line(None).await {
            output.push(last);
        }

        pretty_assertions::assert_eq!(expected_output, output);

        anyhow::Ok(())
    });

    let (client, server) = tokio::join!(client, server);

    (client.unwrap(), server.unwrap())
}
