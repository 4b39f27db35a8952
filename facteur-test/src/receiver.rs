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
use facteur_common::mail_context::MailContext;
use facteur_config::Config;
use facteur_server::{handle_connection, Connection, ConnectionKind, Handler};

/// A type implementing Write+Read to emulate sockets
pub struct Mock<'a, T: AsRef<[u8]> + Unpin> {
    read_cursor: std::io::Cursor<T>,
    write_cursor: std::io::Cursor<&'a mut Vec<u8>>,
}

impl<'a, T: AsRef<[u8]> + Unpin> Mock<'a, T> {
    /// Create a new instance
    pub fn new(read: T, write: &'a mut Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            write_cursor: std::io::Cursor::new(write),
        }
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncRead for Mock<'_, T> {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncWrite for Mock<'_, T> {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<Result<usize, std::io::Error>> {
        std::task::Poll::Ready(std::io::Write::write(&mut self.write_cursor, buf))
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(std::io::Write::flush(&mut self.write_cursor))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// queue reference every accepted message gets in the suites
pub const TEST_QUEUE_REFERENCE: &str = "00000000";

/// used for testing, accepts everything and stores nothing
pub struct DefaultMailHandler;

#[async_trait::async_trait]
impl Handler for DefaultMailHandler {
    async fn on_data(&mut self, _: &MailContext) -> Result<String, facteur_common::Reply> {
        Ok(TEST_QUEUE_REFERENCE.to_string())
    }
}

/// run a connection and assert output produced by facteur and `expected_output`
///
/// # Errors
///
/// * the outcome of [`handle_connection`]
///
/// # Panics
///
/// * arguments provided are ill-formed
pub async fn test_receiver_inner<H>(
    address: &str,
    handler: &mut H,
    smtp_input: &[u8],
    expected_output: &[u8],
    config: std::sync::Arc<Config>,
) -> anyhow::Result<()>
where
    H: Handler + Send,
{
    let mut written_data = Vec::new();
    let mock = Mock::new(smtp_input.to_vec(), &mut written_data);
    let conn = Connection::new(
        ConnectionKind::Opportunistic,
        address.parse().unwrap(),
        config,
        mock,
    );

    let result = handle_connection(conn, None, handler).await;

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&written_data),
    );

    result
}

/// Call [`test_receiver_inner`] on an in-memory transport
#[macro_export]
macro_rules! test_receiver {
    ($input:expr, $output:expr) => {
        test_receiver! {
            on_mail => &mut $crate::receiver::DefaultMailHandler {},
            with_config => $crate::config::local_test(),
            $input,
            $output
        }
    };
    (on_mail => $handler:expr, $input:expr, $output:expr) => {
        test_receiver! {
            on_mail => $handler,
            with_config => $crate::config::local_test(),
            $input,
            $output
        }
    };
    (with_config => $config:expr, $input:expr, $output:expr) => {
        test_receiver! {
            on_mail => &mut $crate::receiver::DefaultMailHandler {},
            with_config => $config,
            $input,
            $output
        }
    };
    (on_mail => $handler:expr, with_config => $config:expr, $input:expr, $output:expr) => {
        $crate::receiver::test_receiver_inner(
            "127.0.0.1:0",
            $handler,
            $input.as_bytes(),
            $output.as_bytes(),
            std::sync::Arc::new($config),
        )
        .await
    };
}
