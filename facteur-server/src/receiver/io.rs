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

/// Line- and chunk-oriented view over the transport.
///
/// `next_line` frames CRLF-terminated commands and header lines;
/// `next_chunk` hands out raw bytes for the body phase of DATA. Both pull
/// from the same internal buffer, so pipelined input survives the switch
/// between the two modes, and `unread` can push post-sentinel bytes back in
/// front of the next command.
#[derive(Debug)]
pub struct AbstractIO<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub inner: S,
    buf: Vec<u8>,
}

macro_rules! ready {
    ($e:expr) => {
        match $e {
            std::task::Poll::Ready(t) => t,
            std::task::Poll::Pending => {
                return std::task::Poll::Pending;
            }
        }
    };
}

impl<S> tokio::io::AsyncRead for AbstractIO<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::pin::Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

const BUFFER_SIZE: usize = 100;
const NEEDLE: &[u8] = b"\r\n";

// a line that grows past this without a terminator is a protocol failure
const LINE_MAX_SIZE: usize = 8192;

// scratch size of one transport read in chunk mode when no ceiling applies
const CHUNK_BUFFER_SIZE: usize = 8192;

impl<S> AbstractIO<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buf: Vec::new(),
        }
    }

    /// read one CRLF-terminated line, stripped of its terminator
    ///
    /// # Errors
    ///
    /// * timed-out
    /// * the line exceeds the framer buffer without a terminator
    pub async fn next_line(
        &mut self,
        timeout: Option<std::time::Duration>,
    ) -> std::io::Result<Option<String>> {
        tokio::time::timeout(
            timeout.unwrap_or(std::time::Duration::from_millis(500)),
            self,
        )
        .await
        .map_err(|t| std::io::Error::new(std::io::ErrorKind::TimedOut, t))?
    }

    /// read whatever bytes are available, at most `ceiling` when non-zero
    ///
    /// Buffered bytes are served before the transport is touched. `None`
    /// means the peer closed the stream.
    ///
    /// # Errors
    ///
    /// * timed-out
    /// * stream's error
    pub async fn next_chunk(
        &mut self,
        ceiling: usize,
        timeout: std::time::Duration,
    ) -> std::io::Result<Option<Vec<u8>>> {
        tokio::time::timeout(timeout, async {
            if self.buf.is_empty() {
                let mut raw = vec![
                    0;
                    if ceiling == 0 {
                        CHUNK_BUFFER_SIZE
                    } else {
                        ceiling
                    }
                ];
                let read = tokio::io::AsyncReadExt::read(&mut self.inner, &mut raw).await?;
                if read == 0 {
                    return Ok(None);
                }
                raw.truncate(read);
                self.buf = raw;
            }
            let take = if ceiling == 0 {
                self.buf.len()
            } else {
                self.buf.len().min(ceiling)
            };
            Ok(Some(self.buf.drain(..take).collect()))
        })
        .await
        .map_err(|t| std::io::Error::new(std::io::ErrorKind::TimedOut, t))?
    }

    /// push bytes back in front of the buffer, to be served by the next read
    pub fn unread(&mut self, mut bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        bytes.extend_from_slice(&self.buf);
        self.buf = bytes;
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin> tokio::io::AsyncBufRead
    for AbstractIO<S>
{
    fn poll_fill_buf(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<&[u8]>> {
        if self.as_mut().buf.is_empty() {
            let mut raw = vec![0; BUFFER_SIZE];
            let mut buf = tokio::io::ReadBuf::new(&mut raw);
            ready!(tokio::io::AsyncRead::poll_read(self.as_mut(), cx, &mut buf,))?;
            self.as_mut().buf = buf.filled().to_vec();
        }
        std::task::Poll::Ready(Ok(&self.get_mut().buf))
    }

    fn consume(mut self: std::pin::Pin<&mut Self>, amt: usize) {
        self.buf = self.buf[amt..].to_vec();
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin> std::future::Future
    for AbstractIO<S>
{
    type Output = std::io::Result<Option<String>>;

    fn poll(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let mut output = vec![];
        loop {
            let available = ready!(tokio::io::AsyncBufRead::poll_fill_buf(self.as_mut(), cx))?;
            if available.is_empty() {
                return std::task::Poll::Ready(Ok(None));
            }

            if let Some(i) = available
                .windows(NEEDLE.len())
                .position(|window| window == NEEDLE)
            {
                let slice = &available[..i];
                output.extend_from_slice(slice);
                tokio::io::AsyncBufRead::consume(self.as_mut(), i + NEEDLE.len());

                return std::task::Poll::Ready(Ok(Some(
                    String::from_utf8(output)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
                )));
            }
            let len = available.len();
            output.extend_from_slice(available);
            tokio::io::AsyncBufRead::consume(self.as_mut(), len);

            if output.len() > LINE_MAX_SIZE {
                return std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "framer buffer exceeded without a line terminator",
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mock {
        read_cursor: std::io::Cursor<Vec<u8>>,
    }

    impl tokio::io::AsyncRead for Mock {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
            std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
        }
    }

    impl tokio::io::AsyncWrite for Mock {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<Result<usize, std::io::Error>> {
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn mock(input: &[u8]) -> AbstractIO<Mock> {
        AbstractIO::new(Mock {
            read_cursor: std::io::Cursor::new(input.to_vec()),
        })
    }

    #[tokio::test]
    async fn read_lines() {
        let input = ["a\r\n", "b\r\n", "c\r\n", "d\r\n", "e\r\n", "f\r\n"].concat();
        let mut io = mock(input.as_bytes());

        let mut has_been_read = vec![];
        while let Ok(Some(line)) = io.next_line(None).await {
            has_been_read.push(line);
        }

        pretty_assertions::assert_eq!(
            input,
            has_been_read
                .into_iter()
                .map(|mut i| {
                    i.push_str("\r\n");
                    i
                })
                .collect::<Vec<_>>()
                .concat()
        );
    }

    #[tokio::test]
    async fn line_split_across_reads() {
        // BUFFER_SIZE is 100, so this line arrives in three fill_buf calls
        let line = "x".repeat(250);
        let mut io = mock(format!("{line}\r\n").as_bytes());
        assert_eq!(io.next_line(None).await.unwrap(), Some(line));
    }

    #[tokio::test]
    async fn line_never_terminated() {
        let mut io = mock("y".repeat(LINE_MAX_SIZE + 100).as_bytes());
        assert_eq!(
            io.next_line(None).await.unwrap_err().kind(),
            std::io::ErrorKind::InvalidData
        );
    }

    #[tokio::test]
    async fn chunks_honor_the_ceiling() {
        let mut io = mock(&[b'z'; 100]);
        let chunk = io
            .next_chunk(8, std::time::Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.len(), 8);
        let chunk = io
            .next_chunk(0, std::time::Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.len(), 92);
    }

    #[tokio::test]
    async fn unread_is_served_first() {
        let mut io = mock(b"QUIT\r\n");
        io.unread(b"NOOP\r\n".to_vec());
        assert_eq!(io.next_line(None).await.unwrap(), Some("NOOP".to_string()));
        assert_eq!(io.next_line(None).await.unwrap(), Some("QUIT".to_string()));
    }

    #[tokio::test]
    async fn mode_switch_keeps_pipelined_bytes() {
        let mut io = mock(b"DATA\r\nbody bytes");
        assert_eq!(io.next_line(None).await.unwrap(), Some("DATA".to_string()));
        let chunk = io
            .next_chunk(0, std::time::Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        // what the line framer had already buffered is not lost
        assert_eq!(&chunk, b"body bytes");
    }
}
