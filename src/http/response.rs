//! Response output.
//!
//! # Responsibilities
//! - Write header bytes and raw body bytes for a request
//! - Stream a file body, zero-copy when the sink is a socket
//!
//! # Design Decisions
//! - The sink is chosen by the embedding server (socket, buffer, proxy)
//! - Sockets use sendfile(2) on Linux; other sinks copy through userspace

use std::io;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

/// Destination of response bytes for one request.
#[allow(async_fn_in_trait)]
pub trait ResponseSink {
    /// Writes part of the header block; returns bytes written.
    async fn write_header(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Writes raw body bytes; returns bytes written.
    async fn write_body(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Sends up to `len` bytes of `file` as the body; returns bytes sent.
    async fn send_file(&mut self, file: &mut File, len: u64) -> io::Result<u64>;
}

/// Sink over any async writer, copying file bodies through a buffer.
#[derive(Debug)]
pub struct StreamSink<W> {
    inner: W,
}

impl<W> StreamSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> ResponseSink for StreamSink<W> {
    async fn write_header(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write_all(bytes).await?;
        Ok(bytes.len())
    }

    async fn write_body(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write_all(bytes).await?;
        Ok(bytes.len())
    }

    async fn send_file(&mut self, file: &mut File, len: u64) -> io::Result<u64> {
        let mut limited = file.take(len);
        tokio::io::copy(&mut limited, &mut self.inner).await
    }
}

#[cfg(target_os = "linux")]
macro_rules! socket_sink {
    ($socket:ty) => {
        impl ResponseSink for $socket {
            async fn write_header(&mut self, bytes: &[u8]) -> io::Result<usize> {
                self.write_all(bytes).await?;
                Ok(bytes.len())
            }

            async fn write_body(&mut self, bytes: &[u8]) -> io::Result<usize> {
                self.write_all(bytes).await?;
                Ok(bytes.len())
            }

            async fn send_file(&mut self, file: &mut File, len: u64) -> io::Result<u64> {
                use std::os::unix::io::AsRawFd;
                use tokio::io::Interest;

                let sock_fd = self.as_raw_fd();
                let file_fd = file.as_raw_fd();
                let mut offset: libc::off_t = 0;
                let mut sent = 0u64;

                while sent < len {
                    self.writable().await?;
                    let chunk = (len - sent).min(0x7fff_f000) as usize;
                    let result = self.try_io(Interest::WRITABLE, || {
                        // SAFETY: both descriptors are open for the duration of the call.
                        let n = unsafe { libc::sendfile(sock_fd, file_fd, &mut offset, chunk) };
                        if n < 0 {
                            Err(io::Error::last_os_error())
                        } else {
                            Ok(n as u64)
                        }
                    });
                    match result {
                        // File shorter than announced.
                        Ok(0) => break,
                        Ok(n) => sent += n,
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                        Err(e) => return Err(e),
                    }
                }

                tracing::trace!(bytes = sent, "sendfile complete");
                Ok(sent)
            }
        }
    };
}

#[cfg(not(target_os = "linux"))]
macro_rules! socket_sink {
    ($socket:ty) => {
        impl ResponseSink for $socket {
            async fn write_header(&mut self, bytes: &[u8]) -> io::Result<usize> {
                self.write_all(bytes).await?;
                Ok(bytes.len())
            }

            async fn write_body(&mut self, bytes: &[u8]) -> io::Result<usize> {
                self.write_all(bytes).await?;
                Ok(bytes.len())
            }

            async fn send_file(&mut self, file: &mut File, len: u64) -> io::Result<u64> {
                let mut limited = file.take(len);
                tokio::io::copy(&mut limited, self).await
            }
        }
    };
}

socket_sink!(TcpStream);
socket_sink!(UnixStream);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn stream_sink_collects_everything() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"file-body-and-more").unwrap();
        std::io::Seek::rewind(&mut tmp).unwrap();
        let mut file = File::from_std(tmp);

        let mut sink = StreamSink::new(Vec::new());
        sink.write_header(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();
        let sent = sink.send_file(&mut file, 9).await.unwrap();

        assert_eq!(sent, 9);
        assert_eq!(sink.into_inner(), b"HTTP/1.1 200 OK\r\n\r\nfile-body");
    }

    #[tokio::test]
    async fn socket_sink_sends_file() {
        let mut tmp = tempfile::tempfile().unwrap();
        let body = vec![b'z'; 200_000];
        tmp.write_all(&body).unwrap();
        let mut file = File::from_std(tmp);

        let (mut tx, mut rx) = UnixStream::pair().unwrap();
        let reader = tokio::spawn(async move {
            let mut got = Vec::new();
            rx.read_to_end(&mut got).await.unwrap();
            got
        });

        ResponseSink::write_header(&mut tx, b"H\r\n\r\n").await.unwrap();
        let sent = ResponseSink::send_file(&mut tx, &mut file, body.len() as u64).await.unwrap();
        assert_eq!(sent, body.len() as u64);
        drop(tx);

        let got = reader.await.unwrap();
        assert_eq!(got.len(), 5 + body.len());
        assert_eq!(&got[..5], b"H\r\n\r\n");
    }
}
