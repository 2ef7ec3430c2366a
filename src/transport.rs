//! One request, one response over a short lived UDP association.

use crate::{
    dns::Resolver,
    errors::{Error, Result},
    models::{Host, Packet},
};

use {
    bytes::BytesMut,
    std::{
        future::Future,
        net::{Ipv4Addr, Ipv6Addr, SocketAddr},
        time::Duration,
    },
    tokio::net::UdpSocket,
    tracing::trace,
};

/// Default read chunk. A read that fills it completely means more data follows.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one request and returns the complete response.
pub trait Transport {
    fn exchange(&self, host: &Host, request: &[u8]) -> impl Future<Output = Result<Packet>>;
}

pub struct UdpTransport {
    resolver: Resolver,
    timeout: Duration,
    chunk_size: usize,
}

impl UdpTransport {
    pub fn new(resolver: Resolver, timeout: Duration, chunk_size: usize) -> Self {
        Self {
            resolver,
            timeout,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Transport for UdpTransport {
    async fn exchange(&self, host: &Host, request: &[u8]) -> Result<Packet> {
        let addr = self.resolver.resolve(host).await?;

        let data = exchange(addr, request, self.chunk_size, self.timeout).await?;

        Ok(Packet { addr, data })
    }
}

async fn exchange(
    addr: SocketAddr,
    request: &[u8],
    chunk_size: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;

    trace!("Sending data to {}: {}", addr, hex::encode(request));
    socket.send(request).await?;

    let mut out = BytesMut::new();
    let mut chunk = vec![0u8; chunk_size];
    loop {
        // A full chunk may also be the last one, so a silent follow-up read ends the response.
        let n = match tokio::time::timeout(timeout, socket.recv(&mut chunk)).await {
            Ok(n) => n?,
            Err(_) if out.is_empty() => return Err(Error::Timeout),
            Err(_) => break,
        };
        trace!("Received data from {}: {}", addr, hex::encode(&chunk[..n]));
        out.extend_from_slice(&chunk[..n]);
        if n < chunk_size {
            break;
        }
    }

    Ok(out.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn responder(replies: Vec<Vec<u8>>) -> (SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let (n, peer) = socket.recv_from(&mut buf).await.unwrap();
            for reply in replies {
                socket.send_to(&reply, peer).await.unwrap();
            }
            buf.truncate(n);
            buf
        });

        (addr, handle)
    }

    fn transport(timeout: Duration, chunk_size: usize) -> UdpTransport {
        UdpTransport::new(Resolver::new().unwrap(), timeout, chunk_size)
    }

    #[tokio::test]
    async fn test_exchange() {
        let (addr, handle) = responder(vec![b"pong".to_vec()]).await;

        let result = transport(DEFAULT_TIMEOUT, DEFAULT_CHUNK_SIZE)
            .exchange(&Host::A(addr), b"ping")
            .await
            .unwrap();

        assert_eq!(
            result,
            Packet {
                addr,
                data: b"pong".to_vec()
            }
        );
        assert_eq!(handle.await.unwrap(), b"ping".to_vec());
    }

    #[tokio::test]
    async fn test_exchange_reassembles_full_chunks() {
        let (addr, handle) = responder(vec![b"abcd".to_vec(), b"ef".to_vec()]).await;

        let result = transport(DEFAULT_TIMEOUT, 4)
            .exchange(&Host::A(addr), b"ping")
            .await
            .unwrap();

        assert_eq!(result.data, b"abcdef".to_vec());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_exact_chunk() {
        let (addr, handle) = responder(vec![b"abcd".to_vec()]).await;

        let result = transport(Duration::from_millis(200), 4)
            .exchange(&Host::A(addr), b"ping")
            .await
            .unwrap();

        assert_eq!(result.data, b"abcd".to_vec());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        let (addr, handle) = responder(vec![]).await;

        let result = transport(Duration::from_millis(100), DEFAULT_CHUNK_SIZE)
            .exchange(&Host::A(addr), b"ping")
            .await;

        assert!(matches!(result, Err(Error::Timeout)));
        handle.await.unwrap();
    }
}
