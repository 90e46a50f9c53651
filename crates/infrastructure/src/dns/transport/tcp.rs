use rsdns_domain::DomainError;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Read one length-prefixed DNS message. `Ok(None)` on a clean EOF between
/// messages.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

/// Write one DNS message with its 2-byte length prefix.
pub async fn write_frame<W>(writer: &mut W, message: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u16::try_from(message.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "DNS message exceeds 65535 bytes")
    })?;

    let mut framed = Vec::with_capacity(message.len() + 2);
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message);
    writer.write_all(&framed).await?;
    writer.flush().await
}

/// Send `query` and read a single reply over an established stream.
pub async fn exchange_stream<S>(stream: &mut S, query: &[u8]) -> Result<Vec<u8>, DomainError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(stream, query).await?;
    read_frame(stream)
        .await?
        .ok_or_else(|| DomainError::Transport("Connection closed before reply".into()))
}

/// DNS over TCP, one connection per exchange.
pub struct TcpTransport;

impl TcpTransport {
    pub async fn exchange(
        server: SocketAddr,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        let exchange = async {
            let mut stream = TcpStream::connect(server).await.map_err(|e| {
                DomainError::Transport(format!("Failed to connect to {}: {}", server, e))
            })?;
            stream.set_nodelay(true)?;
            exchange_stream(&mut stream, query).await
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| {
            DomainError::Transport(format!("Timeout waiting for TCP response from {}", server))
        })?
    }
}
