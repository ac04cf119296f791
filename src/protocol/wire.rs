//! Wire format for message framing and the connection preamble.
//!
//! Messages are length-prefixed: [4 bytes big-endian u32][payload]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{ProtocolErrorKind, RpcError};

/// Maximum message size used when no limit is configured (64 KB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65_536;

/// Magic bytes opening every connection.
pub const PROTOCOL_MAGIC: [u8; 4] = *b"BKRP";

/// Protocol version carried in the preamble.
pub const PROTOCOL_VERSION: u16 = 1;

/// Preamble length: magic + version.
pub const PREAMBLE_LEN: usize = 6;

fn timed_out(operation: &'static str, after: Duration) -> RpcError {
    RpcError::Timeout {
        operation,
        after_ms: after.as_millis() as u64,
    }
}

/// Write this peer's preamble and flush it.
///
/// The flush is part of the contract: the peer cannot start decoding until
/// these bytes are on the wire.
pub async fn write_preamble<W>(writer: &mut W) -> Result<(), RpcError>
where
    W: AsyncWriteExt + Unpin,
{
    let mut buf = [0u8; PREAMBLE_LEN];
    buf[..4].copy_from_slice(&PROTOCOL_MAGIC);
    buf[4..].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and check the peer's preamble.
pub async fn read_preamble<R>(reader: &mut R) -> Result<(), RpcError>
where
    R: AsyncReadExt + Unpin,
{
    let mut buf = [0u8; PREAMBLE_LEN];
    match reader.read_exact(&mut buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RpcError::protocol(ProtocolErrorKind::ConnectionClosed));
        }
        Err(e) => return Err(RpcError::Io(e)),
    }

    if buf[..4] != PROTOCOL_MAGIC {
        return Err(RpcError::protocol(ProtocolErrorKind::BadPreamble {
            message: format!("unexpected magic {:02x?}", &buf[..4]),
        }));
    }

    let version = u16::from_be_bytes([buf[4], buf[5]]);
    if version != PROTOCOL_VERSION {
        return Err(RpcError::protocol(ProtocolErrorKind::BadPreamble {
            message: format!(
                "unsupported version {} (expected {})",
                version, PROTOCOL_VERSION
            ),
        }));
    }

    Ok(())
}

/// Run the preamble exchange from one side of a connection.
///
/// Both peers call this with the same ordering: flush our own preamble first,
/// then wait for theirs. Reading before our preamble is flushed can deadlock
/// against a peer doing the same.
pub async fn handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    timeout_duration: Duration,
) -> Result<(), RpcError>
where
    R: AsyncReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    timeout(timeout_duration, write_preamble(writer))
        .await
        .map_err(|_| timed_out("writing preamble", timeout_duration))??;

    timeout(timeout_duration, read_preamble(reader))
        .await
        .map_err(|_| timed_out("reading preamble", timeout_duration))?
}

/// Read a length-prefixed message from the reader.
///
/// Returns the raw bytes of the message payload.
/// Returns an error if the message is too large or if reading fails.
pub async fn read_message<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, RpcError>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RpcError::protocol(ProtocolErrorKind::ConnectionClosed));
        }
        Err(e) => return Err(RpcError::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > max_size {
        return Err(RpcError::protocol(ProtocolErrorKind::MessageTooLarge {
            size: len,
            max: max_size,
        }));
    }

    let mut buf = vec![0u8; len];
    match reader.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        // Truncated payload: the frame header promised more than arrived.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(RpcError::protocol(ProtocolErrorKind::InvalidMessageFormat {
                message: format!("payload truncated, expected {} bytes", len),
            }))
        }
        Err(e) => Err(RpcError::Io(e)),
    }
}

/// Write a length-prefixed message to the writer.
pub async fn write_message<W>(writer: &mut W, data: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWriteExt + Unpin,
{
    let len = u32::try_from(data.len()).map_err(|_| {
        RpcError::protocol(ProtocolErrorKind::MessageTooLarge {
            size: data.len(),
            max: u32::MAX as usize,
        })
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed message with a timeout.
///
/// Returns a `Timeout` error if the read takes longer than the specified duration.
pub async fn read_message_with_timeout<R>(
    reader: &mut R,
    max_size: usize,
    timeout_duration: Duration,
) -> Result<Vec<u8>, RpcError>
where
    R: AsyncReadExt + Unpin,
{
    timeout(timeout_duration, read_message(reader, max_size))
        .await
        .map_err(|_| timed_out("reading message", timeout_duration))?
}

/// Write a length-prefixed message with a timeout.
pub async fn write_message_with_timeout<W>(
    writer: &mut W,
    data: &[u8],
    timeout_duration: Duration,
) -> Result<(), RpcError>
where
    W: AsyncWriteExt + Unpin,
{
    timeout(timeout_duration, write_message(writer, data))
        .await
        .map_err(|_| timed_out("writing message", timeout_duration))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_and_read_message() {
        let mut buffer = Vec::new();
        let message = b"hello world";

        write_message(&mut buffer, message).await.unwrap();

        assert_eq!(&buffer[0..4], &[0, 0, 0, 11]);
        assert_eq!(&buffer[4..], message);

        let mut cursor = Cursor::new(buffer);
        let result = read_message(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(result, message);
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(&2_000_000u32.to_be_bytes());
        let mut cursor = Cursor::new(data);

        let result = read_message(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::MessageTooLarge { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let mut data = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(data);

        let result = read_message(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_stream_is_connection_closed() {
        let mut cursor = Cursor::new(Vec::new());
        let result = read_message(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::ConnectionClosed
            })
        ));
    }

    #[tokio::test]
    async fn test_preamble_round_trip() {
        let mut buffer = Vec::new();
        write_preamble(&mut buffer).await.unwrap();
        assert_eq!(buffer, b"BKRP\x00\x01");

        let mut cursor = Cursor::new(buffer);
        read_preamble(&mut cursor).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_magic_rejected() {
        let mut cursor = Cursor::new(b"HTTP/1".to_vec());
        let result = read_preamble(&mut cursor).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::BadPreamble { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let mut cursor = Cursor::new(b"BKRP\x00\x02".to_vec());
        let result = read_preamble(&mut cursor).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::BadPreamble { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_symmetric_handshake_does_not_deadlock() {
        let (client, server) = tokio::io::duplex(64);
        let (mut client_rd, mut client_wr) = tokio::io::split(client);
        let (mut server_rd, mut server_wr) = tokio::io::split(server);
        let wait = Duration::from_secs(2);

        let (a, b) = tokio::join!(
            handshake(&mut client_rd, &mut client_wr, wait),
            handshake(&mut server_rd, &mut server_wr, wait),
        );
        a.unwrap();
        b.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_times_out_on_silent_peer() {
        let (client, _server) = tokio::io::duplex(64);
        let (mut rd, mut wr) = tokio::io::split(client);

        let result = handshake(&mut rd, &mut wr, Duration::from_millis(50)).await;
        assert!(matches!(
            result,
            Err(RpcError::Timeout {
                operation: "reading preamble",
                ..
            })
        ));
    }
}
