//! Typed encode/decode on top of the frame layer.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{ProtocolErrorKind, RpcError};

use super::wire::{read_message_with_timeout, write_message_with_timeout};

/// Encode a value to its payload bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode payload bytes into a value.
///
/// Anything that is not exactly one well-formed `T` is a protocol violation.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    serde_json::from_slice(bytes).map_err(|e| {
        RpcError::protocol(ProtocolErrorKind::InvalidMessageFormat {
            message: format!("Invalid JSON: {}", e),
        })
    })
}

/// Encode `value` and write it as one frame.
pub async fn send_value<W, T>(writer: &mut W, value: &T, timeout: Duration) -> Result<(), RpcError>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let bytes = encode(value)?;
    write_message_with_timeout(writer, &bytes, timeout).await
}

/// Read one frame and decode it as `T`.
pub async fn recv_value<R, T>(
    reader: &mut R,
    max_size: usize,
    timeout: Duration,
) -> Result<T, RpcError>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let bytes = read_message_with_timeout(reader, max_size, timeout).await?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PricingRequest, PricingResponse, DEFAULT_MAX_MESSAGE_SIZE};
    use std::io::Cursor;

    #[test]
    fn test_round_trip_law() {
        let requests = [
            PricingRequest::Flight { distance: 50 },
            PricingRequest::Hotel { nights: 0 },
            PricingRequest::Flight { distance: -3 },
        ];
        for request in requests {
            let bytes = encode(&request).unwrap();
            let decoded: PricingRequest = decode(&bytes).unwrap();
            assert_eq!(decoded, request);
            assert_eq!(encode(&decoded).unwrap(), bytes);
        }

        let responses = [
            PricingResponse::Flight { price: 2500.0 },
            PricingResponse::Hotel { price: 0.0 },
            PricingResponse::Hotel { price: 1234.5 },
        ];
        for response in responses {
            let bytes = encode(&response).unwrap();
            let decoded: PricingResponse = decode(&bytes).unwrap();
            assert_eq!(decoded, response);
            assert_eq!(encode(&decoded).unwrap(), bytes);
        }
    }

    #[test]
    fn test_malformed_bytes_are_protocol_violation() {
        let result: Result<PricingRequest, _> = decode(b"\xff\x00not json");
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
    }

    #[test]
    fn test_request_does_not_decode_as_response() {
        let bytes = encode(&PricingRequest::Hotel { nights: 2 }).unwrap();
        let result: Result<PricingResponse, _> = decode(&bytes);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_then_recv() {
        let mut buffer = Vec::new();
        let wait = Duration::from_secs(1);
        send_value(&mut buffer, &PricingRequest::Flight { distance: 7 }, wait)
            .await
            .unwrap();

        let mut cursor = Cursor::new(buffer);
        let request: PricingRequest = recv_value(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE, wait)
            .await
            .unwrap();
        assert_eq!(request, PricingRequest::Flight { distance: 7 });
    }
}
