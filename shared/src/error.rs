use crate::Packet;
use thiserror::Error;

/// Upper bound for one encoded datagram.
pub const MAX_PACKET_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("packet of {size} bytes exceeds the {limit} byte limit")]
    Oversized { size: usize, limit: usize },
}

pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let data = bincode::serialize(packet).map_err(ProtocolError::Encode)?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::Oversized {
            size: data.len(),
            limit: MAX_PACKET_SIZE,
        });
    }
    Ok(data)
}

pub fn decode_packet(data: &[u8]) -> Result<Packet, ProtocolError> {
    if data.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::Oversized {
            size: data.len(),
            limit: MAX_PACKET_SIZE,
        });
    }
    bincode::deserialize(data).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_packet() {
        let data = encode_packet(&Packet::Disconnect).unwrap();
        assert!(matches!(decode_packet(&data).unwrap(), Packet::Disconnect));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_packet(&[255, 255, 255, 255, 1, 2, 3]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_oversized_is_rejected() {
        let data = vec![0u8; MAX_PACKET_SIZE + 1];
        assert!(matches!(
            decode_packet(&data),
            Err(ProtocolError::Oversized { .. })
        ));
    }
}
