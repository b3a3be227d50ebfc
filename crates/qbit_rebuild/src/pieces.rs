use hex::FromHexError;

use crate::error::ValidationError;

/// Width of a v1 piece hash in bytes.
pub const PIECE_HASH_LEN: usize = 20;

/// Width of a v1 piece hash as the daemon reports it.
pub const PIECE_HASH_HEX_LEN: usize = PIECE_HASH_LEN * 2;

/// Decodes per-piece hex SHA-1 digests into the concatenated binary blob
/// stored under the `pieces` key.
///
/// Digests are taken in piece-index order. A digest that is not exactly
/// 40 hex characters is rejected rather than padded or truncated. An empty
/// slice yields an empty blob.
pub fn assemble_pieces<S: AsRef<str>>(hex_digests: &[S]) -> Result<Vec<u8>, ValidationError> {
    let mut pieces = Vec::with_capacity(hex_digests.len() * PIECE_HASH_LEN);

    for (index, digest) in hex_digests.iter().enumerate() {
        pieces.extend_from_slice(&decode_digest(index, digest.as_ref())?);
    }

    Ok(pieces)
}

fn decode_digest(index: usize, digest: &str) -> Result<[u8; PIECE_HASH_LEN], ValidationError> {
    let len = digest.len();
    if len % 2 != 0 {
        return Err(ValidationError::DigestOddLength { index, len });
    }
    if len != PIECE_HASH_HEX_LEN {
        return Err(ValidationError::DigestLength { index, len });
    }

    let mut out = [0u8; PIECE_HASH_LEN];
    hex::decode_to_slice(digest, &mut out).map_err(|err| match err {
        FromHexError::InvalidHexCharacter { c, index: offset } => {
            ValidationError::DigestCharacter {
                index,
                ch: c,
                offset,
            }
        }
        FromHexError::OddLength => ValidationError::DigestOddLength { index, len },
        FromHexError::InvalidStringLength => ValidationError::DigestLength { index, len },
    })?;
    Ok(out)
}
