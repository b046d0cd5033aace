use crate::TokenError;
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;

const BLOCK_LEN: usize = 16;

/// Derives the `AccessToken` a gateway expects on write requests.
///
/// The session `token` is encrypted with AES-128 under `key`, block by block
/// with no chaining and no padding, and hex-encoded in upper case. The
/// 16-byte tokens gateways hand out yield a 32-character result.
pub fn access_token(key: &[u8], token: &[u8]) -> Result<String, TokenError> {
    let cipher =
        Aes128::new_from_slice(key).map_err(|_| TokenError::InvalidKeyLength(key.len()))?;
    if token.is_empty() || token.len() % BLOCK_LEN != 0 {
        return Err(TokenError::InvalidTokenLength(token.len()));
    }

    let mut out = Vec::with_capacity(token.len());
    for chunk in token.chunks_exact(BLOCK_LEN) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(&block);
    }
    Ok(hex::encode_upper(out))
}
