//! EVM signing: keccak, EIP-712 digests and recoverable secp256k1 signatures.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::core::{Error, Result};

/// Signs 32-byte digests on behalf of one account
pub trait Signer: Send + Sync {
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<EvmSignature>;
    fn address(&self) -> String;
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Parse a `0x`-prefixed (or bare) 20-byte address.
pub fn parse_address(s: &str) -> Result<[u8; 20]> {
    let body = s.trim().trim_start_matches("0x");
    let bytes = hex::decode(body).map_err(|e| Error::Signing(format!("bad address {}: {}", s, e)))?;
    bytes
        .try_into()
        .map_err(|_| Error::Signing(format!("address {} is not 20 bytes", s)))
}

/// Recoverable signature in Ethereum layout (v = 27 | 28)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl EvmSignature {
    /// `0x` + r + s + v, 65 bytes hex
    pub fn to_hex(&self) -> String {
        format!("0x{}{}{:02x}", hex::encode(self.r), hex::encode(self.s), self.v)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| Error::Signing(format!("bad signature hex: {}", e)))?;
        if bytes.len() != 65 {
            return Err(Error::Signing(format!("signature is {} bytes, want 65", bytes.len())));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }
}

/// EIP-712 domain with the four standard fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: [u8; 20],
}

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

impl Eip712Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
        buf.extend_from_slice(&keccak256(self.name.as_bytes()));
        buf.extend_from_slice(&keccak256(self.version.as_bytes()));
        buf.extend_from_slice(&uint256(self.chain_id));
        let mut contract = [0u8; 32];
        contract[12..].copy_from_slice(&self.verifying_contract);
        buf.extend_from_slice(&contract);
        keccak256(&buf)
    }

    /// keccak(0x1901 || domainSeparator || structHash)
    pub fn digest(&self, struct_hash: &[u8; 32]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(2 + 64);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(&self.separator());
        buf.extend_from_slice(struct_hash);
        keccak256(&buf)
    }
}

fn uint256(v: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&v.to_be_bytes());
    out
}

fn address_of(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    addr
}

/// EVM ECDSA Signer (k256)
pub struct EvmSigner {
    key: SigningKey,
    address: [u8; 20],
}

impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address_hex())
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    /// Create from hex private key
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(private_key_hex.trim().trim_start_matches("0x"))
            .map_err(|e| Error::Signing(format!("bad private key hex: {}", e)))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::Signing(format!("bad private key: {}", e)))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address_bytes(&self) -> [u8; 20] {
        self.address
    }

    /// Lowercase `0x` address
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// Recover the signer address of `digest`.
    pub fn recover_address(digest: &[u8; 32], sig: &EvmSignature) -> Result<[u8; 20]> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&sig.r);
        rs[32..].copy_from_slice(&sig.s);
        let signature = Signature::from_slice(&rs)
            .map_err(|e| Error::Signing(format!("bad signature: {}", e)))?;
        let recid = sig
            .v
            .checked_sub(27)
            .and_then(RecoveryId::from_byte)
            .ok_or_else(|| Error::Signing(format!("bad recovery id {}", sig.v)))?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recid)
            .map_err(|e| Error::Signing(format!("recovery failed: {}", e)))?;
        Ok(address_of(&key))
    }
}

impl Signer for EvmSigner {
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<EvmSignature> {
        let (signature, recid) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::Signing(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(EvmSignature { r, s, v: 27 + recid.to_byte() })
    }

    fn address(&self) -> String {
        self.address_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_domain_typehash() {
        assert_eq!(
            hex::encode(keccak256(DOMAIN_TYPE.as_bytes())),
            "8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
        );
    }

    #[test]
    fn test_address_from_key() {
        let signer = EvmSigner::from_hex(KEY).unwrap();
        assert_eq!(
            signer.address_hex(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23".to_lowercase()
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = EvmSigner::from_hex(KEY).unwrap();
        let digest = keccak256(b"perp-gateway");
        let sig = signer.sign_digest(&digest).unwrap();
        assert!(sig.v == 27 || sig.v == 28);

        let hex_sig = sig.to_hex();
        assert_eq!(hex_sig.len(), 2 + 130);
        let parsed = EvmSignature::from_hex(&hex_sig).unwrap();
        assert_eq!(parsed, sig);

        let recovered = EvmSigner::recover_address(&digest, &parsed).unwrap();
        assert_eq!(recovered, signer.address_bytes());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = EvmSigner::from_hex(KEY).unwrap();
        let digest = keccak256(b"nonce-1");
        assert_eq!(signer.sign_digest(&digest).unwrap(), signer.sign_digest(&digest).unwrap());
    }

    #[test]
    fn test_bad_key_material() {
        assert!(matches!(EvmSigner::from_hex("0xzz"), Err(Error::Signing(_))));
        assert!(matches!(EvmSigner::from_hex(&"00".repeat(32)), Err(Error::Signing(_))));
    }

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(addr[19], 1);
        assert!(parse_address("0x01").is_err());
    }
}
