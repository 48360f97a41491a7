//! L1 action signing
//!
//! hash = keccak(msgpack(action) || nonce_be || vault_flag [|| vault])
//! The hash becomes the `connectionId` of a phantom `Agent` struct signed
//! under the "Exchange" EIP-712 domain.

use crate::core::Result;
use crate::signer::{keccak256, Eip712Domain, EvmSignature, Signer};

use super::model::Action;

const AGENT_TYPE: &str = "Agent(string source,bytes32 connectionId)";

pub const EXCHANGE_DOMAIN: Eip712Domain = Eip712Domain {
    name: "Exchange",
    version: "1",
    chain_id: 1337,
    verifying_contract: [0u8; 20],
};

/// Hash of the canonical msgpack encoding plus nonce and vault marker.
pub fn action_hash(action: &Action, nonce: u64, vault: Option<&[u8; 20]>) -> Result<[u8; 32]> {
    let mut bytes = rmp_serde::to_vec_named(action)?;
    bytes.extend_from_slice(&nonce.to_be_bytes());
    match vault {
        None => bytes.push(0x00),
        Some(addr) => {
            bytes.push(0x01);
            bytes.extend_from_slice(addr);
        }
    }
    Ok(keccak256(&bytes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhantomAgent {
    pub source: &'static str,
    pub connection_id: [u8; 32],
}

impl PhantomAgent {
    pub fn new(connection_id: [u8; 32], mainnet: bool) -> Self {
        Self {
            source: if mainnet { "a" } else { "b" },
            connection_id,
        }
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(96);
        buf.extend_from_slice(&keccak256(AGENT_TYPE.as_bytes()));
        buf.extend_from_slice(&keccak256(self.source.as_bytes()));
        buf.extend_from_slice(&self.connection_id);
        keccak256(&buf)
    }

    pub fn digest(&self) -> [u8; 32] {
        EXCHANGE_DOMAIN.digest(&self.struct_hash())
    }
}

/// Sign an action. Returns the signature and the digest it covers.
pub fn sign_l1_action(
    signer: &dyn Signer,
    action: &Action,
    nonce: u64,
    vault: Option<&[u8; 20]>,
    mainnet: bool,
) -> Result<(EvmSignature, [u8; 32])> {
    let hash = action_hash(action, nonce, vault)?;
    let digest = PhantomAgent::new(hash, mainnet).digest();
    let signature = signer.sign_digest(&digest)?;
    Ok((signature, digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperliquid_api::model::{BulkCancel, CancelWire};
    use crate::signer::EvmSigner;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn cancel() -> Action {
        Action::Cancel(BulkCancel { cancels: vec![CancelWire { a: 0, o: 12345 }] })
    }

    #[test]
    fn test_hash_covers_nonce_and_vault() {
        let base = action_hash(&cancel(), 1_700_000_000_000, None).unwrap();
        assert_eq!(base, action_hash(&cancel(), 1_700_000_000_000, None).unwrap());
        assert_ne!(base, action_hash(&cancel(), 1_700_000_000_001, None).unwrap());
        assert_ne!(base, action_hash(&cancel(), 1_700_000_000_000, Some(&[0u8; 20])).unwrap());
    }

    #[test]
    fn test_hash_input_layout() {
        let nonce = 42u64;
        let mut expected = rmp_serde::to_vec_named(&cancel()).unwrap();
        expected.extend_from_slice(&nonce.to_be_bytes());
        expected.push(0);
        assert_eq!(action_hash(&cancel(), nonce, None).unwrap(), keccak256(&expected));
    }

    #[test]
    fn test_source_depends_on_network() {
        let hash = [7u8; 32];
        let main = PhantomAgent::new(hash, true);
        let test = PhantomAgent::new(hash, false);
        assert_eq!(main.source, "a");
        assert_eq!(test.source, "b");
        assert_ne!(main.digest(), test.digest());
    }

    #[test]
    fn test_signature_recovers_to_signer() {
        let signer = EvmSigner::from_hex(KEY).unwrap();
        let (sig, digest) = sign_l1_action(&signer, &cancel(), 1, None, true).unwrap();
        let recovered = EvmSigner::recover_address(&digest, &sig).unwrap();
        assert_eq!(recovered, signer.address_bytes());
    }
}
