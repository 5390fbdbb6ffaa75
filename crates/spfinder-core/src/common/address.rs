//! Local validation of storage provider addresses.
//!
//! Addresses have the shape `<network><protocol><payload>`:
//!
//! - network: `f` (mainnet) or `t` (testnets)
//! - protocol `0`: decimal actor id, e.g. `f01000`
//! - protocol `1` / `2`: lowercase base32 of a 20-byte hash plus checksum
//!   (secp256k1 / actor)
//! - protocol `3`: lowercase base32 of a 48-byte BLS public key plus checksum
//! - protocol `4`: `<namespace>f<base32 subaddress plus checksum>` (delegated)
//!
//! Checksums are the 4-byte blake2b digest of the protocol byte followed by the
//! payload, so a mistyped address is rejected before any network call.

use crate::{Error, ProviderId, Result};
use blake2::{
    Blake2bVar,
    digest::{Update, VariableOutput},
};
use core::{fmt, str::FromStr};
use data_encoding::BASE32_NOPAD;

const BASE32_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
const CHECKSUM_LEN: usize = 4;
const SECP_ACTOR_PAYLOAD_LEN: usize = 20;
const BLS_PAYLOAD_LEN: usize = 48;
const MAX_SUBADDRESS_LEN: usize = 54;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Id,
    Secp256k1,
    Actor,
    Bls,
    Delegated,
}

/// A storage provider address that passed local validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    raw: String,
}

impl Address {
    pub fn network(&self) -> Network {
        if self.raw.starts_with('f') {
            Network::Mainnet
        } else {
            Network::Testnet
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self.raw.as_bytes()[1] {
            b'0' => Protocol::Id,
            b'1' => Protocol::Secp256k1,
            b'2' => Protocol::Actor,
            b'3' => Protocol::Bls,
            _ => Protocol::Delegated,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        if !input.is_ascii() {
            return Err(Error::address(input, "non-ascii characters"));
        }
        let bytes = input.as_bytes();
        if bytes.len() < 3 {
            return Err(Error::address(input, "too short"));
        }
        if !matches!(bytes[0], b'f' | b't') {
            return Err(Error::address(input, "unknown network prefix"));
        }

        // ASCII only, so byte 2 is a char boundary
        let payload = &input[2..];
        match bytes[1] {
            b'0' => validate_id(input, payload).map(|_| ())?,
            b'1' => validate_checksummed(input, 1, payload, SECP_ACTOR_PAYLOAD_LEN)?,
            b'2' => validate_checksummed(input, 2, payload, SECP_ACTOR_PAYLOAD_LEN)?,
            b'3' => validate_checksummed(input, 3, payload, BLS_PAYLOAD_LEN)?,
            b'4' => validate_delegated(input, payload)?,
            _ => return Err(Error::address(input, "unknown protocol")),
        }

        Ok(Self {
            raw: input.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<Address> for ProviderId {
    fn from(address: Address) -> Self {
        ProviderId::new(address.raw)
    }
}

fn validate_id(input: &str, payload: &str) -> Result<u64> {
    if payload.is_empty() {
        return Err(Error::address(input, "actor id is empty"));
    }
    if !payload.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::address(input, "actor id must be decimal"));
    }
    if payload.len() > 1 && payload.starts_with('0') {
        return Err(Error::address(input, "actor id has leading zeros"));
    }
    payload
        .parse::<u64>()
        .map_err(|e| Error::address(input, format!("actor id out of range: {e}")))
}

fn validate_checksummed(
    input: &str,
    protocol: u8,
    encoded: &str,
    payload_len: usize,
) -> Result<()> {
    let decoded = decode_base32(input, encoded)?;
    if decoded.len() != payload_len + CHECKSUM_LEN {
        return Err(Error::address(
            input,
            format!(
                "expected {payload_len} payload bytes, got {}",
                decoded.len().saturating_sub(CHECKSUM_LEN)
            ),
        ));
    }
    let (payload, sum) = decoded.split_at(payload_len);
    verify_checksum(input, &[&[protocol], payload], sum)
}

fn validate_delegated(input: &str, payload: &str) -> Result<()> {
    let Some((namespace, encoded)) = payload.split_once('f') else {
        return Err(Error::address(input, "missing namespace separator"));
    };
    let namespace = validate_id(input, namespace)?;

    let decoded = decode_base32(input, encoded)?;
    let sub_len = match decoded.len().checked_sub(CHECKSUM_LEN) {
        Some(len) if len <= MAX_SUBADDRESS_LEN => len,
        _ => return Err(Error::address(input, "malformed delegated subaddress")),
    };
    let (subaddress, sum) = decoded.split_at(sub_len);
    verify_checksum(input, &[&[4], &uvarint(namespace), subaddress], sum)
}

fn decode_base32(input: &str, encoded: &str) -> Result<Vec<u8>> {
    if encoded.is_empty() || !encoded.bytes().all(|b| BASE32_ALPHABET.contains(&b)) {
        return Err(Error::address(input, "payload is not lowercase base32"));
    }
    BASE32_NOPAD
        .decode(encoded.to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::address(input, format!("payload is not valid base32: {e}")))
}

fn verify_checksum(input: &str, parts: &[&[u8]], expected: &[u8]) -> Result<()> {
    if checksum(parts).map_err(|reason| Error::address(input, reason))? != expected {
        return Err(Error::address(input, "checksum mismatch"));
    }
    Ok(())
}

/// 4-byte blake2b digest over the concatenation of `parts`.
fn checksum(parts: &[&[u8]]) -> core::result::Result<[u8; CHECKSUM_LEN], String> {
    let mut hasher = Blake2bVar::new(CHECKSUM_LEN).map_err(|e| e.to_string())?;
    for part in parts {
        hasher.update(part);
    }
    let mut sum = [0u8; CHECKSUM_LEN];
    hasher.finalize_variable(&mut sum).map_err(|e| e.to_string())?;
    Ok(sum)
}

/// Unsigned LEB128, as used for the delegated namespace.
fn uvarint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a well-formed address the way a wallet would print it.
    fn encode(
        network: char,
        protocol: u8,
        prefix: &str,
        payload: &[u8],
        signed: &[&[u8]],
    ) -> String {
        let mut body = payload.to_vec();
        body.extend_from_slice(&checksum(signed).unwrap());
        format!(
            "{network}{protocol}{prefix}{}",
            BASE32_NOPAD.encode(&body).to_ascii_lowercase()
        )
    }

    fn secp(network: char, payload: &[u8; 20]) -> String {
        encode(network, 1, "", payload, &[&[1], payload])
    }

    /// Replaces the character at `index` with a different base32 character.
    fn flip(address: &str, index: usize) -> String {
        let mut chars: Vec<char> = address.chars().collect();
        chars[index] = if chars[index] == 'a' { 'b' } else { 'a' };
        chars.into_iter().collect()
    }

    #[test]
    fn accepts_id_addresses() {
        let addr: Address = "f01000".parse().unwrap();
        assert_eq!(addr.network(), Network::Mainnet);
        assert_eq!(addr.protocol(), Protocol::Id);

        let addr: Address = "t00".parse().unwrap();
        assert_eq!(addr.network(), Network::Testnet);
        assert_eq!(ProviderId::from(addr).as_str(), "t00");
    }

    #[test]
    fn accepts_checksummed_addresses() {
        let hash: [u8; 20] = core::array::from_fn(|i| i as u8 * 7);
        let text = secp('f', &hash);
        assert_eq!(text.len(), 41);
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.protocol(), Protocol::Secp256k1);
        assert_eq!(addr.as_str(), text);

        let actor = encode('t', 2, "", &hash, &[&[2], &hash]);
        let addr: Address = actor.parse().unwrap();
        assert_eq!(addr.network(), Network::Testnet);
        assert_eq!(addr.protocol(), Protocol::Actor);

        let key = [0xa5u8; 48];
        let bls = encode('f', 3, "", &key, &[&[3], &key]);
        assert_eq!(bls.len(), 86);
        let addr: Address = bls.parse().unwrap();
        assert_eq!(addr.protocol(), Protocol::Bls);

        let eth = [0x52u8; 20];
        let delegated = encode('f', 4, "10f", &eth, &[&[4], &uvarint(10), &eth]);
        let addr: Address = delegated.parse().unwrap();
        assert_eq!(addr.protocol(), Protocol::Delegated);
    }

    #[test]
    fn mistyped_character_fails_the_checksum() {
        let hash = [0x11u8; 20];
        let good = secp('f', &hash);
        assert!(good.parse::<Address>().is_ok());

        let bad = flip(&good, 10);
        let err = bad.parse::<Address>().unwrap_err();
        assert_eq!(err, Error::address(&bad, "checksum mismatch"));
    }

    #[test]
    fn checksum_covers_the_protocol() {
        let hash = [0x33u8; 20];
        let secp_text = secp('f', &hash);
        let as_actor = format!("f2{}", &secp_text[2..]);
        assert!(as_actor.parse::<Address>().is_err());

        let eth = [0x52u8; 20];
        let wrong_namespace = encode('f', 4, "11f", &eth, &[&[4], &uvarint(10), &eth]);
        assert!(wrong_namespace.parse::<Address>().is_err());
    }

    #[test]
    fn uvarint_matches_leb128() {
        assert_eq!(uvarint(0), [0x00]);
        assert_eq!(uvarint(10), [0x0a]);
        assert_eq!(uvarint(300), [0xac, 0x02]);
    }

    #[test]
    fn rejects_malformed_addresses() {
        let zero_bls = format!("f3{}", "a".repeat(84));
        for bad in [
            "",
            "f0",
            "x01000",
            "f9abc",
            "f0abc",
            "f0007",
            "f099999999999999999999999",
            "f1tooshort",
            "f1ABJXFBP274XPDQCPUAYKWKFB43OMJOTACM2P3ZA",
            zero_bls.as_str(),
            "f410",
            "f4f",
            "f4xfabcdefgh",
            "f410f",
            "fé0",
            "f€1",
            "f0€",
        ] {
            let err = bad.parse::<Address>().unwrap_err();
            assert!(
                matches!(err, Error::AddressFormat { .. }),
                "{bad:?} produced {err:?}"
            );
        }
    }
}
