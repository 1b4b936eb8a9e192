use bech32::{FromBase32, ToBase32, Variant};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

pub const ADDRESS_HRP: &str = "erd";

/// A 32-byte MultiversX account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub const fn zero() -> Self {
        Address([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bech32(text: &str) -> Result<Self, ClientError> {
        let (hrp, data, _) =
            bech32::decode(text).map_err(|e| ClientError::decode("address", e))?;
        if hrp != ADDRESS_HRP {
            return Err(ClientError::decode(
                "address",
                format!("expected prefix {ADDRESS_HRP}, got {hrp}"),
            ));
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| ClientError::decode("address", e))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ClientError::decode("address", format!("{} bytes", b.len())))?;
        Ok(Address(bytes))
    }

    pub fn to_bech32(&self) -> String {
        // Only fails for an invalid HRP, and ours is a valid constant.
        bech32::encode(ADDRESS_HRP, self.0.to_base32(), Variant::Bech32)
            .unwrap_or_else(|_| hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_bech32(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

/// A transaction hash as returned by the network.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        TxHash(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self, ClientError> {
        let text = text.strip_prefix("0x").unwrap_or(text);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(text, &mut bytes).map_err(|e| ClientError::decode("tx hash", e))?;
        Ok(TxHash(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", shorten(&self.to_hex()))
    }
}

/// Display form for long identifiers: first 6 and last 4 characters.
pub fn shorten(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 13 {
        return text.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
