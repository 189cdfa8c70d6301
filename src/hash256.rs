use super::*;

/// A 32-byte hash kept in the byte order the digest produced it. Bitcoin-family
/// RPC interfaces display hashes byte-reversed, so every hex conversion is
/// explicit about orientation: `to_hex` is the natural order, `to_reversed_hex`
/// is the display order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0; 32]);

    pub fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_byte_array(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn reversed(self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn to_reversed_hex(self) -> String {
        hex::encode(self.reversed().0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        ensure!(s.len() == 64, "hash hex must be 64 chars, got {}", s.len());
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_reversed_hex(s: &str) -> Result<Self> {
        Ok(Self::from_hex(s)?.reversed())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl Display for Hash256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

pub fn double_sha256(bytes: &[u8]) -> Hash256 {
    Hash256(sha256d::Hash::hash(bytes).to_byte_array())
}

/// Scrypt with N=1024, r=1, p=1, the input doubling as its own salt. This is
/// the proof-of-work digest of the Litecoin family; the parameters are fixed
/// by consensus.
pub fn scrypt_digest(bytes: &[u8]) -> Hash256 {
    let params =
        scrypt::Params::new(10, 1, 1, 32).expect("hardcoded scrypt parameters are valid");

    let mut output = [0u8; 32];
    scrypt::scrypt(bytes, bytes, &params, &mut output)
        .expect("32 byte output length is valid");

    Hash256(output)
}
