use super::*;

/// The previous block hash as Stratum puts it on the wire: the 32 header
/// bytes with every u32 word byte-swapped. Internally this wraps the hash in
/// header (natural little-endian) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash(Hash256);

impl PrevHash {
    pub fn hash(self) -> Hash256 {
        self.0
    }
}

impl From<Hash256> for PrevHash {
    fn from(hash: Hash256) -> Self {
        Self(hash)
    }
}

impl FromStr for PrevHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ensure!(s.len() == 64, "prevhash hex must be 64 chars, got {}", s.len());
        let mut wire = [0u8; 32];
        hex::decode_to_slice(s, &mut wire)?;

        let mut natural = [0u8; 32];
        for (src, dst) in wire.chunks_exact(4).zip(natural.chunks_mut(4)) {
            let word = BigEndian::read_u32(src);
            LittleEndian::write_u32(dst, word);
        }

        Ok(PrevHash(Hash256::from_byte_array(natural)))
    }
}

impl Display for PrevHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut swapped = [0u8; 32];
        for (src, dst) in self
            .0
            .as_byte_array()
            .chunks_exact(4)
            .zip(swapped.chunks_mut(4))
        {
            let word = LittleEndian::read_u32(src);
            BigEndian::write_u32(dst, word);
        }

        f.write_str(&hex::encode(swapped))
    }
}
