use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Nbits(CompactTarget);

impl Nbits {
    pub fn to_compact(self) -> CompactTarget {
        self.0
    }
}

impl FromStr for Nbits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let compact = CompactTarget::from_unprefixed_hex(s)?;
        Ok(Nbits(compact))
    }
}

impl Display for Nbits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<Nbits> for CompactTarget {
    fn from(nbits: Nbits) -> CompactTarget {
        nbits.0
    }
}

impl From<CompactTarget> for Nbits {
    fn from(compact: CompactTarget) -> Nbits {
        Nbits(compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let nbits = "1d00ffff".parse::<Nbits>().unwrap();
        assert_eq!(nbits.to_string(), "1d00ffff");
        assert_eq!(nbits.to_compact().to_consensus(), 0x1d00ffff);
    }

    #[test]
    fn rejects_prefixed_or_bad_hex() {
        assert!("0x1d00ffff".parse::<Nbits>().is_err());
        assert!("zzzz".parse::<Nbits>().is_err());
    }
}
