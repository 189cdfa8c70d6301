use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Nonce(u32);

impl FromStr for Nonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let nonce = u32::from_str_radix(s, 16)
            .with_context(|| format!("invalid nonce hex string `{s}`"))?;
        Ok(Nonce(nonce))
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<Nonce> for u32 {
    fn from(nonce: Nonce) -> u32 {
        nonce.0
    }
}

impl From<u32> for Nonce {
    fn from(nonce: u32) -> Nonce {
        Nonce(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        assert_eq!(Nonce::from(0).to_string(), "00000000");
        assert_eq!(Nonce::from(u32::MAX).to_string(), "ffffffff");
        assert_eq!("b2957c02".parse::<Nonce>().unwrap(), Nonce::from(0xb2957c02));
    }

    #[test]
    fn invalid_hex_errors() {
        assert!("".parse::<Nonce>().is_err());
        assert!("xyz".parse::<Nonce>().is_err());
        assert!("100000000".parse::<Nonce>().is_err());
    }
}
