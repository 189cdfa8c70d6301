use super::*;

/// Block version as Stratum transmits it: eight hex digits of the consensus
/// i32, two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Version(pub i32);

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let n = u32::from_str_radix(s, 16)
            .with_context(|| format!("invalid version hex string `{s}`"))?;
        Ok(Self(n as i32))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0 as u32)
    }
}

impl From<i32> for Version {
    fn from(version: i32) -> Self {
        Self(version)
    }
}
