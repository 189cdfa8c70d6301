use super::*;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Extranonce(Vec<u8>);

impl Extranonce {
    pub fn random(size: usize) -> Self {
        let mut bytes = vec![0u8; size];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex::decode(s)?))
    }
}

impl Serialize for Extranonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Extranonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Display for Extranonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Extranonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_has_requested_length() {
        assert_eq!(Extranonce::random(ENONCE1_SIZE).len(), 4);
        assert_eq!(Extranonce::random(0).len(), 0);
    }

    #[test]
    fn random_extranonces_differ() {
        // 2^64 chance of a false failure
        assert_ne!(Extranonce::random(8), Extranonce::random(8));
    }

    #[test]
    fn hex_roundtrip() {
        let extranonce: Extranonce = "abcd1234".parse().unwrap();
        assert_eq!(extranonce.len(), 4);
        assert_eq!(extranonce.to_hex(), "abcd1234");
        assert_eq!(
            serde_json::to_string(&extranonce).unwrap(),
            r#""abcd1234""#
        );
    }

    #[test]
    fn rejects_odd_length_hex() {
        assert!("abc".parse::<Extranonce>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!("zz".parse::<Extranonce>().is_err());
    }
}
