use super::*;

/// Miner login of the form `address.rig`. The address half is validated
/// against the primary chain's pattern at authorize time; the rig id is an
/// opaque label used for bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub address: String,
    pub rig: String,
}

impl Username {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim_matches('"')
    }

    pub fn split(&self) -> Result<Worker> {
        let mut parts = self.as_str().splitn(2, '.');

        let address = parts.next().unwrap_or_default();
        let rig = parts.next().unwrap_or_default();

        ensure!(
            !address.is_empty() && !rig.is_empty(),
            "worker name must be `address.rig`, got `{}`",
            self.as_str()
        );

        Ok(Worker {
            address: address.into(),
            rig: rig.into(),
        })
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
