use super::*;

/// Per-submission rejection reasons, surfaced to the miner as a Stratum error
/// tuple with the classic pool error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StratumError {
    #[display("Malformed request")]
    Malformed,
    #[display("Method not allowed in current state")]
    MethodNotAllowed,
    #[display("Job not found")]
    Stale,
    #[display("Duplicate share")]
    Duplicate,
    #[display("Share above target")]
    AboveTarget,
    #[display("Ntime out of range")]
    InvalidNtime,
    #[display("Invalid extranonce2 length")]
    InvalidNonce2Length,
    #[display("Unauthorized worker")]
    Unauthorized,
    #[display("Not subscribed")]
    NotSubscribed,
}

impl StratumError {
    pub fn code(self) -> i32 {
        match self {
            Self::Malformed | Self::MethodNotAllowed | Self::InvalidNtime
            | Self::InvalidNonce2Length => 20,
            Self::Stale => 21,
            Self::Duplicate => 22,
            Self::AboveTarget => 23,
            Self::Unauthorized => 24,
            Self::NotSubscribed => 25,
        }
    }

    pub fn into_response(self, traceback: Option<Value>) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            traceback,
        }
    }
}

impl std::error::Error for StratumError {}

#[derive(Debug, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl Display for JsonRpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "stratum error {}: {}", self.code, self.message)
    }
}
