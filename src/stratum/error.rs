use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InternalError {
    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },

    #[snafu(display("{message}"))]
    Parse { message: String },

    #[snafu(display("failed to parse hex integer '{input}': {source}"))]
    ParseHexInt {
        input: String,
        source: std::num::ParseIntError,
    },
}

/// Numeric codes returned to miners in `mining.submit`/`mining.authorize` error responses.
/// Values below 20 are reserved by the stratum protocol itself (parse error, method not
/// found, ...); para's own rejection reasons start at 20, matching the range ckpool and
/// other public pools use for vendor-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(i32)]
pub enum StratumError {
    #[display("other/unknown error")]
    Unknown = 20,
    #[display("job not found")]
    InvalidJobId = 21,
    #[display("duplicate share")]
    Duplicate = 22,
    #[display("low difficulty share")]
    AboveTarget = 23,
    #[display("unauthorized worker")]
    Unauthorized = 24,
    #[display("method not allowed")]
    MethodNotAllowed = 25,
    #[display("worker name does not match authorized connection")]
    WorkerMismatch = 26,
    #[display("stale share")]
    Stale = 27,
    #[display("invalid extranonce2 length")]
    InvalidNonce2Length = 28,
    #[display("ntime out of range")]
    NtimeOutOfRange = 29,
    #[display("invalid version rolling mask")]
    InvalidVersionMask = 30,
    #[display("unsupported protocol extension")]
    UnsupportedExtension = 31,
}

impl StratumError {
    pub fn into_response(self, traceback: Option<Value>) -> JsonRpcError {
        JsonRpcError {
            error_code: self as i32,
            message: self.to_string(),
            traceback,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.traceback {
            Some(traceback) => write!(
                f,
                "Stratum error {}: {} (traceback: {})",
                self.error_code,
                self.message,
                serde_json::to_string(traceback).unwrap_or_else(|_| "<invalid traceback>".into())
            ),
            None => write!(f, "Stratum error {}: {}", self.error_code, self.message),
        }
    }
}
