use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Vendor job status as recorded on a product.
///
/// Unknown vendor codes are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusCode {
    Pending,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl StatusCode {
    pub fn as_str(&self) -> &str {
        match self {
            StatusCode::Pending => "PENDING",
            StatusCode::Running => "RUNNING",
            StatusCode::Succeeded => "SUCCEEDED",
            StatusCode::Failed => "FAILED",
            StatusCode::Other(code) => code,
        }
    }

    /// Terminal codes are never polled again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusCode::Succeeded | StatusCode::Failed)
    }
}

impl From<String> for StatusCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => StatusCode::Pending,
            "RUNNING" => StatusCode::Running,
            "SUCCEEDED" => StatusCode::Succeeded,
            "FAILED" => StatusCode::Failed,
            _ => StatusCode::Other(value),
        }
    }
}

impl From<&str> for StatusCode {
    fn from(value: &str) -> Self {
        StatusCode::from(value.to_string())
    }
}

impl From<StatusCode> for String {
    fn from(value: StatusCode) -> Self {
        match value {
            StatusCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for StatusCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StatusCode::from(s))
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
