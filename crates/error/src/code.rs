use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following FATHOM-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Cluster lifecycle errors
/// - **2000-2999**: Query execution and validation errors
/// - **3000-3999**: Harness configuration and query description errors
/// - **5000-5999**: Engine internals and harness bugs
///
/// A published code never changes meaning; retired codes are not reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Cluster Errors (1000-1999) ===
    /// FATHOM-1001: Cluster could not be created
    ClusterStartFailed = 1001,
    /// FATHOM-1002: Cluster could not be torn down cleanly
    ClusterStopFailed = 1002,
    /// FATHOM-1003: Coordinator shut down or cluster already stopped
    ClusterUnavailable = 1003,

    // === Query Errors (2000-2999) ===
    /// FATHOM-2001: Query failed in the engine
    QueryFailed = 2001,
    /// FATHOM-2002: Field/column not found
    FieldNotFound = 2002,
    /// FATHOM-2003: Table not found
    TableNotFound = 2003,
    /// FATHOM-2004: SQL syntax error
    SyntaxError = 2004,
    /// FATHOM-2010: Query succeeded where a failure was expected
    UnexpectedSuccess = 2010,
    /// FATHOM-2011: Failure message lacks the expected fragment
    MessageMismatch = 2011,
    /// FATHOM-2012: Generated plan differs from the expected plan
    PlanMismatch = 2012,
    /// FATHOM-2013: Request targets a different engine than the connection
    EngineMismatch = 2013,

    // === Configuration Errors (3000-3999) ===
    /// FATHOM-3001: Configuration could not be loaded or validated
    InvalidConfig = 3001,
    /// FATHOM-3002: Reuse threshold is not a count or `unbounded`
    InvalidThreshold = 3002,
    /// FATHOM-3003: Query description is incomplete
    InvalidQuery = 3003,

    // === Internal Errors (5000-5999) ===
    /// FATHOM-5001: Internal DataFusion error
    DataFusionInternal = 5001,
    /// FATHOM-5002: Serialization/deserialization failed
    SerializationFailed = 5002,
    /// FATHOM-5003: Unexpected internal state (e.g. poisoned lock)
    InternalPanic = 5003,

    /// FATHOM-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "FATHOM-2012")
    pub fn as_str(&self) -> String {
        format!("FATHOM-{:04}", self.as_u16())
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Cluster,
            2000..=2009 => ErrorCategory::Query,
            2010..=2999 => ErrorCategory::Assertion,
            3000..=3999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("FATHOM-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::ClusterStartFailed),
            1002 => Ok(Self::ClusterStopFailed),
            1003 => Ok(Self::ClusterUnavailable),
            2001 => Ok(Self::QueryFailed),
            2002 => Ok(Self::FieldNotFound),
            2003 => Ok(Self::TableNotFound),
            2004 => Ok(Self::SyntaxError),
            2010 => Ok(Self::UnexpectedSuccess),
            2011 => Ok(Self::MessageMismatch),
            2012 => Ok(Self::PlanMismatch),
            2013 => Ok(Self::EngineMismatch),
            3001 => Ok(Self::InvalidConfig),
            3002 => Ok(Self::InvalidThreshold),
            3003 => Ok(Self::InvalidQuery),
            5001 => Ok(Self::DataFusionInternal),
            5002 => Ok(Self::SerializationFailed),
            5003 => Ok(Self::InternalPanic),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category.
///
/// `Assertion` errors are test failures produced by the harness itself;
/// everything else comes from the cluster, the engine or the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Cluster,
    Query,
    Assertion,
    Config,
    Internal,
}
