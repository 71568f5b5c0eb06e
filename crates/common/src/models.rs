use fathom_error::{ErrorCode, ErrorContext, FathomError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REUSE_THRESHOLD: u32 = 30;

/// Query-execution backend a logical query can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Single-node engine running inside the test process
    Embedded,
    /// Partitioned engine spread over the cluster's nodes
    Distributed,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::Embedded, EngineKind::Distributed];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Embedded => "embedded",
            EngineKind::Distributed => "distributed",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = FathomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" => Ok(EngineKind::Embedded),
            "distributed" => Ok(EngineKind::Distributed),
            other => Err(FathomError::new(
                ErrorCode::InvalidConfig,
                format!("Unknown engine '{}'", other),
            )
            .with_hint("Use 'embedded' or 'distributed'")),
        }
    }
}

/// Number of test classes allowed to share one cluster instance.
///
/// `Bounded(0)` recreates the cluster after every class; `Unbounded` never
/// recreates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReuseThreshold {
    Bounded(u32),
    Unbounded,
}

impl ReuseThreshold {
    /// True once `classes_served` classes have used the current cluster and
    /// it must be recreated.
    pub fn is_reached(&self, classes_served: u32) -> bool {
        match self {
            ReuseThreshold::Bounded(limit) => classes_served >= *limit,
            ReuseThreshold::Unbounded => false,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        match self {
            ReuseThreshold::Bounded(limit) => Some(*limit),
            ReuseThreshold::Unbounded => None,
        }
    }
}

impl Default for ReuseThreshold {
    fn default() -> Self {
        ReuseThreshold::Bounded(DEFAULT_REUSE_THRESHOLD)
    }
}

impl fmt::Display for ReuseThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReuseThreshold::Bounded(limit) => write!(f, "{}", limit),
            ReuseThreshold::Unbounded => f.write_str("unbounded"),
        }
    }
}

fn invalid_threshold(raw: &str) -> FathomError {
    FathomError::new(
        ErrorCode::InvalidThreshold,
        format!("Invalid reuse threshold '{}'", raw),
    )
    .with_context(ErrorContext::Config {
        file_path: None,
        field: Some("cluster.reuse_threshold".to_string()),
    })
    .with_hint("Use a non-negative integer or 'unbounded'")
}

impl FromStr for ReuseThreshold {
    type Err = FathomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw.to_lowercase().as_str() {
            "unbounded" | "none" | "-1" => Ok(ReuseThreshold::Unbounded),
            other => other
                .parse::<u32>()
                .map(ReuseThreshold::Bounded)
                .map_err(|_| invalid_threshold(raw)),
        }
    }
}

impl TryFrom<i64> for ReuseThreshold {
    type Error = FathomError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        if n == -1 {
            return Ok(ReuseThreshold::Unbounded);
        }
        u32::try_from(n)
            .map(ReuseThreshold::Bounded)
            .map_err(|_| invalid_threshold(&n.to_string()))
    }
}

// Config sources hand over either an integer or a keyword string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Count(i64),
    Keyword(String),
}

impl<'de> Deserialize<'de> for ReuseThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let parsed = match RawThreshold::deserialize(deserializer)? {
            RawThreshold::Count(n) => ReuseThreshold::try_from(n),
            RawThreshold::Keyword(s) => s.parse(),
        };
        parsed.map_err(|e| serde::de::Error::custom(e.message))
    }
}
