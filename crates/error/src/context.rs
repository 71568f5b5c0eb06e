//! # Error Contexts
//!
//! Structured metadata attached to harness errors. Mismatch variants carry
//! both compared strings verbatim so a failing test prints everything needed
//! to diagnose it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for FATHOM-1001..1003
    Cluster {
        cluster_name: String,
        /// Instance id, when a handle existed
        instance: Option<String>,
        /// Classes that finished against the instance
        classes_served: u32,
    },

    /// Context for FATHOM-2001..2004 and 2010
    Query {
        engine: String,
        sql: String,
    },

    /// Context for FATHOM-2011
    MessageMismatch {
        engine: String,
        expected_fragment: String,
        actual_message: String,
    },

    /// Context for FATHOM-2012
    PlanMismatch {
        engine: String,
        expected: String,
        actual: String,
        /// Line diff, `-` expected / `+` actual
        diff: String,
    },

    /// Context for FATHOM-3001..3003
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },
}
