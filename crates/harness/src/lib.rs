//! Query execution and validation on a shared test cluster.
//!
//! One test body, several engines: a [`QueryRequest`] is executed through a
//! [`QueryConnection`] and checked against per-engine expectations, since each
//! engine phrases errors and renders plans its own way.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   lease    ┌────────────────────┐
//! │  TestClass    │──────────▶│ ClusterCoordinator │
//! └──────┬────────┘            └─────────┬──────────┘
//!        │ connect(engine)               │ create / destroy
//!        ▼                               ▼
//! ┌───────────────┐   query    ┌────────────────────┐
//! │ QueryHarness  │──────────▶│   LocalCluster     │ (DataFusion)
//! └───────────────┘            └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use fathom_harness::{EngineExpectations, QueryHarness, QueryRequest, SuiteCategory, TestClass};
//!
//! # async fn run() -> fathom_error::Result<()> {
//! let class = TestClass::begin(SuiteCategory::ParallelStatsDisabled)?;
//! for engine in class.engines() {
//!     let conn = class.connect(engine)?;
//!     let harness = QueryHarness::new(&conn);
//!     let request = QueryRequest::sql("SELECT * FROM missing_table");
//!     harness
//!         .execute_expecting_failure(
//!             &request,
//!             &EngineExpectations::new()
//!                 .embedded("not found")
//!                 .distributed("FATHOM-2003"),
//!         )
//!         .await?;
//! }
//! class.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cluster;
pub mod connection;
pub mod expectations;
pub mod harness;
pub mod outcome;
pub mod plan;
pub mod request;
pub mod suite;

pub use builder::QueryBuilder;
pub use cluster::{LocalCluster, LocalClusterProvider};
pub use connection::{ConnectionOptions, LocalConnection, QueryConnection};
pub use expectations::{EngineExpectations, Expectation};
pub use fathom_common::EngineKind;
pub use harness::{PlanCheck, QueryHarness};
pub use outcome::{QueryFailure, QueryOutcome, RowSet};
pub use request::{EngineTarget, QueryRequest, QuerySource};
pub use suite::{shutdown_shared, SuiteCategory, TestClass};
