use fathom_common::EngineKind;
use fathom_error::{ErrorCategory, ErrorCode, ErrorContext, FathomError, Result};
use tracing::{debug, info};

use crate::connection::QueryConnection;
use crate::expectations::{EngineExpectations, Expectation};
use crate::outcome::{QueryFailure, QueryOutcome, RowSet};
use crate::plan::{line_diff, normalize};
use crate::request::QueryRequest;

/// Result of a plan validation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanCheck {
    /// No expected plan was given for this engine.
    Skipped,
    /// The plan text matched exactly.
    Matched(String),
}

impl PlanCheck {
    pub fn is_skipped(&self) -> bool {
        matches!(self, PlanCheck::Skipped)
    }
}

/// Runs [`QueryRequest`]s against one connection and checks the results
/// against per-engine expectations.
///
/// The harness holds no state besides the borrowed connection, so the same
/// request can be run through harnesses for every engine in turn.
pub struct QueryHarness<'a> {
    conn: &'a dyn QueryConnection,
}

impl<'a> QueryHarness<'a> {
    pub fn new(conn: &'a dyn QueryConnection) -> Self {
        Self { conn }
    }

    pub fn engine(&self) -> EngineKind {
        self.conn.engine()
    }

    /// Runs the request and returns its rows. Any engine failure is returned
    /// as the error.
    pub async fn execute(&self, request: &QueryRequest) -> Result<RowSet> {
        let sql = self.resolve(request)?;
        self.conn.query(&sql).await
    }

    /// Runs the request and captures a query failure instead of returning it.
    ///
    /// Cluster, config and assertion errors still propagate.
    pub async fn try_execute(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let sql = self.resolve(request)?;
        self.capture(&sql).await
    }

    async fn capture(&self, sql: &str) -> Result<QueryOutcome> {
        match self.conn.query(sql).await {
            Ok(rows) => Ok(QueryOutcome::Rows(rows)),
            Err(e) if is_query_failure(&e) => {
                Ok(QueryOutcome::Failed(QueryFailure::from_error(self.engine(), &e)))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a request that must fail.
    ///
    /// When the expectation for this engine is non-blank, the failure message
    /// must contain it (case-sensitive substring). A blank or missing entry
    /// only checks that the query failed. Returns the captured failure.
    pub async fn execute_expecting_failure(
        &self,
        request: &QueryRequest,
        expected: &EngineExpectations,
    ) -> Result<QueryFailure> {
        let engine = self.engine();
        let sql = self.resolve(request)?;

        let failure = match self.capture(&sql).await? {
            QueryOutcome::Failed(failure) => failure,
            QueryOutcome::Rows(rows) => {
                return Err(FathomError::new(
                    ErrorCode::UnexpectedSuccess,
                    format!(
                        "Query succeeded on the {} engine with {} row(s) but was expected to fail",
                        engine,
                        rows.num_rows()
                    ),
                )
                .with_context(ErrorContext::Query {
                    engine: engine.to_string(),
                    sql,
                }));
            }
        };

        if let Expectation::Check(fragment) = expected.for_engine(engine) {
            if !failure.message.contains(fragment) {
                return Err(FathomError::new(
                    ErrorCode::MessageMismatch,
                    format!("Failure on the {} engine lacks the expected text", engine),
                )
                .with_context(ErrorContext::MessageMismatch {
                    engine: engine.to_string(),
                    expected_fragment: fragment.to_string(),
                    actual_message: failure.message.clone(),
                }));
            }
        }

        debug!(%engine, code = %failure.code, "Query failed as expected");
        Ok(failure)
    }

    /// Compares the engine's plan for the request with the expected plan.
    ///
    /// A blank or missing expectation skips the check without planning the
    /// query. Plans must match exactly; trailing whitespace is only ignored
    /// when rendering the diff of a mismatch.
    pub async fn validate_plan(
        &self,
        request: &QueryRequest,
        expected: &EngineExpectations,
    ) -> Result<PlanCheck> {
        let engine = self.engine();
        let sql = self.resolve(request)?;

        let expected_plan = match expected.for_engine(engine) {
            Expectation::Check(plan) => plan.to_string(),
            Expectation::Skip => {
                info!(%engine, "No expected plan; skipping plan validation");
                return Ok(PlanCheck::Skipped);
            }
        };

        let actual_plan = self.conn.explain(&sql).await?;
        if actual_plan != expected_plan {
            return Err(FathomError::new(
                ErrorCode::PlanMismatch,
                format!("Plan generated by the {} engine differs from the expected plan", engine),
            )
            .with_context(ErrorContext::PlanMismatch {
                engine: engine.to_string(),
                diff: line_diff(&normalize(&expected_plan), &normalize(&actual_plan)),
                expected: expected_plan,
                actual: actual_plan,
            }));
        }

        Ok(PlanCheck::Matched(actual_plan))
    }

    fn resolve(&self, request: &QueryRequest) -> Result<String> {
        let engine = self.engine();
        if !request.accepts(engine) {
            return Err(FathomError::new(
                ErrorCode::EngineMismatch,
                format!(
                    "Request targets {:?} but the connection is {}",
                    request.target(),
                    engine
                ),
            ));
        }
        request.build_sql()
    }
}

fn is_query_failure(error: &FathomError) -> bool {
    error.category() == ErrorCategory::Query || error.code == ErrorCode::DataFusionInternal
}
