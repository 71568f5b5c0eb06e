use std::fmt;

use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::arrow::util::pretty::pretty_format_batches;
use fathom_common::EngineKind;
use fathom_error::{ErrorCode, FathomError, Result};

/// Rows returned by a successful query.
///
/// The row set owns its batches; dropping it releases them.
#[derive(Debug, Clone)]
pub struct RowSet {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl RowSet {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Every cell rendered as text, row by row. Nulls render as "".
    pub fn rows(&self) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::with_capacity(self.num_rows());
        for batch in &self.batches {
            for row in 0..batch.num_rows() {
                let cells = batch
                    .columns()
                    .iter()
                    .map(|column| array_value_to_string(column, row))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.push(cells);
            }
        }
        Ok(rows)
    }

    /// One column rendered as text.
    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        let index = self.schema.index_of(name).map_err(|_| {
            FathomError::new(
                ErrorCode::FieldNotFound,
                format!(
                    "Column '{}' not in result; columns are [{}]",
                    name,
                    self.column_names().join(", ")
                ),
            )
        })?;

        let mut values = Vec::with_capacity(self.num_rows());
        for batch in &self.batches {
            let column = batch.column(index);
            for row in 0..batch.num_rows() {
                values.push(array_value_to_string(column, row)?);
            }
        }
        Ok(values)
    }

    pub fn pretty(&self) -> Result<String> {
        Ok(pretty_format_batches(&self.batches)?.to_string())
    }
}

/// A query failure captured instead of raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub engine: EngineKind,
    pub code: ErrorCode,
    /// The engine's own wording of the failure
    pub message: String,
}

impl QueryFailure {
    pub fn from_error(engine: EngineKind, error: &FathomError) -> Self {
        Self {
            engine,
            code: error.code,
            message: error.message.clone(),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} engine failed: {}", self.engine, self.message)
    }
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Rows(RowSet),
    Failed(QueryFailure),
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Rows(_))
    }

    pub fn rows(&self) -> Option<&RowSet> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            QueryOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&QueryFailure> {
        match self {
            QueryOutcome::Rows(_) => None,
            QueryOutcome::Failed(failure) => Some(failure),
        }
    }
}
