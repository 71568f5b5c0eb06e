use fathom_common::EngineKind;
use fathom_error::Result;

use crate::builder::QueryBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Sql(String),
    Builder(QueryBuilder),
}

/// Which engines a request may run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineTarget {
    #[default]
    Any,
    Only(EngineKind),
}

/// A logical query plus its engine selector. Immutable once built and safe
/// to execute any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    source: QuerySource,
    target: EngineTarget,
}

impl QueryRequest {
    pub fn sql(text: impl Into<String>) -> Self {
        Self {
            source: QuerySource::Sql(text.into()),
            target: EngineTarget::Any,
        }
    }

    pub fn from_builder(builder: QueryBuilder) -> Self {
        Self {
            source: QuerySource::Builder(builder),
            target: EngineTarget::Any,
        }
    }

    /// Restricts the request to one engine.
    pub fn on(mut self, engine: EngineKind) -> Self {
        self.target = EngineTarget::Only(engine);
        self
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn target(&self) -> EngineTarget {
        self.target
    }

    pub fn accepts(&self, engine: EngineKind) -> bool {
        match self.target {
            EngineTarget::Any => true,
            EngineTarget::Only(target) => target == engine,
        }
    }

    pub fn build_sql(&self) -> Result<String> {
        match &self.source {
            QuerySource::Sql(text) => Ok(text.clone()),
            QuerySource::Builder(builder) => builder.build(),
        }
    }
}

impl From<QueryBuilder> for QueryRequest {
    fn from(builder: QueryBuilder) -> Self {
        QueryRequest::from_builder(builder)
    }
}

impl From<&str> for QueryRequest {
    fn from(sql: &str) -> Self {
        QueryRequest::sql(sql)
    }
}
