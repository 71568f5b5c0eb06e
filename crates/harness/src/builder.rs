use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};

/// Structured description of a `SELECT`, rendered to SQL on demand.
///
/// ```
/// use fathom_harness::QueryBuilder;
///
/// let sql = QueryBuilder::new()
///     .select_columns(["name", "score"])
///     .full_table_name("players")
///     .where_clause("score > 10")
///     .order_by("score DESC")
///     .limit(5)
///     .build()
///     .unwrap();
/// assert_eq!(
///     sql,
///     "SELECT name, score FROM players WHERE score > 10 ORDER BY score DESC LIMIT 5"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    distinct: bool,
    select_columns: Vec<String>,
    select_expression: Option<String>,
    full_table_name: Option<String>,
    where_clause: Option<String>,
    group_by: Option<String>,
    having: Option<String>,
    order_by: Option<String>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Projection expression placed before the plain columns, e.g. `COUNT(*)`.
    pub fn select_expression(mut self, expression: impl Into<String>) -> Self {
        self.select_expression = Some(expression.into());
        self
    }

    pub fn full_table_name(mut self, table: impl Into<String>) -> Self {
        self.full_table_name = Some(table.into());
        self
    }

    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    pub fn group_by(mut self, columns: impl Into<String>) -> Self {
        self.group_by = Some(columns.into());
        self
    }

    pub fn having(mut self, predicate: impl Into<String>) -> Self {
        self.having = Some(predicate.into());
        self
    }

    pub fn order_by(mut self, ordering: impl Into<String>) -> Self {
        self.order_by = Some(ordering.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.full_table_name.as_deref()
    }

    /// Renders the query. An empty projection selects `*`.
    pub fn build(&self) -> Result<String> {
        let table = self
            .full_table_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("full_table_name", "Query has no table"))?;

        if non_blank(&self.having).is_some() && non_blank(&self.group_by).is_none() {
            return Err(invalid("having", "HAVING requires a GROUP BY clause"));
        }

        let mut projection: Vec<&str> = Vec::new();
        if let Some(expression) = non_blank(&self.select_expression) {
            projection.push(expression);
        }
        projection.extend(
            self.select_columns
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty()),
        );

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if projection.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&projection.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(table);

        if let Some(predicate) = non_blank(&self.where_clause) {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        if let Some(group_by) = non_blank(&self.group_by) {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(having) = non_blank(&self.having) {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if let Some(order_by) = non_blank(&self.order_by) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Ok(sql)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(field: &str, message: &str) -> FathomError {
    FathomError::new(ErrorCode::InvalidQuery, message).with_context(ErrorContext::Config {
        file_path: None,
        field: Some(field.to_string()),
    })
}
