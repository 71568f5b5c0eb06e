use crate::{ErrorCode, ErrorContext, FathomError};
use datafusion::error::DataFusionError;

impl From<DataFusionError> for FathomError {
    fn from(err: DataFusionError) -> Self {
        let message = err.strip_backtrace();
        let code = classify_engine_message(&message);
        let mut error = FathomError::new(code, message);
        if code == ErrorCode::FieldNotFound {
            if let Some(hint) = field_hint(&error.message) {
                error = error.with_hint(hint);
            }
        }
        error
    }
}

impl From<datafusion::arrow::error::ArrowError> for FathomError {
    fn from(err: datafusion::arrow::error::ArrowError) -> Self {
        FathomError::new(ErrorCode::DataFusionInternal, err.to_string())
    }
}

impl From<config::ConfigError> for FathomError {
    fn from(err: config::ConfigError) -> Self {
        FathomError::new(ErrorCode::InvalidConfig, err.to_string()).with_context(
            ErrorContext::Config {
                file_path: None,
                field: None,
            },
        )
    }
}

/// Maps an engine failure message onto the query error codes.
pub(crate) fn classify_engine_message(message: &str) -> ErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("no field named") {
        ErrorCode::FieldNotFound
    } else if lower.contains("table") && lower.contains("not found") {
        ErrorCode::TableNotFound
    } else if lower.contains("sql error") || lower.contains("parsererror") {
        ErrorCode::SyntaxError
    } else if lower.contains("error during planning") || lower.contains("execution error") {
        ErrorCode::QueryFailed
    } else {
        ErrorCode::DataFusionInternal
    }
}

// "No field named revenu. Valid fields are sales.revenue, sales.cost."
fn field_hint(message: &str) -> Option<String> {
    let (_, after) = message.split_once("No field named ")?;
    let target = after
        .split(|c: char| c == '.' || c.is_whitespace())
        .next()?
        .trim_matches('"');
    let (_, valid) = message.split_once("Valid fields are ")?;
    let options: Vec<String> = valid
        .trim_end_matches('.')
        .split(", ")
        .map(|f| {
            f.rsplit('.')
                .next()
                .unwrap_or(f)
                .trim_matches('"')
                .to_string()
        })
        .collect();
    find_closest_match(target, &options).map(|m| format!("Did you mean '{}'?", m))
}

fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for i in 1..=a.len() {
        let mut current = vec![i; b.len() + 1];
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            current[j] = (prev[j] + 1).min(current[j - 1] + 1).min(prev[j - 1] + cost);
        }
        prev = current;
    }

    prev[b.len()]
}
