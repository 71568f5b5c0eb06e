//! Plan text extraction and comparison.
//!
//! `EXPLAIN` returns one row per plan type (`logical_plan`, `physical_plan`)
//! with the plan in a `plan` column. Each engine exposes one of them as its
//! plan text.

use datafusion::arrow::util::display::array_value_to_string;
use fathom_error::{ErrorCode, FathomError, Result};

use crate::outcome::RowSet;

pub const LOGICAL_PLAN: &str = "logical_plan";
pub const PHYSICAL_PLAN: &str = "physical_plan";

/// Joins the `plan` cells of every row whose `plan_type` matches.
pub fn extract_plan(explain: &RowSet, plan_type: &str) -> Result<String> {
    let schema = explain.schema();
    let (type_idx, plan_idx) = match (schema.index_of("plan_type"), schema.index_of("plan")) {
        (Ok(t), Ok(p)) => (t, p),
        _ => {
            return Err(FathomError::new(
                ErrorCode::DataFusionInternal,
                format!(
                    "EXPLAIN output has unexpected columns [{}]",
                    explain.column_names().join(", ")
                ),
            ))
        }
    };

    let mut sections = Vec::new();
    for batch in explain.batches() {
        for row in 0..batch.num_rows() {
            if array_value_to_string(batch.column(type_idx), row)? == plan_type {
                sections.push(array_value_to_string(batch.column(plan_idx), row)?);
            }
        }
    }

    if sections.is_empty() {
        return Err(FathomError::new(
            ErrorCode::DataFusionInternal,
            format!("EXPLAIN output has no '{}' row", plan_type),
        ));
    }
    Ok(sections.join("\n"))
}

/// Strips trailing whitespace from each line and trailing blank lines.
///
/// Only used to render mismatch diffs; plan comparison itself is exact.
pub fn normalize(plan: &str) -> String {
    let lines: Vec<&str> = plan.lines().map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Line diff of two plans: ` ` common, `-` only expected, `+` only actual.
pub fn line_diff(expected: &str, actual: &str) -> String {
    let old: Vec<&str> = expected.lines().collect();
    let new: Vec<&str> = actual.lines().collect();

    // lcs[i][j]: longest common subsequence of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            out.push(format!("  {}", old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(format!("- {}", old[i]));
            i += 1;
        } else {
            out.push(format!("+ {}", new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|line| format!("- {}", line)));
    out.extend(new[j..].iter().map(|line| format!("+ {}", line)));
    out.join("\n")
}
