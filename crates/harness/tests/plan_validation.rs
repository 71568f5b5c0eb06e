mod common;

use common::{coordinator, seed_players};
use fathom_common::ReuseThreshold;
use fathom_error::{ErrorCode, ErrorContext};
use fathom_harness::{
    EngineExpectations, EngineKind, PlanCheck, QueryBuilder, QueryConnection, QueryHarness,
    QueryRequest, SuiteCategory, TestClass,
};

fn filtered_players() -> QueryRequest {
    QueryRequest::from_builder(
        QueryBuilder::new()
            .select_columns(["name", "score"])
            .full_table_name("players")
            .where_clause("score > 10")
            .order_by("score DESC"),
    )
}

#[tokio::test]
async fn test_plan_matches_engine_rendering() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Unbounded);
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    seed_players(class.cluster())?;
    let request = filtered_players();
    let sql = request.build_sql()?;

    let embedded = class.connect(EngineKind::Embedded)?;
    let distributed = class.connect(EngineKind::Distributed)?;
    let logical = embedded.explain(&sql).await?;
    let physical = distributed.explain(&sql).await?;
    assert!(logical.contains("TableScan: players"));
    assert_ne!(logical, physical);

    let expected = EngineExpectations::new()
        .embedded(logical.clone())
        .distributed(physical.clone());

    for conn in [&embedded, &distributed] {
        let check = QueryHarness::new(conn).validate_plan(&request, &expected).await?;
        assert!(matches!(check, PlanCheck::Matched(_)), "engine {}", conn.engine());
    }

    // Extra trailing whitespace in the expectation is a mismatch.
    let padded = EngineExpectations::new().embedded(format!("{}  \n\n", logical));
    let err = QueryHarness::new(&embedded)
        .validate_plan(&request, &padded)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PlanMismatch);

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_missing_expectation_skips() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Unbounded);
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    seed_players(class.cluster())?;

    let expected = EngineExpectations::new().embedded("");
    for engine in class.engines() {
        let conn = class.connect(engine)?;
        let check = QueryHarness::new(&conn)
            .validate_plan(&filtered_players(), &expected)
            .await?;
        assert_eq!(check, PlanCheck::Skipped);
    }

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_mismatch_reports_both_plans() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Unbounded);
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    seed_players(class.cluster())?;

    let conn = class.connect(EngineKind::Embedded)?;
    let expected = EngineExpectations::new().embedded("Projection: players.name\n  TableScan: players");
    let err = QueryHarness::new(&conn)
        .validate_plan(&filtered_players(), &expected)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PlanMismatch);

    match &err.context {
        Some(ErrorContext::PlanMismatch {
            engine,
            expected,
            actual,
            diff,
        }) => {
            assert_eq!(engine, "embedded");
            assert_eq!(expected, "Projection: players.name\n  TableScan: players");
            assert!(actual.contains("Sort:"));
            assert!(diff.lines().any(|line| line.starts_with("- ")));
            assert!(diff.lines().any(|line| line.starts_with("+ ")));
        }
        other => panic!("unexpected context: {:?}", other),
    }
    assert!(err.to_string().contains("--- actual plan ---"));

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_statistics_setting_follows_category() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Unbounded);

    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsEnabled)?;
    let conn = class.connect(EngineKind::Embedded)?;
    assert!(conn.session().copied_config().collect_statistics());
    class.finish()?;

    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    let conn = class.connect(EngineKind::Embedded)?;
    assert!(!conn.session().copied_config().collect_statistics());
    class.finish()?;
    Ok(())
}
