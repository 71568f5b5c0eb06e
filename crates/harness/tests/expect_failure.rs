mod common;

use common::{coordinator, seed_players};
use fathom_common::ReuseThreshold;
use fathom_error::{ErrorCode, ErrorContext};
use fathom_harness::{
    EngineExpectations, EngineKind, QueryHarness, QueryRequest, SuiteCategory, TestClass,
};

#[tokio::test]
async fn test_per_engine_fragments() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Bounded(5));
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;

    let request = QueryRequest::sql("SELECT * FROM missing_table");
    let expected = EngineExpectations::new()
        .embedded("not found")
        .distributed("FATHOM-2003");

    for engine in class.engines() {
        let conn = class.connect(engine)?;
        let failure = QueryHarness::new(&conn)
            .execute_expecting_failure(&request, &expected)
            .await?;
        assert_eq!(failure.engine, engine);
        assert_eq!(failure.code, ErrorCode::TableNotFound);
    }

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_fragment_for_the_other_engine_does_not_match() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Bounded(5));
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;

    // The code prefix only appears in the distributed engine's wording.
    let request = QueryRequest::sql("SELECT * FROM missing_table");
    let expected = EngineExpectations::all("FATHOM-2003");

    let conn = class.connect(EngineKind::Embedded)?;
    let err = QueryHarness::new(&conn)
        .execute_expecting_failure(&request, &expected)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MessageMismatch);
    match &err.context {
        Some(ErrorContext::MessageMismatch {
            engine,
            expected_fragment,
            actual_message,
        }) => {
            assert_eq!(engine, "embedded");
            assert_eq!(expected_fragment, "FATHOM-2003");
            assert!(actual_message.contains("not found"));
        }
        other => panic!("unexpected context: {:?}", other),
    }
    let rendered = err.to_string();
    assert!(rendered.contains("FATHOM-2011"));
    assert!(rendered.contains("expected fragment: FATHOM-2003"));

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_blank_fragment_only_requires_failure() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Bounded(5));
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    seed_players(class.cluster())?;

    let request = QueryRequest::sql("SELECT nmae FROM players");
    let expected = EngineExpectations::new().embedded("   ");

    for engine in class.engines() {
        let conn = class.connect(engine)?;
        let failure = QueryHarness::new(&conn)
            .execute_expecting_failure(&request, &expected)
            .await?;
        assert_eq!(failure.code, ErrorCode::FieldNotFound);
    }

    class.finish()?;
    Ok(())
}

#[tokio::test]
async fn test_unexpected_success() -> anyhow::Result<()> {
    let (coordinator, config) = coordinator(ReuseThreshold::Bounded(5));
    let class = TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)?;
    seed_players(class.cluster())?;

    let request = QueryRequest::sql("SELECT name FROM players");
    let conn = class.connect(EngineKind::Distributed)?;
    let err = QueryHarness::new(&conn)
        .execute_expecting_failure(&request, &EngineExpectations::all("not found"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedSuccess);
    assert!(err.message.contains("5 row(s)"));

    class.finish()?;
    Ok(())
}
