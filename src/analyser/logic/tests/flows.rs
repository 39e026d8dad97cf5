use super::*;
use crate::analyser::logic::cleaning::tukey_fence;
use anyhow::Result;
use polars::prelude::*;
use std::sync::Arc;

fn messy_frame() -> PolarsResult<DataFrame> {
    df!(
        "Price" => &[Some("10"), Some("12"), Some("11"), Some("12"), Some("250"), Some("13"), Some("9"), None, Some("12"), Some("10"), Some("11"), Some("14")],
        " Home City " => &[" new york ", "boston", "boston", "boston", "chicago", "boston", " new york ", "denver", "boston", " new york ", "chicago", "denver"],
        "Joined" => &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06", "2024-01-07", "2024-01-08", "2024-01-02", "2024-01-10", "2024-01-11", "2024-01-12"],
        "Mostly Empty" => &[None, None, Some("x"), None, None, None, Some("y"), None, None, None, None, None]
    )
}

fn pipeline() -> CleaningPipeline {
    CleaningPipeline::new(Arc::new(StubClassifier::new(&[
        ("Price", "numeric"),
        (" Home City ", "categorical"),
        ("Joined", "datetime"),
    ])))
}

#[tokio::test]
async fn test_clean_df_end_to_end() -> Result<()> {
    let cleaned = pipeline().clean_df(messy_frame()?).await?;
    let df = &cleaned.df;

    // Rows 1 and 8 are identical
    assert_eq!(df.height(), 11);
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["price", "home_city", "joined"]);
    assert_eq!(cleaned.report.dropped_columns, vec!["Mostly Empty".to_owned()]);

    for column in df.get_columns() {
        assert_eq!(column.null_count(), 0, "{} has gaps", column.name());
    }

    let prices = floats(df.column("price")?);
    assert!(prices.iter().flatten().all(|p| *p <= 20.0), "{prices:?}");
    assert_eq!(strings(df.column("home_city")?)[0].as_deref(), Some("New York"));

    let kinds: Vec<ColumnKind> = cleaned.schema.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ColumnKind::Numeric, ColumnKind::Categorical, ColumnKind::Temporal]
    );
    assert_eq!(cleaned.report.rows_in, 12);
    assert_eq!(cleaned.report.columns_out, 3);
    Ok(())
}

#[tokio::test]
async fn test_clean_df_is_idempotent() -> Result<()> {
    let pipeline = pipeline();
    let first = pipeline.clean_df(messy_frame()?).await?;
    let second = pipeline.clean_df(first.df.clone()).await?;

    assert_eq!(first.schema, second.schema);
    assert_eq!(first.df.shape(), second.df.shape());
    for (a, b) in first.df.get_columns().iter().zip(second.df.get_columns()) {
        assert_eq!(strings(a), strings(b), "{} changed on the second run", a.name());
    }

    for column in second.df.get_columns() {
        if !column.dtype().is_primitive_numeric() {
            continue;
        }
        let values = column.as_materialized_series().cast(&DataType::Float64)?;
        let ca = values.f64()?;
        let (lower, upper) = tukey_fence(ca, 1.5)?.unwrap();
        assert!(ca.into_iter().flatten().all(|v| (lower..=upper).contains(&v)));
    }
    Ok(())
}

#[tokio::test]
async fn test_clean_df_is_idempotent_with_heuristics() -> Result<()> {
    let df = df!(
        "Location" => &["north - east - wing", "south - west - wing", "north - west - wing", "south - east - wing"],
        "AMOUNT PAID" => &["$1,010.50", "$1,012.00", "$1,011.25", "$1,013.75"],
        "Remarks" => &["left at the loading dock by the courier", "signed for by reception staff on floor two", "returned to sender after three attempts", "customer collected the parcel in person"]
    )?;
    let pipeline = CleaningPipeline::new(Arc::new(HeuristicClassifier));

    let first = pipeline.clean_df(df).await?;
    let second = pipeline.clean_df(first.df.clone()).await?;

    let kinds: Vec<ColumnKind> = first.schema.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ColumnKind::Categorical, ColumnKind::Numeric, ColumnKind::Text]
    );
    assert_eq!(first.schema, second.schema);
    for (a, b) in first.df.get_columns().iter().zip(second.df.get_columns()) {
        assert_eq!(strings(a), strings(b), "{} changed on the second run", a.name());
    }
    Ok(())
}

#[tokio::test]
async fn test_classifier_failure_does_not_fail_run() -> Result<()> {
    let df = df!(
        "Amount" => &["1", "2", "2", "3"],
        "Label" => &["a", "b", "c", "d"]
    )?;
    let pipeline = CleaningPipeline::new(Arc::new(FailingClassifier));

    let cleaned = pipeline.clean_df(df).await?;

    assert!(cleaned.schema.iter().all(|c| c.kind == ColumnKind::Text));
    assert_eq!(cleaned.df.height(), 4);
    Ok(())
}

#[tokio::test]
async fn test_run_rejects_invalid_config() {
    let mut config = crate::config::CleaningConfig::default();
    config.missing.column_drop_threshold = 2.0;
    let pipeline = pipeline().with_config(config);

    let result = pipeline.run(std::path::Path::new("unused.csv")).await;
    assert!(matches!(result, Err(CleanError::Config(_))));
}

#[tokio::test]
async fn test_run_with_header_override() -> Result<()> {
    let path = temp_file("override.csv", b"a,b\n1,x\n2,y\n3,x\n");
    let pipeline = CleaningPipeline::new(Arc::new(HeuristicClassifier))
        .with_column_names(vec!["Unit Price".to_owned(), "Size Code".to_owned()]);

    let cleaned = pipeline.run(&path).await;
    let _ = std::fs::remove_file(&path);
    let cleaned = cleaned?;

    assert_eq!(cleaned.schema[0].name, "unit_price");
    assert_eq!(cleaned.schema[1].name, "size_code");
    assert_eq!(cleaned.schema[1].kind, ColumnKind::Categorical);
    Ok(())
}

#[test]
fn test_preview_schema_reads_first_rows() -> Result<()> {
    let path = temp_file(
        "schema.csv",
        b"price,city,member\n1.5,paris,true\n2.5,rome,false\n3.5,oslo,true\n",
    );
    let schema = preview_schema(&path, 2);
    let _ = std::fs::remove_file(&path);
    let schema = schema?;

    let json = serde_json::to_string(&schema)?;
    assert_eq!(
        json,
        r#"[{"name":"price","type":"numeric"},{"name":"city","type":"text"},{"name":"member","type":"boolean"}]"#
    );
    Ok(())
}
