use super::*;
use crate::analyser::logic::io::{SourceFormat, apply_header_override, decode_text, standardise_nulls};
use anyhow::Result;
use polars::prelude::*;
use std::path::Path;

#[test]
fn test_save_df_formats() -> Result<()> {
    let mut df = df!(
        "a" => &[1, 2, 3],
        "b" => &["x", "y", "z"]
    )?;

    let temp_dir = std::env::temp_dir();

    for ext in ["csv", "parquet", "json"] {
        let path = temp_dir.join(format!("autoviz_{}_export.{ext}", std::process::id()));
        save_df(&mut df, &path)?;
        assert!(path.exists(), "{ext} output should exist");
        let _ = std::fs::remove_file(path);
    }

    Ok(())
}

#[test]
fn test_source_format_by_extension() {
    assert_eq!(
        SourceFormat::from_path(Path::new("a.CSV")).unwrap(),
        SourceFormat::Csv
    );
    assert_eq!(
        SourceFormat::from_path(Path::new("book.xlsx")).unwrap(),
        SourceFormat::Spreadsheet
    );
    assert!(matches!(
        SourceFormat::from_path(Path::new("notes.txt")),
        Err(CleanError::UnsupportedFormat(ext)) if ext == "txt"
    ));
}

#[test]
fn test_unsupported_format_is_fatal() {
    let result = load_df(Path::new("/nonexistent/data.parquet"), &LoadOptions::default());
    assert!(matches!(result, Err(CleanError::UnsupportedFormat(_))));
}

#[test]
fn test_decode_text_strips_bom() -> Result<()> {
    let text = decode_text(b"\xEF\xBB\xBFa,b\n1,2\n")?;
    assert_eq!(text, "a,b\n1,2\n");
    Ok(())
}

#[test]
fn test_decode_text_falls_back_to_latin1() -> Result<()> {
    let text = decode_text(b"name\nJos\xe9\n")?;
    assert_eq!(text, "name\nJosé\n");

    // windows-1252 gives 0x80 a printable glyph instead of a C1 control
    let text = decode_text(b"price\n\x80 5\n")?;
    assert_eq!(text, "price\n\u{20ac} 5\n");
    Ok(())
}

#[test]
fn test_load_latin1_csv() -> Result<()> {
    let path = temp_file("latin1.csv", b"name,city\nJos\xe9,M\xfcnchen\nRen\xe9e,Z\xfcrich\n");
    let df = load_df(&path, &LoadOptions::default())?;
    let _ = std::fs::remove_file(&path);

    assert_eq!(df.shape(), (2, 2));
    assert_eq!(strings(df.column("city")?)[0].as_deref(), Some("München"));
    Ok(())
}

#[test]
fn test_load_standardises_null_tokens() -> Result<()> {
    let path = temp_file("nulls.csv", b"score,label\n1,NA\n2,x\nN/A,  \n4,null\n");
    let df = load_df(&path, &LoadOptions::default())?;
    let _ = std::fs::remove_file(&path);

    assert_eq!(df.column("score")?.null_count(), 1);
    assert_eq!(df.column("label")?.null_count(), 3);
    Ok(())
}

#[test]
fn test_load_preview_rows_limits_height() -> Result<()> {
    let path = temp_file("preview.csv", b"a\n1\n2\n3\n4\n5\n6\n7\n");
    let options = LoadOptions {
        preview_rows: Some(5),
        ..Default::default()
    };
    let df = load_df(&path, &options)?;
    let _ = std::fs::remove_file(&path);

    assert_eq!(df.height(), 5);
    Ok(())
}

#[test]
fn test_header_override() -> Result<()> {
    let df = df!(
        "a" => &[1, 2],
        "b" => &["x", "y"]
    )?;

    let renamed = apply_header_override(&df, &["Price".to_owned(), "City".to_owned()])?;
    let names: Vec<&str> = renamed
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .collect();
    assert_eq!(names, vec!["Price", "City"]);

    let mismatch = apply_header_override(&df, &["only".to_owned()]);
    assert!(matches!(mismatch, Err(CleanError::Config(_))));
    Ok(())
}

#[test]
fn test_standardise_nulls_leaves_typed_columns() -> Result<()> {
    let df = df!(
        "n" => &[Some(1.0), None],
        "s" => &["-", "ok"]
    )?;
    let df = standardise_nulls(df)?;

    assert_eq!(df.column("n")?.null_count(), 1);
    assert_eq!(strings(df.column("s")?), vec![None, Some("ok".to_owned())]);
    Ok(())
}
