//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use icon_grid_rust::calibrate;
use icon_grid_rust::config::Config;
use icon_grid_rust::error::IconGridError;
use icon_grid_rust::scanner;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_reference_dir(Path::new("/nonexistent/path/12345"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, IconGridError::FolderNotFound(_)));
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");

    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("manifest.json"), "[]").unwrap();

    let result = scanner::scan_reference_dir(dir.path());
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// 指定した設定ファイルがない場合
#[test]
fn test_config_file_not_found() {
    let result = Config::load(Some(Path::new("/nonexistent/config.json")));
    assert!(matches!(result, Err(IconGridError::FileNotFound(_))));
}

/// 設定ファイルが壊れている場合
#[test]
fn test_config_file_invalid() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ invalid").unwrap();

    let result = Config::load(Some(&path));
    assert!(matches!(result, Err(IconGridError::Config(_))));

    // 配列形式はフィールド順に埋まってしまうので受け付けない
    std::fs::write(&path, r#"{"grid": [2, 2]}"#).unwrap();
    let result = Config::load(Some(&path));
    assert!(matches!(result, Err(IconGridError::Config(_))));
}

/// グリッド設定ファイルが壊れている場合
#[test]
fn test_grid_spec_invalid() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("grid_spec.json");
    std::fs::write(&path, "[1, 2]").unwrap();

    let mut config = Config::default();
    assert!(matches!(config.load_grid_spec(&path), Err(IconGridError::Config(_))));
    assert!(!config.grid.is_fixed());
}

/// キャリブレーション対象の画像がない・読めない場合
#[test]
fn test_calibrate_missing_and_corrupt_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = dir.path().join("grid_spec.json");

    let missing = calibrate::calibrate_file(&dir.path().join("none.png"), &output);
    assert!(matches!(missing, Err(IconGridError::FileNotFound(_))));

    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"not an image").unwrap();
    let result = calibrate::calibrate_file(&corrupt, &output);
    assert!(matches!(result, Err(IconGridError::ImageLoad(_))));
    assert!(!output.exists());
}

/// タイルのない画像ではグリッドを推定できない
#[test]
fn test_calibrate_blank_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("blank.png");
    image::RgbImage::from_pixel(200, 200, image::Rgb([30, 30, 30]))
        .save(&path)
        .unwrap();

    let result = calibrate::calibrate_file(&path, &dir.path().join("out.json"));
    assert!(matches!(result, Err(IconGridError::Calibration(_))));
}

/// IconGridErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        IconGridError::Config("テスト設定エラー".to_string()),
        IconGridError::FileNotFound("test.png".to_string()),
        IconGridError::FolderNotFound("/path/to/folder".to_string()),
        IconGridError::ImageLoad("壊れた画像".to_string()),
        IconGridError::InvalidIndex("不正なインデックス".to_string()),
        IconGridError::InvalidManifest("不正なマニフェスト".to_string()),
        IconGridError::Task("panic".to_string()),
        IconGridError::Calibration("sample.png".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: IconGridError = io_err.into();

    assert!(matches!(err, IconGridError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: IconGridError = json_err.into();

    assert!(matches!(err, IconGridError::JsonParse(_)));
}
