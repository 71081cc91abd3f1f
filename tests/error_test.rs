//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use photo_board::error::{BoardError, MissingFields};
use photo_board::scanner;
use photo_board::schema::{FileFormProvider, FormSchemaProvider};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダから選択した場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), 10);
    assert!(matches!(result.unwrap_err(), BoardError::ImageLoad(_)));
}

/// 画像のないフォルダは空（エラーではない）
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path(), 10);
    assert!(result.unwrap().is_empty());
}

/// BoardError の Display 実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        BoardError::Config("설정".to_string()),
        BoardError::EmptyQueue,
        BoardError::QueueFull(10),
        BoardError::ItemNotFound(3),
        BoardError::ImageLoad("a.jpg".to_string()),
        BoardError::Render("stale".to_string()),
        BoardError::Storage("disk full".to_string()),
        BoardError::Network("HTTP 500".to_string()),
        BoardError::Auth("HTTP 401".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "Error display should not be empty");
    }
}

/// 未入力項目のメッセージに位置と項目名が入る
#[test]
fn test_validation_message_lists_items() {
    let err = BoardError::Validation(vec![
        MissingFields {
            item_index: Some(0),
            fields: vec!["이름".into(), "동".into()],
        },
        MissingFields {
            item_index: Some(2),
            fields: vec!["일자".into()],
        },
    ]);
    assert_eq!(err.to_string(), "입력 오류: #1 [이름, 동] #3 [일자]");
    assert!(err.is_validation());
    assert!(!err.is_auth());
}

/// JSON の構文エラーは JsonParse に変換される
#[tokio::test]
async fn test_form_file_with_bad_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("forms.json");
    std::fs::write(&path, "{ not json").unwrap();

    let provider = FileFormProvider::new(&path);
    let result = provider.list_forms().await;
    assert!(matches!(result, Err(BoardError::JsonParse(_))));
}

/// 存在しないフォームファイル
#[tokio::test]
async fn test_form_file_missing() {
    let provider = FileFormProvider::new("/nonexistent/forms.json");
    assert!(matches!(provider.list_forms().await, Err(BoardError::Config(_))));
}

/// 不正な色指定は共通ライブラリのエラーとして伝わる
#[test]
fn test_common_error_is_transparent() {
    let common = photo_board_common::Color::parse("#zzz").unwrap_err();
    let expected = common.to_string();
    let err: BoardError = common.into();
    assert_eq!(err.to_string(), expected);
}
