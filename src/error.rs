use thiserror::Error;

#[derive(Error, Debug)]
pub enum IconGridError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("インデックスファイルが不正: {0}")]
    InvalidIndex(String),

    #[error("マニフェストファイルが不正: {0}")]
    InvalidManifest(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("検出タスクエラー: {0}")]
    Task(String),

    #[error("グリッドを推定できませんでした: {0}")]
    Calibration(String),
}

pub type Result<T> = std::result::Result<T, IconGridError>;
