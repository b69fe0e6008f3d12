//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// 16進ハッシュ文字列が不正
    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
