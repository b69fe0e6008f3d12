//! アイコングリッド検出・知覚ハッシュ照合エンジン
//!
//! スクリーンショットからアイコンタイルを切り出し、参照カタログと
//! 64bit知覚ハッシュで照合する。

pub mod calibrate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod pipeline;
pub mod scanner;

pub use icon_grid_common::{BBox, DetectResponse, DetectedIcon, GridSpec, ImageHash, ReferenceEntry};
