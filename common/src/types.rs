//! 検出エンジンの型定義
//!
//! エンジンとCLIで共有される型:
//! - ReferenceEntry: 参照カタログの1エントリ（インデックスファイルの1レコード）
//! - GridSpec: 固定グリッド切り出しの設定
//! - DetectResponse: 検出結果（レスポンス形式）

use crate::hash::ImageHash;
use serde::{Deserialize, Serialize};

/// 画像座標系の矩形。JSONでは `[x, y, w, h]` の配列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }

    /// `width`×`height` の画像上で切り出した結果が空になるか
    pub fn is_empty_within(&self, width: u32, height: u32) -> bool {
        self.w == 0 || self.h == 0 || self.x >= width || self.y >= height
    }
}

impl From<[u32; 4]> for BBox {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [u32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

/// 固定グリッド設定（rows/colsが0なら自動検出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    pub gap_x: u32,
    pub gap_y: u32,
}

impl GridSpec {
    /// rows>0 かつ cols>0 のとき固定グリッドモード
    pub fn is_fixed(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }
}

/// 参照カタログのエントリ
///
/// 一意性は `(name, element)` の組で決まる。同名で属性違いのアイコンが存在しうる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,

    #[serde(default)]
    pub element: Option<String>,

    #[serde(rename = "file")]
    pub source_path: String,

    #[serde(rename = "phash", alias = "primary_hash")]
    pub primary_hash: ImageHash,

    #[serde(rename = "dhash", alias = "secondary_hash", default)]
    pub secondary_hash: Option<ImageHash>,
}

impl ReferenceEntry {
    /// 空文字列の属性は属性なしとして扱う
    pub fn element_tag(&self) -> Option<&str> {
        self.element.as_deref().filter(|e| !e.is_empty())
    }
}

/// マニフェストファイルの1項目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestItem {
    pub name: Option<String>,
    pub element: Option<String>,
    pub file: Option<String>,
}

/// 検出された1アイコン
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIcon {
    /// 表示ラベル（曖昧な名前は "{element} {name}"）
    pub name: String,
    pub base_name: String,
    pub element: Option<String>,
    pub distance: u32,
    pub confidence: f64,
    pub bbox: BBox,
}

/// 検出レスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detected: Vec<DetectedIcon>,
    pub names: Vec<String>,
    pub count: usize,
}

impl DetectResponse {
    pub fn from_detected(detected: Vec<DetectedIcon>) -> Self {
        let names: Vec<String> = detected.iter().map(|d| d.name.clone()).collect();
        Self {
            count: names.len(),
            names,
            detected,
        }
    }
}
