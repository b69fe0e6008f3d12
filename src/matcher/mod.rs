//! タイルと参照カタログの照合

pub mod fingerprint;

pub use fingerprint::{central_crop, dhash, fingerprint, phash, Fingerprint};

use crate::config::{CentralCrop, MatchThresholds};
use icon_grid_common::{ImageHash, ReferenceEntry, HASH_BITS};
use image::DynamicImage;
use std::collections::HashSet;

/// 最良候補と次点との差
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Margin {
    Bounded(u32),
    /// 次点の候補がない
    Unbounded,
}

impl Margin {
    pub fn at_least(&self, min: u32) -> bool {
        match self {
            Margin::Bounded(m) => *m >= min,
            Margin::Unbounded => true,
        }
    }
}

/// 1タイルの照合結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: &'a ReferenceEntry,
    pub distance: u32,
    pub margin: Margin,
}

impl MatchResult<'_> {
    /// 距離・マージンのしきい値を満たすか
    pub fn is_accepted(&self, thresholds: &MatchThresholds) -> bool {
        self.distance <= thresholds.max_distance && self.margin.at_least(thresholds.min_margin)
    }

    pub fn confidence(&self) -> f64 {
        confidence(self.distance)
    }
}

/// カタログを1回走査して最良と次点を求める
///
/// 同距離の場合は先に現れたエントリが勝つ。次点は走査時点の最良距離より
/// 厳密に大きい距離の最小値。カタログが空なら None。
pub fn best_match(query: ImageHash, entries: &[ReferenceEntry]) -> Option<MatchResult<'_>> {
    let mut best: Option<(&ReferenceEntry, u32)> = None;
    let mut second: Option<u32> = None;

    for entry in entries {
        let distance = query.distance(&entry.primary_hash);
        match best {
            None => best = Some((entry, distance)),
            Some((_, best_distance)) if distance < best_distance => {
                second = Some(best_distance);
                best = Some((entry, distance));
            }
            Some((_, best_distance)) if distance > best_distance => {
                if second.map_or(true, |s| distance < s) {
                    second = Some(distance);
                }
            }
            Some(_) => {}
        }
    }

    best.map(|(entry, distance)| MatchResult {
        entry,
        distance,
        margin: second.map_or(Margin::Unbounded, |s| Margin::Bounded(s - distance)),
    })
}

/// タイル画像の中央部をハッシュ化して照合する
pub fn match_tile<'a>(
    tile: &DynamicImage,
    entries: &'a [ReferenceEntry],
    crop: &CentralCrop,
) -> Option<MatchResult<'a>> {
    if entries.is_empty() {
        return None;
    }
    let query = phash(&central_crop(tile, crop));
    best_match(query, entries)
}

/// ハミング距離0〜64を信頼度1〜0に線形変換（小数4桁）
pub fn confidence(distance: u32) -> f64 {
    let value = (1.0 - distance as f64 / HASH_BITS as f64).max(0.0);
    (value * 10_000.0).round() / 10_000.0
}

/// 表示ラベル。曖昧な名前には属性を前置する
pub fn display_label(entry: &ReferenceEntry, ambiguous: &HashSet<String>) -> String {
    match entry.element_tag() {
        Some(element) if ambiguous.contains(&entry.name) => format!("{} {}", element, entry.name),
        _ => entry.name.clone(),
    }
}
