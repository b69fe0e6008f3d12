//! 検出リクエストの処理
//!
//! デコード → タイル切り出し → ハッシュ化 → 照合。CPUのみの同期処理なので、
//! 非同期ホストからは `detect_async` でブロッキングプールに逃がす。

use crate::catalog::{CatalogSnapshot, CatalogStore};
use crate::config::Config;
use crate::error::{IconGridError, Result};
use crate::grid::{self, Tile, TileLayout};
use crate::matcher::{self, display_label};
use icon_grid_common::{DetectResponse, DetectedIcon};
use image::DynamicImage;
use rayon::prelude::*;
use std::sync::Arc;

/// 1枚分の結果。採用された配置も返す（`--show-layout` 用）
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub layout: TileLayout,
    pub detected: Vec<DetectedIcon>,
}

/// リクエスト全体の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub response: DetectResponse,
    /// (入力中の位置, 配置)。デコードできなかった画像は含まない
    pub layouts: Vec<(usize, TileLayout)>,
}

/// 1枚の画像からアイコンを検出する（行優先順）
///
/// しきい値を満たさないタイルは結果に含めない。
pub fn detect_image(image: &DynamicImage, catalog: &CatalogSnapshot, config: &Config) -> Vec<DetectedIcon> {
    if catalog.is_empty() {
        log::debug!("カタログが空のため照合をスキップ");
        return Vec::new();
    }
    analyze_image(image, catalog, config).detected
}

/// 配置を決めてから照合する。カタログが空ならタイルはハッシュ化しない
pub fn analyze_image(image: &DynamicImage, catalog: &CatalogSnapshot, config: &Config) -> ImageReport {
    let layout = grid::locate_tiles(image, &config.grid, &config.tuning);
    if catalog.is_empty() {
        return ImageReport { layout, detected: Vec::new() };
    }

    let tiles = grid::crop_boxes(image, &layout.boxes);
    let detected: Vec<DetectedIcon> = tiles
        .par_iter()
        .filter_map(|tile| match_tile(tile, catalog, config))
        .collect();

    log::debug!("検出: {}件 / タイル{}件 ({})", detected.len(), tiles.len(), layout.strategy);
    ImageReport { layout, detected }
}

fn match_tile(tile: &Tile, catalog: &CatalogSnapshot, config: &Config) -> Option<DetectedIcon> {
    let result = matcher::match_tile(&tile.image, &catalog.entries, &config.central_crop)?;
    if !result.is_accepted(&config.thresholds) {
        return None;
    }

    let entry = result.entry;
    Some(DetectedIcon {
        name: display_label(entry, &catalog.ambiguous),
        base_name: entry.name.clone(),
        element: entry.element.clone(),
        distance: result.distance,
        confidence: result.confidence(),
        bbox: tile.bbox,
    })
}

/// エンコード済み画像群を処理する。デコードできない画像は読み飛ばす
pub fn detect_images(encoded: &[Vec<u8>], catalog: &CatalogSnapshot, config: &Config) -> DetectResponse {
    detect_batch(encoded, catalog, config).response
}

pub fn detect_batch(encoded: &[Vec<u8>], catalog: &CatalogSnapshot, config: &Config) -> BatchReport {
    let mut detected = Vec::new();
    let mut layouts = Vec::new();
    for (i, bytes) in encoded.iter().enumerate() {
        let image = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("画像{}をデコードできません: {}", i + 1, e);
                continue;
            }
        };
        let report = analyze_image(&image, catalog, config);
        detected.extend(report.detected);
        layouts.push((i, report.layout));
    }

    BatchReport {
        response: DetectResponse::from_detected(detected),
        layouts,
    }
}

/// ブロッキングプール上で検出する
///
/// リクエスト全体で同じスナップショットを使う。
pub async fn detect_async(store: &CatalogStore, config: Arc<Config>, encoded: Vec<Vec<u8>>) -> Result<BatchReport> {
    let catalog = store.current();
    tokio::task::spawn_blocking(move || detect_batch(&encoded, &catalog, &config))
        .await
        .map_err(|e| IconGridError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogOrigin;
    use crate::grid::Strategy;

    #[test]
    fn test_empty_catalog_detects_nothing() {
        let image = DynamicImage::new_rgb8(64, 64);
        let catalog = CatalogSnapshot::unloaded();
        assert!(detect_image(&image, &catalog, &Config::default()).is_empty());
    }

    #[test]
    fn test_undecodable_input_is_skipped() {
        let catalog = CatalogSnapshot::new(Vec::new(), CatalogOrigin::IndexFile);
        let response = detect_images(&[b"garbage".to_vec()], &catalog, &Config::default());
        assert_eq!(response, DetectResponse::default());
    }

    #[test]
    fn test_batch_reports_layout_per_decoded_image() {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(120, 90)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let catalog = CatalogSnapshot::unloaded();

        let report = detect_batch(&[b"garbage".to_vec(), bytes], &catalog, &Config::default());
        assert_eq!(report.layouts.len(), 1);
        let (index, layout) = &report.layouts[0];
        assert_eq!(*index, 1);
        assert_eq!(layout.strategy, Strategy::WholeImage);
        assert_eq!(report.response.count, 0);
    }
}
