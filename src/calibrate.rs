//! サンプル画像からの固定グリッド推定
//!
//! 照合時の検出とは独立した簡易版。エッジ検出の外側輪郭からタイルを拾い、
//! 左上座標の並びから行数・列数・余白・間隔を求める。結果は `--grid-spec`
//! で固定グリッド設定として読み込める。

use crate::error::{IconGridError, Result};
use crate::grid::detect::bounding_rect;
use crate::grid::{cluster_positions, median};
use icon_grid_common::{BBox, GridSpec};
use image::DynamicImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BLUR_SIGMA: f32 = 1.1;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
const MIN_SIDE: u32 = 40;
const MAX_FRACTION: f64 = 0.6;
const MIN_AREA: u32 = 2000;

/// キャリブレーション結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub rows: u32,
    pub cols: u32,
    pub margin_x: u32,
    pub margin_y: u32,
    pub gap_x: u32,
    pub gap_y: u32,
    pub cell_w: u32,
    pub cell_h: u32,
}

impl From<Calibration> for GridSpec {
    fn from(c: Calibration) -> Self {
        GridSpec {
            rows: c.rows,
            cols: c.cols,
            margin_x: c.margin_x,
            margin_y: c.margin_y,
            gap_x: c.gap_x,
            gap_y: c.gap_y,
        }
    }
}

/// 画像からグリッドを推定する。タイルが見つからなければ None
pub fn calibrate(image: &DynamicImage) -> Option<Calibration> {
    let tiles = find_tiles(image);
    log::debug!("キャリブレーション: タイル{}件", tiles.len());
    infer_spec(&tiles)
}

fn find_tiles(image: &DynamicImage) -> Vec<BBox> {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let edges = canny(&gaussian_blur_f32(&gray, BLUR_SIGMA), CANNY_LOW, CANNY_HIGH);

    find_contours::<u32>(&edges)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .filter_map(|c| bounding_rect(&c.points))
        .filter(|b| {
            let ratio = b.w as f64 / b.h as f64;
            b.w >= MIN_SIDE
                && b.h >= MIN_SIDE
                && b.w as f64 <= width as f64 * MAX_FRACTION
                && b.h as f64 <= height as f64 * MAX_FRACTION
                && (0.85..=1.15).contains(&ratio)
                && b.w * b.h >= MIN_AREA
        })
        .collect()
}

/// タイルの左上座標から GridSpec を組み立てる
pub fn infer_spec(tiles: &[BBox]) -> Option<Calibration> {
    if tiles.is_empty() {
        return None;
    }

    let widths: Vec<f64> = tiles.iter().map(|t| t.w as f64).collect();
    let heights: Vec<f64> = tiles.iter().map(|t| t.h as f64).collect();
    let cell_w = median(&widths) as u32;
    let cell_h = median(&heights) as u32;
    let tolerance = 3.0_f64.max((cell_w as f64 * 0.25).floor());

    let xs: Vec<f64> = tiles.iter().map(|t| t.x as f64).collect();
    let ys: Vec<f64> = tiles.iter().map(|t| t.y as f64).collect();
    let cols: Vec<u32> = cluster_positions(&xs, tolerance).into_iter().map(|v| v as u32).collect();
    let rows: Vec<u32> = cluster_positions(&ys, tolerance).into_iter().map(|v| v as u32).collect();

    Some(Calibration {
        rows: rows.len() as u32,
        cols: cols.len() as u32,
        margin_x: cols[0],
        margin_y: rows[0],
        gap_x: median_gap(&cols, cell_w),
        gap_y: median_gap(&rows, cell_h),
        cell_w,
        cell_h,
    })
}

/// 隣接位置の間隔からセルサイズを引いた値の中央値（負なら0）
fn median_gap(positions: &[u32], cell: u32) -> u32 {
    let gaps: Vec<f64> = positions
        .windows(2)
        .map(|w| w[1] as f64 - w[0] as f64 - cell as f64)
        .collect();
    median(&gaps).max(0.0) as u32
}

/// 画像ファイルを読み、推定結果をJSONで保存する
pub fn calibrate_file(image_path: &Path, output: &Path) -> Result<Calibration> {
    if !image_path.exists() {
        return Err(IconGridError::FileNotFound(image_path.display().to_string()));
    }
    let image = image::open(image_path)
        .map_err(|e| IconGridError::ImageLoad(format!("{}: {}", image_path.display(), e)))?;

    let calibration = calibrate(&image)
        .ok_or_else(|| IconGridError::Calibration(image_path.display().to_string()))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, serde_json::to_string_pretty(&calibration)?)?;
    Ok(calibration)
}
