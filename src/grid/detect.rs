//! 輪郭ベースのタイル候補検出
//!
//! グレースケール → ぼかし → 適応的二値化（反転）→ 輪郭抽出 → 外接矩形。
//! 得られた矩形をサイズ・縦横比・位置でふるいにかけ、中央値サイズから
//! 外れたもの（UIボタン等）と重複検出を取り除く。

use super::cluster::median;
use crate::config::DetectionTuning;
use icon_grid_common::BBox;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::point::Point;

/// 検出結果
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// 候補が1つも残らなかった。画像全体を1タイルとして扱う
    WholeImage(BBox),
    Tiles(DetectedTiles),
}

/// サイズ揃え・重複除去済みのタイル
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTiles {
    /// 検出順（輪郭の走査順）
    pub tiles: Vec<BBox>,
    pub median_w: f64,
    pub median_h: f64,
}

impl Detection {
    pub fn boxes(&self) -> Vec<BBox> {
        match self {
            Detection::WholeImage(bbox) => vec![*bbox],
            Detection::Tiles(detected) => detected.tiles.clone(),
        }
    }
}

/// 画像からタイルを検出する
pub fn detect_tiles(image: &DynamicImage, tuning: &DetectionTuning) -> Detection {
    let (width, height) = (image.width(), image.height());
    let candidates = find_candidates(image, tuning);
    log::debug!("タイル候補: {}件 ({}x{})", candidates.len(), width, height);

    if candidates.is_empty() {
        return Detection::WholeImage(BBox::new(0, 0, width, height));
    }

    Detection::Tiles(refine_candidates(&candidates, tuning))
}

/// 輪郭の外接矩形のうち、タイルらしいものを返す
pub fn find_candidates(image: &DynamicImage, tuning: &DetectionTuning) -> Vec<BBox> {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let blurred = if tuning.blur_sigma > 0.0 {
        gaussian_blur_f32(&gray, tuning.blur_sigma)
    } else {
        gray
    };
    let binary = threshold_mean_inverted(&blurred, tuning.threshold_block_radius, tuning.threshold_offset);

    find_contours::<u32>(&binary)
        .iter()
        .filter_map(|contour| bounding_rect(&contour.points))
        .filter(|rect| is_tile_candidate(rect, width, height, tuning))
        .collect()
}

/// 局所平均による適応的二値化（反転）
///
/// 局所平均 - offset 以下の画素を前景(255)にする。
fn threshold_mean_inverted(image: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let means = box_filter(image, block_radius, block_radius);
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let src = image.get_pixel(x, y)[0] as i32;
        let mean = means.get_pixel(x, y)[0] as i32;
        if src <= mean - offset {
            *pixel = Luma([255]);
        }
    }
    out
}

/// 輪郭点の外接矩形
pub(crate) fn bounding_rect(points: &[Point<u32>]) -> Option<BBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

fn is_tile_candidate(rect: &BBox, width: u32, height: u32, tuning: &DetectionTuning) -> bool {
    if rect.w < tuning.min_tile_size || rect.h < tuning.min_tile_size {
        return false;
    }
    if rect.w as f64 > width as f64 * tuning.max_tile_fraction
        || rect.h as f64 > height as f64 * tuning.max_tile_fraction
    {
        return false;
    }
    let ratio = rect.w as f64 / rect.h as f64;
    if ratio < tuning.min_aspect || ratio > tuning.max_aspect {
        return false;
    }
    // 右側のサイドメニュー
    rect.x as f64 <= width as f64 * tuning.right_rail_fraction
}

/// 中央値サイズから外れた候補を捨て、中心が近い重複を先勝ちで除く
pub fn refine_candidates(candidates: &[BBox], tuning: &DetectionTuning) -> DetectedTiles {
    let widths: Vec<f64> = candidates.iter().map(|c| c.w as f64).collect();
    let heights: Vec<f64> = candidates.iter().map(|c| c.h as f64).collect();
    let median_w = median(&widths);
    let median_h = median(&heights);

    let size_filtered = candidates.iter().filter(|c| {
        (c.w as f64 - median_w).abs() <= median_w * tuning.size_tolerance
            && (c.h as f64 - median_h).abs() <= median_h * tuning.size_tolerance
    });

    let mut centers: Vec<(f64, f64)> = Vec::new();
    let mut tiles = Vec::new();
    for tile in size_filtered {
        let (cx, cy) = tile.center();
        let duplicate = centers.iter().any(|&(ux, uy)| {
            (cx - ux).abs() < median_w * tuning.dedup_fraction
                && (cy - uy).abs() < median_h * tuning.dedup_fraction
        });
        if duplicate {
            continue;
        }
        centers.push((cx, cy));
        tiles.push(*tile);
    }

    log::debug!(
        "タイル: {}件 (候補{}件, 中央値 {:.1}x{:.1})",
        tiles.len(),
        candidates.len(),
        median_w,
        median_h
    );

    DetectedTiles {
        tiles,
        median_w,
        median_h,
    }
}
