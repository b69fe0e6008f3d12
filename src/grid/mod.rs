//! タイルの切り出し
//!
//! 固定グリッド → グリッド推定 → 検出タイル → 画像全体 の順に戦略を試し、
//! 最初に適用できたものの矩形を使う。

pub mod cluster;
pub mod detect;
pub mod fixed;
pub mod infer;

pub use cluster::{cluster_positions, median};
pub use detect::{detect_tiles, Detection, DetectedTiles};
pub use fixed::fixed_cells;
pub use infer::infer_grid;

use crate::config::DetectionTuning;
use icon_grid_common::{BBox, GridSpec};
use image::DynamicImage;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;

/// タイル配置の決め方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 行数・列数・余白が既知
    FixedGrid,
    /// 部分的な検出からグリッドを再構成
    InferredGrid,
    /// 検出タイルを (y, x) 順にそのまま使う
    DetectedTiles,
    /// 画像全体を1タイルとする
    WholeImage,
}

impl Strategy {
    pub const CHAIN: [Strategy; 4] = [
        Strategy::FixedGrid,
        Strategy::InferredGrid,
        Strategy::DetectedTiles,
        Strategy::WholeImage,
    ];

    /// 適用できれば矩形列、できなければ None
    fn apply(self, ctx: &LayoutContext<'_>) -> Option<Vec<BBox>> {
        let (width, height) = ctx.dimensions();
        match self {
            Strategy::FixedGrid => ctx
                .grid
                .is_fixed()
                .then(|| fixed_cells(ctx.grid, width, height)),
            Strategy::InferredGrid => match ctx.detection() {
                Detection::Tiles(d) => {
                    infer_grid(&d.tiles, d.median_w, d.median_h, width, height, ctx.tuning)
                }
                Detection::WholeImage(_) => None,
            },
            Strategy::DetectedTiles => match ctx.detection() {
                Detection::Tiles(d) => {
                    let mut tiles: Vec<BBox> = d
                        .tiles
                        .iter()
                        .filter(|t| !t.is_empty_within(width, height))
                        .copied()
                        .collect();
                    tiles.sort_by_key(|t| (t.y, t.x));
                    (!tiles.is_empty()).then_some(tiles)
                }
                Detection::WholeImage(_) => None,
            },
            Strategy::WholeImage => Some(vec![BBox::new(0, 0, width, height)]),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::FixedGrid => "fixed_grid",
            Strategy::InferredGrid => "inferred_grid",
            Strategy::DetectedTiles => "detected_tiles",
            Strategy::WholeImage => "whole_image",
        };
        f.write_str(name)
    }
}

/// 戦略間で共有する入力。検出は必要になった時に1回だけ行う
struct LayoutContext<'a> {
    image: &'a DynamicImage,
    grid: &'a GridSpec,
    tuning: &'a DetectionTuning,
    detection: OnceCell<Detection>,
}

impl LayoutContext<'_> {
    fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    fn detection(&self) -> &Detection {
        self.detection
            .get_or_init(|| detect_tiles(self.image, self.tuning))
    }
}

/// 採用された配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayout {
    pub strategy: Strategy,
    pub boxes: Vec<BBox>,
}

/// 切り出したタイル
#[derive(Debug, Clone)]
pub struct Tile {
    pub image: DynamicImage,
    pub bbox: BBox,
}

/// タイル矩形を決める
pub fn locate_tiles(image: &DynamicImage, grid: &GridSpec, tuning: &DetectionTuning) -> TileLayout {
    let ctx = LayoutContext {
        image,
        grid,
        tuning,
        detection: OnceCell::new(),
    };

    for strategy in Strategy::CHAIN {
        if let Some(boxes) = strategy.apply(&ctx) {
            log::debug!("タイル配置: {} ({}件)", strategy, boxes.len());
            return TileLayout { strategy, boxes };
        }
    }

    // WholeImage は常に適用できる
    TileLayout {
        strategy: Strategy::WholeImage,
        boxes: vec![BBox::new(0, 0, image.width(), image.height())],
    }
}

/// 画像をタイルに切り出す（行優先）
///
/// 画像からはみ出す矩形は画像内に収まる部分だけを切り出し、bboxはそのまま返す。
pub fn crop_grid(image: &DynamicImage, grid: &GridSpec, tuning: &DetectionTuning) -> Vec<Tile> {
    let layout = locate_tiles(image, grid, tuning);
    crop_boxes(image, &layout.boxes)
}

pub fn crop_boxes(image: &DynamicImage, boxes: &[BBox]) -> Vec<Tile> {
    boxes
        .iter()
        .filter(|b| !b.is_empty_within(image.width(), image.height()))
        .map(|b| Tile {
            image: image.crop_imm(b.x, b.y, b.w, b.h),
            bbox: *b,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn plain(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_fixed_grid_takes_priority() {
        let grid = GridSpec { rows: 3, cols: 3, ..Default::default() };
        let layout = locate_tiles(&plain(300, 300), &grid, &DetectionTuning::default());
        assert_eq!(layout.strategy, Strategy::FixedGrid);
        assert_eq!(layout.boxes.len(), 9);

        let tiles = crop_grid(&plain(300, 300), &grid, &DetectionTuning::default());
        assert_eq!(tiles.len(), 9);
        assert!(tiles.iter().all(|t| t.image.width() == 100 && t.image.height() == 100));
        assert_eq!(tiles[3].bbox, BBox::new(0, 100, 100, 100));
    }

    #[test]
    fn test_featureless_image_is_one_tile() {
        let layout = locate_tiles(&plain(120, 90), &GridSpec::default(), &DetectionTuning::default());
        assert_eq!(layout.strategy, Strategy::WholeImage);
        assert_eq!(layout.boxes, vec![BBox::new(0, 0, 120, 90)]);
    }

    #[test]
    fn test_too_few_tiles_use_detected_order() {
        let boxes = [
            BBox::new(300, 200, 60, 60),
            BBox::new(20, 200, 60, 60),
            BBox::new(150, 20, 60, 60),
        ];
        let mut img = RgbImage::from_pixel(500, 400, Rgb([255, 255, 255]));
        for b in &boxes {
            for y in b.y..b.y + b.h {
                for x in b.x..b.x + b.w {
                    img.put_pixel(x, y, Rgb([0, 0, 0]));
                }
            }
        }

        let layout = locate_tiles(&DynamicImage::ImageRgb8(img), &GridSpec::default(), &DetectionTuning::default());
        assert_eq!(layout.strategy, Strategy::DetectedTiles);
        assert_eq!(layout.boxes, vec![boxes[2], boxes[1], boxes[0]]);
    }

    #[test]
    fn test_crop_clamps_to_image() {
        let tiles = crop_boxes(&plain(100, 100), &[BBox::new(80, 80, 40, 40), BBox::new(100, 0, 10, 10)]);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].bbox, BBox::new(80, 80, 40, 40));
        assert_eq!((tiles[0].image.width(), tiles[0].image.height()), (20, 20));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::InferredGrid.to_string(), "inferred_grid");
        assert_eq!(serde_json::to_string(&Strategy::WholeImage).unwrap(), "\"whole_image\"");
    }
}
