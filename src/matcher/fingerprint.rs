//! 知覚ハッシュの計算
//!
//! - pHash: 32x32グレースケールのDCT低周波8x8を中央値で2値化
//! - dHash: 9x8グレースケールの横方向の輝度差

use crate::config::CentralCrop;
use crate::grid::median;
use icon_grid_common::ImageHash;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use std::f64::consts::PI;

const PHASH_SIZE: usize = 32;
const LOW_FREQ: usize = 8;
const DHASH_WIDTH: u32 = 9;
const DHASH_HEIGHT: u32 = 8;

/// 主・副のハッシュ組
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub primary: ImageHash,
    pub secondary: ImageHash,
}

/// タイル中央部を切り出す。中央部が空になる小さな画像はそのまま返す
pub fn central_crop(image: &DynamicImage, crop: &CentralCrop) -> DynamicImage {
    match crop.region(image.width(), image.height()) {
        Some((x0, y0, x1, y1)) => image.crop_imm(x0, y0, x1 - x0, y1 - y0),
        None => image.clone(),
    }
}

/// 中央部を切り出してから両方のハッシュを計算する
pub fn fingerprint(image: &DynamicImage, crop: &CentralCrop) -> Fingerprint {
    let region = central_crop(image, crop);
    Fingerprint {
        primary: phash(&region),
        secondary: dhash(&region),
    }
}

pub fn phash(image: &DynamicImage) -> ImageHash {
    if image.width() == 0 || image.height() == 0 {
        return ImageHash::default();
    }

    let size = PHASH_SIZE as u32;
    let gray = imageops::resize(&image.to_luma8(), size, size, FilterType::Lanczos3);
    let pixels: Vec<f64> = gray.pixels().map(|p| p[0] as f64).collect();

    let coeffs = low_frequency_dct(&pixels);
    let threshold = median(&coeffs);
    ImageHash::from_bits(coeffs.iter().map(|&c| c > threshold))
}

pub fn dhash(image: &DynamicImage) -> ImageHash {
    if image.width() == 0 || image.height() == 0 {
        return ImageHash::default();
    }

    let gray = imageops::resize(&image.to_luma8(), DHASH_WIDTH, DHASH_HEIGHT, FilterType::Lanczos3);
    let bits = (0..DHASH_HEIGHT).flat_map(|y| {
        let gray = &gray;
        (0..DHASH_WIDTH - 1).map(move |x| gray.get_pixel(x + 1, y)[0] > gray.get_pixel(x, y)[0])
    });
    ImageHash::from_bits(bits)
}

/// 2次元DCT-IIの左上 LOW_FREQ×LOW_FREQ 係数（行優先、縦周波数が行）
///
/// 正規化係数は中央値比較に影響しないので省く。
fn low_frequency_dct(pixels: &[f64]) -> Vec<f64> {
    let n = PHASH_SIZE;
    let cosines: Vec<f64> = (0..LOW_FREQ)
        .flat_map(|k| (0..n).map(move |i| (PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos()))
        .collect();
    let basis = |k: usize, i: usize| cosines[k * n + i];

    // 各行を横方向に変換
    let mut rows = vec![0.0; n * LOW_FREQ];
    for y in 0..n {
        for v in 0..LOW_FREQ {
            rows[y * LOW_FREQ + v] = (0..n).map(|x| pixels[y * n + x] * basis(v, x)).sum();
        }
    }

    // 縦方向
    let mut coeffs: Vec<f64> = Vec::with_capacity(LOW_FREQ * LOW_FREQ);
    for u in 0..LOW_FREQ {
        for v in 0..LOW_FREQ {
            coeffs.push((0..n).map(|y| rows[y * LOW_FREQ + v] * basis(u, y)).sum::<f64>());
        }
    }
    coeffs
}
