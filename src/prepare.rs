//! Turns an arbitrary source image into a panel-sized PNG
//!
//! Steps: trim fully transparent borders, optionally cluster the palette
//! down to N colours, pad (centred, transparent) to a square whose side is a
//! multiple of the target size, then downsample by blocks, each block
//! becoming its most common colour.

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Pixels at or above this alpha count as content when trimming
const OPAQUE_ALPHA: u8 = 128;

// Clustering is seeded so the same input always yields the same palette
const CLUSTER_SEED: u64 = 42;
const CLUSTER_RESTARTS: usize = 10;
const CLUSTER_MAX_ITERATIONS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub source: (u32, u32),
    pub trimmed: (u32, u32),
    pub padded: u32,
    pub size: u32,
    /// Distinct colours left after clustering, when clustering was asked for
    pub palette: Option<usize>,
}

pub fn prepare_image(
    input: &Path,
    output: &Path,
    size: u32,
    colors: Option<usize>,
) -> ImageResult<PrepareReport> {
    let size = size.max(1);
    let source = image::open(input)?.to_rgba8();
    let mut working = trim_transparent(&source);
    let trimmed = working.dimensions();
    if let Some(n) = colors {
        working = cluster_colors(&working, n);
    }
    let palette = colors.map(|_| distinct_colors(&working));
    let padded = pad_to_square(&working, size);
    let resized = block_resize(&padded, size);
    resized.save_with_format(output, ImageFormat::Png)?;

    let report = PrepareReport {
        source: source.dimensions(),
        trimmed,
        padded: padded.width(),
        size,
        palette,
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        source = ?report.source,
        trimmed = ?report.trimmed,
        padded = report.padded,
        palette = ?report.palette,
        "Image prepared"
    );
    Ok(report)
}

/// Crop to the bounding box of pixels with alpha >= 128. A fully
/// transparent image is returned unchanged.
pub fn trim_transparent(img: &RgbaImage) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if px[3] < OPAQUE_ALPHA {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }

    match bounds {
        Some((left, top, right, bottom)) => {
            let (w, h) = (right - left + 1, bottom - top + 1);
            debug!(from = ?img.dimensions(), to = ?(w, h), "Trimmed transparent border");
            image::imageops::crop_imm(img, left, top, w, h).to_image()
        }
        None => img.clone(),
    }
}

/// Remap `img` onto at most `n_colors` colours using k-means over RGBA.
/// An image that already has no more than `n_colors` colours is returned
/// unchanged.
pub fn cluster_colors(img: &RgbaImage, n_colors: usize) -> RgbaImage {
    let mut histogram: BTreeMap<[u8; 4], u32> = BTreeMap::new();
    for px in img.pixels() {
        *histogram.entry(px.0).or_insert(0) += 1;
    }
    let unique = histogram.len();
    let k = n_colors.max(1).min(unique);
    if k == unique {
        debug!(unique, "Palette already small enough, skipping clustering");
        return img.clone();
    }

    let points: Vec<[f32; 4]> = histogram.keys().map(|c| c.map(f32::from)).collect();
    let weights: Vec<f32> = histogram.values().map(|&n| n as f32).collect();

    let mut rng = StdRng::seed_from_u64(CLUSTER_SEED);
    let mut best: Option<(f32, Vec<[f32; 4]>)> = None;
    for _ in 0..CLUSTER_RESTARTS {
        let (inertia, centroids) = kmeans(&points, &weights, k, &mut rng);
        if best.as_ref().map_or(true, |(score, _)| inertia < *score) {
            best = Some((inertia, centroids));
        }
    }
    let Some((_, centroids)) = best else {
        return img.clone();
    };

    let remap: HashMap<[u8; 4], [u8; 4]> = histogram
        .keys()
        .zip(&points)
        .map(|(color, point)| (*color, quantize(centroids[nearest(point, &centroids)])))
        .collect();
    let mut out = img.clone();
    for px in out.pixels_mut() {
        if let Some(mapped) = remap.get(&px.0) {
            px.0 = *mapped;
        }
    }
    info!(from = unique, to = k, "Colours clustered");
    out
}

pub fn distinct_colors(img: &RgbaImage) -> usize {
    img.pixels().map(|px| px.0).collect::<HashSet<_>>().len()
}

fn distance2(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f32; 4], centroids: &[[f32; 4]]) -> usize {
    let mut best = 0;
    let mut best_d = f32::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance2(point, c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn quantize(c: [f32; 4]) -> [u8; 4] {
    c.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

fn pick_weighted<R: Rng>(weights: &[f32], rng: &mut R) -> usize {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut target = rng.random_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    weights.len() - 1
}

/// One weighted k-means run: k-means++ seeding, then Lloyd iterations until
/// assignments settle. Returns the weighted inertia and the centroids.
fn kmeans<R: Rng>(
    points: &[[f32; 4]],
    weights: &[f32],
    k: usize,
    rng: &mut R,
) -> (f32, Vec<[f32; 4]>) {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[pick_weighted(weights, rng)]);
    let mut closest: Vec<f32> = points.iter().map(|p| distance2(p, &centroids[0])).collect();
    while centroids.len() < k {
        let scores: Vec<f32> = closest.iter().zip(weights).map(|(d, w)| d * w).collect();
        let next = points[pick_weighted(&scores, rng)];
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(distance2(p, &next));
        }
        centroids.push(next);
    }

    let mut labels = vec![usize::MAX; points.len()];
    for _ in 0..CLUSTER_MAX_ITERATIONS {
        let mut changed = false;
        for (label, p) in labels.iter_mut().zip(points) {
            let n = nearest(p, &centroids);
            if *label != n {
                *label = n;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0f32; 4]; k];
        let mut totals = vec![0f32; k];
        for ((p, w), &label) in points.iter().zip(weights).zip(&labels) {
            for (acc, v) in sums[label].iter_mut().zip(p) {
                *acc += v * w;
            }
            totals[label] += w;
        }
        for ((c, sum), &total) in centroids.iter_mut().zip(&sums).zip(&totals) {
            // an emptied cluster keeps its last position
            if total > 0.0 {
                *c = std::array::from_fn(|i| sum[i] / total);
            }
        }
    }

    let inertia = points
        .iter()
        .zip(weights)
        .zip(&labels)
        .map(|((p, w), &label)| distance2(p, &centroids[label]) * w)
        .sum();
    (inertia, centroids)
}

/// Centre `img` on a transparent square canvas whose side is the larger
/// dimension rounded up to a multiple of `size`.
pub fn pad_to_square(img: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let side = w.div_ceil(size).max(1).max(h.div_ceil(size)) * size;
    if (w, h) == (side, side) {
        return img.clone();
    }
    let mut canvas = RgbaImage::new(side, side);
    let (ox, oy) = ((side - w) / 2, (side - h) / 2);
    image::imageops::replace(&mut canvas, img, ox as i64, oy as i64);
    canvas
}

/// Downsample a square image whose side is a multiple of `size`. Each
/// output pixel is the most frequent colour of its block; ties go to the
/// colour seen first in row-major order.
pub fn block_resize(img: &RgbaImage, size: u32) -> RgbaImage {
    let block_w = (img.width() / size).max(1);
    let block_h = (img.height() / size).max(1);
    let mut out = RgbaImage::new(size, size);
    let mut counts: HashMap<[u8; 4], (u32, u32)> = HashMap::new();

    for by in 0..size {
        for bx in 0..size {
            counts.clear();
            let mut order = 0;
            let x_end = ((bx + 1) * block_w).min(img.width());
            let y_end = ((by + 1) * block_h).min(img.height());
            for y in by * block_h..y_end {
                for x in bx * block_w..x_end {
                    let entry = counts.entry(img.get_pixel(x, y).0).or_insert((0, order));
                    entry.0 += 1;
                    order += 1;
                }
            }
            let winner = counts
                .iter()
                .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
                .map(|(color, _)| *color)
                .unwrap_or([0, 0, 0, 0]);
            out.put_pixel(bx, by, Rgba(winner));
        }
    }
    out
}
