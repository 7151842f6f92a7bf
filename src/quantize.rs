use std::collections::HashMap;

use palette::Srgb;
use tracing::debug;

use crate::{error::PaletteError, report::Palette};

pub const DEFAULT_MAX_ITERATIONS: usize = 20;
/// Largest centroid move (normalised RGB units) still counted as converged.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizeOptions {
    pub max_iterations: usize,
    pub tolerance: f32,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// A centroid and the number of pixels currently assigned to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cluster {
    pub centroid: Srgb<f32>,
    pub population: u64,
}

impl Cluster {
    fn seed(color: Srgb<u8>) -> Self {
        Self {
            centroid: color.into_format(),
            population: 0,
        }
    }

    pub fn color(&self) -> Srgb<u8> {
        self.centroid.into_format()
    }
}

/// Reduce `pixels` to at most `k` representative colors.
///
/// Runs k-means in RGB space over the distinct colors of the image, each
/// weighted by its pixel count. Seeding is deterministic: `k` evenly spaced
/// picks from the distinct colors ordered by descending count. Clusters that
/// lose all their pixels are dropped, so the result can be shorter than `k`.
pub fn quantize(pixels: &[Srgb<u8>], k: usize, options: &QuantizeOptions) -> Result<Palette, PaletteError> {
    if k == 0 {
        return Err(PaletteError::InvalidArgument(
            "color count must be a positive integer".into(),
        ));
    }
    if pixels.is_empty() {
        return Err(PaletteError::InvalidArgument("image contains no pixels".into()));
    }

    let total = pixels.len() as u64;
    let colors = histogram(pixels);
    debug!(pixels = total, distinct = colors.len(), k, "built color histogram");

    if colors.len() <= k {
        return Ok(Palette::from_counts(colors, total));
    }

    let clusters = kmeans(&colors, k, options);
    Ok(Palette::from_counts(
        clusters.iter().map(|c| (c.color(), c.population)),
        total,
    ))
}

// ------------------------------------------------------------
// Histogram
// ------------------------------------------------------------

/// Distinct colors with their pixel counts, in order of first appearance.
fn histogram(pixels: &[Srgb<u8>]) -> Vec<(Srgb<u8>, u64)> {
    let mut index: HashMap<(u8, u8, u8), usize> = HashMap::new();
    let mut colors: Vec<(Srgb<u8>, u64)> = Vec::new();

    for &pixel in pixels {
        let key = pixel.into_components();
        match index.get(&key) {
            Some(&i) => colors[i].1 += 1,
            None => {
                index.insert(key, colors.len());
                colors.push((pixel, 1));
            }
        }
    }

    colors
}

// ------------------------------------------------------------
// Seeding
// ------------------------------------------------------------

/// Pick `k` starting centroids without any randomness.
///
/// Distinct colors are ranked by pixel count (ties keep first-appearance
/// order) and `k` of them are taken at evenly spaced ranks, so the most
/// common color always seeds a cluster and the rest are spread across the
/// popularity range. Requires `colors.len() >= k`, which keeps every seed
/// distinct.
fn seeds(colors: &[(Srgb<u8>, u64)], k: usize) -> Vec<Cluster> {
    let mut by_count: Vec<&(Srgb<u8>, u64)> = colors.iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1));

    let n = by_count.len();
    (0..k).map(|i| Cluster::seed(by_count[seed_rank(i, n, k)].0)).collect()
}

/// `i * n / k` computed in 64 bits; `usize` is only 32 bits on wasm32.
fn seed_rank(i: usize, n: usize, k: usize) -> usize {
    (i as u64 * n as u64 / k as u64) as usize
}

// ------------------------------------------------------------
// Lloyd iterations
// ------------------------------------------------------------

/// Requires `colors.len() > k`.
fn kmeans(colors: &[(Srgb<u8>, u64)], k: usize, options: &QuantizeOptions) -> Vec<Cluster> {
    let points: Vec<(Srgb<f32>, u64)> = colors
        .iter()
        .map(|&(color, count)| (color.into_format(), count))
        .collect();
    refine(&points, seeds(colors, k), options)
}

/// Lloyd iterations over weighted points.
///
/// Each pass assigns every point to its nearest centroid, then moves each
/// centroid to the count-weighted mean of its points. A cluster that ends a
/// pass with no points is dropped instead of re-seeded. Stops once no
/// centroid moves by `options.tolerance` or more, or after
/// `options.max_iterations` passes. At least one pass always runs so every
/// returned cluster has a population.
fn refine(points: &[(Srgb<f32>, u64)], mut clusters: Vec<Cluster>, options: &QuantizeOptions) -> Vec<Cluster> {
    for iteration in 0..options.max_iterations.max(1) {
        let mut sums = vec![[0f64; 3]; clusters.len()];
        let mut populations = vec![0u64; clusters.len()];

        for &(point, count) in points {
            let nearest = nearest_cluster(&clusters, point);
            let weight = count as f64;
            sums[nearest][0] += point.red as f64 * weight;
            sums[nearest][1] += point.green as f64 * weight;
            sums[nearest][2] += point.blue as f64 * weight;
            populations[nearest] += count;
        }

        let before = clusters.len();
        let mut max_shift = 0f32;
        let mut next = Vec::with_capacity(before);
        for ((cluster, sum), population) in clusters.iter().zip(&sums).zip(&populations) {
            if *population == 0 {
                continue;
            }
            let n = *population as f64;
            let centroid = Srgb::new(
                (sum[0] / n) as f32,
                (sum[1] / n) as f32,
                (sum[2] / n) as f32,
            );
            max_shift = max_shift.max(distance_squared(cluster.centroid, centroid).sqrt());
            next.push(Cluster {
                centroid,
                population: *population,
            });
        }
        clusters = next;

        if clusters.len() < before {
            debug!(iteration, dropped = before - clusters.len(), "dropped empty clusters");
        }
        if max_shift < options.tolerance {
            debug!(iteration, "k-means converged");
            break;
        }
    }

    clusters
}

/// Index of the closest centroid. Ties go to the lower index.
fn nearest_cluster(clusters: &[Cluster], point: Srgb<f32>) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, cluster) in clusters.iter().enumerate() {
        let d = distance_squared(cluster.centroid, point);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn distance_squared(a: Srgb<f32>, b: Srgb<f32>) -> f32 {
    let dr = a.red - b.red;
    let dg = a.green - b.green;
    let db = a.blue - b.blue;
    dr * dr + dg * dg + db * db
}
