//! Distance metrics.
//!
//! Every metric here is expressed as a *distance*: lower means closer. Search
//! results are always ranked ascending, whichever metric a collection uses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric a collection ranks its vectors by.
///
/// The metric is fixed when a collection is created and stored with it, so the
/// vectors written at ingestion and the queries issued later are always compared
/// the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean (L2) distance. Range `[0, inf)`.
    #[default]
    Euclidean,

    /// Cosine distance, `1 - cos(a, b)`. Range `[0, 2]`.
    ///
    /// A zero-length vector is treated as orthogonal to everything.
    Cosine,

    /// Negated inner product. Lower (more negative) means more aligned.
    DotProduct,

    /// Manhattan (L1) distance. Range `[0, inf)`.
    Manhattan,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::DotProduct => -dot(a, b),
            DistanceMetric::Manhattan => manhattan(a, b),
        }
    }

    /// Canonical lowercase name, as written to disk and config files.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Manhattan => "manhattan",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "dot_product" | "dot" | "inner_product" | "ip" => Ok(DistanceMetric::DotProduct),
            "manhattan" | "l1" => Ok(DistanceMetric::Manhattan),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

#[inline]
fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[inline]
fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut ab, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        ab += x * y;
        aa += x * x;
        bb += y * y;
    }

    let denom = (aa * bb).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        ab / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_default_is_euclidean() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Euclidean);
    }

    #[test]
    fn test_euclidean() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!(close(d, 5.0));
        assert!(close(DistanceMetric::Euclidean.distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0));
    }

    #[test]
    fn test_cosine() {
        assert!(close(DistanceMetric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]), 0.0));
        assert!(close(DistanceMetric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0));
        assert!(close(DistanceMetric::Cosine.distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0));
        assert!(close(DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0));
    }

    #[test]
    fn test_dot_product_ranks_aligned_first() {
        let q = [1.0, 2.0, 3.0];
        let near = DistanceMetric::DotProduct.distance(&q, &[4.0, 5.0, 6.0]);
        let far = DistanceMetric::DotProduct.distance(&q, &[-1.0, 0.0, 0.0]);
        assert!(close(near, -32.0));
        assert!(near < far);
    }

    #[test]
    fn test_manhattan() {
        let d = DistanceMetric::Manhattan.distance(&[0.0, 0.0, 0.0], &[1.0, -2.0, 3.0]);
        assert!(close(d, 6.0));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("COSINE".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("ip".parse::<DistanceMetric>().unwrap(), DistanceMetric::DotProduct);
        assert_eq!("l1".parse::<DistanceMetric>().unwrap(), DistanceMetric::Manhattan);
        assert!("hamming".parse::<DistanceMetric>().is_err());

        for metric in [
            DistanceMetric::Euclidean,
            DistanceMetric::Cosine,
            DistanceMetric::DotProduct,
            DistanceMetric::Manhattan,
        ] {
            assert_eq!(metric.to_string().parse::<DistanceMetric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DistanceMetric::DotProduct).unwrap();
        assert_eq!(json, "\"dot_product\"");
    }
}
