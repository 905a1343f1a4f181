use serde::{Deserialize, Serialize};

/// Five-bucket star rating distribution for a place
///
/// Counts are plain non-negative integer strings (digit grouping removed).
/// A `Scores` value always has all five buckets; a partial histogram is never
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub one_star: String,
    pub two_stars: String,
    pub three_stars: String,
    pub four_stars: String,
    pub five_stars: String,
}

impl Scores {
    /// Builds a histogram from per-star counts indexed by `star - 1`
    ///
    /// Returns `None` unless every bucket is present.
    pub fn from_buckets(buckets: [Option<String>; 5]) -> Option<Self> {
        let [one, two, three, four, five] = buckets;
        Some(Self {
            one_star: one?,
            two_stars: two?,
            three_stars: three?,
            four_stars: four?,
            five_stars: five?,
        })
    }
}
