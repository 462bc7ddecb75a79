//! Universe classification into constraint buckets.

use hobart_data::FundamentalsMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Broad ETFs and SPDR sector funds.
pub const DEFAULT_ETFS: &[&str] = &[
    "SPY", "QQQ", "IVV", "VOO", "VTI", "IWM", "DIA", "XLF", "XLK", "XLY", "XLC", "XLE", "XLV",
    "XLI", "XLB", "XLRE", "XLU",
];

/// Constraint bucket a ticker can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UniverseBucket {
    /// Market cap below the small-cap ceiling
    SmallCap,
    /// Market cap above the large-cap floor
    LargeCap,
    /// Listed exchange-traded fund
    #[serde(rename = "ETF")]
    Etf,
}

impl UniverseBucket {
    /// Every bucket, in display order.
    pub const ALL: [Self; 3] = [Self::SmallCap, Self::LargeCap, Self::Etf];
}

impl fmt::Display for UniverseBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallCap => write!(f, "SmallCap"),
            Self::LargeCap => write!(f, "LargeCap"),
            Self::Etf => write!(f, "ETF"),
        }
    }
}

/// Configuration for the universe classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Market caps strictly below this are small caps (default: 2e9)
    pub small_cap_ceiling: f64,
    /// Market caps strictly above this are large caps (default: 10e9)
    pub large_cap_floor: f64,
    /// Tickers always classified as ETFs
    pub etf_tickers: BTreeSet<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            small_cap_ceiling: 2e9,
            large_cap_floor: 10e9,
            etf_tickers: DEFAULT_ETFS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Three disjoint ticker sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseBuckets {
    /// Small caps
    pub small_caps: BTreeSet<String>,
    /// Large caps
    pub large_caps: BTreeSet<String>,
    /// ETFs
    pub etfs: BTreeSet<String>,
}

impl UniverseBuckets {
    /// Members of one bucket.
    pub const fn members(&self, bucket: UniverseBucket) -> &BTreeSet<String> {
        match bucket {
            UniverseBucket::SmallCap => &self.small_caps,
            UniverseBucket::LargeCap => &self.large_caps,
            UniverseBucket::Etf => &self.etfs,
        }
    }

    /// Every classified ticker, bucket by bucket.
    pub fn tickers(&self) -> Vec<String> {
        UniverseBucket::ALL
            .into_iter()
            .flat_map(|b| self.members(b).iter().cloned())
            .collect()
    }

    /// Bucket a ticker belongs to, if any.
    pub fn bucket_of(&self, ticker: &str) -> Option<UniverseBucket> {
        UniverseBucket::ALL
            .into_iter()
            .find(|b| self.members(*b).contains(ticker))
    }
}

/// Partitions a universe into buckets from fundamentals.
#[derive(Debug, Clone, Default)]
pub struct UniverseClassifier {
    config: ClassifierConfig,
}

impl UniverseClassifier {
    /// Create a classifier.
    pub const fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classifier with default thresholds and the given ETF list.
    pub fn with_etfs<I, S>(etfs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ClassifierConfig {
            etf_tickers: etfs.into_iter().map(Into::into).collect(),
            ..Default::default()
        })
    }

    /// Current configuration.
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Bucket for one ticker.
    ///
    /// Market caps between the thresholds, or unknown, yield `None`.
    pub fn bucket(&self, ticker: &str, market_cap: Option<f64>) -> Option<UniverseBucket> {
        if self.config.etf_tickers.contains(ticker) {
            return Some(UniverseBucket::Etf);
        }
        match market_cap {
            Some(cap) if cap < self.config.small_cap_ceiling => Some(UniverseBucket::SmallCap),
            Some(cap) if cap > self.config.large_cap_floor => Some(UniverseBucket::LargeCap),
            _ => None,
        }
    }

    /// Classify every ticker in the fundamentals map.
    pub fn classify(&self, fundamentals: &FundamentalsMap) -> UniverseBuckets {
        let mut buckets = UniverseBuckets::default();
        for (ticker, f) in fundamentals {
            let set = match self.bucket(ticker, f.known_market_cap()) {
                Some(UniverseBucket::SmallCap) => &mut buckets.small_caps,
                Some(UniverseBucket::LargeCap) => &mut buckets.large_caps,
                Some(UniverseBucket::Etf) => &mut buckets.etfs,
                None => continue,
            };
            set.insert(ticker.clone());
        }
        tracing::debug!(
            small = buckets.small_caps.len(),
            large = buckets.large_caps.len(),
            etf = buckets.etfs.len(),
            "classified universe"
        );
        buckets
    }
}
