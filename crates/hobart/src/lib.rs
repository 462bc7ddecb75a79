#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod backtest;
pub mod config;
pub mod error;
pub mod live;
pub mod paper;
pub mod pipeline;

// Re-export main types from sub-crates
pub use hobart_data as data;
pub use hobart_factors as factors;
pub use hobart_output as output;
pub use hobart_portfolio as portfolio;
pub use hobart_risk as risk;

pub use backtest::{Backtest, BacktestRun, BacktestSnapshot, allocation_table, summarize};
pub use config::{BacktestConfig, HobartConfig, RebalanceConfig};
pub use error::{HobartError, Result};
pub use live::{RebalanceReport, Rebalancer};
pub use paper::PaperAccount;
pub use pipeline::{CycleOutcome, Pipeline, Targets};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
