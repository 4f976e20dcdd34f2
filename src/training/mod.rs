//! Model training
//!
//! Seeded splits, forest fitting, grid search, evaluation and backtesting.

pub mod backtest;
pub mod metrics;
pub mod search;
pub mod split;
pub mod trainer;

pub use backtest::{backtest, BacktestReport};
pub use metrics::{ClassificationReport, Evaluation};
pub use search::{grid_search, SearchResult};
pub use split::TrainTestSplit;
pub use trainer::{ModelTrainer, TrainingOutcome};
