//! Prediction and inference
//!
//! Matchup and game predictions from a trained model and the event history.

pub mod inference;

pub use inference::{format_matchup, format_prediction, Predictor, NEUTRAL_PROBABILITY};
