pub mod metrics;
pub mod predictor;
pub mod providers;

pub use metrics::{get_metrics, init_metrics};
pub use predictor::{PredictionError, Predictor, PredictorSettings};
