//! Photo classification: tensor encoding and the inference runner.

mod decode;
mod preprocessing;
mod runner;

pub use decode::OutputDecoder;
pub use preprocessing::TensorEncoder;
pub use runner::{Classifier, ModelHandle};
