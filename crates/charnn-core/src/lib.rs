pub mod config;
pub mod error;
pub mod gru;
pub mod model;

pub use config::ModelConfig;
pub use error::{ModelError, Result};
pub use model::{CharModel, CharRnn, HiddenState, ParamSnapshot};
