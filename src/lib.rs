pub mod backend;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keyboard;
pub mod model;
pub mod planner;
pub mod sim;
pub mod timing;
pub mod trace;

pub use config::{Preset, TypingConfig};
pub use dispatch::{CancelToken, DispatchOutcome, Dispatcher, KeySink};
pub use engine::run;
pub use error::{ConfigError, DispatchError, TypistError};
