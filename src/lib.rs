//! MiniSpark — an in-process, multi-threaded, lazy partitioned-dataset
//! engine: build a DAG of sources and transforms, then trigger it with
//! an action that fans tasks out across a worker pool and blocks until
//! every output partition is materialized.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod kernels;
pub mod latch;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod rdd;
pub mod seq;
pub mod task;
pub mod types;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use rdd::Dataset;
pub use types::{context, downcast_ref, element, Context, Element, MapInput};
