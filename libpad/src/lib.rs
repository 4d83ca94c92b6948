//! Runner for live charting snippets
mod error;

pub mod canvas;
pub mod chart;
pub mod config;
pub mod dom;
pub mod env;
pub mod examples;
pub mod exec;
pub mod generate;
pub mod legend;
pub mod playground;
pub mod router;
pub mod session;
pub mod value;

pub use config::Config;
pub use dom::{Document, Node};
pub use env::Environment;
pub use error::Error;
pub use examples::{Example, ExampleSource, LoadError};
pub use exec::{ExecutionResult, Executor, RunId};
pub use playground::{PlaygroundHandle, Snapshot};
pub use router::{Router, RunStatus};
pub use session::Session;
pub use value::{Extern, Interp, Promise, Val};

pub type Result<T> = std::result::Result<T, Error>;
