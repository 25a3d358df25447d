//! In-memory registry of spawned child processes.
//!
//! Launches child processes, hands out a stable identifier for each, and
//! lets callers read their output in bounded chunks under a cancellation
//! scope, wait for their full output, check liveness, kill them and list
//! them.
//!
//! # Usage
//!
//! ```rust
//! use execreg::ProcessRegistry;
//!
//! #[tokio::main]
//! async fn main() -> execreg::prelude::Result<()> {
//!     let registry = ProcessRegistry::new("shell");
//!     let id = registry.spawn("sh", ["-c", "printf hello"], "")?;
//!
//!     let output = registry.wait_output(id).await?;
//!     assert_eq!(output.stdout, b"hello");
//!     assert!(output.stderr.is_empty());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handle;
pub mod info;
pub mod output;
pub mod prelude;
pub mod registry;

pub use execreg_config::RegistryConfig;
pub use execreg_io::scope::Scope;
pub use handle::{ProcessHandle, Stream};
pub use info::ProcessInfo;
pub use output::{StreamEnd, WaitOutput};
pub use registry::ProcessRegistry;
