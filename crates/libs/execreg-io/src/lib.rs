//! Process execution primitives for execreg.
//!
//! Provides utilities for spawning child processes with all three standard
//! streams piped, cancellation scopes that bound how long a read may block,
//! and a single bounded read that races the stream against its scope.
//!
//! # Usage
//!
//! ```rust
//! use execreg_io::{process::spawn_process, reader::read_chunk, scope::Scope};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut child = spawn_process("echo", vec!["Hello".to_string()], None).unwrap();
//!     let mut stdout = child.stdout.take().unwrap();
//!     let scope = Scope::with_timeout(Duration::from_secs(5));
//!
//!     let chunk = read_chunk(&mut stdout, &scope, 200).await.unwrap();
//!     assert_eq!(chunk, b"Hello\n");
//! }
//! ```

pub mod error;
pub mod prelude;
pub mod process;
pub mod reader;
pub mod scope;
