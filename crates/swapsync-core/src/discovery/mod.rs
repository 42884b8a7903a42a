//! Model file discovery and key derivation.
//!
//! - `path` - validation of relative artifact paths
//! - `scanner` - recursive directory walk
//! - `shards` - split GGUF handling
//! - `key` - bounded, collision-checked model keys

pub mod key;
pub mod path;
pub mod scanner;
pub mod shards;

pub use key::{KeyGenerator, ModelKey};
pub use path::{validate, ArtifactPath};
pub use scanner::{ModelDiscovery, ScanResult};
