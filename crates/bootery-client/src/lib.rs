//! bootery-client: image packing and bootery streaming for bootgate
//!
//! This crate talks to the two external systems that produce and consume
//! boot images:
//!
//! - `packer`: runs `gokr-packer` and owns the resulting temp images
//! - `stream`: streams an image to a bootery and returns the boot log
//!
//! Nothing here retries. A failed build or upload is reported once and the
//! caller decides what to do with it.

pub mod error;
pub mod packer;
pub mod stream;

pub use error::BooteryError;
pub use packer::{GokrPacker, ImageBuilder, ImagePair, PackerConfig};
pub use stream::{boot_test_url, update_root_url, BooteryClient, BooteryRequest};

/// Result type for bootery-client operations
pub type Result<T> = std::result::Result<T, BooteryError>;
