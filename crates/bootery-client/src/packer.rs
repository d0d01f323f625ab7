//! gokrazy image packing.
//!
//! Runs `gokr-packer` to produce a boot and a root file system image in
//! two temporary files. The files belong to the returned [`ImagePair`] and
//! are removed when it is dropped, whether or not the run succeeds.

use crate::error::BooteryError;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info};

/// Hostname baked into test images.
pub const HOSTNAME: &str = "bakery";

/// Packages embedded into every test image, in packer argument order.
pub const APPLICATION_PACKAGES: [&str; 4] = [
    "github.com/gokrazy/breakglass",
    "github.com/gokrazy/bakery/cmd/bake",
    "github.com/gokrazy/timestamps",
    "github.com/gokrazy/wifi",
];

/// Boot and root file system images of one run.
#[derive(Debug)]
pub struct ImagePair {
    boot: TempPath,
    root: TempPath,
}

impl ImagePair {
    /// Allocate two empty, uniquely named temp files.
    pub fn allocate() -> Result<Self> {
        let boot = tempfile::Builder::new()
            .prefix("gokr-boot")
            .tempfile()?
            .into_temp_path();
        let root = tempfile::Builder::new()
            .prefix("gokr-root")
            .tempfile()?
            .into_temp_path();
        Ok(ImagePair { boot, root })
    }

    pub fn boot_path(&self) -> &Path {
        &self.boot
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }
}

/// Produces the images under test.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build a fresh boot/root image pair.
    async fn build(&self) -> Result<ImagePair>;
}

/// Pass-through configuration for `gokr-packer`.
#[derive(Debug, Clone)]
pub struct PackerConfig {
    /// Packer executable (looked up in `PATH` unless absolute).
    pub program: String,

    /// `-kernel_package`
    pub kernel_package: String,

    /// `-firmware_package`
    pub firmware_package: String,

    /// `-serial_console`
    pub serial_console: String,
}

impl Default for PackerConfig {
    fn default() -> Self {
        PackerConfig {
            program: "gokr-packer".to_string(),
            kernel_package: "github.com/gokrazy/kernel".to_string(),
            firmware_package: "github.com/gokrazy/firmware".to_string(),
            serial_console: "serial0,115200".to_string(),
        }
    }
}

impl PackerConfig {
    /// Command line arguments for writing into `boot` and `root`.
    pub fn args(&self, boot: &Path, root: &Path) -> Vec<String> {
        let mut args = vec![
            format!("-hostname={}", HOSTNAME),
            format!("-overwrite_boot={}", boot.display()),
            format!("-overwrite_root={}", root.display()),
            format!("-kernel_package={}", self.kernel_package),
            format!("-firmware_package={}", self.firmware_package),
            format!("-serial_console={}", self.serial_console),
        ];
        args.extend(APPLICATION_PACKAGES.iter().map(|p| p.to_string()));
        args
    }
}

/// [`ImageBuilder`] backed by the `gokr-packer` subprocess.
pub struct GokrPacker {
    config: PackerConfig,
}

impl GokrPacker {
    pub fn new(config: PackerConfig) -> Self {
        GokrPacker { config }
    }
}

#[async_trait]
impl ImageBuilder for GokrPacker {
    async fn build(&self) -> Result<ImagePair> {
        let images = ImagePair::allocate()?;
        let args = self.config.args(images.boot_path(), images.root_path());

        info!(program = %self.config.program, "Packing boot and root images");
        debug!(?args, "packer arguments");

        // Output goes straight to our stdout/stderr so CI logs show progress.
        let status = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if !status.success() {
            return Err(BooteryError::Build {
                program: self.config.program.clone(),
                code: status.code(),
            });
        }

        Ok(images)
    }
}
