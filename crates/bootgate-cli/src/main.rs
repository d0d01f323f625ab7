//! bootgate - boot-test pull requests on real hardware
//!
//! Intended to run as a CI job for every pull request. If the pull request
//! carries the required label, `bootgate` packs a gokrazy image, boots it
//! on a bootery, publishes the boot log as a gist and reports back on the
//! pull request. Pull requests without the label exit successfully.
//!
//! CI identity (user, token, slug, pull request number) is read from flags
//! or the environment.

use anyhow::{Context, Result};
use bootery_client::{BooteryClient, GokrPacker, PackerConfig};
use bootgate_ci::github::DEFAULT_API_URL;
use bootgate_ci::{
    init_tracing, BootPipeline, GitHubClient, GitHubConfig, PipelineConfig, PipelineOutcome,
    PullRequestRef,
};
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "bootgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Boot-test pull requests on real hardware", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// /testboot URL to send boot images to
    #[arg(long, env = "BOOTERY_URL", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    bootery_url: String,

    /// Label required before the pull request is tested; removed on success
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    require_label: String,

    /// Label set on the pull request after a successful boot test
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    set_label: String,

    /// Update the bootery root file system, too (needed for kernels with loadable modules)
    #[arg(long)]
    update_root: bool,

    /// -kernel_package to pass to gokr-packer
    #[arg(long, default_value = "github.com/gokrazy/kernel")]
    kernel_package: String,

    /// -firmware_package to pass to gokr-packer
    #[arg(long, default_value = "github.com/gokrazy/firmware")]
    firmware_package: String,

    /// -serial_console to pass to gokr-packer
    #[arg(long, default_value = "serial0,115200")]
    serial_console: String,

    /// gokr-packer executable
    #[arg(long, default_value = "gokr-packer")]
    packer: String,

    /// GitHub user the token belongs to
    #[arg(long, env = "GITHUB_USER", value_parser = NonEmptyStringValueParser::new())]
    github_user: String,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    github_token: String,

    /// owner/repo of the repository under test
    #[arg(long, env = "GITHUB_REPOSITORY")]
    slug: String,

    /// Pull request number
    #[arg(long, env = "PULL_REQUEST")]
    pull_request: String,

    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    github_api_url: String,

    /// Per-request timeout for bootery uploads in seconds (0 = no timeout)
    #[arg(long, default_value_t = 0)]
    http_timeout_secs: u64,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let pull_request = PullRequestRef::parse(&self.slug, &self.pull_request)?;
        let config = PipelineConfig {
            pull_request,
            require_label: self.require_label.clone(),
            set_label: self.set_label.clone(),
            bootery_url: self.bootery_url.clone(),
            update_root: self.update_root,
        };
        config.validate()?;
        Ok(config)
    }

    fn github_config(&self) -> GitHubConfig {
        GitHubConfig::new(&self.github_user, &self.github_token).with_api_url(&self.github_api_url)
    }

    fn packer_config(&self) -> PackerConfig {
        PackerConfig {
            program: self.packer.clone(),
            kernel_package: self.kernel_package.clone(),
            firmware_package: self.firmware_package.clone(),
            serial_console: self.serial_console.clone(),
        }
    }

    fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let config = cli.pipeline_config().context("Invalid configuration")?;
    let github = GitHubClient::new(cli.github_config()).context("Failed to create GitHub client")?;
    let bootery =
        BooteryClient::new(cli.http_timeout()).context("Failed to create bootery client")?;
    let packer = GokrPacker::new(cli.packer_config());

    info!(pr = %config.pull_request, "bootgate {}", env!("CARGO_PKG_VERSION"));

    let pipeline = BootPipeline::new(config, Arc::new(github), Arc::new(packer), bootery);
    let outcome = pipeline.run().await;

    match &outcome {
        PipelineOutcome::Skipped { label } => {
            info!(label = %label, "Pull request not labeled for boot testing")
        }
        PipelineOutcome::Succeeded { log_url } => info!(log_url = %log_url, "Done"),
        // Already logged with the redacted reason.
        PipelineOutcome::Failed { .. } => {}
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
