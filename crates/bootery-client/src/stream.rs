//! Bootery streaming client
//!
//! Uploads an image file to a bootery with a single streaming PUT and
//! returns the response body, which is the console log of the boot.
//!
//! Wire format:
//!
//! ```text
//! PUT <url>?slug=<owner/repo>[&boot-newer=<unix seconds>]
//! Content-Type: application/octet-stream
//!
//! <raw image bytes>
//! ```

use crate::error::BooteryError;
use crate::Result;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, StatusCode, Url};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Path suffix of the boot-test endpoint.
pub const TESTBOOT_SUFFIX: &str = "/testboot";

/// Path suffix of the root-update endpoint.
pub const UPDATEROOT_SUFFIX: &str = "/updateroot";

const SLUG_PARAM: &str = "slug";
const BOOT_NEWER_PARAM: &str = "boot-newer";

/// Sibling root-update endpoint of a `/testboot` URL.
///
/// The last path segment is swapped; query and credentials stay as they are.
pub fn update_root_url(bootery_url: &str) -> String {
    let testboot = &TESTBOOT_SUFFIX[1..];
    let updateroot = &UPDATEROOT_SUFFIX[1..];

    if let Ok(mut url) = Url::parse(bootery_url) {
        let ends_in_testboot =
            url.path_segments().and_then(|mut s| s.next_back()) == Some(testboot);
        let swapped = match url.path_segments_mut() {
            Ok(mut segments) => {
                if ends_in_testboot {
                    segments.pop();
                } else {
                    segments.pop_if_empty();
                }
                segments.push(updateroot);
                true
            }
            Err(()) => false,
        };
        if swapped {
            return url.into();
        }
    }

    // Unparseable; streaming reports it as an invalid URL later.
    let base = bootery_url
        .strip_suffix(TESTBOOT_SUFFIX)
        .unwrap_or(bootery_url);
    format!("{}{}", base, UPDATEROOT_SUFFIX)
}

/// Boot-test URL carrying the `update_root` flag.
pub fn boot_test_url(bootery_url: &str, update_root: bool) -> Result<String> {
    let mut url = parse_url(bootery_url)?;
    url.query_pairs_mut()
        .append_pair("update_root", if update_root { "true" } else { "false" });
    Ok(url.into())
}

fn parse_url(raw: &str) -> Result<Url> {
    // The parse error never echoes the input, so the URL cannot leak here.
    Url::parse(raw).map_err(|e| BooteryError::InvalidUrl(e.to_string()))
}

/// One streaming upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooteryRequest {
    /// Endpoint, possibly with query parameters of its own.
    pub target_url: String,

    /// `owner/repo` of the code under test.
    pub slug: String,

    /// Only boot builds newer than this Unix timestamp.
    pub newer_than: Option<i64>,
}

impl BooteryRequest {
    /// Request for booting an image that must be newer than `newer_than`.
    pub fn boot_test(target_url: &str, slug: &str, newer_than: i64) -> Self {
        BooteryRequest {
            target_url: target_url.to_string(),
            slug: slug.to_string(),
            newer_than: Some(newer_than),
        }
    }

    /// Request for replacing the bootery root file system.
    pub fn root_update(target_url: &str, slug: &str) -> Self {
        BooteryRequest {
            target_url: target_url.to_string(),
            slug: slug.to_string(),
            newer_than: None,
        }
    }

    /// Final request URL.
    ///
    /// Query pairs already present on `target_url` are kept; `slug` and
    /// `boot-newer` replace any existing values.
    pub fn url(&self) -> Result<Url> {
        let mut url = parse_url(&self.target_url)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != SLUG_PARAM && k != BOOT_NEWER_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.extend_pairs(kept);
            query.append_pair(SLUG_PARAM, &self.slug);
            if let Some(newer) = self.newer_than {
                query.append_pair(BOOT_NEWER_PARAM, &newer.to_string());
            }
        }

        Ok(url)
    }
}

/// HTTP client for a bootery.
#[derive(Debug, Clone)]
pub struct BooteryClient {
    http: reqwest::Client,
}

impl BooteryClient {
    /// Create a client. `timeout` bounds each whole request; `None` keeps
    /// the transport defaults.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("bootgate/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(BooteryClient {
            http: builder.build()?,
        })
    }

    /// Stream `image` to the bootery and return the response body.
    ///
    /// Exactly one attempt is made; retry policy belongs to the caller.
    pub async fn stream(&self, image: &Path, request: &BooteryRequest) -> Result<String> {
        let url = request.url()?;

        let file = tokio::fs::File::open(image).await?;
        let len = file.metadata().await?.len();
        debug!(image = %image.display(), bytes = len, "streaming image");

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, len)
            .body(Body::from(file))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(BooteryError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Boot `boot_image` and return its console log.
    pub async fn test_boot(
        &self,
        boot_image: &Path,
        bootery_url: &str,
        slug: &str,
        newer_than: i64,
    ) -> Result<String> {
        info!("Testing boot file system");
        self.stream(
            boot_image,
            &BooteryRequest::boot_test(bootery_url, slug, newer_than),
        )
        .await
    }

    /// Replace the bootery root file system with `root_image`.
    pub async fn update_root(
        &self,
        root_image: &Path,
        bootery_url: &str,
        slug: &str,
    ) -> Result<String> {
        info!("Updating root file system");
        self.stream(
            root_image,
            &BooteryRequest::root_update(&update_root_url(bootery_url), slug),
        )
        .await
    }
}
