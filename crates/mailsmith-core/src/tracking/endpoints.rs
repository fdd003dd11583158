//! Open and click tracking endpoints.
//!
//! [`Tracker`] holds the request handling for the two tracking routes. It
//! is framework agnostic: the host application routes requests to
//! [`Tracker::ping`] and [`Tracker::jump`] and turns the results into HTTP
//! responses.

use std::fmt;

use url::form_urlencoded;

use crate::config::TrackingConfig;

/// Placeholder for the hash in the ping route.
const HASH_PLACEHOLDER: &str = "@hash";

/// A transparent 1x1 PNG.
pub const PIXEL_PNG: [u8; 111] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x03, 0x00, 0x00, 0x00, 0x25, 0xdb, 0x56,
    0xca, 0x00, 0x00, 0x00, 0x04, 0x67, 0x41, 0x4d, 0x41, 0x00, 0x00, 0xb1, 0x8f, 0x0b, 0xfc, 0x61,
    0x05, 0x00, 0x00, 0x00, 0x03, 0x50, 0x4c, 0x54, 0x45, 0x00, 0x00, 0x00, 0xa7, 0x7a, 0x3d, 0xda,
    0x00, 0x00, 0x00, 0x01, 0x74, 0x52, 0x4e, 0x53, 0x00, 0x40, 0xe6, 0xd8, 0x66, 0x00, 0x00, 0x00,
    0x0a, 0x49, 0x44, 0x41, 0x54, 0x08, 0xd7, 0x63, 0x60, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0xe2,
    0x21, 0xbc, 0x33, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Response to a beacon request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    /// Value for the `Content-Type` response header.
    pub content_type: &'static str,
    /// Response body.
    pub body: &'static [u8],
}

impl PingResponse {
    const fn pixel() -> Self {
        Self {
            content_type: "image/png",
            body: &PIXEL_PNG,
        }
    }
}

type PingHook = Box<dyn Fn(&str) + Send + Sync>;
type JumpHook = Box<dyn Fn(&str, &[(String, String)]) + Send + Sync>;

/// Handler for the open and click tracking routes.
pub struct Tracker {
    config: TrackingConfig,
    on_ping: Option<PingHook>,
    on_jump: Option<JumpHook>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.config)
            .field("on_ping", &self.on_ping.is_some())
            .field("on_jump", &self.on_jump.is_some())
            .finish()
    }
}

impl Tracker {
    /// Creates a tracker without hooks.
    #[must_use]
    pub const fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            on_ping: None,
            on_jump: None,
        }
    }

    /// Sets the hook called with the hash of every beacon hit.
    #[must_use]
    pub fn on_ping(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_ping = Some(Box::new(hook));
        self
    }

    /// Sets the hook called with the target and all query parameters of
    /// every jump.
    #[must_use]
    pub fn on_jump(mut self, hook: impl Fn(&str, &[(String, String)]) + Send + Sync + 'static) -> Self {
        self.on_jump = Some(Box::new(hook));
        self
    }

    /// Returns the tracking configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Absolute URL of the beacon for `hash`, for embedding in HTML.
    #[must_use]
    pub fn ping_url(&self, hash: &str) -> String {
        self.config.ping_url(hash)
    }

    /// Absolute URL of the jump endpoint.
    #[must_use]
    pub fn jump_url(&self) -> String {
        self.config.jump_url()
    }

    /// Handles a request to the beacon route.
    ///
    /// `path` is the request path relative to the base URL, e.g.
    /// `/mailer-ping/abc123.png`. Returns `None` if it does not match the
    /// ping route.
    #[must_use]
    pub fn ping(&self, path: &str) -> Option<PingResponse> {
        let hash = self.match_ping_route(path)?;
        tracing::debug!(hash, "tracking pixel requested");

        if let Some(hook) = &self.on_ping {
            hook(hash);
        }
        Some(PingResponse::pixel())
    }

    /// Handles a request to the jump route.
    ///
    /// `query` is the raw query string, with or without the leading `?`.
    /// Returns the decoded redirect target, or `None` if the query has no
    /// non-empty `target` parameter.
    #[must_use]
    pub fn jump(&self, query: &str) -> Option<String> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let target = params
            .iter()
            .find(|(key, _)| key == "target")
            .map(|(_, value)| value.clone())
            .filter(|target| !target.is_empty());

        let Some(target) = target else {
            tracing::debug!(query, "jump request without target");
            return None;
        };
        tracing::debug!(target = %target, "redirecting tracked link");

        if let Some(hook) = &self.on_jump {
            hook(&target, &params);
        }
        Some(target)
    }

    fn match_ping_route<'a>(&self, path: &'a str) -> Option<&'a str> {
        let (prefix, suffix) = self.config.ping_route.split_once(HASH_PLACEHOLDER)?;
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let hash = path.strip_prefix(prefix)?.strip_suffix(suffix)?;

        if hash.is_empty() || hash.contains('/') {
            return None;
        }
        Some(hash)
    }
}
