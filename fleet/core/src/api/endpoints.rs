//! API endpoint paths

/// Resource paths relative to the API base
pub mod paths {
    use reqwest::Url;

    /// Code-server instances
    pub const CODE_SERVER: &str = "/code-server";
    /// Stored credentials
    pub const CREDENTIALS: &str = "/credentials";
    /// Docker scripts
    pub const DOCKER_SCRIPTS: &str = "/docker-scripts";
    /// Images built from Docker scripts
    pub const DOCKER_IMAGES: &str = "/docker-scripts/images";
    /// Template scripts
    pub const TEMPLATE_SCRIPTS: &str = "/templates";
    /// Health check
    pub const HEALTH: &str = "/health";

    /// Percent-encode `segment` so it stays one path segment
    ///
    /// `/`, `?`, `#`, `%` and spaces are escaped.
    #[must_use]
    pub fn encode_segment(segment: &str) -> String {
        let Ok(mut scratch) = Url::parse("http://segment.invalid/") else {
            return segment.to_string();
        };
        if let Ok(mut segments) = scratch.path_segments_mut() {
            segments.clear().push(segment);
        }
        scratch.path().trim_start_matches('/').to_string()
    }

    /// `<collection>/<id>`
    #[must_use]
    pub fn item(collection: &str, id: &str) -> String {
        format!("{collection}/{}", encode_segment(id))
    }

    /// Streamed build log of a Docker script
    #[must_use]
    pub fn build_image(script_id: &str) -> String {
        format!("{DOCKER_SCRIPTS}/{}/build-image", encode_segment(script_id))
    }
}

/// Resolves API paths against a base URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Endpoints under `base` (a trailing `/` is ignored)
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL for `path`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }

    /// Absolute URL of a script's build log stream
    #[must_use]
    pub fn build_image(&self, script_id: &str) -> String {
        self.url(&paths::build_image(script_id))
    }
}
