//! Destination URLs.
//!
//! The URL a file is published to is part of its digest, so it must be
//! rendered identically on every run. It is never dialed by this crate.

/// Region name that maps to the global endpoint.
pub const US_STANDARD: &str = "us-standard";

/// Where a bucket lives, as far as URL rendering is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    region: Option<String>,
    secure: bool,
}

impl Endpoint {
    /// Create an endpoint. `us-standard` and empty regions use the global host.
    pub fn new(region: Option<&str>, secure: bool) -> Self {
        let region = region
            .filter(|r| !r.is_empty() && *r != US_STANDARD)
            .map(String::from);
        Self { region, secure }
    }

    /// The region, if one selects a regional host.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Host name, e.g. `s3-eu-west-1.amazonaws.com`.
    pub fn host(&self) -> String {
        match &self.region {
            Some(region) => format!("s3-{}.amazonaws.com", region),
            None => "s3.amazonaws.com".to_string(),
        }
    }

    /// Full URL of an object in path style.
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}://{}/{}/{}", self.scheme(), self.host(), bucket, key)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_endpoint() {
        let endpoint = Endpoint::default();
        assert_eq!(
            endpoint.object_url("site", "css/app.css"),
            "https://s3.amazonaws.com/site/css/app.css"
        );
    }

    #[test]
    fn test_regional_endpoint() {
        let endpoint = Endpoint::new(Some("eu-west-1"), true);
        assert_eq!(endpoint.region(), Some("eu-west-1"));
        assert_eq!(
            endpoint.object_url("site", "index.html"),
            "https://s3-eu-west-1.amazonaws.com/site/index.html"
        );
    }

    #[test]
    fn test_us_standard_is_global() {
        let endpoint = Endpoint::new(Some(US_STANDARD), false);
        assert_eq!(endpoint.region(), None);
        assert_eq!(endpoint.object_url("b", "k"), "http://s3.amazonaws.com/b/k");
    }
}
