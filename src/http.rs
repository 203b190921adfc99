// Request/response types shared by the store, the strategies, and the server.

use bytes::Bytes;
use url::Url;

/// Declared destination of an intercepted request, taken from the
/// `Sec-Fetch-Dest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Other,
}

impl Destination {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("document") => Destination::Document,
            Some("image") => Destination::Image,
            _ => Destination::Other,
        }
    }
}

/// An intercepted request, reduced to what classification and cache
/// keying need.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl ProxyRequest {
    pub fn get(url: Url, destination: Destination) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            destination,
        }
    }
}

/// A response as fetched from the network or served from a cache
/// generation.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxyResponse {
    /// Exactly HTTP 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Any success-range status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse(Some("document")), Destination::Document);
        assert_eq!(Destination::parse(Some("image")), Destination::Image);
        assert_eq!(Destination::parse(Some("script")), Destination::Other);
        assert_eq!(Destination::parse(None), Destination::Other);
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let response = ProxyResponse {
            status: 200,
            headers: vec![("CONTENT-TYPE".to_string(), "text/html".to_string())],
            body: Bytes::new(),
        };
        assert_eq!(response.content_type(), Some("text/html"));
        assert!(response.is_ok());
        assert!(response.is_success());
    }
}
