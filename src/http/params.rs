//! Ordered request parameters and URL-encoding helpers.

use crate::http::charset::Charset;
use url::form_urlencoded;

/// Ordered `name=value` pairs for query strings and URL-encoded bodies.
///
/// Duplicate names are kept; order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.pairs.push((name.into(), value.to_string()));
        self
    }

    /// Parse `a=1&b=2`. Returns `None` when any pair has no `=`.
    pub fn parse(post_data: &str) -> Option<Self> {
        let mut params = Self::new();
        for pair in post_data.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=')?;
            params.add(name.trim(), value.trim());
        }
        Some(params)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// `a=1&b=2` for a URL query. Pairs with an empty name are skipped.
    pub fn to_query_string(&self, dont_escape: bool) -> String {
        to_query_string(self.iter(), dont_escape, Charset::Utf8)
    }

    /// `a=1&b=2` for an `application/x-www-form-urlencoded` body, values
    /// encoded with `charset` before escaping.
    pub fn to_post_query_string(&self, dont_escape: bool, charset: Charset) -> String {
        to_query_string(self.iter(), dont_escape, charset)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.add(name, value);
        }
        params
    }
}

fn to_query_string<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
    dont_escape: bool,
    charset: Charset,
) -> String {
    pairs
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            if dont_escape {
                format!("{name}={value}")
            } else {
                format!("{name}={}", url_encode_bytes(&charset.encode(value)))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Form-encode a string: spaces become `+`, unsafe bytes become `%XX`.
pub fn url_encode(value: &str) -> String {
    url_encode_bytes(value.as_bytes())
}

fn url_encode_bytes(bytes: &[u8]) -> String {
    form_urlencoded::byte_serialize(bytes).collect()
}

/// Media type for a file extension (with or without the leading dot).
pub fn determine_media_type(extension: &str) -> &'static str {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    match extension.as_str() {
        "txt" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_skips_empty_names() {
        let params: RequestParams = [("a", "1"), ("", "x"), ("b", "two words")]
            .into_iter()
            .collect();
        assert_eq!(params.to_query_string(false), "a=1&b=two+words");
        assert_eq!(params.to_query_string(true), "a=1&b=two words");
    }

    #[test]
    fn test_post_query_string_uses_charset() {
        let mut params = RequestParams::new();
        params.add("q", "caf\u{e9}");
        assert_eq!(params.to_post_query_string(false, Charset::Utf8), "q=caf%C3%A9");
        assert_eq!(params.to_post_query_string(false, Charset::Latin1), "q=caf%E9");
    }

    #[test]
    fn test_parse_post_data() {
        let params = RequestParams::parse("user = bob&pass=x").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("user", "bob"), ("pass", "x")]);
        assert!(RequestParams::parse("novalue").is_none());
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode(""), "");
        assert_eq!(url_encode("a b&c"), "a+b%26c");
    }

    #[test]
    fn test_media_types() {
        assert_eq!(determine_media_type(".PNG"), "image/png");
        assert_eq!(determine_media_type("txt"), "text/plain");
        assert_eq!(determine_media_type("unknown"), "application/octet-stream");
    }
}
