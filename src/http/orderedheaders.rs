use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Headers the client always computes itself; callers may not set them.
pub const RESERVED_HEADERS: [&str; 6] = [
    "Accept-Encoding",
    "Content-Length",
    "Content-Type",
    "Connection",
    "Proxy-Connection",
    "Host",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// A header map that strictly preserves insertion order and the caller's casing.
///
/// Lookups compare names case-insensitively. Setting an existing name replaces
/// its value in place, so a header keeps the position it was first given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedHeaderMap {
    headers: Vec<(String, String)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Insert a request header after validating its name and value.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        let invalid = || NetError::InvalidHeader {
            name: name.to_string(),
        };
        HeaderName::from_str(name).map_err(|_| invalid())?;
        HeaderValue::from_str(value).map_err(|_| invalid())?;
        self.insert_unchecked(name, value);
        Ok(())
    }

    /// Insert without validation; used for headers read off the wire.
    pub(crate) fn insert_unchecked(&mut self, name: &str, value: &str) {
        if let Some((_, v)) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            *v = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.headers.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Copy every header of `other` over this map; `other` wins on conflicts.
    pub fn extend_from(&mut self, other: &OrderedHeaderMap) {
        for (name, value) in other.iter() {
            self.insert_unchecked(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Convert to a standard `http::HeaderMap`, skipping entries that are not valid HTTP.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
                map.append(name, value);
            }
        }
        map
    }

    /// Render as `Name: value\r\n` lines in insertion order.
    pub fn write_to(&self, out: &mut String) {
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
    }
}
