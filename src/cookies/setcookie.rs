//! `Set-Cookie` handling.
//!
//! Only the name and value matter to the jar. Attributes are consulted for
//! expiry alone: a cookie whose `expires` date is already past (or whose
//! `max-age` is not positive) is removed rather than stored.

use crate::cookies::jar::CookieJar;
use cookie::Cookie;
use time::OffsetDateTime;

/// One parsed `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie<'a> {
    pub name: &'a str,
    pub value: &'a str,
    /// The header value as received, attributes included.
    pub raw: &'a str,
    pub expired: bool,
}

impl<'a> SetCookie<'a> {
    /// Split `raw` on its first `=`; a `;` starts the attribute list.
    ///
    /// Returns `None` when there is no `=` at all.
    pub fn parse(raw: &'a str, now: OffsetDateTime) -> Option<Self> {
        let separator = raw.find('=')?;
        let name = raw[..separator].trim();
        let rest = &raw[separator + 1..];
        let (value, has_attributes) = match rest.find(';') {
            Some(end) => (&rest[..end], true),
            None => (rest, false),
        };
        let expired = has_attributes && is_expired(raw, now);
        Some(Self {
            name,
            value: value.trim(),
            raw,
            expired,
        })
    }

    /// Value that asks the client to forget the cookie.
    pub fn is_removal(&self) -> bool {
        self.expired || self.value.is_empty() || self.value.eq_ignore_ascii_case("deleted")
    }

    /// Update the logical jar and record the raw header.
    pub fn apply(&self, jar: &mut CookieJar, raw_cookies: &mut CookieJar) {
        if self.is_removal() {
            jar.remove(self.name);
        } else {
            jar.insert(self.name, self.value);
        }
        raw_cookies.insert(self.name, self.raw);
    }
}

fn is_expired(raw: &str, now: OffsetDateTime) -> bool {
    let Ok(parsed) = Cookie::parse(raw) else {
        return false;
    };
    if parsed.max_age().is_some_and(|age| age.is_zero() || age.is_negative()) {
        return true;
    }
    parsed
        .expires_datetime()
        .is_some_and(|expires| expires < now)
}
