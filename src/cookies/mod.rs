//! Cookie storage.
//!
//! - [`CookieJar`](jar::CookieJar): name to value map sent as the `Cookie`
//!   header, optionally locked against updates from responses
//! - [`SetCookie`](setcookie::SetCookie): parsing of `Set-Cookie` values,
//!   including removal of expired or deleted cookies
//!
//! # Example
//!
//! ```rust
//! use proxynet::cookies::jar::CookieJar;
//!
//! let mut jar = CookieJar::new();
//! jar.insert("session", "abc");
//! jar.insert("theme", "dark");
//! assert_eq!(jar.to_string(), "session=abc; theme=dark");
//! ```

pub mod jar;
pub mod setcookie;
