use crate::base::neterror::NetError;
use crate::http::requestbody::RequestBody;
use crate::http::response::Response;
use crate::http::transaction::HttpTransaction;
use http::Method;
use url::Url;

/// A call as the caller sees it: the request plus any redirects it causes.
pub(crate) struct HttpJob<'a> {
    transaction: HttpTransaction<'a>,
    url: Url,
}

impl<'a> HttpJob<'a> {
    pub fn new(transaction: HttpTransaction<'a>, url: Url) -> Self {
        Self { transaction, url }
    }

    /// Send the request and follow redirects while allowed.
    ///
    /// Each redirect is reissued as a bodiless GET without this call's extra
    /// headers. At most `maximum_automatic_redirections` are followed; one
    /// more fails the call. A 3xx without a usable `Location` is returned as is.
    pub fn start(&mut self, method: &Method, body: Option<&mut RequestBody>) -> Result<(), NetError> {
        self.transaction.start(method, &self.url, body)?;
        if !self.transaction.config.allow_auto_redirect {
            return Ok(());
        }

        let limit = self.transaction.config.maximum_automatic_redirections;
        let mut redirects = 0usize;
        loop {
            let next = self
                .transaction
                .last
                .as_ref()
                .filter(|head| head.has_redirect())
                .and_then(|head| head.redirect_address().cloned());
            let Some(next) = next else {
                return Ok(());
            };

            if redirects >= limit {
                return Err(NetError::TooManyRedirects {
                    host: self.url.host_str().unwrap_or_default().to_string(),
                    limit,
                });
            }
            redirects += 1;

            if let Some(head) = self.transaction.last.as_mut() {
                Response::new(head, self.transaction.connections.reader(), None).none()?;
            }

            tracing::debug!(from = %self.url, to = %next, redirects, "following redirect");
            self.transaction.oneshot_headers = None;
            self.url = next;
            self.transaction.start(&Method::GET, &self.url, None)?;
        }
    }
}
