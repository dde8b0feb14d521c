/// Where an `HttpClient` call currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The request is idle.
    #[default]
    Idle,

    /// Picking the proxy for the destination.
    ResolvingProxyForUrl,

    /// Establishing proxy tunnel.
    EstablishingProxyTunnel,

    /// Connecting to the host (TCP handshake).
    Connecting,

    /// Sending the HTTP request.
    SendingRequest,

    /// Waiting for the server response (TTFB).
    WaitingForResponse,

    /// Reading the response body.
    ReadingResponse,
}
