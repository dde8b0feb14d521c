use crate::base::neterror::NetError;
use boring::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslStream, SslVerifyMode, SslVersion};
use boring::x509::X509StoreContextRef;
use std::fmt;
use std::net::TcpStream;
use std::sync::Arc;

/// Certificate-validation callback.
///
/// Receives BoringSSL's own verdict for the certificate currently being checked
/// and returns whether to accept it.
pub type CertificateValidator = Arc<dyn Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync>;

/// TLS settings for `https` destinations.
///
/// The default configuration accepts every server certificate. Use
/// [`TlsConfig::verify_system_trust`] or [`TlsConfig::with_validator`] to
/// enforce a policy.
#[derive(Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
    validator: CertificateValidator,
    verify_hostname: bool,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("alpn_protos", &self.alpn_protos)
            .field("verify_hostname", &self.verify_hostname)
            .finish_non_exhaustive()
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl TlsConfig {
    /// Trust every certificate and skip hostname checks.
    pub fn accept_all() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos: vec!["http/1.1".to_string()],
            validator: Arc::new(|_, _| true),
            verify_hostname: false,
        }
    }

    /// Accept only certificates that chain to the system trust store and match the host.
    pub fn verify_system_trust() -> Self {
        Self {
            validator: Arc::new(|preverified, _| preverified),
            verify_hostname: true,
            ..Self::accept_all()
        }
    }

    /// Replace the certificate-validation callback.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync + 'static,
    {
        self.validator = Arc::new(validator);
        self.verify_hostname = true;
        self
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), String> {
        if let Some(min) = self.min_version {
            builder
                .set_min_proto_version(Some(min))
                .map_err(|e| e.to_string())?;
        }
        if let Some(max) = self.max_version {
            builder
                .set_max_proto_version(Some(max))
                .map_err(|e| e.to_string())?;
        }

        if !self.alpn_protos.is_empty() {
            let mut alpn_wire = Vec::new();
            for proto in &self.alpn_protos {
                if proto.is_empty() || proto.len() > 255 {
                    return Err(format!("invalid ALPN protocol {proto:?}"));
                }
                alpn_wire.push(proto.len() as u8);
                alpn_wire.extend_from_slice(proto.as_bytes());
            }
            builder
                .set_alpn_protos(&alpn_wire)
                .map_err(|e| e.to_string())?;
        }

        let validator = Arc::clone(&self.validator);
        builder.set_verify_callback(SslVerifyMode::PEER, move |preverified, ctx| {
            validator(preverified, ctx)
        });

        Ok(())
    }

    /// Run the TLS handshake for `host` over an established TCP stream.
    pub fn connect(&self, host: &str, tcp: TcpStream) -> Result<SslStream<TcpStream>, NetError> {
        let failed = |reason: String| NetError::SslHandshakeFailed {
            host: host.to_string(),
            reason,
        };

        let mut builder = SslConnector::builder(SslMethod::tls()).map_err(|e| failed(e.to_string()))?;
        self.apply_to_builder(&mut builder).map_err(failed)?;
        let connector = builder.build();

        let mut config = connector.configure().map_err(|e| failed(e.to_string()))?;
        config.set_use_server_name_indication(Self::should_set_sni(host));
        config.set_verify_hostname(self.verify_hostname);

        config
            .connect(host, tcp)
            .map_err(|e| failed(e.to_string()))
    }

    /// Check if SNI should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.parse::<std::net::IpAddr>().is_err()
    }
}
