//! TLS Material
//!
//! Trust bundle loading and PKCS#12 client identity decoding. The resulting
//! `TlsSettings` value is handed to a transport factory per call and is never
//! installed into any process-wide default.

use base64::Engine;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{TppError, TppResult};
use crate::types::CredentialState;

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";
const PEM_PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Client certificate identity decoded from a PKCS#12 keystore.
#[derive(Clone)]
pub struct ClientIdentity {
    /// PEM-encoded private key followed by the certificate chain.
    pem: Vec<u8>,
    /// DER-encoded issuer certificates from the keystore chain.
    ca_certificates: Vec<Vec<u8>>,
}

impl ClientIdentity {
    /// PEM-encoded key and certificate chain.
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// Issuer certificates bundled with the client certificate.
    pub fn ca_certificates(&self) -> &[Vec<u8>] {
        &self.ca_certificates
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("pem", &"[REDACTED]")
            .field("ca_certificates", &self.ca_certificates.len())
            .finish()
    }
}

/// TLS configuration for the transport used by a single exchange.
#[derive(Clone, Debug, Default)]
pub struct TlsSettings {
    /// PEM CA bundle replacing the built-in roots.
    pub trust_bundle: Option<Vec<u8>>,
    /// Client certificate for mutual TLS.
    pub identity: Option<ClientIdentity>,
}

impl TlsSettings {
    /// Check if a client identity is installed.
    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Hex SHA-256 over the TLS material, used to key pooled clients.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match &self.trust_bundle {
            Some(bundle) => {
                hasher.update(b"trust:");
                hasher.update(bundle);
            }
            None => hasher.update(b"trust:none"),
        }
        match &self.identity {
            Some(identity) => {
                hasher.update(b"identity:");
                hasher.update(&identity.pem);
            }
            None => hasher.update(b"identity:none"),
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Build TLS settings for a credential, decoding the keystore when requested.
pub fn tls_settings_for(state: &CredentialState, with_identity: bool) -> TppResult<TlsSettings> {
    let trust_bundle = match state.trust_bundle.as_deref().filter(|b| !b.is_empty()) {
        Some(location) => Some(load_trust_bundle(location)?),
        None => None,
    };

    let identity = if with_identity {
        let location = state.p12_certificate.as_deref().unwrap_or_default();
        let password = state
            .p12_password
            .as_ref()
            .map(|p| p.expose_secret().as_str())
            .unwrap_or_default();
        let keystore = load_pkcs12(location)?;
        Some(decode_pkcs12(&keystore, password)?)
    } else {
        None
    };

    Ok(TlsSettings {
        trust_bundle,
        identity,
    })
}

/// Load a PEM trust bundle from a file path, inline PEM text or base64 content.
pub fn load_trust_bundle(location: &str) -> TppResult<Vec<u8>> {
    let read_failed = |message: String| TppError::TrustBundleReadFailed {
        location: describe_location(location),
        message,
    };

    let data = if location.contains("-----BEGIN") {
        location.as_bytes().to_vec()
    } else {
        resolve_path_or_base64(location).map_err(read_failed)?
    };

    let certificates = pem::parse_many(&data).map_err(|e| read_failed(e.to_string()))?;
    if !certificates
        .iter()
        .any(|block| block.tag() == PEM_CERTIFICATE_TAG)
    {
        return Err(read_failed("no PEM certificates found".to_string()));
    }

    Ok(data)
}

/// Load PKCS#12 keystore bytes from a file path or base64 content.
pub fn load_pkcs12(location: &str) -> TppResult<Vec<u8>> {
    resolve_path_or_base64(location).map_err(|message| TppError::Pkcs12ReadFailed {
        location: describe_location(location),
        message,
    })
}

/// Decode a PKCS#12 keystore into PEM key and certificate material.
pub fn decode_pkcs12(data: &[u8], password: &str) -> TppResult<ClientIdentity> {
    let keystore = p12_keystore::KeyStore::from_pkcs12(data, password).map_err(|e| {
        TppError::Pkcs12DecodeFailed {
            message: e.to_string(),
        }
    })?;

    let (_, chain) = keystore
        .private_key_chain()
        .ok_or_else(|| TppError::Pkcs12DecodeFailed {
            message: "keystore contains no private key".to_string(),
        })?;

    let certificates = chain.chain();
    if certificates.is_empty() {
        return Err(TppError::Pkcs12DecodeFailed {
            message: "keystore contains no certificate".to_string(),
        });
    }

    let mut blocks = vec![pem::Pem::new(PEM_PRIVATE_KEY_TAG, chain.key().to_vec())];
    blocks.extend(
        certificates
            .iter()
            .map(|cert| pem::Pem::new(PEM_CERTIFICATE_TAG, cert.as_der().to_vec())),
    );

    Ok(ClientIdentity {
        pem: pem::encode_many(&blocks).into_bytes(),
        ca_certificates: certificates
            .iter()
            .skip(1)
            .map(|cert| cert.as_der().to_vec())
            .collect(),
    })
}

/// Split a PEM bundle into DER certificates.
pub fn pem_certificates(bundle: &[u8]) -> TppResult<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(bundle).map_err(|e| TppError::TrustBundleReadFailed {
        location: "inline content".to_string(),
        message: e.to_string(),
    })?;

    Ok(blocks
        .into_iter()
        .filter(|block| block.tag() == PEM_CERTIFICATE_TAG)
        .map(|block| block.into_contents())
        .collect())
}

fn resolve_path_or_base64(location: &str) -> Result<Vec<u8>, String> {
    if location.is_empty() {
        return Err("no location given".to_string());
    }

    let path = Path::new(location);
    if path.is_file() {
        return std::fs::read(path).map_err(|e| e.to_string());
    }

    let compact: String = location.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|_| "not a readable file and not valid base64 content".to_string())
}

/// Name a location in error text without echoing inline key or bundle content.
fn describe_location(location: &str) -> String {
    let path = Path::new(location);
    let path_like = path.extension().is_some()
        && !location.contains('\n')
        && !location.contains("-----");
    if path.is_file() || path_like {
        location.to_string()
    } else {
        "inline content".to_string()
    }
}
