use crate::cli::Args;

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use log::info;
use rustls::ServerConfig;
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{ CertificateDer, PrivateKeyDer };
use rustls_pemfile::{ certs, pkcs8_private_keys };

/// Returns the certificate/key pair when TLS is requested, or an error when only
/// half of the pair was given.
pub fn tls_paths(args: &Args) -> Result<Option<(&str, &str)>, Box<dyn Error + Send + Sync>> {
    if !args.enable_tls {
        return Ok(None);
    }
    match (&args.tls_cert_path, &args.tls_key_path) {
        (Some(cert), Some(key)) => Ok(Some((cert.as_str(), key.as_str()))),
        (Some(_), None) | (None, Some(_)) =>
            Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS".into()),
        (None, None) => Err("--enable-tls was set but no certificate/key paths provided".into()),
    }
}

pub fn load_tls_config(
    cert_path: &str,
    key_path: &str
) -> Result<Arc<ServerConfig>, Box<dyn Error + Send + Sync>> {
    info!("Loading TLS certificate from '{}' and key from '{}'", cert_path, key_path);
    let cert_file = File::open(cert_path).map_err(|e|
        format!("Failed to open TLS certificate file '{}': {}", cert_path, e)
    )?;
    let key_file = File::open(key_path).map_err(|e|
        format!("Failed to open TLS key file '{}': {}", key_path, e)
    )?;

    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut BufReader::new(cert_file))
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Failed to read certificate(s): {}", e))?;
    if cert_chain.is_empty() {
        return Err(format!("No certificates found in '{}'", cert_path).into());
    }

    let key = pkcs8_private_keys(&mut BufReader::new(key_file))
        .next()
        .ok_or("No PKCS8 private key found in key file")?
        .map_err(|e| format!("Error reading private key: {}", e))?;

    let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(cert_chain, PrivateKeyDer::Pkcs8(key))?;
    Ok(Arc::new(config))
}
