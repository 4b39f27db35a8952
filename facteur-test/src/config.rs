use facteur_common::mechanism::Mechanism;
use facteur_config::Config;

/// path of the self-signed certificate, relative to the crate root
pub const TEST_SERVER_CERT: &str = "src/template/certs/certificate.crt";
/// path of the matching RSA private key, relative to the crate root
pub const TEST_SERVER_KEY: &str = "src/template/certs/private_key.rsa.key";

/// Get a config for local tests
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name("testserver.com")
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .without_tls_support()
        .with_default_smtp_options()
        .with_default_smtp_error_handler()
        .with_default_smtp_codes()
        .without_auth()
        .validate()
        .unwrap()
}

/// A config accepting password-bearing mechanisms over clair connections,
/// for suites that authenticate without a TLS layer
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn unsafe_auth_config() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name("testserver.com")
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .without_tls_support()
        .with_default_smtp_options()
        .with_default_smtp_error_handler()
        .with_default_smtp_codes()
        .with_auth(
            false,
            true,
            vec![Mechanism::Plain, Mechanism::Login, Mechanism::CramMd5],
            -1,
        )
        .validate()
        .unwrap()
}

/// A config advertising STARTTLS backed by the embedded certificate
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn tls_config() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name("testserver.com")
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .with_safe_tls_config(TEST_SERVER_CERT, TEST_SERVER_KEY)
        .unwrap()
        .with_default_smtp_options()
        .with_default_smtp_error_handler()
        .with_default_smtp_codes()
        .without_auth()
        .validate()
        .unwrap()
}
