pub mod semver;
pub mod socket_addr;
pub mod tls_certificate;
pub mod tls_private_key;
