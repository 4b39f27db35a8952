/*
 * facteur mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::config::ConfigServerTls;
use facteur_common::re::anyhow;

struct TlsLogger;

impl rustls::KeyLog for TlsLogger {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        log::trace!("{} {:?} {:?}", label, client_random, secret);
    }
}

/// build the rustls server parameters out of the TLS section of the config
///
/// # Errors
///
/// * the certificate and the private key do not match
pub fn get_rustls_config(config: &ConfigServerTls) -> anyhow::Result<rustls::ServerConfig> {
    let mut out = rustls::ServerConfig::builder()
        .with_safe_default_cipher_suites()
        .with_safe_default_kx_groups()
        .with_safe_default_protocol_versions()
        .map_err(|e| anyhow::anyhow!("cannot initialize tls config: '{e}'"))?
        .with_no_client_auth()
        .with_single_cert(
            vec![config.certificate.clone()],
            config.private_key.clone(),
        )
        .map_err(|e| anyhow::anyhow!("certificate or private key rejected: '{e}'"))?;

    out.ignore_client_order = config.preempt_cipherlist;
    out.key_log = std::sync::Arc::new(TlsLogger {});

    Ok(out)
}
