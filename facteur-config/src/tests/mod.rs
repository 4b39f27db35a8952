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
use crate::Config;
use facteur_common::CodesID;

fn build() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0, <2.0.0")
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

#[test]
fn domain_substitution() {
    let config = build();
    pretty_assertions::assert_eq!(
        config.server.smtp.codes.get(&CodesID::Greetings).unwrap().fold(),
        "220 testserver.com Service ready\r\n"
    );
    pretty_assertions::assert_eq!(
        config.server.smtp.codes.get(&CodesID::Helo).unwrap().fold(),
        "250 testserver.com\r\n"
    );
}

#[test]
fn defaults() {
    let config = build();
    assert_eq!(config.server.smtp.message_size_max, 10_485_670);
    assert_eq!(config.server.smtp.rcpt_count_max, 1000);
    assert_eq!(
        config.server.smtp.timeout_client.data,
        std::time::Duration::from_secs(180)
    );
    assert!(config.server.tls.is_none());
    assert!(config.server.smtp.auth.is_none());
}

#[test]
fn deserialize_minimal() {
    let config = toml::from_str::<Config>(
        r#"
version_requirement = ">=1.0.0"

[server]
domain = "example.com"
"#,
    )
    .unwrap();
    assert_eq!(config.server.domain, "example.com");
    // the table is complete even when the file does not mention it
    assert!(config.server.smtp.codes.contains_key(&CodesID::TooLarge));
}

#[test]
fn deserialize_rejects_unknown_fields() {
    toml::from_str::<Config>(
        r#"
version_requirement = ">=1.0.0"

[server]
not_a_field = true
"#,
    )
    .unwrap_err();
}

#[test]
fn codes_override() {
    let config = Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name("testserver.com")
        .with_ipv4_localhost()
        .with_default_logs_settings()
        .without_tls_support()
        .with_default_smtp_options()
        .with_default_smtp_error_handler()
        .with_smtp_codes(
            [(
                CodesID::Greetings,
                facteur_common::Reply::parse_str("220 custom banner").unwrap(),
            )]
            .into_iter()
            .collect(),
        )
        .without_auth()
        .validate()
        .unwrap();
    pretty_assertions::assert_eq!(
        config.server.smtp.codes.get(&CodesID::Greetings).unwrap().fold(),
        "220 custom banner\r\n"
    );
}
