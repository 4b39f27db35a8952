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
use facteur_common::re::anyhow;

#[doc(hidden)]
pub fn get_log4rs_config(config: &Config, no_daemon: bool) -> anyhow::Result<log4rs::Config> {
    use anyhow::Context;
    use log4rs::{append, config, encode, Config};

    let server = append::file::FileAppender::builder()
        .encoder(Box::new(encode::pattern::PatternEncoder::new(
            &config.server.logs.format,
        )))
        .build(&config.server.logs.filepath)
        .with_context(|| format!("For filepath: '{}'", config.server.logs.filepath.display()))?;

    let mut builder = Config::builder();
    let mut root = config::Root::builder();

    if no_daemon {
        builder = builder.appender(
            config::Appender::builder().build(
                "stdout",
                Box::new(
                    append::console::ConsoleAppender::builder()
                        .encoder(Box::new(encode::pattern::PatternEncoder::new(
                            "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5} {I})} ((line:{L:<3})) $ {m}{n}",
                        )))
                        .build(),
                ),
            ),
        );
        root = root.appender("stdout");
    }

    builder
        .appender(config::Appender::builder().build("server", Box::new(server)))
        .loggers(
            config
                .server
                .logs
                .level
                .iter()
                .map(|(name, level)| config::Logger::builder().build(name, *level)),
        )
        .build(
            root.appender("server").build(
                *config
                    .server
                    .logs
                    .level
                    .get("default")
                    .unwrap_or(&log::LevelFilter::Warn),
            ),
        )
        .map_err(|e| {
            e.errors().iter().for_each(|e| log::error!("{}", e));
            anyhow::anyhow!(e)
        })
}

#[cfg(test)]
mod tests {
    use super::get_log4rs_config;
    use crate::Config;

    #[test]
    fn init() {
        let mut config = Config::builder()
            .with_current_version()
            .with_debug_server_info()
            .with_ipv4_localhost()
            .with_default_logs_settings()
            .without_tls_support()
            .with_default_smtp_options()
            .with_default_smtp_error_handler()
            .with_default_smtp_codes()
            .without_auth()
            .validate()
            .unwrap();
        config.server.logs.filepath = "./tmp/facteur.log".into();

        let res = get_log4rs_config(&config, true);
        assert!(res.is_ok(), "{res:?}");
        let res = get_log4rs_config(&config, false);
        assert!(res.is_ok(), "{res:?}");
    }
}
