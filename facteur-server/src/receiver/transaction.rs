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
use crate::handler::Handler;
use crate::log_channels;
use crate::receiver::body::{receive_body, BodyOutcome};
use crate::receiver::Connection;
use facteur_common::{
    address::Address,
    envelop::Envelop,
    event::{Event, MimeBodyType},
    extensions::Extensions,
    mail_context::{MailContext, MessageMetadata},
    mechanism::Mechanism,
    re::anyhow,
    state::StateSMTP,
    CodesID, Reply, ReplyCode,
};
use facteur_config::{Config, TlsSecurityLevel};

pub struct Transaction {
    state: StateSMTP,
    context: MailContext,
}

#[allow(clippy::module_name_repetitions)]
pub enum TransactionResult {
    Nothing,
    Mail(Box<MailContext>),
    TlsUpgrade,
    Authentication(String, Mechanism, Option<Vec<u8>>),
}

// Generated from a string received
enum ProcessedEvent {
    Reply(Reply),
    ChangeState(StateSMTP),
    ReplyChangeState(StateSMTP, Reply),
}

impl Transaction {
    async fn parse_and_apply_and_get_reply<S, H>(
        &mut self,
        conn: &mut Connection<S>,
        handler: &mut H,
        client_message: &str,
    ) -> ProcessedEvent
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        H: Handler + Send,
    {
        log::trace!(
            target: log_channels::TRANSACTION,
            "buffer=\"{client_message}\""
        );

        let command_or_code = Event::parse_cmd(client_message);

        log::trace!(
            target: log_channels::TRANSACTION,
            "parsed=\"{command_or_code:?}\""
        );

        match command_or_code {
            Ok(event) => self.process_event(conn, handler, event).await,
            Err(id) => ProcessedEvent::Reply(conn.reply_of(id)),
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn process_event<S, H>(
        &mut self,
        conn: &mut Connection<S>,
        handler: &mut H,
        event: Event,
    ) -> ProcessedEvent
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        H: Handler + Send,
    {
        match (self.state.clone(), event) {
            (_, Event::NoopCmd) => ProcessedEvent::Reply(conn.reply_of(CodesID::Ok)),

            (_, Event::VrfyCmd(query)) => ProcessedEvent::Reply(handler.on_vrfy(&query).await),

            (_, Event::RsetCmd) => {
                handler.on_rset().await;
                let helo = self.context.envelop.helo.clone();
                let next = if helo.is_empty() {
                    StateSMTP::Connect
                } else {
                    StateSMTP::Helo
                };
                self.set_helo(helo);
                ProcessedEvent::ReplyChangeState(next, conn.reply_of(CodesID::Ok))
            }

            (_, Event::QuitCmd) => {
                conn.client_quit = true;
                ProcessedEvent::ReplyChangeState(StateSMTP::Stop, conn.reply_of(CodesID::Closing))
            }

            (_, Event::UnknownCmd { verb, argument }) => {
                ProcessedEvent::Reply(handler.on_unknown(&verb, &argument).await)
            }

            (_, Event::HeloCmd(domain)) => match handler.on_helo(&domain).await {
                Ok(()) => {
                    self.set_helo(domain);
                    // plain HELO advertises nothing
                    conn.extensions = Extensions::default();
                    ProcessedEvent::ReplyChangeState(StateSMTP::Helo, conn.reply_of(CodesID::Helo))
                }
                Err(reply) => ProcessedEvent::Reply(reply),
            },

            (_, Event::EhloCmd(_)) if conn.config.server.smtp.disable_ehlo => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::Unimplemented))
            }

            (_, Event::EhloCmd(domain)) => {
                let mut offered =
                    Extensions::with_builtins(conn.config.server.smtp.message_size_max);
                if conn.config.server.tls.is_some() && !conn.is_secured {
                    offered.set("STARTTLS", None);
                }
                if let Some(auth) = &conn.config.server.smtp.auth {
                    offered.set(
                        "AUTH",
                        Some(
                            auth.mechanisms
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(" "),
                        ),
                    );
                }

                match handler.on_ehlo(&domain, offered).await {
                    Ok(mut extensions) => {
                        if conn.is_secured {
                            extensions.remove("STARTTLS");
                        }
                        self.set_helo(domain);
                        conn.extensions = extensions.clone();
                        ProcessedEvent::ReplyChangeState(
                            StateSMTP::Helo,
                            extensions.to_ehlo_reply(&conn.server_name),
                        )
                    }
                    Err(reply) => ProcessedEvent::Reply(reply),
                }
            }

            (_, Event::StartTls) if conn.is_secured => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::TlsAlreadyActive))
            }

            (StateSMTP::Connect, Event::StartTls | Event::Auth(..)) => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::EhloFirst))
            }

            (StateSMTP::Helo, Event::StartTls) if conn.config.server.tls.is_none() => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::TlsNotAvailable))
            }

            (StateSMTP::Helo, Event::StartTls) => {
                // ack over the clair channel, then hand over to the upgrade
                ProcessedEvent::ReplyChangeState(
                    StateSMTP::NegotiationTLS,
                    conn.reply_of(CodesID::Greetings),
                )
            }

            (StateSMTP::Helo, Event::Auth(mechanism, initial_response))
                if !conn.is_authenticated =>
            {
                if !conn.extensions.contains("AUTH") {
                    ProcessedEvent::Reply(conn.reply_of(CodesID::AuthNotImplemented))
                } else if !conn.extensions.auth_mechanisms().contains(&mechanism) {
                    ProcessedEvent::Reply(conn.reply_of(CodesID::AuthMechNotSupported))
                } else {
                    ProcessedEvent::ChangeState(StateSMTP::Authentication(
                        mechanism,
                        initial_response,
                    ))
                }
            }

            (StateSMTP::Connect, Event::MailCmd(..) | Event::RcptCmd(..) | Event::DataCmd) => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::HeloFirst))
            }

            (StateSMTP::MailFrom | StateSMTP::RcptTo, Event::MailCmd(..)) => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::NestedMail))
            }

            (StateSMTP::Helo, Event::MailCmd(reverse_path, params)) => {
                self.on_mail(conn, handler, reverse_path, params).await
            }

            (StateSMTP::Helo, Event::RcptCmd(..) | Event::DataCmd) => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::NeedMail))
            }

            (StateSMTP::MailFrom | StateSMTP::RcptTo, Event::RcptCmd(forward_path, params)) => {
                self.on_rcpt(conn, handler, forward_path, params).await
            }

            (StateSMTP::MailFrom, Event::DataCmd) => {
                ProcessedEvent::Reply(conn.reply_of(CodesID::NeedRcpt))
            }

            (StateSMTP::RcptTo, Event::DataCmd) => {
                ProcessedEvent::ReplyChangeState(StateSMTP::Data, conn.reply_of(CodesID::DataStart))
            }

            _ => ProcessedEvent::Reply(conn.reply_of(CodesID::BadSequence)),
        }
    }

    async fn on_mail<S, H>(
        &mut self,
        conn: &mut Connection<S>,
        handler: &mut H,
        reverse_path: Address,
        params: Vec<String>,
    ) -> ProcessedEvent
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        H: Handler + Send,
    {
        if !conn.is_secured
            && conn.config.server.tls.as_ref().map(|tls| tls.security_level)
                == Some(TlsSecurityLevel::Encrypt)
        {
            return ProcessedEvent::Reply(conn.reply_of(CodesID::TlsRequired));
        }

        if !conn.is_authenticated
            && conn
                .config
                .server
                .smtp
                .auth
                .as_ref()
                .map_or(false, |auth| auth.must_be_authenticated)
        {
            return ProcessedEvent::Reply(conn.reply_of(CodesID::AuthRequired));
        }

        let size_max = effective_size_max(conn);
        let mut expected_size = None;

        for param in &params {
            if let Some(value) = param.strip_prefix("SIZE=") {
                match value.parse::<u64>() {
                    Ok(declared) if declared <= size_max => expected_size = Some(declared),
                    Ok(declared) => {
                        return ProcessedEvent::Reply(Reply::new(
                            ReplyCode::Code { code: 552 },
                            format!(
                                "Estimated message length {declared} exceeds limit of {size_max}"
                            ),
                        ));
                    }
                    Err(_) => {
                        return ProcessedEvent::Reply(conn.reply_of(CodesID::SyntaxErrorParams));
                    }
                }
            } else if let Some(value) = param.strip_prefix("BODY=") {
                if !conn.extensions.contains("8BITMIME") {
                    return ProcessedEvent::Reply(Reply::new(
                        ReplyCode::Code { code: 555 },
                        "Unsupported option BODY",
                    ));
                }
                if value.parse::<MimeBodyType>().is_err() {
                    return ProcessedEvent::Reply(conn.reply_of(CodesID::SyntaxErrorParams));
                }
            } else if !handler.on_mail_param(param).await {
                return ProcessedEvent::Reply(Reply::new(
                    ReplyCode::Code { code: 555 },
                    format!("Unsupported option: {param}"),
                ));
            }
        }

        match handler.on_mail(&reverse_path).await {
            Ok(()) => {
                self.set_mail_from(conn, reverse_path, expected_size);
                ProcessedEvent::ReplyChangeState(StateSMTP::MailFrom, conn.reply_of(CodesID::MailOk))
            }
            Err(reply) => ProcessedEvent::Reply(reply),
        }
    }

    async fn on_rcpt<S, H>(
        &mut self,
        conn: &mut Connection<S>,
        handler: &mut H,
        forward_path: Address,
        params: Vec<String>,
    ) -> ProcessedEvent
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        H: Handler + Send,
    {
        for param in &params {
            if !handler.on_rcpt_param(param).await {
                return ProcessedEvent::Reply(Reply::new(
                    ReplyCode::Code { code: 555 },
                    format!("Unsupported option: {param}"),
                ));
            }
        }

        if self.context.envelop.rcpt.len() >= conn.config.server.smtp.rcpt_count_max {
            return ProcessedEvent::Reply(conn.reply_of(CodesID::TooManyRecipients));
        }

        match handler.on_rcpt(&forward_path).await {
            Ok(()) => {
                self.context.envelop.rcpt.push(forward_path);
                ProcessedEvent::ReplyChangeState(StateSMTP::RcptTo, conn.reply_of(CodesID::RcptOk))
            }
            Err(reply) => ProcessedEvent::Reply(reply),
        }
    }
}

impl Transaction {
    fn set_helo(&mut self, helo: String) {
        self.context.envelop = Envelop {
            helo,
            ..Envelop::default()
        };
        self.context.headers.clear();
        self.context.body.clear();
        self.context.metadata = None;
    }

    fn set_mail_from<S>(
        &mut self,
        conn: &Connection<S>,
        reverse_path: Address,
        expected_size: Option<u64>,
    ) where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    {
        let now = std::time::SystemTime::now();

        self.context.envelop.mail_from = Some(reverse_path);
        self.context.envelop.rcpt.clear();
        self.context.envelop.expected_size = expected_size;
        self.context.envelop.credentials = conn.credentials.clone();
        self.context.headers.clear();
        self.context.body.clear();
        self.context.metadata = Some(MessageMetadata {
            timestamp: now,
            message_id: format!(
                "{}{}{}{}",
                now.duration_since(std::time::SystemTime::UNIX_EPOCH)
                    .unwrap_or(std::time::Duration::ZERO)
                    .as_micros(),
                conn.timestamp
                    .duration_since(std::time::SystemTime::UNIX_EPOCH)
                    .unwrap_or(std::time::Duration::ZERO)
                    .as_millis(),
                std::iter::repeat_with(|| conn.rng.alphanumeric())
                    .take(36)
                    .collect::<String>(),
                std::process::id()
            ),
        });

        log::trace!(
            target: log_channels::TRANSACTION,
            "envelop=\"{:?}\"",
            self.context.envelop
        );
    }
}

fn effective_size_max<S>(conn: &Connection<S>) -> u64
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    conn.extensions
        .size_limit()
        .unwrap_or(conn.config.server.smtp.message_size_max)
}

fn get_timeout_for_state(
    config: &std::sync::Arc<Config>,
    state: &StateSMTP,
) -> std::time::Duration {
    match state {
        StateSMTP::Connect => config.server.smtp.timeout_client.connect,
        StateSMTP::Helo => config.server.smtp.timeout_client.helo,
        StateSMTP::MailFrom => config.server.smtp.timeout_client.mail_from,
        StateSMTP::RcptTo => config.server.smtp.timeout_client.rcpt_to,
        StateSMTP::Data => config.server.smtp.timeout_client.data,
        _ => std::time::Duration::from_secs(3 * 60),
    }
}

impl Transaction {
    pub async fn receive<S, H>(
        conn: &mut Connection<S>,
        helo_domain: &Option<String>,
        handler: &mut H,
    ) -> anyhow::Result<TransactionResult>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        H: Handler + Send,
    {
        let mut transaction = Self {
            state: if helo_domain.is_none() {
                StateSMTP::Connect
            } else {
                StateSMTP::Helo
            },
            context: MailContext {
                connection_timestamp: conn.timestamp,
                client_addr: conn.client_addr,
                envelop: Envelop::default(),
                headers: vec![],
                body: vec![],
                metadata: None,
            },
        };

        if let Some(helo) = helo_domain.as_ref().cloned() {
            transaction.set_helo(helo);
        }

        let mut read_timeout = get_timeout_for_state(&conn.config, &transaction.state);

        loop {
            match transaction.state.clone() {
                StateSMTP::NegotiationTLS => return Ok(TransactionResult::TlsUpgrade),
                StateSMTP::Authentication(mechanism, initial_response) => {
                    return Ok(TransactionResult::Authentication(
                        transaction.context.envelop.helo.clone(),
                        mechanism,
                        initial_response,
                    ));
                }
                StateSMTP::Stop => {
                    conn.is_alive = false;
                    return Ok(TransactionResult::Nothing);
                }
                StateSMTP::Data => {
                    let size_max =
                        usize::try_from(effective_size_max(conn)).unwrap_or(usize::MAX);
                    match receive_body(
                        &mut conn.inner,
                        size_max,
                        conn.config.server.smtp.timeout_client.data,
                    )
                    .await?
                    {
                        BodyOutcome::Complete { headers, body } => {
                            transaction.context.headers = headers;
                            transaction.context.body = body;

                            let mut output = MailContext {
                                connection_timestamp: conn.timestamp,
                                client_addr: conn.client_addr,
                                envelop: Envelop::default(),
                                headers: vec![],
                                body: vec![],
                                metadata: None,
                            };
                            std::mem::swap(&mut transaction.context, &mut output);

                            return Ok(TransactionResult::Mail(Box::new(output)));
                        }
                        BodyOutcome::SizeExceeded => {
                            conn.send_code(CodesID::TooLarge).await?;
                            let helo = transaction.context.envelop.helo.clone();
                            transaction.set_helo(helo);
                            transaction.state = StateSMTP::Helo;
                            read_timeout =
                                get_timeout_for_state(&conn.config, &transaction.state);
                        }
                        BodyOutcome::Eof => {
                            log::info!(
                                target: log_channels::TRANSACTION,
                                "eof during the mail input"
                            );
                            transaction.state = StateSMTP::Stop;
                        }
                        BodyOutcome::Timeout => {
                            conn.send_code(CodesID::Timeout).await?;
                            anyhow::bail!(std::io::Error::new(
                                std::io::ErrorKind::TimedOut,
                                "no byte received within the idle timeout"
                            ))
                        }
                    }
                }
                _ => match conn.read(read_timeout).await {
                    Ok(Some(client_message)) => {
                        match transaction
                            .parse_and_apply_and_get_reply(conn, handler, &client_message)
                            .await
                        {
                            ProcessedEvent::Reply(reply) => {
                                conn.send_reply(&reply).await?;
                            }
                            ProcessedEvent::ChangeState(new_state) => {
                                log::info!(
                                    target: log_channels::TRANSACTION,
                                    "================ STATE: /{:?}/ => /{new_state:?}/",
                                    transaction.state
                                );
                                transaction.state = new_state;
                                read_timeout =
                                    get_timeout_for_state(&conn.config, &transaction.state);
                            }
                            ProcessedEvent::ReplyChangeState(new_state, reply) => {
                                log::info!(
                                    target: log_channels::TRANSACTION,
                                    "================ STATE: /{:?}/ => /{new_state:?}/",
                                    transaction.state
                                );
                                transaction.state = new_state;
                                read_timeout =
                                    get_timeout_for_state(&conn.config, &transaction.state);
                                conn.send_reply(&reply).await?;
                            }
                        }
                    }
                    Ok(None) => {
                        log::info!(target: log_channels::TRANSACTION, "eof");
                        transaction.state = StateSMTP::Stop;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        conn.send_code(CodesID::Timeout).await?;
                        anyhow::bail!(e)
                    }
                    Err(e) => anyhow::bail!(e),
                },
            }
        }
    }
}
