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
use crate::address::Address;
use crate::mechanism::Mechanism;
use crate::CodesID;

// max command line length, 512 octets including the CRLF already stripped
const COMMAND_LINE_MAX_LENGTH: usize = 510;

/// See "SMTP Service Extension for 8-bit MIME Transport"
/// https://datatracker.ietf.org/doc/html/rfc6152
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MimeBodyType {
    ///
    SevenBit,
    ///
    EightBitMime,
}

impl std::str::FromStr for MimeBodyType {
    type Err = CodesID;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7BIT" => Ok(Self::SevenBit),
            "8BITMIME" => Ok(Self::EightBitMime),
            _ => Err(CodesID::SyntaxErrorParams),
        }
    }
}

/// Command received from the client
/// See "Simple Mail Transfer Protocol"
/// https://datatracker.ietf.org/doc/html/rfc5321
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// Used to identify the SMTP client to the SMTP server.
    /// Syntax = `"HELO" SP ( Domain / address-literal ) CRLF`
    HeloCmd(String),
    /// Used to identify the SMTP client to the SMTP server and request smtp
    /// extensions.
    /// Syntax = `"EHLO" SP ( Domain / address-literal ) CRLF`
    EhloCmd(String),
    /// Initiate a mail transaction. Carries the reverse path and the
    /// service-extension parameters, whitespace-split and uppercased.
    /// Syntax = `"MAIL FROM:" Reverse-path [SP Mail-parameters] CRLF`
    MailCmd(Address, Vec<String>),
    /// Identify one recipient of the mail data.
    /// Syntax = `"RCPT TO:" Forward-path [SP Rcpt-parameters] CRLF`
    RcptCmd(Address, Vec<String>),
    /// Start the mail data input.
    /// Syntax = `"DATA" CRLF`
    DataCmd,
    /// Abort the current mail transaction, clearing every buffer.
    /// Syntax = `"RSET" CRLF`
    RsetCmd,
    /// Ask the receiver to confirm that the argument identifies a user or
    /// mailbox; answered by the application handler.
    /// Syntax = `"VRFY" SP String CRLF`
    VrfyCmd(String),
    /// No effect.
    /// Syntax = `"NOOP" [ SP String ] CRLF`
    NoopCmd,
    /// Close the transmission channel after a "221 Bye".
    /// Syntax = `"QUIT" CRLF`
    QuitCmd,
    /// See "Transport Layer Security"
    /// https://datatracker.ietf.org/doc/html/rfc3207
    /// Syntax = `"STARTTLS" CRLF`
    StartTls,
    /// Authentication with SASL protocol
    /// https://datatracker.ietf.org/doc/html/rfc4954
    /// Syntax = `"AUTH" mechanism [initial-response] CRLF`
    Auth(Mechanism, Option<Vec<u8>>),
    /// Anything else; the application handler supplies the reply.
    UnknownCmd {
        /// leading token, uppercased
        verb: String,
        /// remainder of the line, original case
        argument: String,
    },
}

impl Event {
    /// Create a valid SMTP command (or event) from a string OR return the
    /// id of the error reply to send
    /// See https://datatracker.ietf.org/doc/html/rfc5321#section-4.1
    ///
    /// # Errors
    pub fn parse_cmd(input: &str) -> Result<Self, CodesID> {
        if input.len() > COMMAND_LINE_MAX_LENGTH {
            return Err(CodesID::UnrecognizedCommand);
        }

        let input = input.trim();
        let (verb, argument) = match input.find(char::is_whitespace) {
            Some(i) => (&input[..i], input[i + 1..].trim_start()),
            None => (input, ""),
        };
        let verb = verb.to_ascii_uppercase();

        match verb.as_str() {
            "HELO" => match argument {
                "" => Err(CodesID::SyntaxHelo),
                domain => Ok(Self::HeloCmd(domain.to_string())),
            },
            "EHLO" => match argument {
                "" => Err(CodesID::SyntaxEhlo),
                domain => Ok(Self::EhloCmd(domain.to_string())),
            },
            "MAIL" => Self::parse_arg_mail_from(argument),
            "RCPT" => Self::parse_arg_rcpt_to(argument),
            "VRFY" => match argument {
                "" => Err(CodesID::SyntaxErrorParams),
                query => Ok(Self::VrfyCmd(query.to_string())),
            },
            "DATA" => Self::without_argument(argument, Self::DataCmd),
            "RSET" => Self::without_argument(argument, Self::RsetCmd),
            "QUIT" => Self::without_argument(argument, Self::QuitCmd),
            "NOOP" => Ok(Self::NoopCmd),
            "STARTTLS" => match argument {
                "" => Ok(Self::StartTls),
                _ => Err(CodesID::NoParametersAllowed),
            },
            "AUTH" => Self::parse_arg_auth(argument),
            _ => Ok(Self::UnknownCmd {
                verb,
                argument: argument.to_string(),
            }),
        }
    }

    fn without_argument(argument: &str, event: Self) -> Result<Self, CodesID> {
        if argument.is_empty() {
            Ok(event)
        } else {
            Err(CodesID::SyntaxErrorParams)
        }
    }

    fn parse_arg_mail_from(argument: &str) -> Result<Self, CodesID> {
        let path = argument
            .get(.."FROM:".len())
            .filter(|prefix| prefix.eq_ignore_ascii_case("FROM:"))
            .map(|_| &argument["FROM:".len()..])
            .ok_or(CodesID::SyntaxMailFrom)?;

        let (reverse_path, params) =
            Address::parse_path(path).map_err(|_| CodesID::BadSenderAddress)?;

        Ok(Self::MailCmd(
            reverse_path,
            params
                .split_whitespace()
                .map(str::to_ascii_uppercase)
                .collect(),
        ))
    }

    fn parse_arg_rcpt_to(argument: &str) -> Result<Self, CodesID> {
        let path = argument
            .get(.."TO:".len())
            .filter(|prefix| prefix.eq_ignore_ascii_case("TO:"))
            .map(|_| &argument["TO:".len()..])
            .ok_or(CodesID::SyntaxRcptTo)?;

        let (forward_path, params) =
            Address::parse_path(path).map_err(|_| CodesID::BadRcptAddress)?;
        if forward_path.is_null() {
            return Err(CodesID::BadRcptAddress);
        }

        Ok(Self::RcptCmd(
            forward_path,
            params
                .split_whitespace()
                .map(str::to_ascii_uppercase)
                .collect(),
        ))
    }

    fn parse_arg_auth(argument: &str) -> Result<Self, CodesID> {
        let mut words = argument.split_whitespace();
        let mechanism = words
            .next()
            .filter(|m| !m.is_empty())
            .ok_or(CodesID::SyntaxErrorParams)?;
        let initial_response = words.next();
        if words.next().is_some() {
            return Err(CodesID::SyntaxErrorParams);
        }

        Ok(Self::Auth(
            mechanism
                .parse::<Mechanism>()
                .map_err(|_| CodesID::AuthMechNotSupported)?,
            initial_response.map(|s| s.as_bytes().to_vec()),
        ))
    }
}
