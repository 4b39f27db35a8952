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

/// Identifier of a configurable reply, the key of the codes table
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    serde::Deserialize,
    serde::Serialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum CodesID {
    //
    // Special messages
    //
    /// First message sent by the server
    Greetings,
    /// Answer to QUIT, right before closing
    Closing,
    /// Answer to HELO
    Helo,
    /// Answer to DATA, the client may start the mail input
    DataStart,
    //
    // Session status
    //
    /// Accepted
    Ok,
    /// Sender accepted
    MailOk,
    /// Recipient accepted
    RcptOk,
    //
    // Command parsing
    //
    ///
    UnrecognizedCommand,
    ///
    SyntaxErrorParams,
    /// HELO without a hostname
    SyntaxHelo,
    /// EHLO without a hostname
    SyntaxEhlo,
    /// MAIL without a `FROM:` path
    SyntaxMailFrom,
    /// RCPT without a `TO:` path
    SyntaxRcptTo,
    /// the reverse path does not parse
    BadSenderAddress,
    /// the forward path does not parse or is empty
    BadRcptAddress,
    /// the command takes no parameter at all
    NoParametersAllowed,
    ///
    Unimplemented,
    //
    // Sequencing
    //
    ///
    BadSequence,
    /// MAIL, RCPT or DATA before any HELO/EHLO
    HeloFirst,
    /// AUTH or STARTTLS before EHLO
    EhloFirst,
    /// MAIL while a sender is already set
    NestedMail,
    /// RCPT or DATA before MAIL
    NeedMail,
    /// DATA without any accepted recipient
    NeedRcpt,
    //
    // TLS extension
    //
    ///
    TlsNotAvailable,
    ///
    TlsAlreadyActive,
    /// The server policy requires a secured connection for mail transactions
    TlsRequired,
    //
    // Auth extension
    //
    ///
    AuthSucceeded,
    /// AUTH issued while the capability is not advertised
    AuthNotImplemented,
    ///
    AuthMechNotSupported,
    ///
    AuthClientMustNotStart,
    ///
    AuthMechanismMustBeEncrypted,
    ///
    AuthInvalidCredentials,
    /// The server policy requires an authenticated client for mail transactions
    AuthRequired,
    ///
    AuthClientCanceled,
    ///
    AuthErrorDecode64,
    /// The decoded SASL payload has the wrong shape
    AuthMalformed,
    //
    // Resource limits
    //
    /// The `error_count` threshold has been passed, the connection closes
    TooManyError,
    ///
    Timeout,
    ///
    TooManyRecipients,
    /// Stored message bytes went over the effective SIZE cap
    TooLarge,
}
