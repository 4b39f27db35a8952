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
use crate::envelop::Envelop;

/// metadata
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MessageMetadata {
    /// instant when the last "MAIL FROM" has been received.
    pub timestamp: std::time::SystemTime,
    /// unique id generated when the "MAIL FROM" has been received.
    /// format: `{mail timestamp}{connection timestamp}{random}{process id}`
    pub message_id: String,
}

/// Representation of one mail obtained by a smtp transaction
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MailContext {
    /// time of connection by the client.
    pub connection_timestamp: std::time::SystemTime,
    /// address of the client.
    pub client_addr: std::net::SocketAddr,
    /// envelop of the message.
    pub envelop: Envelop,
    /// headers extracted during the DATA phase, in the order received.
    pub headers: Vec<(String, String)>,
    /// raw body following the header terminator, dot-unstuffed, exclusive
    /// of the end-of-data sentinel.
    pub body: Vec<u8>,
    /// metadata, present once a MAIL command has been accepted.
    pub metadata: Option<MessageMetadata>,
}
