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
use crate::auth::Credentials;

/// Data received during one smtp transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Envelop {
    /// the hostname the client identified with on HELO/EHLO
    pub helo: String,
    /// the sender received with the MAIL command, `None` until then,
    /// `Some(null address)` for the null reverse path `<>`
    pub mail_from: Option<Address>,
    /// recipients received with the RCPT command, in order, duplicates kept
    pub rcpt: Vec<Address>,
    /// size the client declared with `MAIL FROM:<..> SIZE=`, advisory
    pub expected_size: Option<u64>,
    /// what the client authenticated with, when it did
    pub credentials: Option<Credentials>,
}
