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
use crate::mechanism::Mechanism;
use crate::{Reply, ReplyCode};

/// One advertised ESMTP capability, `value` is `None` for plain flags
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Extension {
    /// capability name, kept uppercase
    pub name: String,
    /// capability parameter, omitted from the EHLO line when absent
    pub value: Option<String>,
}

/// The set of capabilities advertised in the EHLO response, queried later by
/// the command handlers. Insertion order is the advertisement order; lookups
/// are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Extensions {
    entries: Vec<Extension>,
}

impl Extensions {
    /// the built-in set every EHLO offer starts from
    #[must_use]
    pub fn with_builtins(message_size_max: u64) -> Self {
        let mut this = Self::default();
        this.set("SIZE", Some(message_size_max.to_string()));
        this.set("8BITMIME", None);
        this.set("PIPELINING", None);
        this
    }

    /// add or replace a capability
    pub fn set(&mut self, name: &str, value: Option<String>) {
        let name = name.to_uppercase();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Extension { name, value }),
        }
    }

    ///
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    ///
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    ///
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(name));
    }

    ///
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    ///
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.entries.iter()
    }

    /// the advertised `SIZE` value, when present and well formed
    #[must_use]
    pub fn size_limit(&self) -> Option<u64> {
        self.get("SIZE")?.value.as_ref()?.parse().ok()
    }

    /// the mechanisms listed in the `AUTH` capability value, unknown
    /// tokens skipped
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<Mechanism> {
        self.get("AUTH")
            .and_then(|e| e.value.as_ref())
            .map(|value| {
                value
                    .split_whitespace()
                    .filter_map(|token| token.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// the multi-line EHLO response: the server hostname first, then one
    /// line per capability
    #[must_use]
    pub fn to_ehlo_reply(&self, server_name: &str) -> Reply {
        let lines = std::iter::once(server_name.to_string())
            .chain(self.entries.iter().map(|Extension { name, value }| {
                value
                    .as_ref()
                    .map_or_else(|| name.clone(), |value| format!("{name} {value}"))
            }))
            .collect::<Vec<_>>();
        Reply::new(ReplyCode::Code { code: 250 }, lines.join("\r\n"))
    }
}
