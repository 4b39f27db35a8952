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

/// List of supported SASL Mechanism
/// See https://www.iana.org/assignments/sasl-mechanisms/sasl-mechanisms.xhtml
#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub enum Mechanism {
    /// Common, but for interoperability
    Plain,
    /// Obsolete
    Login,
    /// Limited
    CramMd5,
}

impl Default for Mechanism {
    fn default() -> Self {
        Self::Plain
    }
}

impl Mechanism {
    /// Does the client send its credential on the AUTH line itself
    #[must_use]
    pub const fn client_first(self) -> bool {
        match self {
            Self::Plain => true,
            Self::Login | Self::CramMd5 => false,
        }
    }

    /// Does this mechanism expose the password on the wire, requiring TLS
    /// (STARTTLS or tunnel) unless explicitly allowed in clair
    #[must_use]
    pub const fn must_be_under_tls(self) -> bool {
        match self {
            Self::Plain | Self::Login => true,
            // the challenge/response never transports the password
            Self::CramMd5 => false,
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        })
    }
}

impl From<Mechanism> for String {
    fn from(this: Mechanism) -> Self {
        format!("{this}")
    }
}

impl std::str::FromStr for Mechanism {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAIN" => Ok(Self::Plain),
            "LOGIN" => Ok(Self::Login),
            "CRAM-MD5" => Ok(Self::CramMd5),
            _ => anyhow::bail!("not a valid AUTH Mechanism: '{}'", s),
        }
    }
}

impl TryFrom<String> for Mechanism {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        <Self as std::str::FromStr>::from_str(&s)
    }
}
