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

/// maximum accumulated length of a local part
const LOCAL_PART_MAX_LENGTH: usize = 129;

/// Email address, either a mailbox or the null reverse path `<>`
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, Eq)]
#[serde(into = "String", try_from = "String")]
pub struct Address {
    #[serde(skip)]
    at_sign: Option<usize>,
    full: String,
}

impl TryFrom<String> for Address {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self::null());
        }
        let (address, remainder) = Self::parse_path(&value)
            .map_err(|error| anyhow::anyhow!("'{}' is not a valid address: {}", value, error))?;
        if !remainder.is_empty() {
            anyhow::bail!("'{}' is not a valid address: trailing input", value);
        }
        Ok(address)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.full
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

const fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '-' | '.' | '_')
}

impl Address {
    /// the null reverse path `<>`, valid only as a MAIL sender
    #[must_use]
    pub const fn null() -> Self {
        Self {
            at_sign: None,
            full: String::new(),
        }
    }

    ///
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.full.is_empty()
    }

    /// get the full email address.
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    /// get the user of the address.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.at_sign.map_or(&*self.full, |at| &self.full[..at])
    }

    /// get the fqdn of the address.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.at_sign.map(|at| &self.full[at + 1..])
    }

    /// Parse the RFC 5321 "Path" form of a MAIL/RCPT argument.
    ///
    /// Accepts `<mailbox>`, `<>`, the source-route form `<@a,@b:mailbox>`
    /// (the route is discarded), quoted local parts with one level of `\`
    /// escaping, and bare mailboxes delimited by the first unquoted space.
    /// Whatever follows the path (service extensions such as `SIZE=`) is
    /// returned as the second value, leading spaces trimmed.
    ///
    /// # Errors
    ///
    /// * asymmetric angle brackets
    /// * characters outside the permitted set
    /// * local part longer than 129 bytes
    pub fn parse_path(input: &str) -> anyhow::Result<(Self, &str)> {
        let input = input.trim_start();
        if let Some(rest) = input.strip_prefix('<') {
            let mut in_quotes = false;
            let mut escaped = false;
            let mut close = None;
            for (i, c) in rest.char_indices() {
                if escaped {
                    escaped = false;
                    continue;
                }
                match c {
                    '\\' if in_quotes => escaped = true,
                    '"' => in_quotes = !in_quotes,
                    '>' if !in_quotes => {
                        close = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            let close = close.ok_or_else(|| anyhow::anyhow!("expected '>' closing the path"))?;
            let remainder = rest[close + 1..].trim_start();
            let inner = &rest[..close];
            if inner.is_empty() {
                return Ok((Self::null(), remainder));
            }
            let mailbox = if inner.starts_with('@') {
                // source route, accepted and discarded
                let colon = inner
                    .find(':')
                    .ok_or_else(|| anyhow::anyhow!("malformed source route"))?;
                &inner[colon + 1..]
            } else {
                inner
            };
            Ok((Self::parse_mailbox(mailbox)?, remainder))
        } else {
            let mut in_quotes = false;
            let mut escaped = false;
            let mut end = input.len();
            for (i, c) in input.char_indices() {
                if escaped {
                    escaped = false;
                    continue;
                }
                match c {
                    '\\' if in_quotes => escaped = true,
                    '"' => in_quotes = !in_quotes,
                    ' ' if !in_quotes => {
                        end = i;
                        break;
                    }
                    _ => {}
                }
            }
            let (mailbox, remainder) = input.split_at(end);
            let mailbox = mailbox.trim_end();
            if mailbox.is_empty() {
                anyhow::bail!("empty path");
            }
            Ok((Self::parse_mailbox(mailbox)?, remainder.trim_start()))
        }
    }

    fn parse_mailbox(mailbox: &str) -> anyhow::Result<Self> {
        if mailbox.starts_with('"') {
            let mut escaped = false;
            let mut content_len = 0_usize;
            let mut close = None;
            for (i, c) in mailbox.char_indices().skip(1) {
                if escaped {
                    escaped = false;
                    content_len += 1;
                    continue;
                }
                match c {
                    '\\' => escaped = true,
                    '"' => {
                        close = Some(i);
                        break;
                    }
                    _ => content_len += 1,
                }
            }
            let close = close.ok_or_else(|| anyhow::anyhow!("unterminated quoted local part"))?;
            if content_len > LOCAL_PART_MAX_LENGTH {
                anyhow::bail!("local part exceeds {LOCAL_PART_MAX_LENGTH} characters");
            }
            let rest = &mailbox[close + 1..];
            if rest.is_empty() {
                return Ok(Self {
                    at_sign: None,
                    full: mailbox.to_string(),
                });
            }
            let domain = rest
                .strip_prefix('@')
                .ok_or_else(|| anyhow::anyhow!("expected '@' after the quoted local part"))?;
            if domain.is_empty() || !domain.chars().all(is_bareword_char) {
                anyhow::bail!("invalid domain: '{domain}'");
            }
            Ok(Self {
                at_sign: Some(close + 1),
                full: mailbox.to_string(),
            })
        } else {
            if let Some(invalid) = mailbox.chars().find(|c| !is_bareword_char(*c)) {
                anyhow::bail!("invalid character in mailbox: '{invalid}'");
            }
            let at_sign = mailbox.find('@');
            if at_sign.unwrap_or(mailbox.len()) > LOCAL_PART_MAX_LENGTH {
                anyhow::bail!("local part exceeds {LOCAL_PART_MAX_LENGTH} characters");
            }
            Ok(Self {
                at_sign,
                full: mailbox.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed() {
        let (address, remainder) = Address::parse_path("<hello@domain.com>").unwrap();
        assert_eq!(address.full(), "hello@domain.com");
        assert_eq!(address.local_part(), "hello");
        assert_eq!(address.domain(), Some("domain.com"));
        assert!(remainder.is_empty());
    }

    #[test]
    fn bare_with_remainder() {
        let (address, remainder) =
            Address::parse_path("  john@doe SIZE=1024 BODY=8BITMIME").unwrap();
        assert_eq!(address.full(), "john@doe");
        assert_eq!(remainder, "SIZE=1024 BODY=8BITMIME");
    }

    #[test]
    fn null_path() {
        let (address, remainder) = Address::parse_path("<>").unwrap();
        assert!(address.is_null());
        assert!(remainder.is_empty());
    }

    #[test]
    fn source_route_discarded() {
        let (address, _) =
            Address::parse_path("<@relay.one,@relay.two:john@doe.net>").unwrap();
        assert_eq!(address.full(), "john@doe.net");
    }

    #[test]
    fn quoted_local_part() {
        let (address, remainder) = Address::parse_path(r#"<"john \"q\" doe"@host> FOO"#).unwrap();
        assert_eq!(address.full(), r#""john \"q\" doe"@host"#);
        assert_eq!(address.domain(), Some("host"));
        assert_eq!(remainder, "FOO");
    }

    #[test]
    fn asymmetric_brackets() {
        assert!(Address::parse_path("<john@doe").is_err());
        assert!(Address::parse_path("<john@doe> ").is_ok());
    }

    #[test]
    fn local_part_too_long() {
        let too_long = format!("<{}@b>", "a".repeat(130));
        assert!(Address::parse_path(&too_long).is_err());
        let fits = format!("<{}@b>", "a".repeat(129));
        assert!(Address::parse_path(&fits).is_ok());
    }

    #[test]
    fn rejected_characters() {
        assert!(Address::parse_path("<jo hn@doe>").is_err());
        assert!(Address::parse_path("<john!@doe>").is_err());
    }

    #[test]
    fn round_trip() {
        for path in ["<john@doe.net>", "<aa@bb>", "<\"a b\"@host>", "postmaster"] {
            let (address, _) = Address::parse_path(path).unwrap();
            let (again, _) = Address::parse_path(address.full()).unwrap();
            assert_eq!(address, again);
        }
    }

    #[test]
    fn deserialize() {
        let parsed = serde_json::from_str::<Address>(r#""hello@domain.com""#).unwrap();
        assert_eq!(parsed.full(), "hello@domain.com");
        assert_eq!(parsed.local_part(), "hello");
        assert_eq!(parsed.domain(), Some("domain.com"));
    }

    #[test]
    fn serialize() {
        assert_eq!(
            serde_json::to_string(&Address::try_from("hello@domain.com".to_string()).unwrap())
                .unwrap(),
            r#""hello@domain.com""#
        );
    }
}
