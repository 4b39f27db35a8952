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
use crate::ReplyCode;

/// SMTP message sent by the server to the client as defined in RFC 5321 §4.2
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Reply {
    #[serde(flatten)]
    code: ReplyCode,
    text: String,
}

impl<'de> serde::Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ReplyVisitor;

        impl<'de> serde::de::Visitor<'de> for ReplyVisitor {
            type Value = Reply;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a reply line or a { code, enhanced, text } map")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Reply::parse_str(v).map_err(serde::de::Error::custom)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                #[derive(serde::Deserialize)]
                #[serde(field_identifier, rename_all = "lowercase")]
                enum Field {
                    Code,
                    Enhanced,
                    Text,
                }

                let mut text: Option<String> = None;
                let mut code = None;
                let mut enhanced = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Code => {
                            if code.is_some() {
                                return Err(serde::de::Error::duplicate_field("code"));
                            }
                            code = Some(map.next_value()?);
                        }
                        Field::Text => {
                            if text.is_some() {
                                return Err(serde::de::Error::duplicate_field("text"));
                            }
                            text = Some(map.next_value()?);
                        }
                        Field::Enhanced => {
                            if enhanced.is_some() {
                                return Err(serde::de::Error::duplicate_field("enhanced"));
                            }
                            enhanced = Some(map.next_value()?);
                        }
                    }
                }
                let code = code.ok_or_else(|| serde::de::Error::missing_field("code"))?;
                Ok(Reply::new(
                    match enhanced {
                        Some(enhanced) => ReplyCode::Enhanced { code, enhanced },
                        None => ReplyCode::Code { code },
                    },
                    text.ok_or_else(|| serde::de::Error::missing_field("text"))?,
                ))
            }
        }

        deserializer.deserialize_any(ReplyVisitor)
    }
}

impl Reply {
    ///
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.ends_with("\r\n") {
            log::info!("smtp replies do not need a trailing '\\r\\n', it is inserted automatically");
        }

        Self { code, text }
    }

    ///
    #[must_use]
    pub const fn code(&self) -> &ReplyCode {
        &self.code
    }

    ///
    #[must_use]
    pub const fn text(&self) -> &String {
        &self.text
    }

    ///
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// produce the wire form: one `<code> <text>\r\n` line per text line,
    /// every line but the last carrying the `-` continuation marker
    #[must_use]
    pub fn fold(&self) -> String {
        let prefix = format!("{} ", self.code).chars().collect::<Vec<_>>();

        let output = self
            .text
            .split("\r\n")
            .filter(|s| !s.is_empty())
            .flat_map(|line| {
                line.chars()
                    .collect::<Vec<char>>()
                    .chunks(80 - (prefix.len() + 2))
                    .flat_map(|c| [&prefix, c, &"\r\n".chars().collect::<Vec<_>>()].concat())
                    .collect::<String>()
                    .chars()
                    .collect::<Vec<_>>()
            })
            .collect::<String>();

        let mut output = output
            .split("\r\n")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        if output.is_empty() {
            return format!("{}\r\n", self.code);
        }

        let len = output.len();
        for i in &mut output[0..len - 1] {
            i.replace_range(3..4, "-");
        }

        output
            .into_iter()
            .flat_map(|mut l| {
                l.push_str("\r\n");
                l.chars().collect::<Vec<_>>()
            })
            .collect::<String>()
    }

    /// parse a `<code> [enhanced] <text>` line
    ///
    /// # Errors
    ///
    /// * the line does not begin with a valid code
    pub fn parse_str(line: &str) -> anyhow::Result<Self> {
        let (code, text) = ReplyCode::parse(line)?;
        Ok(Self::new(code, text.to_string()))
    }
}
