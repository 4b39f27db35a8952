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

/// Code at the start of each line of a reply
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum ReplyCode {
    /// simple reply code as defined in RFC 5321
    Code {
        /// https://datatracker.ietf.org/doc/html/rfc5321#section-4.2
        code: u16,
    },
    /// enhanced status code, see RFC 2034
    Enhanced {
        /// https://datatracker.ietf.org/doc/html/rfc5321#section-4.2
        code: u16,
        /// `class.subject.detail`
        enhanced: String,
    },
}

impl ReplyCode {
    /// is the code a 4yz or 5yz negative completion
    #[must_use]
    pub const fn is_error(&self) -> bool {
        match self {
            Self::Code { code } | Self::Enhanced { code, .. } => *code >= 400,
        }
    }

    fn try_parse<'a>(self, words: &[&str], line: &'a str) -> anyhow::Result<(Self, &'a str)> {
        match (self, words) {
            (Self::Enhanced { .. }, [_, "", ..]) => anyhow::bail!("empty second word"),
            (Self::Enhanced { .. }, [code, enhanced, ..]) => {
                let enhanced_len = enhanced.len();
                let enhanced = enhanced
                    .splitn(3, '.')
                    .map(|s| {
                        s.parse::<u16>()?;
                        Ok(s.to_string())
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?
                    .join(".");

                Ok((
                    Self::Enhanced {
                        code: code.parse::<u16>()?,
                        enhanced,
                    },
                    {
                        let mut line = &line[code.len() + 1 + enhanced_len..];
                        if line.starts_with(' ') {
                            line = &line[1..];
                        }
                        line
                    },
                ))
            }
            (Self::Code { .. }, [code, ..]) => Ok((
                Self::Code {
                    code: code.parse::<u16>()?,
                },
                {
                    let mut line = &line[code.len()..];
                    if line.starts_with(' ') {
                        line = &line[1..];
                    }
                    line
                },
            )),
            _ => anyhow::bail!("invalid data {line}"),
        }
    }

    /// parse one reply line into its code and trailing text
    ///
    /// # Errors
    ///
    /// * not the right format
    pub fn parse(line: &str) -> anyhow::Result<(Self, &'_ str)> {
        let words = line.split(' ').collect::<Vec<&str>>();
        for i in [
            Self::Enhanced {
                code: u16::default(),
                enhanced: String::default(),
            },
            Self::Code {
                code: u16::default(),
            },
        ] {
            let output = i.try_parse(words.as_slice(), line);
            if output.is_ok() {
                return output;
            }
        }
        anyhow::bail!("invalid format {words:?}");
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code { code } => f.write_fmt(format_args!("{code}")),
            Self::Enhanced { code, enhanced } => f.write_fmt(format_args!("{code} {enhanced}")),
        }
    }
}
