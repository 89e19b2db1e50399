use std::fmt;

/// A parsed media type such as `application/json; charset=utf-8`.
///
/// `essence` is the lowercased `type/subtype`; parameter names are
/// lowercased, values keep their case with quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

/// Why a media type string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    Empty,
    ExpectedSlash,
    ExpectedToken,
    InvalidParameter(String),
    UnterminatedQuote,
}

impl fmt::Display for MediaTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTypeError::Empty => write!(f, "no media type"),
            MediaTypeError::ExpectedSlash => write!(f, "expected slash after first token"),
            MediaTypeError::ExpectedToken => write!(f, "expected token after slash"),
            MediaTypeError::InvalidParameter(p) => write!(f, "invalid media parameter {p:?}"),
            MediaTypeError::UnterminatedQuote => write!(f, "unterminated quoted parameter value"),
        }
    }
}

impl std::error::Error for MediaTypeError {}

fn is_tchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn take_token(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|(_, c)| !is_tchar(*c))
        .map_or(input.len(), |(i, _)| i);
    input.split_at(end)
}

impl MediaType {
    /// Parse `type/subtype *( ";" name=value )`.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let (main, rest) = take_token(input);
        if main.is_empty() {
            return Err(MediaTypeError::ExpectedToken);
        }
        let rest = rest.strip_prefix('/').ok_or(MediaTypeError::ExpectedSlash)?;
        let (sub, mut rest) = take_token(rest);
        if sub.is_empty() {
            return Err(MediaTypeError::ExpectedToken);
        }
        let essence = format!("{main}/{sub}").to_ascii_lowercase();

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            rest = rest
                .strip_prefix(';')
                .ok_or_else(|| MediaTypeError::InvalidParameter(rest.to_string()))?
                .trim_start();
            if rest.is_empty() {
                // Trailing `;` is tolerated.
                break;
            }
            let (name, after) = take_token(rest);
            if name.is_empty() {
                return Err(MediaTypeError::InvalidParameter(rest.to_string()));
            }
            let after = after
                .strip_prefix('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter(name.to_string()))?;
            let (value, after) = if let Some(quoted) = after.strip_prefix('"') {
                parse_quoted(quoted)?
            } else {
                let (v, a) = take_token(after);
                if v.is_empty() {
                    return Err(MediaTypeError::InvalidParameter(name.to_string()));
                }
                (v.to_string(), a)
            };
            params.push((name.to_ascii_lowercase(), value));
            rest = after;
        }

        Ok(Self { essence, params })
    }

    #[must_use]
    pub fn essence(&self) -> &str {
        &self.essence
    }

    #[must_use]
    pub fn main_type(&self) -> &str {
        self.essence.split('/').next().unwrap_or_default()
    }

    #[must_use]
    pub fn sub_type(&self) -> &str {
        self.essence.split('/').nth(1).unwrap_or_default()
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `charset` parameter, lowercased.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        self.param("charset").map(str::to_ascii_lowercase)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (k, v) in &self.params {
            write!(f, "; {k}={v}")?;
        }
        Ok(())
    }
}

fn parse_quoted(input: &str) -> Result<(String, &str), MediaTypeError> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => return Err(MediaTypeError::UnterminatedQuote),
            },
            other => value.push(other),
        }
    }
    Err(MediaTypeError::UnterminatedQuote)
}

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub media_type: MediaType,
    pub quality: f32,
}

impl MediaRange {
    /// How specifically this range matches `essence`: 3 for an exact
    /// match, 2 for `type/*`, 1 for `*/*`, `None` when it does not match.
    #[must_use]
    pub fn specificity(&self, essence: &str) -> Option<u8> {
        let range = self.media_type.essence();
        if range == "*/*" {
            return Some(1);
        }
        if range == essence {
            return Some(3);
        }
        let (main, sub) = range.split_once('/')?;
        if sub == "*" && essence.split_once('/').map(|(m, _)| m) == Some(main) {
            return Some(2);
        }
        None
    }
}

/// Parse an `Accept` header. Malformed ranges and ranges with an invalid
/// `q` are skipped. An empty header yields `*/*`.
#[must_use]
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let ranges: Vec<MediaRange> = header
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|raw| {
            let media_type = MediaType::parse(raw).ok()?;
            let quality = match media_type.param("q") {
                Some(q) => {
                    let q: f32 = q.parse().ok()?;
                    if !(0.0..=1.0).contains(&q) {
                        return None;
                    }
                    q
                }
                None => 1.0,
            };
            Some(MediaRange {
                media_type,
                quality,
            })
        })
        .collect();
    if header.trim().is_empty() {
        return vec![any_range()];
    }
    ranges
}

pub(crate) fn any_range() -> MediaRange {
    MediaRange {
        media_type: MediaType {
            essence: "*/*".to_string(),
            params: Vec::new(),
        },
        quality: 1.0,
    }
}
