//! Parses a user's message into a Cobalt request.
//!
//! Format: `<link> [key=value ...]`, e.g. `https://youtu.be/xyz m=audio`.

use std::collections::BTreeMap;

use serde::Serialize;

/// Short option keys users type, mapped to Cobalt request fields.
const OPTION_KEYS: &[(&str, &str)] = &[("m", "downloadMode")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRequest {
    pub url: String,
    #[serde(rename = "filenameStyle")]
    pub filename_style: &'static str,
    #[serde(flatten)]
    pub options: BTreeMap<&'static str, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first word is not an http(s) link.
    NotALink,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NotALink => write!(f, "message does not start with a link"),
        }
    }
}

impl std::error::Error for ParseError {}

pub fn parse_request(text: &str) -> Result<MediaRequest, ParseError> {
    let mut words = text.split_whitespace();
    let link = words.next().ok_or(ParseError::NotALink)?;
    if !link.starts_with("http") {
        return Err(ParseError::NotALink);
    }

    let mut options = BTreeMap::new();
    for word in words {
        let mut parts = word.split('=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        // Later flags win; unknown keys are dropped
        if let Some((_, field)) = OPTION_KEYS.iter().find(|(short, _)| *short == key) {
            options.insert(*field, value.to_string());
        }
    }

    Ok(MediaRequest {
        url: link.to_string(),
        filename_style: "basic",
        options,
    })
}
