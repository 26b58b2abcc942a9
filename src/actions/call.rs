//! Parser for function-call style action strings such as
//! `type(index=2, text="hello, world")`.

use std::collections::HashMap;

use thiserror::Error;

/// Call parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallParseError {
    #[error("Not a call: {0}")]
    InvalidFormat(String),
    #[error("Unterminated string in call: {0}")]
    UnterminatedString(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// A parsed call: a lowercase name and its keyword arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: HashMap<String, String>,
}

impl Call {
    /// Raw argument value.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Required argument value.
    pub fn require(&self, key: &str) -> Result<&str, CallParseError> {
        self.arg(key)
            .ok_or_else(|| CallParseError::MissingParameter(key.to_string()))
    }

    /// Required argument parsed into `T`.
    pub fn require_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<T, CallParseError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| CallParseError::InvalidValue {
            name: key.to_string(),
            value: raw.to_string(),
        })
    }
}

/// Parse `name(key=value, ...)`.
///
/// Values may be bare or quoted with `"` or `'`; commas and `=` inside quotes
/// are kept verbatim. Bare values keep their inner spaces and lose the
/// surrounding ones.
pub fn parse_call(input: &str) -> Result<Call, CallParseError> {
    let input = input.trim().trim_end_matches(';').trim();

    let open = input
        .find('(')
        .ok_or_else(|| CallParseError::InvalidFormat(input.to_string()))?;
    let content = input[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| CallParseError::InvalidFormat(input.to_string()))?;

    let name = input[..open].trim().to_lowercase();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(CallParseError::InvalidFormat(input.to_string()));
    }

    let mut args = HashMap::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_string = false;
    let mut string_char = '"';
    let mut parsing_key = true;
    let mut bare = false;

    for c in content.chars() {
        if in_string {
            if c == string_char {
                in_string = false;
            } else {
                value.push(c);
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = true;
                string_char = c;
            }
            '=' if parsing_key => {
                parsing_key = false;
            }
            ',' => {
                push_arg(&mut args, &mut key, &mut value, bare);
                parsing_key = true;
                bare = false;
            }
            _ if c.is_whitespace() => {
                if !parsing_key && bare {
                    value.push(c);
                }
            }
            _ => {
                if parsing_key {
                    key.push(c);
                } else {
                    value.push(c);
                    bare = true;
                }
            }
        }
    }

    if in_string {
        return Err(CallParseError::UnterminatedString(input.to_string()));
    }
    push_arg(&mut args, &mut key, &mut value, bare);

    Ok(Call { name, args })
}

fn push_arg(args: &mut HashMap<String, String>, key: &mut String, value: &mut String, bare: bool) {
    let trimmed = key.trim();
    if !trimmed.is_empty() {
        let mut value = std::mem::take(value);
        if bare {
            value.truncate(value.trim_end().len());
        }
        args.insert(trimmed.to_lowercase(), value);
    }
    key.clear();
    value.clear();
}
