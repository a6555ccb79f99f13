//! RFC 1035 master file parser
//!
//! Supported syntax:
//! - `;` comments (outside quoted strings)
//! - `$ORIGIN` and `$TTL` directives
//! - `@` for the current origin, relative and absolute owner names
//! - blank owner (line starting with whitespace) repeats the previous owner
//! - optional TTL and class, in either order, before the type
//! - parenthesised records spanning several lines
//! - quoted strings with embedded spaces
//!
//! `$INCLUDE` and `$GENERATE` are rejected.

use crate::zone_file::{ZoneEntry, ZoneFile, qualify};
use tracing::{debug, trace};
use zonesync_core::{Error, Result};

const CLASSES: &[&str] = &["IN", "CH", "HS", "CS"];

/// Parser state carried from line to line
pub struct ZoneFileParser {
    origin: String,
    default_ttl: u32,
    last_owner: Option<String>,
    line_number: usize,
}

impl ZoneFileParser {
    /// Create a parser for a zone whose origin and TTL come from configuration
    ///
    /// Both can be overridden by `$ORIGIN` and `$TTL` in the file.
    pub fn new(origin: &str, default_ttl: u32) -> Self {
        Self {
            origin: origin.trim_end_matches('.').to_string(),
            default_ttl,
            last_owner: None,
            line_number: 0,
        }
    }

    /// Parse zone file contents
    pub fn parse(mut self, contents: &str) -> Result<ZoneFile> {
        let zone_origin = self.origin.clone();
        let mut entries = Vec::new();

        let mut buffer = String::new();
        let mut depth = 0usize;
        let mut start_line = 0;

        for line in contents.lines() {
            self.line_number += 1;
            let line = strip_comment(line);

            if depth == 0 {
                if line.trim().is_empty() {
                    continue;
                }
                buffer.clear();
                start_line = self.line_number;
            } else {
                buffer.push(' ');
            }

            buffer.push_str(line);
            depth = paren_depth(depth, line).map_err(|msg| self.error(msg))?;
            if depth > 0 {
                continue;
            }

            trace!("Parsing logical line {}: {}", start_line, buffer);

            if buffer.trim_start().starts_with('$') {
                self.directive(&buffer)?;
            } else {
                entries.push(self.record(&buffer, start_line)?);
            }
        }

        if depth > 0 {
            return Err(Error::zone_file(format!(
                "Unclosed parenthesis starting at line {}",
                start_line
            )));
        }

        debug!("Parsed {} entries for zone {}", entries.len(), zone_origin);

        Ok(ZoneFile {
            origin: zone_origin,
            default_ttl: self.default_ttl,
            entries,
        })
    }

    fn error(&self, msg: impl std::fmt::Display) -> Error {
        Error::zone_file(format!("Line {}: {}", self.line_number, msg))
    }

    fn directive(&mut self, line: &str) -> Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let keyword = parts.first().map(|p| p.to_ascii_uppercase()).unwrap_or_default();

        match keyword.as_str() {
            "$ORIGIN" => {
                let name = parts
                    .get(1)
                    .ok_or_else(|| self.error("$ORIGIN requires a domain name"))?;
                self.origin = qualify(name, &self.origin).trim_end_matches('.').to_string();
                debug!("Set origin to {}", self.origin);
                Ok(())
            }
            "$TTL" => {
                let value = parts.get(1).ok_or_else(|| self.error("$TTL requires a value"))?;
                self.default_ttl =
                    parse_ttl(value).ok_or_else(|| self.error(format!("Invalid TTL {}", value)))?;
                debug!("Set default TTL to {}", self.default_ttl);
                Ok(())
            }
            other => Err(self.error(format!("Unsupported directive {}", other))),
        }
    }

    fn record(&mut self, line: &str, start_line: usize) -> Result<ZoneEntry> {
        let tokens = tokenize(line);
        let mut idx = 0;

        let owner = if line.starts_with([' ', '\t']) {
            self.last_owner
                .clone()
                .ok_or_else(|| Error::zone_file(format!("Line {}: no previous owner", start_line)))?
        } else {
            let name = tokens
                .first()
                .ok_or_else(|| Error::zone_file(format!("Line {}: empty record", start_line)))?;
            idx += 1;
            qualify(name, &self.origin)
        };

        let mut ttl = None;
        let mut class = None;
        let mut rtype = None;

        while let Some(token) = tokens.get(idx) {
            idx += 1;
            if ttl.is_none() {
                if let Some(value) = parse_ttl(token) {
                    ttl = Some(value);
                    continue;
                }
            }
            if class.is_none() && CLASSES.iter().any(|c| c.eq_ignore_ascii_case(token)) {
                class = Some(token.to_ascii_uppercase());
                continue;
            }
            if is_type_mnemonic(token) {
                rtype = Some(token.to_ascii_uppercase());
                break;
            }
            return Err(Error::zone_file(format!(
                "Line {}: unexpected field {:?}",
                start_line, token
            )));
        }

        let rtype = rtype
            .ok_or_else(|| Error::zone_file(format!("Line {}: missing record type", start_line)))?;

        let rdata = &tokens[idx..];
        if rdata.is_empty() {
            return Err(Error::zone_file(format!("Line {}: missing RDATA", start_line)));
        }

        self.last_owner = Some(owner.clone());

        Ok(ZoneEntry {
            name: owner,
            ttl: ttl.unwrap_or(self.default_ttl),
            class: class.unwrap_or_else(|| "IN".to_string()),
            rdata: qualify_rdata(&rtype, rdata, &self.origin),
            rtype,
        })
    }
}

/// Drop everything after the first `;` that is not inside quotes
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

fn paren_depth(mut depth: usize, line: &str) -> std::result::Result<usize, &'static str> {
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth.checked_sub(1).ok_or("unbalanced ')'")?;
            }
            _ => {}
        }
    }
    Ok(depth)
}

/// Split a logical line on whitespace, keeping quoted strings whole
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' | ')' if !in_quotes => {}
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse a TTL, with optional s/m/h/d/w unit suffixes (e.g. "1h30m")
pub(crate) fn parse_ttl(token: &str) -> Option<u32> {
    if token.is_empty() || !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(seconds) = token.parse::<u32>() {
        return Some(seconds);
    }

    let mut total: u32 = 0;
    let mut number = String::new();
    for ch in token.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let unit = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return None,
        };
        let value: u32 = number.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        number.clear();
    }

    if number.is_empty() { Some(total) } else { None }
}

fn is_type_mnemonic(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic())
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Join RDATA tokens, qualifying the fields that hold domain names
fn qualify_rdata(rtype: &str, tokens: &[String], origin: &str) -> String {
    let name_fields: &[usize] = match rtype {
        "CNAME" | "NS" | "PTR" | "DNAME" => &[0],
        "MX" => &[1],
        "SRV" => &[3],
        "SOA" => &[0, 1],
        _ => &[],
    };

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            if name_fields.contains(&i) {
                qualify(token, origin)
            } else {
                token.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
