//! Structured command grammar for outgoing RCON notifications.
//!
//! Commands have the shape `<prefix> <target> <TAG> <field>…` where
//! `target=0` broadcasts and a positive integer addresses one game slot.
//! Free-text fields are double-quoted with embedded quotes escaped as
//! `\"`; missing optional strings serialize as `""`. Numeric fields are
//! plain base-10 ASCII.

use serde::{Deserialize, Serialize};

/// Broadcast target for commands addressed to everyone on the server.
pub const BROADCAST_TARGET: u32 = 0;

/// Engine family a server runs; decides how the game-side plugin renders
/// colors and formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Goldsrc,
    Source,
    Source2,
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Builds one command string field by field.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    parts: Vec<String>,
}

impl CommandBuilder {
    pub fn new(prefix: &str, target: u32, tag: &str) -> Self {
        Self {
            parts: vec![prefix.to_string(), target.to_string(), tag.to_string()],
        }
    }

    /// Appends a quoted free-text field.
    pub fn arg_str(mut self, value: &str) -> Self {
        self.parts.push(quote(value));
        self
    }

    /// Appends an optional free-text field; `None` serializes as `""`.
    pub fn arg_opt_str(mut self, value: Option<&str>) -> Self {
        self.parts.push(quote(value.unwrap_or("")));
        self
    }

    pub fn arg_int(mut self, value: i64) -> Self {
        self.parts.push(value.to_string());
        self
    }

    pub fn arg_uint(mut self, value: u64) -> Self {
        self.parts.push(value.to_string());
        self
    }

    /// Appends a flag as `1`/`0`.
    pub fn arg_bool(mut self, value: bool) -> Self {
        self.parts.push(if value { "1" } else { "0" }.to_string());
        self
    }

    /// Appends a ratio formatted to two decimals (KDR and friends).
    pub fn arg_ratio(mut self, value: f64) -> Self {
        self.parts.push(format!("{value:.2}"));
        self
    }

    pub fn build(self) -> String {
        self.parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let cmd = CommandBuilder::new("hlx_event", BROADCAST_TARGET, "KILL")
            .arg_str("Player")
            .arg_int(-3)
            .arg_uint(1000)
            .build();
        assert_eq!(cmd, r#"hlx_event 0 KILL "Player" -3 1000"#);
    }

    #[test]
    fn test_quote_escaping() {
        let cmd = CommandBuilder::new("hlx_event", 5, "MESSAGE")
            .arg_str(r#"she said "hi" there"#)
            .build();
        assert_eq!(cmd, r#"hlx_event 5 MESSAGE "she said \"hi\" there""#);
    }

    #[test]
    fn test_missing_optional_serializes_empty() {
        let cmd = CommandBuilder::new("hlx_event", 0, "DISCONNECT")
            .arg_str("Player")
            .arg_opt_str(None)
            .arg_opt_str(Some("DE"))
            .build();
        assert_eq!(cmd, r#"hlx_event 0 DISCONNECT "Player" "" "DE""#);
    }

    #[test]
    fn test_ratio_two_decimals() {
        let cmd = CommandBuilder::new("hlx_event", 3, "STATS").arg_ratio(7.0 / 3.0).build();
        assert_eq!(cmd, "hlx_event 3 STATS 2.33");
    }

    #[test]
    fn test_spaces_stay_inside_quotes() {
        let cmd = CommandBuilder::new("hlx_event", 0, "CONNECT")
            .arg_str("Two Words")
            .build();
        assert_eq!(cmd.split(' ').count(), 5);
        assert!(cmd.ends_with(r#""Two Words""#));
    }
}
