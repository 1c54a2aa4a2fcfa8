//! Steam-ID normalization and bot pseudo-identity.
//!
//! Game servers report identities in several spellings: the canonical
//! 64-bit account number, the legacy `STEAM_X:Y:Z` triple, the bracketed
//! `[U:1:N]` form, and the literal `"BOT"` for every bot on the server.
//! Everything entering the resolver is normalized here so the persistence
//! natural key `(uniqueId, game)` is stable across spellings.

use crate::error::{CoreError, CoreResult};
use scorekeep_event_system::ServerId;

/// Offset between a legacy account number and the 64-bit individual-account
/// id space.
pub const STEAM64_BASE: u64 = 76561197960265728;

/// Whether the raw identifier is the game's bot placeholder.
pub fn is_bot_id(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("BOT")
}

/// The synthetic durable identity for a bot.
///
/// Every bot on a server reports the literal `"BOT"`; collapsing them into
/// one persistent player would corrupt stats, so the durable identity is
/// derived from the server and the sanitized bot name instead. The session
/// keeps the raw `"BOT"` so outgoing commands that need the game's view of
/// the id stay accurate.
pub fn bot_unique_id(server_id: ServerId, sanitized_name: &str) -> String {
    format!("BOT_{}_{}", server_id, sanitized_name)
}

/// Normalizes a player identifier to the canonical 64-bit decimal form.
///
/// Idempotent on already-canonical input. Rejects empty and malformed
/// identifiers with a validation error. Does not handle the bot
/// placeholder; callers route that through [`bot_unique_id`] first.
pub fn normalize_steam_id(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("empty Steam ID"));
    }

    // Already canonical: a 64-bit decimal account id.
    if trimmed.len() >= 15 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(trimmed.to_string());
    }

    // Legacy STEAM_X:Y:Z.
    if let Some(rest) = strip_prefix_ignore_case(trimmed, "STEAM_") {
        let mut parts = rest.split(':');
        let (universe, parity, account) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(u), Some(y), Some(z), None) => (u, y, z),
            _ => return Err(CoreError::validation(format!("malformed Steam ID: {trimmed}"))),
        };
        if universe.parse::<u8>().is_err() {
            return Err(CoreError::validation(format!("malformed Steam ID: {trimmed}")));
        }
        let parity: u64 = parity
            .parse()
            .ok()
            .filter(|p| *p <= 1)
            .ok_or_else(|| CoreError::validation(format!("malformed Steam ID: {trimmed}")))?;
        let account: u64 = account
            .parse()
            .map_err(|_| CoreError::validation(format!("malformed Steam ID: {trimmed}")))?;
        return Ok((STEAM64_BASE + 2 * account + parity).to_string());
    }

    // Bracketed [U:1:N].
    if let Some(inner) = trimmed.strip_prefix("[U:1:").and_then(|s| s.strip_suffix(']')) {
        let account: u64 = inner
            .parse()
            .map_err(|_| CoreError::validation(format!("malformed Steam ID: {trimmed}")))?;
        return Ok((STEAM64_BASE + account).to_string());
    }

    Err(CoreError::validation(format!("unrecognized Steam ID format: {trimmed}")))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// Sanitizes a display name for use inside bot pseudo-ids and validation.
///
/// Trims, folds whitespace runs to `_`, keeps ASCII alphanumerics and a
/// small punctuation set, drops everything else. An empty result is a
/// validation error.
pub fn sanitize_player_name(raw: &str) -> CoreResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for c in raw.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push('_');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']' | '(' | ')') {
            out.push(c);
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        return Err(CoreError::validation(format!("invalid player name: {raw:?}")));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_conversion() {
        assert_eq!(
            normalize_steam_id("STEAM_0:1:123456").unwrap(),
            "76561197960512641"
        );
        assert_eq!(
            normalize_steam_id("STEAM_1:0:1").unwrap(),
            (STEAM64_BASE + 2).to_string()
        );
    }

    #[test]
    fn test_idempotent_on_canonical_form() {
        let canonical = normalize_steam_id("STEAM_0:1:123456").unwrap();
        assert_eq!(normalize_steam_id(&canonical).unwrap(), canonical);
    }

    #[test]
    fn test_bracketed_form() {
        assert_eq!(
            normalize_steam_id("[U:1:246913]").unwrap(),
            "76561197960512641"
        );
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!(normalize_steam_id("").is_err());
        assert!(normalize_steam_id("   ").is_err());
        assert!(normalize_steam_id("STEAM_0:2:123").is_err());
        assert!(normalize_steam_id("STEAM_0:1").is_err());
        assert!(normalize_steam_id("STEAM_0:1:12:34").is_err());
        assert!(normalize_steam_id("STEAM_0:x:123").is_err());
        assert!(normalize_steam_id("[U:1:abc]").is_err());
        assert!(normalize_steam_id("gibberish").is_err());
    }

    #[test]
    fn test_bot_detection() {
        assert!(is_bot_id("BOT"));
        assert!(is_bot_id("bot"));
        assert!(is_bot_id(" BOT "));
        assert!(!is_bot_id("BOT_5_Expert"));
        assert!(!is_bot_id("76561197960512641"));
    }

    #[test]
    fn test_bot_unique_id_format() {
        assert_eq!(bot_unique_id(ServerId(5), "Expert"), "BOT_5_Expert");
    }

    #[test]
    fn test_name_sanitization() {
        assert_eq!(sanitize_player_name("  Test Player  ").unwrap(), "Test_Player");
        assert_eq!(sanitize_player_name("[ACE] nick.42").unwrap(), "[ACE]_nick.42");
        assert_eq!(sanitize_player_name("a\u{7}b").unwrap(), "ab");
        assert_eq!(sanitize_player_name("spaced   out").unwrap(), "spaced_out");
        assert!(sanitize_player_name("").is_err());
        assert!(sanitize_player_name("\u{1f600}\u{1f600}").is_err());
    }
}
