/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! IRC message helpers.
//!
//! Just enough inspection of raw lines to drive the bot. Lines are matched
//! textually; no full message parser is involved.

/// Returns true for a server `PING :<token>` line.
#[inline]
#[must_use]
pub fn is_ping(line: &str) -> bool {
    line.starts_with("PING :")
}

/// Builds the `PONG` reply for a `PING` line, echoing its token.
#[must_use]
pub fn make_pong(ping: &str) -> String {
    let token = ping.find(':').map_or("", |at| &ping[at..]);
    format!("PONG {token}")
}

/// Returns true if the line carries a `MODE <nick>` change.
#[must_use]
pub fn is_mode_for(line: &str, nick: &str) -> bool {
    line.contains(&format!("MODE {nick}"))
}

/// Returns true if `PRIVMSG` appears after the line's first word.
#[must_use]
pub fn is_privmsg(line: &str) -> bool {
    line.split_once(' ')
        .is_some_and(|(_, rest)| rest.contains("PRIVMSG"))
}

/// Returns the trailing text of a message: everything after the first `:`
/// that follows the prefix.
#[must_use]
pub fn message_text(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(' ')?;
    let at = rest.find(':')?;
    Some(&rest[at + 1..])
}

/// Returns true if the message text starts with `.hello`.
#[must_use]
pub fn is_hello(line: &str) -> bool {
    message_text(line).is_some_and(|text| text.starts_with(".hello"))
}

/// Extracts the sender nick from a `:nick!user@host` prefix.
#[must_use]
pub fn nick_of(line: &str) -> Option<&str> {
    let prefix = line.strip_prefix(':').unwrap_or(line);
    let (nick, _) = prefix.split_once('!')?;
    Some(nick)
}

/// `NICK` registration line.
#[must_use]
pub fn nick(nick: &str) -> String {
    format!("NICK {nick}")
}

/// `USER` registration line.
#[must_use]
pub fn user(nick: &str) -> String {
    format!("USER {nick} remotehost remoteserver :Forkey Bot")
}

/// `JOIN` line.
#[must_use]
pub fn join(channel: &str) -> String {
    format!("JOIN {channel}")
}

/// `PRIVMSG` line.
#[must_use]
pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {target} :{text}")
}
