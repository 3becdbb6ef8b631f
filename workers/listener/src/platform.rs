//! A long-lived IRC-style session with the streaming platform's chat
//! backend: plain-text line protocol over TCP, the way the platform's own
//! chat transport works (§4.3).

use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform session I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("platform session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// A raw inbound chat line, before normalization and validation.
#[derive(Debug, Clone, Default)]
pub struct RawChatMessage {
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    pub room_id: Option<i64>,
    pub user: Option<String>,
    pub text: Option<String>,
}

/// The write half of the session: joins, leaves, and (elsewhere) publishes
/// are serialized by a single process-wide mutex because the socket is not
/// safe for concurrent writers (§4.9).
pub struct PlatformWriter {
    write_half: Mutex<OwnedWriteHalf>,
}

impl PlatformWriter {
    pub async fn join_room(&self, login: &str) -> Result<()> {
        self.send_line(&format!("JOIN #{login}")).await
    }

    pub async fn leave_room(&self, login: &str) -> Result<()> {
        self.send_line(&format!("PART #{login}")).await
    }

    async fn send_line(&self, line: &str) -> Result<()> {
        let mut w = self.write_half.lock().await;
        w.write_all(line.as_bytes()).await?;
        w.write_all(b"\r\n").await?;
        w.flush().await?;
        Ok(())
    }
}

/// The read half: owned exclusively by the single background task that
/// receives chat lines.
pub struct PlatformReader {
    reader: BufReader<OwnedReadHalf>,
    line: String,
}

impl PlatformReader {
    /// Block until the next `PRIVMSG` line arrives, parsing IRCv3 message
    /// tags (`@id=...;room-id=...;tmi-sent-ts=...`) into a [`RawChatMessage`].
    /// Non-`PRIVMSG` control lines (PING, JOIN acks, ...) are consumed and
    /// skipped transparently.
    pub async fn recv(&mut self) -> Result<Option<RawChatMessage>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Ok(None);
            }
            let line = self.line.trim_end();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("PING") {
                // Keepalive; the writer side handles PONG separately.
                let _ = rest;
                continue;
            }
            if let Some(message) = parse_privmsg(line) {
                return Ok(Some(message));
            }
        }
    }
}

/// Parse `@tags :nick!user@host PRIVMSG #channel :message text` into a
/// [`RawChatMessage`]. Returns `None` for any other command.
fn parse_privmsg(line: &str) -> Option<RawChatMessage> {
    let (tags_part, rest) = if let Some(body) = line.strip_prefix('@') {
        body.split_once(' ')?
    } else {
        ("", line)
    };

    if !rest.contains(" PRIVMSG ") {
        return None;
    }

    let tags: HashMap<&str, &str> = tags_part
        .split(';')
        .filter_map(|kv| kv.split_once('='))
        .collect();

    let user = rest
        .split_once(' ')
        .and_then(|(prefix, _)| prefix.strip_prefix(':'))
        .and_then(|prefix| prefix.split('!').next())
        .map(str::to_string);

    let text = rest.split_once(" :").map(|(_, msg)| msg.to_string());

    Some(RawChatMessage {
        id: tags.get("id").map(|s| s.to_string()),
        timestamp: tags.get("tmi-sent-ts").and_then(|s| s.parse().ok()),
        room_id: tags.get("room-id").and_then(|s| s.parse().ok()),
        user,
        text,
    })
}

/// Open a session to `addr`, authenticate, and split it into its writer
/// and reader halves.
pub async fn connect(addr: &str, nick: &str, token: &str) -> Result<(PlatformWriter, PlatformReader)> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut write_half) = stream.into_split();

    write_half.write_all(format!("PASS oauth:{token}\r\n").as_bytes()).await?;
    write_half.write_all(format!("NICK {nick}\r\n").as_bytes()).await?;
    write_half
        .write_all(b"CAP REQ :twitch.tv/tags twitch.tv/commands\r\n")
        .await?;
    write_half.flush().await?;

    Ok((
        PlatformWriter {
            write_half: Mutex::new(write_half),
        },
        PlatformReader {
            reader: BufReader::new(read_half),
            line: String::new(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_privmsg() {
        let line = "@id=f1c2a3b4-0000-4000-8000-000000000000;room-id=42;tmi-sent-ts=1700000000000 :alice!alice@alice.tmi.twitch.tv PRIVMSG #bob :hello chat";
        let parsed = parse_privmsg(line).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("f1c2a3b4-0000-4000-8000-000000000000"));
        assert_eq!(parsed.room_id, Some(42));
        assert_eq!(parsed.timestamp, Some(1700000000000));
        assert_eq!(parsed.user.as_deref(), Some("alice"));
        assert_eq!(parsed.text.as_deref(), Some("hello chat"));
    }

    #[test]
    fn ignores_non_privmsg_lines() {
        assert!(parse_privmsg("PING :tmi.twitch.tv").is_none());
        assert!(parse_privmsg(":tmi.twitch.tv 376 bob :End of /MOTD").is_none());
    }
}
