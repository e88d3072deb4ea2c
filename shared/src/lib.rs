//! Wire protocol shared between the trivia server and client.
//!
//! Every message travels as one self-delimited frame: `TYPE|LENGTH|DATA\n`.
//! The LENGTH field is informational only; the decoder locates fields by the
//! first two `|` delimiters and the terminating newline.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Nickname buffer bound; usable nicknames are 1..=31 characters.
pub const MAX_NICKNAME_LEN: usize = 32;
pub const MAX_MSG_LEN: usize = 1024;
pub const MAX_TOPICS: usize = 4;
/// Default registry capacity.
pub const MAX_PLAYERS: usize = 20;
/// Questions loaded per topic; longer quiz files are truncated.
pub const QUIZ_QUESTIONS: usize = 5;

// Message type tags.
pub const MSG_NICK: &str = "NICK";
pub const MSG_THEME: &str = "THEME";
pub const MSG_THEMES: &str = "THEMES";
pub const MSG_THEMES_LIST: &str = "THEMES_LIST";
pub const MSG_QUIZ_START: &str = "QUIZ_START";
pub const MSG_QUESTION: &str = "QUESTION";
pub const MSG_ANSWER: &str = "ANSWER";
pub const MSG_RESULT: &str = "RESULT";
pub const MSG_SCORE: &str = "SCORE";
pub const MSG_SCORELIST: &str = "SCORELIST";
pub const MSG_END_SCORE: &str = "END_SCORE";
pub const MSG_END: &str = "END";
pub const MSG_OK: &str = "OK";
pub const MSG_ERROR: &str = "ERROR";

// Payload tokens carried by RESULT and ERROR frames.
pub const RESP_CORRECT: &str = "CORRECT";
pub const RESP_WRONG: &str = "WRONG";
pub const RESP_NICK_TAKEN: &str = "NICK_TAKEN";
pub const RESP_INVALID_THEME: &str = "INVALID_THEME";
pub const RESP_QUIZ_COMPLETE: &str = "QUIZ_COMPLETE";

/// Codec and transport failures surfaced by the framing layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message type must not be empty")]
    EmptyType,
    #[error("frame is missing a field delimiter")]
    MissingDelimiter,
    #[error("frame is missing its newline terminator")]
    MissingTerminator,
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Malformed-frame errors leave the connection usable; transport errors
    /// and a closed or truncated stream do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::MissingDelimiter)
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: String,
    pub data: String,
}

impl Frame {
    /// Produces one wire frame. Fails only when the type tag is empty.
    pub fn encode(msg_type: &str, data: &str) -> Result<String, ProtocolError> {
        if msg_type.is_empty() {
            return Err(ProtocolError::EmptyType);
        }
        Ok(format!("{}|{}|{}\n", msg_type, data.len(), data))
    }

    /// Parses exactly one frame from `raw`. Field boundaries come from the
    /// first two `|` delimiters and the terminator; the LENGTH field is
    /// skipped without being trusted.
    pub fn decode(raw: &str) -> Result<Frame, ProtocolError> {
        let (msg_type, rest) = raw.split_once('|').ok_or(ProtocolError::MissingDelimiter)?;
        let (_length, rest) = rest.split_once('|').ok_or(ProtocolError::MissingDelimiter)?;
        let (data, _) = rest
            .split_once('\n')
            .ok_or(ProtocolError::MissingTerminator)?;
        Ok(Frame {
            msg_type: msg_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// Per-connection receive buffer that reassembles frames from a byte stream.
///
/// Bytes are pulled from the transport until a newline-terminated frame is
/// available; anything past the terminator stays buffered for the next call,
/// so frames split across reads and frames coalesced into one read are both
/// handled. A malformed line is consumed whole, leaving later frames intact.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Reads the next frame from `reader`.
    ///
    /// Errors: `ConnectionClosed` on a clean EOF between frames,
    /// `MissingTerminator` on EOF that cuts a frame short, `MissingDelimiter`
    /// for a complete line that is not a well-formed frame, `Io` for
    /// transport failures.
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Frame, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                let raw = String::from_utf8_lossy(&line);
                return Frame::decode(&raw);
            }

            let mut chunk = [0u8; MAX_MSG_LEN];
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Err(ProtocolError::ConnectionClosed);
                }
                // A partial frame with no terminator can never complete.
                self.buf.clear();
                return Err(ProtocolError::MissingTerminator);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Encodes and writes one frame, retrying until the transport has accepted
/// every byte.
pub async fn write_frame<W>(writer: &mut W, msg_type: &str, data: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = Frame::encode(msg_type, data)?;
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// A nickname is 1..=31 characters, ASCII alphanumeric or underscore.
pub fn valid_nickname(nickname: &str) -> bool {
    if nickname.is_empty() || nickname.len() >= MAX_NICKNAME_LEN {
        return false;
    }
    nickname.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expands the literal two-character `\n` escape used inside list payloads
/// into real newlines for display. The escape is never a frame terminator.
pub fn expand_escapes(text: &str) -> String {
    text.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_encode_basic_frame() {
        let frame = Frame::encode(MSG_NICK, "alice").unwrap();
        assert_eq!(frame, "NICK|5|alice\n");
    }

    #[test]
    fn test_encode_empty_data() {
        let frame = Frame::encode(MSG_THEMES, "").unwrap();
        assert_eq!(frame, "THEMES|0|\n");
    }

    #[test]
    fn test_encode_empty_type_fails() {
        assert!(matches!(
            Frame::encode("", "data"),
            Err(ProtocolError::EmptyType)
        ));
    }

    #[test]
    fn test_decode_roundtrip() {
        let encoded = Frame::encode(MSG_ANSWER, "Rome").unwrap();
        let frame = Frame::decode(&encoded).unwrap();
        assert_eq!(frame.msg_type, "ANSWER");
        assert_eq!(frame.data, "Rome");
    }

    #[test]
    fn test_decode_ignores_length_field() {
        // The decoder must not trust LENGTH; boundaries come from delimiters.
        let frame = Frame::decode("OK|9999|hi\n").unwrap();
        assert_eq!(frame.msg_type, "OK");
        assert_eq!(frame.data, "hi");

        let frame = Frame::decode("OK|garbage|hi\n").unwrap();
        assert_eq!(frame.data, "hi");
    }

    #[test]
    fn test_decode_data_may_contain_pipes() {
        let frame = Frame::decode("SCORELIST|7|0a|b|c\n").unwrap();
        assert_eq!(frame.data, "a|b|c");
    }

    #[test]
    fn test_decode_missing_first_delimiter() {
        assert!(matches!(
            Frame::decode("NICKalice\n"),
            Err(ProtocolError::MissingDelimiter)
        ));
    }

    #[test]
    fn test_decode_missing_second_delimiter() {
        assert!(matches!(
            Frame::decode("NICK|5alice\n"),
            Err(ProtocolError::MissingDelimiter)
        ));
    }

    #[test]
    fn test_decode_missing_terminator() {
        assert!(matches!(
            Frame::decode("NICK|5|alice"),
            Err(ProtocolError::MissingTerminator)
        ));
    }

    #[tokio::test]
    async fn test_reader_frame_split_across_reads() {
        let mut mock = Builder::new().read(b"NICK|5|al").read(b"ice\n").build();
        let mut reader = FrameReader::new();

        let frame = reader.read_frame(&mut mock).await.unwrap();
        assert_eq!(frame.msg_type, "NICK");
        assert_eq!(frame.data, "alice");
    }

    #[tokio::test]
    async fn test_reader_coalesced_frames_delivered_one_at_a_time() {
        let mut mock = Builder::new()
            .read(b"RESULT|7|CORRECT\nRESULT|13|QUIZ_COMPLETE\n")
            .build();
        let mut reader = FrameReader::new();

        let first = reader.read_frame(&mut mock).await.unwrap();
        assert_eq!(first.data, "CORRECT");
        let second = reader.read_frame(&mut mock).await.unwrap();
        assert_eq!(second.data, "QUIZ_COMPLETE");
    }

    #[tokio::test]
    async fn test_reader_malformed_line_does_not_corrupt_next_frame() {
        let mut mock = Builder::new().read(b"NICK|noseconddelim\nOK|0|\n").build();
        let mut reader = FrameReader::new();

        let err = reader.read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MissingDelimiter));
        assert!(!err.is_fatal());

        let frame = reader.read_frame(&mut mock).await.unwrap();
        assert_eq!(frame.msg_type, "OK");
    }

    #[tokio::test]
    async fn test_reader_clean_eof() {
        let mut mock = Builder::new().build();
        let mut reader = FrameReader::new();

        let err = reader.read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_reader_eof_mid_frame() {
        let mut mock = Builder::new().read(b"NICK|5|ali").build();
        let mut reader = FrameReader::new();

        let err = reader.read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MissingTerminator));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_write_frame_then_read_back() {
        let mut out = Vec::new();
        write_frame(&mut out, MSG_QUESTION, "What is 2+2?")
            .await
            .unwrap();

        let mut reader = FrameReader::new();
        let frame = reader.read_frame(&mut out.as_slice()).await.unwrap();
        assert_eq!(frame.msg_type, "QUESTION");
        assert_eq!(frame.data, "What is 2+2?");
    }

    #[test]
    fn test_valid_nicknames() {
        assert!(valid_nickname("alice"));
        assert!(valid_nickname("Bob_42"));
        assert!(valid_nickname("x"));
        assert!(valid_nickname(&"a".repeat(31)));
    }

    #[test]
    fn test_invalid_nicknames() {
        assert!(!valid_nickname(""));
        assert!(!valid_nickname(&"a".repeat(32)));
        assert!(!valid_nickname("has space"));
        assert!(!valid_nickname("semi;colon"));
        assert!(!valid_nickname("pipe|char"));
        assert!(!valid_nickname("accented_é"));
    }

    #[test]
    fn test_expand_escapes() {
        assert_eq!(expand_escapes("a\\nb\\nc"), "a\nb\nc");
        assert_eq!(expand_escapes("no escapes"), "no escapes");
        assert_eq!(expand_escapes(""), "");
    }
}
