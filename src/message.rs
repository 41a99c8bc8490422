//! Message framing for the input stream.
//!
//! The input is a flat blob of text in which messages are separated by a
//! literal delimiter token:
//!
//! ```text
//! HELO example.org__END_MSG__
//! MAIL FROM:<a@example.org>__END_MSG__
//! QUIT
//! ```
//!
//! Each chunk between delimiters is normalized before it goes on the wire:
//! one leading newline is dropped, trailing whitespace is trimmed and the
//! message is terminated by exactly one blank line (`\n\n`).

use bytes::{BufMut, Bytes, BytesMut};

/// Delimiter used when the configuration does not name one.
pub const DEFAULT_DELIMITER: &str = "__END_MSG__";

/// Terminator appended to every message.
const TERMINATOR: &[u8] = b"\n\n";

/// One normalized unit of payload, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Bytes);

impl Message {
    /// Normalize a raw chunk taken from the input blob.
    pub fn normalize(chunk: &[u8]) -> Self {
        let body = chunk.strip_prefix(b"\n").unwrap_or(chunk);
        let end = body
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |pos| pos + 1);
        let body = &body[..end];

        let mut buf = BytesMut::with_capacity(body.len() + TERMINATOR.len());
        buf.put_slice(body);
        buf.put_slice(TERMINATOR);
        Message(buf.freeze())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Split `blob` on every occurrence of `delimiter`.
///
/// `k` delimiters always yield `k + 1` chunks, in order; chunks may be
/// empty. An empty delimiter never splits.
pub fn split<'a>(blob: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    if delimiter.is_empty() {
        return vec![blob];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos + delimiter.len() <= blob.len() {
        if blob[pos..].starts_with(delimiter) {
            chunks.push(&blob[start..pos]);
            pos += delimiter.len();
            start = pos;
        } else {
            pos += 1;
        }
    }
    chunks.push(&blob[start..]);
    chunks
}

/// Split and normalize `blob` into the messages to transmit.
pub fn messages(blob: &[u8], delimiter: &str) -> Vec<Message> {
    split(blob, delimiter.as_bytes())
        .into_iter()
        .map(Message::normalize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: &[u8] = DEFAULT_DELIMITER.as_bytes();

    #[test]
    fn test_split_counts() {
        assert_eq!(split(b"PING", DELIM).len(), 1);
        assert_eq!(split(b"CMD1__END_MSG__CMD2", DELIM), vec![&b"CMD1"[..], b"CMD2"]);
        assert_eq!(
            split(b"__END_MSG____END_MSG__", DELIM),
            vec![&b""[..], b"", b""]
        );
        assert_eq!(split(b"a__END_MSG__", DELIM), vec![&b"a"[..], b""]);
    }

    #[test]
    fn test_split_partial_token_is_content() {
        assert_eq!(
            split(b"a__END_MSGb__END_MSG__c", DELIM),
            vec![&b"a__END_MSGb"[..], b"c"]
        );
    }

    #[test]
    fn test_split_empty_delimiter() {
        assert_eq!(split(b"abc", b""), vec![&b"abc"[..]]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(Message::normalize(b"PING").as_bytes(), b"PING\n\n");
        assert_eq!(Message::normalize(b"\nHELO x\r\n  \t").as_bytes(), b"HELO x\n\n");
        assert_eq!(Message::normalize(b"\n\nbody").as_bytes(), b"\nbody\n\n");
        assert_eq!(Message::normalize(b"").as_bytes(), b"\n\n");
        assert_eq!(Message::normalize(b"\n").as_bytes(), b"\n\n");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in [&b"PING"[..], b"line one\nline two", b"GET / HTTP/1.0\r\nHost: x"] {
            let once = Message::normalize(raw);
            let twice = Message::normalize(once.as_bytes());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_messages_never_contain_delimiter() {
        let blob = b"\nUSER bob__END_MSG__\nPASS hunter2__END_MSG__\nQUIT\n";
        let msgs = messages(blob, DEFAULT_DELIMITER);

        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].as_bytes(), b"USER bob\n\n");
        assert_eq!(msgs[1].as_bytes(), b"PASS hunter2\n\n");
        assert_eq!(msgs[2].as_bytes(), b"QUIT\n\n");
        for msg in &msgs {
            assert!(msg.len() > 2);
            assert!(split(msg.as_bytes(), DELIM).len() == 1);
        }
    }
}
