//! Raw terminal bytes → input events → structured keys.
//!
//! Two stages, both total (they never fail):
//! - [`KeyDecoder::decode`] segments one chunk of raw bytes into ordered
//!   [`InputEvent`]s: runs of printable text, or single key payloads
//!   (control bytes, DEL, escape sequences).
//! - [`parse_key`] turns a key payload into a [`Key`].
//!
//! Anything unrecognized degrades to [`KeyKind::Unknown`] with no modifiers.

const ESC: u8 = 0x1B;
const DEL: u8 = 0x7F;

/// Longest escape sequence accumulated before it is cut off and emitted as-is.
pub const MAX_SEQUENCE_LEN: usize = 256;

// ============================================================================
// INPUT EVENTS
// ============================================================================

/// Whether a payload is typed text or a single key to be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Key,
    Text,
}

/// One decoded unit of input, consumed immediately by the active state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub payload: String,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn key(payload: impl Into<String>) -> Self {
        InputEvent {
            payload: payload.into(),
            kind: InputKind::Key,
        }
    }

    pub fn text(payload: impl Into<String>) -> Self {
        InputEvent {
            payload: payload.into(),
            kind: InputKind::Text,
        }
    }
}

// ============================================================================
// SEGMENTATION
// ============================================================================

/// Splits raw terminal input into text runs and key payloads.
///
/// Each chunk is decoded independently: pending text is flushed at the end
/// of the chunk, and an escape sequence cut short by the chunk boundary is
/// emitted with whatever bytes arrived.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    text: Vec<u8>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk into events, in arrival order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let mut i = 0;

        while i < chunk.len() {
            let byte = chunk[i];
            match byte {
                ESC => {
                    self.flush_text(&mut events);
                    let len = escape_len(&chunk[i..]);
                    events.push(InputEvent::key(String::from_utf8_lossy(&chunk[i..i + len])));
                    i += len;
                    continue;
                }
                // Newlines stay in the text run so consecutive ones coalesce.
                b'\r' | b'\n' => self.text.push(b'\r'),
                0x00..=0x1F | DEL => {
                    self.flush_text(&mut events);
                    events.push(InputEvent::key(char::from(byte)));
                }
                _ => self.text.push(byte),
            }
            i += 1;
        }

        self.flush_text(&mut events);
        events
    }

    fn flush_text(&mut self, events: &mut Vec<InputEvent>) {
        if self.text.is_empty() {
            return;
        }
        events.push(InputEvent::text(String::from_utf8_lossy(&self.text)));
        self.text.clear();
    }
}

/// Length of the escape sequence at the start of `bytes` (which starts with ESC).
///
/// `ESC [` and `ESC ]` run until a final byte in `0x40..=0x7E`. `ESC` followed
/// by any other printable byte is a two-byte Alt form. Anything else leaves a
/// bare ESC and the following byte is decoded on its own.
fn escape_len(bytes: &[u8]) -> usize {
    match bytes.get(1) {
        Some(b'[' | b']') => {
            let limit = bytes.len().min(MAX_SEQUENCE_LEN);
            bytes
                .iter()
                .enumerate()
                .take(limit)
                .skip(2)
                .find(|(_, b)| (0x40..=0x7E).contains(*b))
                .map_or(limit, |(offset, _)| offset + 1)
        }
        Some(0x20..=0x7F) => 2,
        _ => 1,
    }
}

// ============================================================================
// KEYS
// ============================================================================

/// What a key payload names, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    #[default]
    Unknown,
    Escape,
    Delete,
    Insert,
    Home,
    End,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    /// Always a lowercase ASCII letter `a..=z`.
    Letter(char),
    /// Function keys `F0..=F20`.
    Function(u8),
}

/// A parsed key with its modifier flags. Built fresh per payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Key {
    pub kind: KeyKind,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Key {
    /// A key with no modifiers.
    pub const fn plain(kind: KeyKind) -> Self {
        Key {
            kind,
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// True when no modifier flag is set.
    pub fn is_plain(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }

    /// True for Ctrl+`letter` with no other modifier.
    pub fn is_ctrl_letter(&self, letter: char) -> bool {
        self.kind == KeyKind::Letter(letter) && self.ctrl && !(self.shift || self.alt || self.meta)
    }

    /// Apply a CSI modifier parameter. Values outside `1..=8` are ignored.
    fn apply_modifier_code(&mut self, code: u32) {
        match code {
            1 => self.meta = true,
            2 => self.shift = true,
            3 => self.alt = true,
            4 => {
                self.alt = true;
                self.shift = true;
            }
            5 => self.ctrl = true,
            6 => {
                self.ctrl = true;
                self.shift = true;
            }
            7 => {
                self.ctrl = true;
                self.alt = true;
            }
            8 => {
                self.ctrl = true;
                self.alt = true;
                self.shift = true;
            }
            _ => {}
        }
    }
}

/// Parse a `Key`-kind payload. Never fails.
pub fn parse_key(payload: &str) -> Key {
    let key = match payload.as_bytes() {
        [b @ 1..=26] => Key {
            ctrl: true,
            ..Key::plain(KeyKind::Letter(char::from(b + 0x60)))
        },
        [DEL] => Key::plain(KeyKind::Backspace),
        [b @ b'a'..=b'z'] => Key::plain(KeyKind::Letter(char::from(*b))),
        [b @ b'A'..=b'Z'] => Key {
            shift: true,
            ..Key::plain(KeyKind::Letter(char::from(b.to_ascii_lowercase())))
        },
        [ESC] => Key::plain(KeyKind::Escape),
        [ESC, b'[', body @ ..] => parse_csi(body).unwrap_or_default(),
        [ESC, DEL] => Key {
            alt: true,
            ..Key::plain(KeyKind::Backspace)
        },
        [ESC, b] if b.is_ascii_alphabetic() => Key {
            alt: true,
            shift: b.is_ascii_uppercase(),
            ..Key::plain(KeyKind::Letter(char::from(b.to_ascii_lowercase())))
        },
        _ => Key::default(),
    };

    // An unnamed key carries no modifiers.
    if key.kind == KeyKind::Unknown {
        Key::default()
    } else {
        key
    }
}

/// Parse the part of a CSI sequence after `ESC [`: `[value[;modifier[;...]]]final`.
fn parse_csi(body: &[u8]) -> Option<Key> {
    let (&terminator, params) = body.split_last()?;
    if !(0x40..=0x7E).contains(&terminator) {
        return None;
    }

    let params = std::str::from_utf8(params).ok()?;
    let fields: Vec<&str> = if params.is_empty() {
        Vec::new()
    } else {
        params.split(';').collect()
    };
    // Every field is digits; only the last may be empty.
    for (i, field) in fields.iter().enumerate() {
        if field.is_empty() && i + 1 != fields.len() {
            return None;
        }
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let number = |i: usize| fields.get(i).and_then(|f| f.parse::<u32>().ok());

    let kind = match terminator {
        b'~' => number(0).and_then(tilde_key)?,
        b'A' => KeyKind::Up,
        b'B' => KeyKind::Down,
        b'C' => KeyKind::Right,
        b'D' => KeyKind::Left,
        b'H' => KeyKind::Home,
        b'F' => KeyKind::End,
        _ => return None,
    };

    let mut key = Key::plain(kind);
    if let Some(code) = number(1) {
        key.apply_modifier_code(code);
    }
    Some(key)
}

/// `CSI <n> ~` key codes.
fn tilde_key(value: u32) -> Option<KeyKind> {
    let kind = match value {
        1 | 7 => KeyKind::Home,
        2 => KeyKind::Insert,
        3 => KeyKind::Delete,
        4 | 8 => KeyKind::End,
        10 => KeyKind::Function(0),
        11 => KeyKind::Function(1),
        12 => KeyKind::Function(2),
        13 => KeyKind::Function(3),
        14 => KeyKind::Function(4),
        15 => KeyKind::Function(5),
        17 => KeyKind::Function(6),
        18 => KeyKind::Function(7),
        19 => KeyKind::Function(8),
        20 => KeyKind::Function(9),
        21 => KeyKind::Function(10),
        22 => KeyKind::Function(11),
        24 => KeyKind::Function(12),
        25 => KeyKind::Function(13),
        26 => KeyKind::Function(14),
        28 => KeyKind::Function(15),
        29 => KeyKind::Function(16),
        31 => KeyKind::Function(17),
        32 => KeyKind::Function(18),
        33 => KeyKind::Function(19),
        34 => KeyKind::Function(20),
        _ => return None,
    };
    Some(kind)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(bytes: &[u8]) -> Vec<InputEvent> {
        KeyDecoder::new().decode(bytes)
    }

    fn key_of(bytes: &[u8]) -> Key {
        let events = decode(bytes);
        assert_eq!(events.len(), 1, "expected one event, got {:?}", events);
        assert_eq!(events[0].kind, InputKind::Key);
        parse_key(&events[0].payload)
    }

    // -- Segmentation --

    #[test]
    fn text_is_one_event() {
        assert_eq!(decode(b"hello world"), vec![InputEvent::text("hello world")]);
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        assert!(decode(b"").is_empty());
    }

    #[test]
    fn newlines_normalize_and_coalesce_into_text() {
        assert_eq!(decode(b"ab\r\ncd\n"), vec![InputEvent::text("ab\r\rcd\r")]);
        assert_eq!(decode(b"\r"), vec![InputEvent::text("\r")]);
    }

    #[test]
    fn control_byte_flushes_pending_text_first() {
        assert_eq!(
            decode(b"ab\x03cd"),
            vec![
                InputEvent::text("ab"),
                InputEvent::key("\x03"),
                InputEvent::text("cd"),
            ]
        );
    }

    #[test]
    fn del_flushes_pending_text_and_is_backspace() {
        let events = decode(b"abc\x7f");
        assert_eq!(events, vec![InputEvent::text("abc"), InputEvent::key("\x7f")]);
        assert_eq!(parse_key(&events[1].payload).kind, KeyKind::Backspace);
    }

    #[test]
    fn escape_flushes_text_and_collects_csi() {
        assert_eq!(
            decode(b"x\x1b[1;5Ay"),
            vec![
                InputEvent::text("x"),
                InputEvent::key("\x1b[1;5A"),
                InputEvent::text("y"),
            ]
        );
    }

    #[test]
    fn back_to_back_sequences_split() {
        assert_eq!(
            decode(b"\x1b[A\x1b[B\x1b[3~"),
            vec![
                InputEvent::key("\x1b[A"),
                InputEvent::key("\x1b[B"),
                InputEvent::key("\x1b[3~"),
            ]
        );
    }

    #[test]
    fn alt_form_consumes_exactly_one_byte() {
        assert_eq!(
            decode(b"\x1bxyz"),
            vec![InputEvent::key("\x1bx"), InputEvent::text("yz")]
        );
    }

    #[test]
    fn bare_escape_at_chunk_end() {
        assert_eq!(decode(b"\x1b"), vec![InputEvent::key("\x1b")]);
    }

    #[test]
    fn escape_before_control_byte_stays_bare() {
        assert_eq!(
            decode(b"\x1b\x1b"),
            vec![InputEvent::key("\x1b"), InputEvent::key("\x1b")]
        );
    }

    #[test]
    fn unterminated_sequence_emitted_at_chunk_end() {
        assert_eq!(decode(b"\x1b[12;"), vec![InputEvent::key("\x1b[12;")]);
    }

    #[test]
    fn osc_runs_to_final_byte() {
        assert_eq!(
            decode(b"\x1b]12;34x5"),
            vec![InputEvent::key("\x1b]12;34x"), InputEvent::text("5")]
        );
    }

    #[test]
    fn overlong_sequence_is_cut_off() {
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend(std::iter::repeat_n(b'1', 400));
        let events = decode(&bytes);
        assert_eq!(events[0].payload.len(), MAX_SEQUENCE_LEN);
        assert_eq!(parse_key(&events[0].payload), Key::default());
    }

    #[test]
    fn utf8_text_survives() {
        assert_eq!(decode("héllo".as_bytes()), vec![InputEvent::text("héllo")]);
    }

    // -- Key parsing --

    #[test]
    fn ctrl_letters_for_every_control_byte() {
        for b in 1u8..=26 {
            let key = parse_key(&char::from(b).to_string());
            assert_eq!(key.kind, KeyKind::Letter(char::from(b + 0x60)));
            assert!(key.ctrl);
            assert!(!key.shift && !key.alt && !key.meta);
        }
    }

    #[test]
    fn decoded_control_bytes_are_ctrl_keys() {
        for b in (1u8..=26).filter(|b| *b != b'\r' && *b != b'\n') {
            let key = key_of(&[b]);
            assert_eq!(key.kind, KeyKind::Letter(char::from(b + 0x60)));
            assert!(key.ctrl);
        }
    }

    #[test]
    fn ctrl_c_is_ctrl_letter_c() {
        assert!(key_of(b"\x03").is_ctrl_letter('c'));
    }

    #[test]
    fn letters_and_shift() {
        assert_eq!(parse_key("q"), Key::plain(KeyKind::Letter('q')));
        let shifted = parse_key("Q");
        assert_eq!(shifted.kind, KeyKind::Letter('q'));
        assert!(shifted.shift);
    }

    #[test]
    fn arrows_without_modifiers() {
        assert_eq!(key_of(b"\x1b[A"), Key::plain(KeyKind::Up));
        assert_eq!(key_of(b"\x1b[B"), Key::plain(KeyKind::Down));
        assert_eq!(key_of(b"\x1b[C"), Key::plain(KeyKind::Right));
        assert_eq!(key_of(b"\x1b[D"), Key::plain(KeyKind::Left));
    }

    #[test]
    fn ctrl_up() {
        let key = key_of(b"\x1b[1;5A");
        assert_eq!(key.kind, KeyKind::Up);
        assert!(key.ctrl);
        assert!(!key.shift && !key.alt && !key.meta);
    }

    #[test]
    fn modifier_table() {
        let cases = [
            (1, (false, false, false, true)),
            (2, (false, true, false, false)),
            (3, (false, false, true, false)),
            (4, (false, true, true, false)),
            (5, (true, false, false, false)),
            (6, (true, true, false, false)),
            (7, (true, false, true, false)),
            (8, (true, true, true, false)),
            (9, (false, false, false, false)),
        ];
        for (code, (ctrl, shift, alt, meta)) in cases {
            let key = parse_key(&format!("\x1b[1;{}D", code));
            assert_eq!(key.kind, KeyKind::Left, "code {}", code);
            assert_eq!(
                (key.ctrl, key.shift, key.alt, key.meta),
                (ctrl, shift, alt, meta),
                "code {}",
                code
            );
        }
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(parse_key("\x1b[2~").kind, KeyKind::Insert);
        assert_eq!(parse_key("\x1b[3~").kind, KeyKind::Delete);
        assert_eq!(parse_key("\x1b[10~").kind, KeyKind::Function(0));
        assert_eq!(parse_key("\x1b[15~").kind, KeyKind::Function(5));
        assert_eq!(parse_key("\x1b[17~").kind, KeyKind::Function(6));
        assert_eq!(parse_key("\x1b[24~").kind, KeyKind::Function(12));
        assert_eq!(parse_key("\x1b[34~").kind, KeyKind::Function(20));
        assert_eq!(parse_key("\x1b[16~"), Key::default());
    }

    #[test]
    fn home_and_end() {
        assert_eq!(parse_key("\x1b[H").kind, KeyKind::Home);
        assert_eq!(parse_key("\x1b[F").kind, KeyKind::End);
        assert_eq!(parse_key("\x1b[1~").kind, KeyKind::Home);
        assert_eq!(parse_key("\x1b[4~").kind, KeyKind::End);
    }

    #[test]
    fn modified_delete() {
        let key = parse_key("\x1b[3;2~");
        assert_eq!(key.kind, KeyKind::Delete);
        assert!(key.shift);
    }

    #[test]
    fn escape_key() {
        assert_eq!(parse_key("\x1b"), Key::plain(KeyKind::Escape));
    }

    #[test]
    fn alt_letters() {
        let key = parse_key("\x1bx");
        assert_eq!(key.kind, KeyKind::Letter('x'));
        assert!(key.alt && !key.shift);

        let key = parse_key("\x1bX");
        assert_eq!(key.kind, KeyKind::Letter('x'));
        assert!(key.alt && key.shift);

        let key = parse_key("\x1b\x7f");
        assert_eq!(key.kind, KeyKind::Backspace);
        assert!(key.alt);
    }

    #[test]
    fn unrecognized_input_is_unknown_without_modifiers() {
        let payloads = [
            "\x1b[1;5Z",
            "\x1b]0;title",
            "\x1b[?1;2c",
            "\x1b[;5A",
            "\x1b1",
            "\x00",
            "ab",
            "",
        ];
        for payload in payloads {
            assert_eq!(parse_key(payload), Key::default(), "payload {:?}", payload);
        }
    }

    #[test]
    fn trailing_separator_has_no_modifier() {
        assert_eq!(parse_key("\x1b[1;A"), Key::plain(KeyKind::Up));
    }

    // -- Properties --

    proptest! {
        #[test]
        fn printable_chunks_are_one_text_event(s in "[ -~]{1,64}") {
            let events = decode(s.as_bytes());
            prop_assert_eq!(events, vec![InputEvent::text(s.clone())]);
        }

        #[test]
        fn decoding_never_loses_ordering_of_keys(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
            let bytes = format!("{}\x1b[A{}", prefix, suffix);
            let events = decode(bytes.as_bytes());
            let keys: Vec<_> = events.iter().filter(|e| e.kind == InputKind::Key).collect();
            prop_assert_eq!(keys.len(), 1);
            prop_assert_eq!(parse_key(&keys[0].payload).kind, KeyKind::Up);
        }

        #[test]
        fn parse_key_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..16)) {
            for event in decode(&bytes) {
                let _ = parse_key(&event.payload);
            }
        }
    }
}
