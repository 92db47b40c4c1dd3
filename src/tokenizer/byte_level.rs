//! GPT-2 style reversible byte <-> printable-character table.
//!
//! Printable Latin-1 bytes map to themselves; the remaining bytes (controls,
//! space, soft hyphen...) are shifted to code points starting at U+0100 so
//! every byte has a visible, merge-friendly stand-in.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct ByteLevelTable {
    to_char: [char; 256],
    to_byte: HashMap<char, u8>,
}

impl ByteLevelTable {
    pub(crate) fn new() -> Self {
        let mut to_char = ['\0'; 256];
        let mut to_byte = HashMap::with_capacity(256);
        let mut shifted = 0u32;

        for b in 0..=255u8 {
            let printable = matches!(b, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF);
            let c = if printable {
                char::from(b)
            } else {
                let c = char::from_u32(256 + shifted).unwrap_or(char::REPLACEMENT_CHARACTER);
                shifted += 1;
                c
            };
            to_char[b as usize] = c;
            to_byte.insert(c, b);
        }

        Self { to_char, to_byte }
    }

    /// Map every UTF-8 byte of `text` to its stand-in character.
    pub(crate) fn encode(&self, text: &str) -> String {
        text.bytes().map(|b| self.to_char[b as usize]).collect()
    }

    /// Invert [`encode`](Self::encode). Characters outside the table are kept
    /// as their own UTF-8 bytes; invalid sequences become U+FFFD.
    pub(crate) fn decode(&self, text: &str) -> String {
        let mut bytes = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];
        for c in text.chars() {
            match self.to_byte.get(&c) {
                Some(&b) => bytes.push(b),
                None => bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
