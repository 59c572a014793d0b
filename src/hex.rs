use std::fmt::Display;

/// A valid lowercase hexadecimal encoding of binary data.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(String);

impl Hex {
    /// Decodes a hexadecimal string, rejecting odd lengths and non-hex digits.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        fn unhex_digit(h: u8) -> Option<u8> {
            match h {
                b'0'..=b'9' => Some(h - b'0'),
                b'a'..=b'f' => Some(h - b'a' + 10),
                b'A'..=b'F' => Some(h - b'A' + 10),
                _ => None,
            }
        }

        let s = s.as_bytes();
        if s.len() % 2 != 0 {
            return None;
        }
        let mut out = Vec::with_capacity(s.len() / 2);
        for pair in s.chunks(2) {
            out.push(unhex_digit(pair[0])? << 4 | unhex_digit(pair[1])?);
        }
        Some(out)
    }

    /// Whether every character of `s` is a hexadecimal digit.
    pub fn is_hex(s: &str) -> bool {
        s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        fn hex_digit(b: u8) -> char {
            match b {
                0..=9 => (b + b'0') as char,
                10..=15 => (b - 10 + b'a') as char,
                _ => unreachable!("bad hex digit"),
            }
        }

        let mut out = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.push(hex_digit(b >> 4));
            out.push(hex_digit(b & 0b00001111));
        }
        Hex(out)
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex = Hex::from(example);
    assert_eq!(hex.to_string(), "68656c6c6f2c20776f726c64");
    assert_eq!(Hex::decode(&hex.to_string()).as_deref(), Some(example));
}

#[test]
fn test_hex_rejects_garbage() {
    assert_eq!(Hex::decode("abc"), None);
    assert_eq!(Hex::decode("zz"), None);
    assert!(Hex::is_hex("00ff"));
    assert!(!Hex::is_hex("0g"));
}
