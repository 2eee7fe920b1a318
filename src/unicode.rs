//! Unicode to WinAnsiEncoding conversion for builtin Type1 text
//!
//! Builtin PDF fonts are drawn with single-byte WinAnsiEncoding strings.
//! WinAnsiEncoding is a superset of Latin-1; characters outside it are
//! replaced with '?'.

/// Convert a Unicode string to WinAnsiEncoding bytes
pub fn unicode_to_winansi(text: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(text.len());

    for ch in text.chars() {
        let byte = match ch {
            // Standard ASCII (0x00-0x7F)
            ch if ch as u32 <= 0x7F => ch as u8,

            // Latin-1 range maps 1:1 in WinAnsi
            ch if (0xA0..=0xFF).contains(&(ch as u32)) => ch as u8,

            // WinAnsi-specific assignments in 0x80-0x9F
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91, // Left single quotation mark
            '\u{2019}' => 0x92, // Right single quotation mark
            '\u{201C}' => 0x93, // Left double quotation mark
            '\u{201D}' => 0x94, // Right double quotation mark
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,

            // Not representable in WinAnsiEncoding
            _ => b'?',
        };

        result.push(byte);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let text = "Hello World";
        let result = unicode_to_winansi(text);
        assert_eq!(result, text.as_bytes());
    }

    #[test]
    fn test_latin1() {
        let result = unicode_to_winansi("Café");
        assert_eq!(result, vec![b'C', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_winansi_punctuation() {
        let result = unicode_to_winansi("\u{2019}\u{2013}€");
        assert_eq!(result, vec![0x92, 0x96, 0x80]);
    }

    #[test]
    fn test_unmapped_replaced() {
        let result = unicode_to_winansi("漢");
        assert_eq!(result, vec![b'?']);
    }
}
