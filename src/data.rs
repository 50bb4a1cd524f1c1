const fn create_windows_1252_table() -> [char; 256] {
    let mut table = [0 as char; 256];
    let mut i = 0usize;
    while i < 256 {
        let c = match i {
            128 => '\u{20ac}',
            130 => '\u{201a}',
            131 => '\u{0192}',
            132 => '\u{201e}',
            133 => '\u{2026}',
            134 => '\u{2020}',
            135 => '\u{2021}',
            136 => '\u{02c6}',
            137 => '\u{2030}',
            138 => '\u{0160}',
            139 => '\u{2039}',
            140 => '\u{0152}',
            142 => '\u{017d}',
            145 => '\u{2018}',
            146 => '\u{2019}',
            147 => '\u{201c}',
            148 => '\u{201d}',
            149 => '\u{2022}',
            150 => '\u{2013}',
            151 => '\u{2014}',
            152 => '\u{02dc}',
            153 => '\u{2122}',
            154 => '\u{0161}',
            155 => '\u{203a}',
            156 => '\u{0153}',
            158 => '\u{017e}',
            159 => '\u{0178}',

            // 129, 141, 143, 144, 157 are undefined and pass through as C1 controls
            i => i as u8 as char,
        };
        table[i] = c;
        i += 1;
    }
    table
}

pub(crate) static WINDOWS_1252: [char; 256] = create_windows_1252_table();

const WHITESPACE: u8 = 1;
const BOUNDARY: u8 = 2;
const UNKNOWN: u8 = 4;

const fn create_character_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];

    let mut i = 0usize;
    while i < 0x20 {
        table[i] = UNKNOWN | BOUNDARY;
        i += 1;
    }
    table[0x7f] = UNKNOWN | BOUNDARY;

    table[b'\t' as usize] = WHITESPACE | BOUNDARY;
    table[b'\n' as usize] = WHITESPACE | BOUNDARY;
    table[b'\x0b' as usize] = WHITESPACE | BOUNDARY; // \v
    table[b'\x0c' as usize] = WHITESPACE | BOUNDARY; // \f
    table[b'\r' as usize] = WHITESPACE | BOUNDARY;
    table[b' ' as usize] = WHITESPACE | BOUNDARY;
    table[b';' as usize] = WHITESPACE | BOUNDARY;

    table[b'!' as usize] = BOUNDARY;
    table[b'#' as usize] = BOUNDARY;
    table[b'"' as usize] = BOUNDARY;
    table[b'<' as usize] = BOUNDARY;
    table[b'=' as usize] = BOUNDARY;
    table[b'>' as usize] = BOUNDARY;
    table[b'?' as usize] = BOUNDARY;
    table[b'{' as usize] = BOUNDARY;
    table[b'}' as usize] = BOUNDARY;
    table[b'[' as usize] = UNKNOWN | BOUNDARY;
    table[b']' as usize] = UNKNOWN | BOUNDARY;
    table
}

/// Packs the attributes the lexer asks about a byte into one lookup so the
/// table stays hot in cache across call sites.
static CHARACTER_CLASS: [u8; 256] = create_character_class_table();

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    CHARACTER_CLASS[usize::from(b)] & WHITESPACE != 0
}

#[inline]
pub(crate) fn is_boundary(b: u8) -> bool {
    CHARACTER_CLASS[usize::from(b)] & BOUNDARY != 0
}

/// Bytes that can never start a token
#[inline]
pub(crate) fn is_unknown(b: u8) -> bool {
    CHARACTER_CLASS[usize::from(b)] & UNKNOWN != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(b' ', true, true, false)]
    #[case(b';', true, true, false)]
    #[case(b'=', false, true, false)]
    #[case(b'"', false, true, false)]
    #[case(b'[', false, true, true)]
    #[case(b'\0', false, true, true)]
    #[case(b'a', false, false, false)]
    #[case(b'.', false, false, false)]
    #[case(0xc3, false, false, false)]
    fn test_character_classes(
        #[case] b: u8,
        #[case] whitespace: bool,
        #[case] boundary: bool,
        #[case] unknown: bool,
    ) {
        assert_eq!(is_whitespace(b), whitespace);
        assert_eq!(is_boundary(b), boundary);
        assert_eq!(is_unknown(b), unknown);
    }

    #[test]
    fn test_windows_1252_table() {
        assert_eq!(WINDOWS_1252[b'a' as usize], 'a');
        assert_eq!(WINDOWS_1252[0x80], '€');
        assert_eq!(WINDOWS_1252[0xe5], 'å');
    }
}
