use crate::interpreter::utils::header::{get_mem_addr, Header};
use bitreader::BitReader;
use log::{trace, warn};

/// The three alphabets for Z-string decoding
pub const ALPHABET_A0: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHABET_A1: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Slot 0 is the ZSCII escape and slot 1 a newline in v2+
const ALPHABET_A2: &[u8] = b"\x00\r0123456789.,!?_#'\"/\\-:()";
const ALPHABET_A2_V1: &[u8] = b"\x000123456789.,!?_#'\"/\\<-:()";

/// ZSCII codes 155-223 when the story supplies no translation table
const DEFAULT_UNICODE: [char; 69] = [
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú',
    'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê',
    'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ',
    'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

/// ZSCII newline
pub const ZSCII_NEWLINE: u8 = 13;

/// Split an encoded word into its end flag and three z-characters
pub fn zchars_from_word(word: u16) -> Result<(bool, [u8; 3]), String> {
    let bytes = word.to_be_bytes();
    let mut reader = BitReader::new(&bytes);
    let read_err = |e| format!("Malformed z-string word {word:04x}: {e}");

    let last = reader.read_u8(1).map_err(read_err)? == 1;
    let mut chars = [0u8; 3];
    for zc in chars.iter_mut() {
        *zc = reader.read_u8(5).map_err(read_err)?;
    }
    Ok((last, chars))
}

/// Text codec bound to a story image: alphabets, abbreviations and the
/// unicode translation table all come from the header.
pub struct ZText<'a> {
    memory: &'a [u8],
    version: u8,
    abbrev_table: usize,
    alphabet_table: usize,
    unicode_table: usize,
}

impl<'a> ZText<'a> {
    pub fn new(memory: &'a [u8], header: &Header) -> Self {
        let mut unicode_table = 0;
        if header.version >= 5 && header.header_extension != 0 {
            let ext = header.header_extension;
            if get_mem_addr(memory, ext) >= 3 {
                unicode_table = get_mem_addr(memory, ext + 6);
            }
        }
        ZText {
            memory,
            version: header.version,
            abbrev_table: header.abbrev_table,
            alphabet_table: header.alphabet_table,
            unicode_table,
        }
    }

    /// Z-characters a dictionary word is truncated to
    pub fn resolution(&self) -> usize {
        if self.version <= 3 {
            6
        } else {
            9
        }
    }

    /// Decode a Z-string from memory starting at the given address.
    /// Returns the decoded string and the number of bytes consumed.
    pub fn decode_at(&self, addr: usize) -> Result<(String, usize), String> {
        let mut words = Vec::new();
        let mut offset = addr;
        loop {
            let pair = self
                .memory
                .get(offset..offset + 2)
                .ok_or_else(|| format!("Unterminated string starting at {addr:05x}"))?;
            let word = u16::from_be_bytes([pair[0], pair[1]]);
            words.push(word);
            offset += 2;
            if word & 0x8000 != 0 {
                break;
            }
        }
        let text = self.decode_words(&words)?;
        Ok((text, offset - addr))
    }

    /// Decode already-fetched encoded words (inline print text)
    pub fn decode_words(&self, words: &[u16]) -> Result<String, String> {
        let zscii = self.words_to_zscii(words, true)?;
        Ok(zscii.into_iter().map(|z| self.zscii_to_char(z)).collect())
    }

    fn words_to_zscii(&self, words: &[u16], allow_abbrev: bool) -> Result<Vec<u16>, String> {
        let mut zchars = Vec::with_capacity(words.len() * 3);
        for &word in words {
            let (last, chars) = zchars_from_word(word)?;
            zchars.extend_from_slice(&chars);
            if last {
                break;
            }
        }
        trace!("z-chars {:?}", zchars);

        let mut out = Vec::new();
        let mut locked = 0usize;
        let mut current = 0usize;
        let mut i = 0;
        while i < zchars.len() {
            let zc = zchars[i];
            i += 1;
            match zc {
                0 => out.push(32),
                1 if self.version == 1 => out.push(ZSCII_NEWLINE as u16),
                1..=3 if self.version >= 3 || zc == 1 => {
                    let Some(&index) = zchars.get(i) else {
                        break;
                    };
                    i += 1;
                    if allow_abbrev {
                        out.extend(self.expand_abbreviation(zc, index)?);
                    } else {
                        warn!("Abbreviation inside abbreviation ignored");
                    }
                    current = locked;
                }
                2 | 3 => {
                    // v1-2 temporary shifts cycle up or down
                    current = Self::shifted(locked, zc == 2);
                }
                4 | 5 if self.version <= 2 => {
                    locked = Self::shifted(locked, zc == 4);
                    current = locked;
                }
                4 => current = 1,
                5 => current = 2,
                _ => {
                    if current == 2 && zc == 6 {
                        // 10-bit ZSCII escape
                        if i + 1 < zchars.len() {
                            out.push(((zchars[i] as u16) << 5) | zchars[i + 1] as u16);
                        }
                        i += 2;
                    } else {
                        out.push(self.alphabet_zscii(current, zc) as u16);
                    }
                    current = locked;
                }
            }
        }
        Ok(out)
    }

    fn shifted(alphabet: usize, up: bool) -> usize {
        if up {
            (alphabet + 1) % 3
        } else {
            (alphabet + 2) % 3
        }
    }

    fn expand_abbreviation(&self, bank: u8, index: u8) -> Result<Vec<u16>, String> {
        let entry = self.abbrev_table + 2 * (32 * (bank as usize - 1) + index as usize);
        if self.abbrev_table == 0 || entry + 1 >= self.memory.len() {
            return Err(format!("Abbreviation {bank}:{index} outside story image"));
        }
        let addr = get_mem_addr(self.memory, entry) * 2;
        let mut words = Vec::new();
        let mut offset = addr;
        loop {
            let pair = self
                .memory
                .get(offset..offset + 2)
                .ok_or_else(|| format!("Abbreviation string at {addr:05x} runs off the image"))?;
            let word = u16::from_be_bytes([pair[0], pair[1]]);
            words.push(word);
            offset += 2;
            if word & 0x8000 != 0 {
                break;
            }
        }
        self.words_to_zscii(&words, false)
    }

    /// ZSCII code for z-character `zc` (6..=31) in an alphabet
    fn alphabet_zscii(&self, alphabet: usize, zc: u8) -> u8 {
        let index = (zc - 6) as usize;
        if self.version >= 5 && self.alphabet_table != 0 {
            if alphabet == 2 && index == 1 {
                return ZSCII_NEWLINE;
            }
            if let Some(&b) = self.memory.get(self.alphabet_table + alphabet * 26 + index) {
                return b;
            }
        }
        match alphabet {
            0 => ALPHABET_A0[index],
            1 => ALPHABET_A1[index],
            _ if self.version == 1 => ALPHABET_A2_V1[index],
            _ => ALPHABET_A2[index],
        }
    }

    fn unicode_entries(&self) -> Vec<char> {
        if self.unicode_table == 0 {
            return DEFAULT_UNICODE.to_vec();
        }
        let count = self.memory.get(self.unicode_table).copied().unwrap_or(0) as usize;
        (0..count)
            .map(|i| {
                let code = get_mem_addr(self.memory, self.unicode_table + 1 + 2 * i) as u32;
                char::from_u32(code).unwrap_or('?')
            })
            .collect()
    }

    /// Convert ZSCII code to a printable character
    pub fn zscii_to_char(&self, zscii: u16) -> char {
        match zscii {
            13 => '\n',
            32..=126 => zscii as u8 as char,
            155..=251 => self
                .unicode_entries()
                .get(zscii as usize - 155)
                .copied()
                .unwrap_or('?'),
            _ => '?',
        }
    }

    /// Convert a character to its ZSCII code, if it has one
    pub fn char_to_zscii(&self, ch: char) -> Option<u8> {
        match ch {
            '\n' | '\r' => Some(ZSCII_NEWLINE),
            ' '..='~' => Some(ch as u8),
            _ => self
                .unicode_entries()
                .iter()
                .position(|&c| c == ch)
                .map(|i| (155 + i) as u8),
        }
    }

    fn zchars_for(&self, text: &[u8], keep_case: bool, limit: usize) -> Vec<u8> {
        let (a1_shift, a2_shift) = if self.version <= 2 { (2, 3) } else { (4, 5) };
        let mut zchars: Vec<u8> = Vec::with_capacity(text.len() + 3);

        for &raw in text {
            if zchars.len() >= limit {
                break;
            }
            let ch = if keep_case {
                raw
            } else {
                raw.to_ascii_lowercase()
            };
            if ch == b' ' {
                zchars.push(0);
            } else if let Some(index) = self.find_in_alphabet(0, ch) {
                zchars.push(index as u8 + 6);
            } else if let Some(index) = self.find_in_alphabet(1, ch) {
                zchars.extend_from_slice(&[a1_shift, index as u8 + 6]);
            } else if let Some(index) = self.find_in_alphabet(2, ch) {
                zchars.extend_from_slice(&[a2_shift, index as u8 + 6]);
            } else {
                zchars.extend_from_slice(&[a2_shift, 6, ch >> 5, ch & 0x1F]);
            }
        }
        zchars
    }

    fn pack_zchars(mut zchars: Vec<u8>) -> Vec<u16> {
        while zchars.is_empty() || zchars.len() % 3 != 0 {
            zchars.push(5);
        }
        let mut words: Vec<u16> = zchars
            .chunks(3)
            .map(|c| ((c[0] as u16) << 10) | ((c[1] as u16) << 5) | c[2] as u16)
            .collect();
        if let Some(last) = words.last_mut() {
            *last |= 0x8000;
        }
        words
    }

    /// Encode ZSCII text as dictionary words: truncated or padded with 5s
    /// to the version's resolution, end bit on the last word.
    pub fn encode_zscii(&self, text: &[u8]) -> Vec<u16> {
        let resolution = self.resolution();
        let mut zchars = self.zchars_for(text, false, resolution);
        zchars.truncate(resolution);
        zchars.resize(resolution, 5);
        Self::pack_zchars(zchars)
    }

    /// Encode arbitrary text as a full-length Z-string, case preserved
    pub fn encode_string(&self, text: &str) -> Vec<u16> {
        let zscii: Vec<u8> = text.chars().filter_map(|c| self.char_to_zscii(c)).collect();
        Self::pack_zchars(self.zchars_for(&zscii, true, usize::MAX))
    }

    /// Encode a string for dictionary comparison
    pub fn encode_word(&self, text: &str) -> Vec<u16> {
        let zscii: Vec<u8> = text.chars().filter_map(|c| self.char_to_zscii(c)).collect();
        self.encode_zscii(&zscii)
    }

    fn find_in_alphabet(&self, alphabet: usize, zscii: u8) -> Option<usize> {
        // A2 slot 0 is the escape and slot 1 the newline
        let start = if alphabet == 2 {
            if self.version == 1 {
                1
            } else {
                2
            }
        } else {
            0
        };
        (start..26).find(|&i| self.alphabet_zscii(alphabet, i as u8 + 6) == zscii)
    }
}
