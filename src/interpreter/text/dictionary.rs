use crate::interpreter::core::vm::VM;
use crate::interpreter::text::text::ZText;
use log::debug;
use std::cmp::Ordering;

/// Dictionary header: separators, entry size and count, then the entries
#[derive(Debug, Clone)]
pub struct Dictionary {
    pub addr: u32,
    pub separators: Vec<u8>,
    pub entry_length: u8,
    /// Negative counts mark an unsorted table
    pub entry_count: i16,
    pub entries_addr: u32,
}

impl Dictionary {
    pub fn load(vm: &VM, addr: u32) -> Result<Self, String> {
        let sep_count = vm.read_byte(addr)? as u32;
        let separators = (0..sep_count)
            .map(|i| vm.read_byte(addr + 1 + i))
            .collect::<Result<Vec<u8>, String>>()?;
        let entry_start = addr + 1 + sep_count;
        let entry_length = vm.read_byte(entry_start)?;
        let entry_count = vm.read_word(entry_start + 1)? as i16;
        Ok(Dictionary {
            addr,
            separators,
            entry_length,
            entry_count,
            entries_addr: entry_start + 3,
        })
    }

    fn entry_addr(&self, index: usize) -> u32 {
        self.entries_addr + index as u32 * self.entry_length as u32
    }

    fn compare_entry(&self, vm: &VM, index: usize, encoded: &[u16]) -> Result<Ordering, String> {
        let addr = self.entry_addr(index);
        for (i, word) in encoded.iter().enumerate() {
            let entry_word = vm.read_word(addr + 2 * i as u32)?;
            match word.cmp(&entry_word) {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }

    /// Binary search over a sorted table; 0 when absent
    pub fn lookup_binary(&self, vm: &VM, encoded: &[u16]) -> Result<u16, String> {
        let mut low = 0i32;
        let mut high = self.entry_count.max(0) as i32 - 1;

        while low <= high {
            let mid = (low + high) / 2;
            match self.compare_entry(vm, mid as usize, encoded)? {
                Ordering::Less => high = mid - 1,
                Ordering::Greater => low = mid + 1,
                Ordering::Equal => return Ok(self.entry_addr(mid as usize) as u16),
            }
        }
        Ok(0)
    }

    /// Linear scan, tolerating a negative (unsorted) count; 0 when absent
    pub fn lookup_linear(&self, vm: &VM, encoded: &[u16]) -> Result<u16, String> {
        for index in 0..self.entry_count.unsigned_abs() as usize {
            if self.compare_entry(vm, index, encoded)? == Ordering::Equal {
                return Ok(self.entry_addr(index) as u16);
            }
        }
        Ok(0)
    }
}

/// Split input text into (start, length) tokens. Spaces delimit words and
/// each separator character is a word of its own.
pub fn split_tokens(text: &[u8], separators: &[u8]) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &ch) in text.iter().enumerate() {
        if ch == b' ' {
            if let Some(s) = start.take() {
                tokens.push((s, i - s));
            }
        } else if separators.contains(&ch) {
            if let Some(s) = start.take() {
                tokens.push((s, i - s));
            }
            tokens.push((i, 1));
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push((s, text.len() - s));
    }
    tokens
}

impl VM {
    /// Look up a word in the main dictionary
    pub fn lookup_dictionary(&self, word: &str) -> Result<u16, String> {
        let dictionary = Dictionary::load(self, self.game.header.dictionary as u32)?;
        let encoded = ZText::new(&self.game.memory, &self.game.header).encode_word(word);
        let addr = dictionary.lookup_binary(self, &encoded)?;
        debug!("dictionary lookup '{}' -> {:04x}", word, addr);
        Ok(addr)
    }

    /// Read the typed characters out of a text buffer
    pub fn read_text_buffer(&self, text_buffer: u32) -> Result<(Vec<u8>, u32), String> {
        let max = self.read_byte(text_buffer)? as u32;
        if self.version() >= 5 {
            let len = (self.read_byte(text_buffer + 1)? as u32).min(max);
            let chars = (0..len)
                .map(|i| self.read_byte(text_buffer + 2 + i))
                .collect::<Result<Vec<u8>, String>>()?;
            Ok((chars, 2))
        } else {
            let mut chars = Vec::new();
            for i in 0..max {
                let ch = self.read_byte(text_buffer + 1 + i)?;
                if ch == 0 {
                    break;
                }
                chars.push(ch);
            }
            Ok((chars, 1))
        }
    }

    /// Tokenise the text buffer into the parse buffer. A user dictionary is
    /// scanned linearly; with `skip_unknown` unrecognised words leave their
    /// parse entries untouched.
    pub fn tokenise(
        &mut self,
        text_buffer: u32,
        parse_buffer: u32,
        user_dictionary: Option<u32>,
        skip_unknown: bool,
    ) -> Result<(), String> {
        let (chars, text_offset) = self.read_text_buffer(text_buffer)?;
        let dict_addr = user_dictionary.unwrap_or(self.game.header.dictionary as u32);
        let dictionary = Dictionary::load(self, dict_addr)?;
        let max_words = self.read_byte(parse_buffer)? as usize;

        let tokens = split_tokens(&chars, &dictionary.separators);
        let mut entries = Vec::with_capacity(tokens.len().min(max_words));
        {
            let text = ZText::new(&self.game.memory, &self.game.header);
            for &(start, len) in tokens.iter().take(max_words) {
                let encoded = text.encode_zscii(&chars[start..start + len]);
                let addr = if user_dictionary.is_some() {
                    dictionary.lookup_linear(self, &encoded)?
                } else {
                    dictionary.lookup_binary(self, &encoded)?
                };
                let position = start as u32 + text_offset;
                if position > 0xFF {
                    debug!("tokenise: word at text offset {} clamped to 255", position);
                }
                entries.push((addr, len as u8, position.min(0xFF) as u8));
            }
        }

        debug!(
            "tokenise: {} words of {} allowed, dictionary {:04x}",
            entries.len(),
            max_words,
            dict_addr
        );

        self.write_byte(parse_buffer + 1, entries.len() as u8)?;
        for (i, (addr, len, position)) in entries.into_iter().enumerate() {
            if addr == 0 && skip_unknown {
                continue;
            }
            let entry = parse_buffer + 2 + 4 * i as u32;
            self.write_word(entry, addr)?;
            self.write_byte(entry + 2, len)?;
            self.write_byte(entry + 3, position)?;
        }
        Ok(())
    }
}
