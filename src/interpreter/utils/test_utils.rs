//! Builder for small synthetic story images, used by unit and integration tests
//!
//! Memory map of a built story:
//!
//! ```text
//! 0x0000  header
//! 0x0040  abbreviation table
//! 0x0100  globals (240 words)
//! 0x0300  object table, then property tables
//! 0x0C00  scratch area for text/parse buffers and tables
//! 0x1000  static memory: dictionary
//! 0x2000  high memory: code, initial PC / main routine
//! ```
use crate::config::Config;
use crate::interpreter::core::game::Game;
use crate::interpreter::core::interpreter::Interpreter;
use crate::interpreter::core::vm::VM;
use crate::interpreter::display::HeadlessScreen;
use crate::interpreter::quetzal::MemorySaveStore;
use crate::interpreter::objects::zobject::ObjectLayout;
use crate::interpreter::text::text::ZText;
use crate::interpreter::utils::header::Header;

pub const ABBREV_ADDR: usize = 0x0040;
pub const GLOBALS_ADDR: usize = 0x0100;
pub const OBJECT_TABLE_ADDR: usize = 0x0300;
pub const SCRATCH_ADDR: usize = 0x0C00;
pub const STATIC_BASE: usize = 0x1000;
pub const DICTIONARY_ADDR: usize = 0x1000;
pub const CODE_ADDR: usize = 0x2000;
pub const STORY_SIZE: usize = 0x4000;

/// An object to lay out in the object table
#[derive(Debug, Clone, Default)]
pub struct ObjectSpec {
    pub name: String,
    pub parent: u16,
    pub sibling: u16,
    pub child: u16,
    pub attributes: Vec<u16>,
    /// (property number, data bytes)
    pub properties: Vec<(u16, Vec<u8>)>,
}

impl ObjectSpec {
    pub fn named(name: &str) -> Self {
        ObjectSpec {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn links(mut self, parent: u16, sibling: u16, child: u16) -> Self {
        self.parent = parent;
        self.sibling = sibling;
        self.child = child;
        self
    }

    pub fn attr(mut self, attr: u16) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn prop(mut self, number: u16, data: &[u8]) -> Self {
        self.properties.push((number, data.to_vec()));
        self
    }
}

pub struct StoryBuilder {
    version: u8,
    memory: Vec<u8>,
    code_cursor: usize,
    objects: Vec<ObjectSpec>,
    defaults: Vec<(u16, u16)>,
    dictionary: Option<(Vec<String>, Vec<u8>)>,
}

impl StoryBuilder {
    pub fn new(version: u8) -> Self {
        let mut memory = vec![0u8; STORY_SIZE];
        memory[0x00] = version;
        memory[0x02..0x04].copy_from_slice(&1u16.to_be_bytes());
        memory[0x04..0x06].copy_from_slice(&(CODE_ADDR as u16).to_be_bytes());
        memory[0x08..0x0A].copy_from_slice(&(DICTIONARY_ADDR as u16).to_be_bytes());
        memory[0x0A..0x0C].copy_from_slice(&(OBJECT_TABLE_ADDR as u16).to_be_bytes());
        memory[0x0C..0x0E].copy_from_slice(&(GLOBALS_ADDR as u16).to_be_bytes());
        memory[0x0E..0x10].copy_from_slice(&(STATIC_BASE as u16).to_be_bytes());
        memory[0x12..0x18].copy_from_slice(b"240101");
        memory[0x18..0x1A].copy_from_slice(&(ABBREV_ADDR as u16).to_be_bytes());

        let mut builder = StoryBuilder {
            version,
            memory,
            code_cursor: CODE_ADDR,
            objects: Vec::new(),
            defaults: Vec::new(),
            dictionary: None,
        };
        if version == 6 {
            // main routine with no locals
            let packed = builder.pack(CODE_ADDR);
            builder.memory[0x06..0x08].copy_from_slice(&packed.to_be_bytes());
            builder.memory[CODE_ADDR] = 0;
            builder.code_cursor += 1;
        } else {
            builder.memory[0x06..0x08].copy_from_slice(&(CODE_ADDR as u16).to_be_bytes());
        }
        builder
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Packed form of a routine or string address
    pub fn pack(&self, addr: usize) -> u16 {
        let factor = match self.version {
            1..=3 => 2,
            4..=7 => 4,
            _ => 8,
        };
        (addr / factor) as u16
    }

    /// Append instruction bytes at the code cursor, returning their address
    pub fn code(&mut self, bytes: &[u8]) -> usize {
        let addr = self.code_cursor;
        self.memory[addr..addr + bytes.len()].copy_from_slice(bytes);
        self.code_cursor += bytes.len();
        addr
    }

    /// Current address of the code cursor
    pub fn here(&self) -> usize {
        self.code_cursor
    }

    /// Place a routine at `addr` (aligned for packing), returning its packed address
    pub fn routine(&mut self, addr: usize, num_locals: u8, defaults: &[u16], body: &[u8]) -> u16 {
        let mut cursor = addr;
        self.memory[cursor] = num_locals;
        cursor += 1;
        if self.version <= 4 {
            for i in 0..num_locals as usize {
                let value = defaults.get(i).copied().unwrap_or(0);
                self.memory[cursor..cursor + 2].copy_from_slice(&value.to_be_bytes());
                cursor += 2;
            }
        }
        self.memory[cursor..cursor + body.len()].copy_from_slice(body);
        self.pack(addr)
    }

    pub fn set_byte(&mut self, addr: usize, value: u8) -> &mut Self {
        self.memory[addr] = value;
        self
    }

    pub fn set_word(&mut self, addr: usize, value: u16) -> &mut Self {
        self.memory[addr..addr + 2].copy_from_slice(&value.to_be_bytes());
        self
    }

    pub fn set_bytes(&mut self, addr: usize, bytes: &[u8]) -> &mut Self {
        self.memory[addr..addr + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn set_global(&mut self, global: u8, value: u16) -> &mut Self {
        self.set_word(GLOBALS_ADDR + 2 * global as usize, value)
    }

    pub fn add_object(&mut self, object: ObjectSpec) -> u16 {
        self.objects.push(object);
        self.objects.len() as u16
    }

    pub fn property_default(&mut self, prop: u16, value: u16) -> &mut Self {
        self.defaults.push((prop, value));
        self
    }

    pub fn dictionary(&mut self, words: &[&str], separators: &[u8]) -> &mut Self {
        self.dictionary = Some((
            words.iter().map(|w| w.to_string()).collect(),
            separators.to_vec(),
        ));
        self
    }

    /// Write an encoded string at `addr`, returning the bytes used
    pub fn string(&mut self, addr: usize, text: &str) -> usize {
        let words = self.codec_words(|codec| codec.encode_string(text));
        for (i, word) in words.iter().enumerate() {
            self.set_word(addr + 2 * i, *word);
        }
        words.len() * 2
    }

    /// Encoded words of `text`, for inline print instructions
    pub fn encoded(&self, text: &str) -> Vec<u16> {
        self.codec_words(|codec| codec.encode_string(text))
    }

    fn codec_words<F>(&self, f: F) -> Vec<u16>
    where
        F: Fn(&ZText) -> Vec<u16>,
    {
        let header = Header::new(&self.memory);
        let codec = ZText::new(&self.memory, &header);
        f(&codec)
    }

    fn layout_objects(&mut self) {
        let layout = ObjectLayout::for_version(self.version);
        for &(prop, value) in &self.defaults.clone() {
            self.set_word(OBJECT_TABLE_ADDR + 2 * (prop as usize - 1), value);
        }

        let tree_base = OBJECT_TABLE_ADDR + layout.default_count * 2;
        let mut prop_cursor = tree_base + self.objects.len() * layout.entry_size;
        for (index, object) in self.objects.clone().iter().enumerate() {
            let entry = tree_base + index * layout.entry_size;
            for &attr in &object.attributes {
                self.memory[entry + attr as usize / 8] |= 0x80 >> (attr % 8);
            }
            let links = [
                (layout.parent_offset, object.parent),
                (layout.sibling_offset, object.sibling),
                (layout.child_offset, object.child),
            ];
            for (offset, value) in links {
                if layout.is_modern() {
                    self.set_word(entry + offset, value);
                } else {
                    self.memory[entry + offset] = value as u8;
                }
            }
            self.set_word(entry + layout.property_offset, prop_cursor as u16);

            // short name
            let name_words = if object.name.is_empty() {
                Vec::new()
            } else {
                self.encoded(&object.name)
            };
            self.memory[prop_cursor] = name_words.len() as u8;
            prop_cursor += 1;
            for word in name_words {
                self.set_word(prop_cursor, word);
                prop_cursor += 2;
            }

            let mut properties = object.properties.clone();
            properties.sort_by(|a, b| b.0.cmp(&a.0));
            for (number, data) in properties {
                let len = data.len();
                if !layout.is_modern() {
                    self.memory[prop_cursor] = (((len - 1) as u8) << 5) | number as u8;
                    prop_cursor += 1;
                } else if len <= 2 {
                    let size_bit = if len == 2 { 0x40 } else { 0 };
                    self.memory[prop_cursor] = size_bit | number as u8;
                    prop_cursor += 1;
                } else {
                    self.memory[prop_cursor] = 0x80 | number as u8;
                    self.memory[prop_cursor + 1] = 0x80 | (len as u8 & 0x3F);
                    prop_cursor += 2;
                }
                self.memory[prop_cursor..prop_cursor + len].copy_from_slice(&data);
                prop_cursor += len;
            }
            self.memory[prop_cursor] = 0;
            prop_cursor += 1;
        }
    }

    fn layout_dictionary(&mut self) {
        let Some((words, separators)) = self.dictionary.clone() else {
            // empty dictionary: no separators, 7-byte entries, none present
            self.memory[DICTIONARY_ADDR] = 0;
            self.memory[DICTIONARY_ADDR + 1] = 7;
            return;
        };
        let mut encoded: Vec<Vec<u16>> = words
            .iter()
            .map(|w| self.codec_words(|codec| codec.encode_word(w)))
            .collect();
        encoded.sort();
        encoded.dedup();

        let entry_length = if self.version <= 3 { 7 } else { 9 };
        let mut cursor = DICTIONARY_ADDR;
        self.memory[cursor] = separators.len() as u8;
        cursor += 1;
        self.set_bytes(cursor, &separators);
        cursor += separators.len();
        self.memory[cursor] = entry_length;
        self.set_word(cursor + 1, encoded.len() as u16);
        cursor += 3;
        for word in encoded {
            for (i, w) in word.iter().enumerate() {
                self.set_word(cursor + 2 * i, *w);
            }
            cursor += entry_length as usize;
        }
    }

    /// Produce the finished story image
    pub fn build(mut self) -> Vec<u8> {
        self.layout_objects();
        self.layout_dictionary();
        let scale = match self.version {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };
        let len_field = (STORY_SIZE / scale) as u16;
        self.set_word(0x1A, len_field);
        let checksum = self.memory[0x40..]
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(b as u16));
        self.set_word(0x1C, checksum);
        self.memory
    }

    pub fn build_game(self) -> Result<Game, String> {
        Game::from_memory(self.build())
    }
}

/// Headless interpreter over a built story, with a fixed random seed
pub fn interpreter_for(builder: StoryBuilder) -> Result<Interpreter<HeadlessScreen>, String> {
    let vm = VM::new(builder.build_game()?)?;
    let config = Config {
        random_seed: Some(1234),
        instruction_limit: Some(100_000),
        ..Config::default()
    };
    Ok(Interpreter::new(
        vm,
        HeadlessScreen::new(),
        Box::new(MemorySaveStore::new()),
        config,
    ))
}

/// Build a story whose code is laid down by `setup`, append `quit`, and run
/// it until it stops
pub fn run_code(
    version: u8,
    setup: impl FnOnce(&mut StoryBuilder),
) -> Result<Interpreter<HeadlessScreen>, String> {
    let mut builder = StoryBuilder::new(version);
    setup(&mut builder);
    builder.code(&[0xBA]);
    let mut interp = interpreter_for(builder)?;
    interp.run()?;
    Ok(interp)
}

/// Encode an instruction's branch data
pub fn branch_bytes(on_true: bool, offset: i16) -> Vec<u8> {
    let polarity = if on_true { 0x80 } else { 0x00 };
    if (0..64).contains(&offset) {
        vec![polarity | 0x40 | offset as u8]
    } else {
        let raw = (offset as i32).rem_euclid(16384) as u16;
        vec![polarity | (raw >> 8) as u8, raw as u8]
    }
}
