use crate::config::Config;
use crate::interpreter::utils::header::{
    Header, FLAGS1_NO_STATUS_LINE, FLAGS1_SPLIT_AVAILABLE, FLAGS2_FIXED_PITCH, FLAGS2_TRANSCRIPT,
};
use log::{debug, info};

/// Largest story image any version can address (v8)
pub const MAX_STORY_SIZE: usize = 512 * 1024;

/// Represents a loaded game with owned memory
pub struct Game {
    /// The raw game memory
    pub memory: Vec<u8>,
    /// The parsed header
    pub header: Header,
    /// Pristine image, used for compressed saves, restart and verify
    pub original_memory: Vec<u8>,
}

impl Game {
    /// Create a new game from memory bytes
    pub fn from_memory(memory: Vec<u8>) -> Result<Self, String> {
        if memory.len() < 64 {
            return Err("Game file too small for header".to_string());
        }
        if memory.len() > MAX_STORY_SIZE {
            return Err(format!(
                "Game file of {} bytes exceeds the {} byte address space",
                memory.len(),
                MAX_STORY_SIZE
            ));
        }
        let header = Header::new(&memory);
        if !(1..=8).contains(&header.version) {
            return Err(format!("Unsupported story version {}", header.version));
        }
        if header.base_static_mem < 64 || header.base_static_mem > memory.len() {
            return Err(format!(
                "Static memory base 0x{:04x} outside story image",
                header.base_static_mem
            ));
        }

        info!(
            "Loaded v{} story, release {} serial {}",
            header.version,
            header.release,
            header.serial_string()
        );

        let original_memory = memory.clone();
        Ok(Game {
            memory,
            header,
            original_memory,
        })
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Fill in the interpreter capability fields of the header
    pub fn apply_config(&mut self, config: &Config) {
        let version = self.header.version;
        let mut flags1 = self.memory[0x01];
        if version <= 3 {
            flags1 &= !FLAGS1_NO_STATUS_LINE;
            flags1 |= FLAGS1_SPLIT_AVAILABLE;
        } else {
            // bold, italic, fixed-space and timed input
            flags1 |= 0x04 | 0x08 | 0x10 | 0x80;
        }
        self.memory[0x01] = flags1;

        self.memory[0x1E] = config.interpreter_number;
        self.memory[0x1F] = config.interpreter_version as u8;
        self.memory[0x20] = config.screen_height;
        self.memory[0x21] = config.screen_width;
        if version >= 5 {
            self.memory[0x22..0x24].copy_from_slice(&(config.screen_width as u16).to_be_bytes());
            self.memory[0x24..0x26].copy_from_slice(&(config.screen_height as u16).to_be_bytes());
            self.memory[0x26] = 1;
            self.memory[0x27] = 1;
        }
        self.memory[0x32] = 1;
        self.memory[0x33] = 1;
        self.header.flags1 = flags1;
        debug!(
            "Header configured: interpreter {} '{}', screen {}x{}",
            config.interpreter_number,
            config.interpreter_version,
            config.screen_width,
            config.screen_height
        );
    }

    /// Reload the pristine image, keeping the transcript and fixed-pitch bits
    pub fn restart_image(&mut self) {
        let keep = self.flags2() & (FLAGS2_TRANSCRIPT | FLAGS2_FIXED_PITCH);
        self.memory.copy_from_slice(&self.original_memory);
        let flags2 = (self.flags2() & !(FLAGS2_TRANSCRIPT | FLAGS2_FIXED_PITCH)) | keep;
        self.set_flags2(flags2);
    }

    pub fn flags2(&self) -> u16 {
        u16::from_be_bytes([self.memory[0x10], self.memory[0x11]])
    }

    pub fn set_flags2(&mut self, flags2: u16) {
        self.memory[0x10..0x12].copy_from_slice(&flags2.to_be_bytes());
        self.header.flags2 = flags2;
    }

    /// Sum of the original story bytes from 0x40 up to the declared file length
    pub fn checksum(&self) -> u16 {
        let end = if self.header.len_file == 0 {
            self.original_memory.len()
        } else {
            self.header.len_file.min(self.original_memory.len())
        };
        self.original_memory[0x40.min(end)..end]
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
    }

    /// Size of dynamic memory in bytes
    pub fn dynamic_size(&self) -> usize {
        self.header.base_static_mem
    }
}
