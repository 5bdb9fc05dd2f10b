use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

/// Flags 1 bit: status line shows hours:minutes instead of score/moves (v3)
pub const FLAGS1_TIME_GAME: u8 = 0x02;
/// Flags 1 bit: status line not available (v1-3)
pub const FLAGS1_NO_STATUS_LINE: u8 = 0x10;
/// Flags 1 bit: screen splitting available (v3)
pub const FLAGS1_SPLIT_AVAILABLE: u8 = 0x20;
/// Flags 2 bit: transcripting on
pub const FLAGS2_TRANSCRIPT: u16 = 0x0001;
/// Flags 2 bit: force fixed-pitch font
pub const FLAGS2_FIXED_PITCH: u16 = 0x0002;

/// Read a big-endian word out of a raw story image
pub fn get_mem_addr(bytes: &[u8], offset: usize) -> usize {
    match bytes.get(offset..offset + 2) {
        Some(pair) => u16::from_be_bytes([pair[0], pair[1]]) as usize,
        None => 0,
    }
}

/// Fixed-offset story header fields, read once at load
#[derive(Debug, Clone)]
pub struct Header {
    pub version: u8,
    pub flags1: u8,
    pub release: u16,
    pub serial: [u8; 6],
    pub base_high_mem: usize,
    pub base_static_mem: usize,
    pub initial_pc: usize,
    pub dictionary: usize,
    pub object_table_addr: usize,
    pub global_variables: usize,
    pub flags2: u16,
    pub abbrev_table: usize,
    pub len_file: usize,
    pub checksum_file: u16,
    pub routine_offset: usize,
    pub string_offset: usize,
    pub terminating_chars_table: usize,
    pub standard_revision_number: u16,
    pub alphabet_table: usize,
    pub header_extension: usize,
}

impl Header {
    pub fn new(bytes: &[u8]) -> Header {
        let version = bytes.first().copied().unwrap_or(0);
        let mut serial = [0u8; 6];
        if let Some(raw) = bytes.get(0x12..0x18) {
            serial.copy_from_slice(raw);
        }

        let length_scale = match version {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };

        // v5+ only fields read as 0 on older stories
        let v5_field = |offset| if version >= 5 { get_mem_addr(bytes, offset) } else { 0 };
        let v67_field = |offset| {
            if version == 6 || version == 7 {
                get_mem_addr(bytes, offset)
            } else {
                0
            }
        };

        Header {
            version,
            flags1: bytes.get(0x01).copied().unwrap_or(0),
            release: get_mem_addr(bytes, 0x02) as u16,
            serial,
            base_high_mem: get_mem_addr(bytes, 0x04),
            initial_pc: get_mem_addr(bytes, 0x06),
            dictionary: get_mem_addr(bytes, 0x08),
            object_table_addr: get_mem_addr(bytes, 0x0A),
            global_variables: get_mem_addr(bytes, 0x0C),
            base_static_mem: get_mem_addr(bytes, 0x0E),
            flags2: get_mem_addr(bytes, 0x10) as u16,
            abbrev_table: get_mem_addr(bytes, 0x18),
            len_file: get_mem_addr(bytes, 0x1A) * length_scale,
            checksum_file: get_mem_addr(bytes, 0x1C) as u16,
            routine_offset: v67_field(0x28),
            string_offset: v67_field(0x2A),
            terminating_chars_table: v5_field(0x2E),
            standard_revision_number: get_mem_addr(bytes, 0x32) as u16,
            alphabet_table: v5_field(0x34),
            header_extension: v5_field(0x36),
        }
    }

    /// Serial number as printable text
    pub fn serial_string(&self) -> String {
        self.serial.iter().map(|&b| b as char).collect()
    }

    /// Scale factor applied to packed routine and string addresses
    pub fn packing_factor(&self) -> usize {
        match self.version {
            1..=3 => 2,
            4..=7 => 4,
            _ => 8,
        }
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Z-code version:           {}
Interpreter flags:        {:#04x}
Release number:           {}
Size of resident memory:  {:#06x}
Start PC:                 {:#06x}
Dictionary address:       {:#06x}
Object table address:     {:#06x}
Global variables address: {:#06x}
Size of dynamic memory:   {:#06x}
Game flags:               {:#06x}
Serial number:            {}
Abbreviations address:    {:#06x}
File size:                {:#06x}
Checksum:                 {:#06x}
",
            self.version,
            self.flags1,
            self.release,
            self.base_high_mem,
            self.initial_pc,
            self.dictionary,
            self.object_table_addr,
            self.global_variables,
            self.base_static_mem,
            self.flags2,
            self.serial_string(),
            self.abbrev_table,
            self.len_file,
            self.checksum_file,
        )
    }
}
