//! Quetzal chunk definitions: IFhd, Stks and IntD

use crate::interpreter::core::vm::MAX_LOCALS;
use sub_array::SubArray;

/// IFhd chunk - identifies the story a save belongs to and where to resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFhdChunk {
    /// Release number (from 0x02 in header)
    pub release: u16,
    /// Serial number (6 bytes from 0x12 in header)
    pub serial: [u8; 6],
    /// Checksum (from 0x1C in header)
    pub checksum: u16,
    /// Resume PC, stored in 3 bytes
    pub pc: u32,
}

impl IFhdChunk {
    pub const SIZE: usize = 13;

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.release.to_be_bytes());
        bytes.extend_from_slice(&self.serial);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        bytes.extend_from_slice(&self.pc.to_be_bytes()[1..]);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        let raw: [u8; Self::SIZE] = data
            .get(..Self::SIZE)
            .and_then(|slice| slice.try_into().ok())
            .ok_or("IFhd chunk too small")?;

        let release: &[u8; 2] = raw.sub_array_ref(0);
        let serial: &[u8; 6] = raw.sub_array_ref(2);
        let checksum: &[u8; 2] = raw.sub_array_ref(8);
        let pc: &[u8; 3] = raw.sub_array_ref(10);

        Ok(IFhdChunk {
            release: u16::from_be_bytes(*release),
            serial: *serial,
            checksum: u16::from_be_bytes(*checksum),
            pc: u32::from_be_bytes([0, pc[0], pc[1], pc[2]]),
        })
    }
}

/// One routine context as stored in a Stks chunk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSnapshot {
    pub return_pc: u32,
    /// Result is thrown away rather than stored
    pub discard: bool,
    pub result_var: u8,
    /// Bit n set when argument n+1 was supplied
    pub args_mask: u8,
    pub locals: Vec<u16>,
    pub stack: Vec<u16>,
}

impl FrameSnapshot {
    /// Number of arguments the caller supplied
    pub fn arg_count(&self) -> u8 {
        self.args_mask.trailing_ones() as u8
    }
}

/// Stks chunk - the call stack and evaluation stack, oldest frame first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StksChunk {
    pub frames: Vec<FrameSnapshot>,
}

impl StksChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for frame in &self.frames {
            bytes.extend_from_slice(&frame.return_pc.to_be_bytes()[1..]);
            let mut flags = frame.locals.len() as u8 & 0x0F;
            if frame.discard {
                flags |= 0x10;
            }
            bytes.push(flags);
            bytes.push(frame.result_var);
            bytes.push(frame.args_mask);
            bytes.extend_from_slice(&(frame.stack.len() as u16).to_be_bytes());
            for value in frame.locals.iter().chain(frame.stack.iter()) {
                bytes.extend_from_slice(&value.to_be_bytes());
            }
        }
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        let word = |offset: usize| -> Result<u16, String> {
            data.get(offset..offset + 2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .ok_or_else(|| format!("Stks chunk truncated at offset {offset}"))
        };

        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let header = data
                .get(offset..offset + 8)
                .ok_or_else(|| format!("Stks frame header truncated at offset {offset}"))?;
            let return_pc = u32::from_be_bytes([0, header[0], header[1], header[2]]);
            let flags = header[3];
            let num_locals = (flags & 0x0F) as usize;
            if num_locals > MAX_LOCALS {
                return Err(format!("Stks frame declares {num_locals} locals"));
            }
            let stack_count = u16::from_be_bytes([header[6], header[7]]) as usize;
            offset += 8;

            let mut locals = Vec::with_capacity(num_locals);
            for _ in 0..num_locals {
                locals.push(word(offset)?);
                offset += 2;
            }
            let mut stack = Vec::with_capacity(stack_count);
            for _ in 0..stack_count {
                stack.push(word(offset)?);
                offset += 2;
            }

            frames.push(FrameSnapshot {
                return_pc,
                discard: flags & 0x10 != 0,
                result_var: header[4],
                args_mask: header[5],
                locals,
                stack,
            });
        }
        Ok(StksChunk { frames })
    }
}

/// IntD chunk - interpreter-private data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntDChunk {
    pub os_id: [u8; 4],
    pub interpreter_id: [u8; 4],
    pub data: Vec<u8>,
}

impl Default for IntDChunk {
    fn default() -> Self {
        IntDChunk {
            os_id: *b"    ",
            interpreter_id: *b"ZCOR",
            data: Vec::new(),
        }
    }
}

impl IntDChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(12 + self.data.len());
        bytes.extend_from_slice(&self.os_id);
        // flags, contents id, reserved word
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&self.interpreter_id);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}
