use crate::interpreter::opcodes::opcode_tables::{self, OpcodeInfo};
use log::trace;
use std::fmt::{Debug, Display, Error, Formatter, Write};

/// Operand types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// Large constant (2 bytes)
    LargeConstant,
    /// Small constant (1 byte)
    SmallConstant,
    /// Variable number
    Variable,
    /// Omitted (not present)
    Omitted,
}

impl OperandType {
    /// Parse operand type from 2-bit value
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => OperandType::LargeConstant,
            0b01 => OperandType::SmallConstant,
            0b10 => OperandType::Variable,
            _ => OperandType::Omitted,
        }
    }

    /// The 2-bit encoding of this type
    pub fn to_bits(self) -> u8 {
        match self {
            OperandType::LargeConstant => 0b00,
            OperandType::SmallConstant => 0b01,
            OperandType::Variable => 0b10,
            OperandType::Omitted => 0b11,
        }
    }

    /// Get the size in bytes for this operand type
    pub fn size(&self) -> usize {
        match self {
            OperandType::LargeConstant => 2,
            OperandType::SmallConstant => 1,
            OperandType::Variable => 1,
            OperandType::Omitted => 0,
        }
    }
}

/// Instruction forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionForm {
    Long,
    Short,
    Extended,
    Variable,
}

/// Operand count categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandCount {
    /// 0 operands
    OP0,
    /// 1 operand
    OP1,
    /// 2 operands (long form, or variable form with a 2OP opcode)
    OP2,
    /// Variable number of operands (0-8)
    VAR,
    /// Extended opcodes (v5+)
    EXT,
}

impl Display for OperandCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            OperandCount::OP0 => "0OP",
            OperandCount::OP1 => "1OP",
            OperandCount::OP2 => "2OP",
            OperandCount::VAR => "VAR",
            OperandCount::EXT => "EXT",
        };
        write!(f, "{name}")
    }
}

/// Branch information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// True if branch on true, false if branch on false
    pub on_true: bool,
    /// Branch offset (0-1 = return false/true, otherwise a jump)
    pub offset: i16,
    /// Encoded length of the branch data (1 or 2 bytes)
    pub len: u8,
    /// Address immediately following the branch data
    pub next_addr: usize,
}

impl BranchInfo {
    /// Decode branch data at `addr`
    pub fn decode(memory: &[u8], addr: usize) -> Result<Self, String> {
        let first_byte = *memory
            .get(addr)
            .ok_or_else(|| format!("Branch offset out of bounds at {addr:05x}"))?;
        let on_true = (first_byte & 0x80) != 0;
        if (first_byte & 0x40) != 0 {
            // Short form: 6-bit unsigned offset
            Ok(BranchInfo {
                on_true,
                offset: (first_byte & 0x3F) as i16,
                len: 1,
                next_addr: addr + 1,
            })
        } else {
            let second_byte = *memory
                .get(addr + 1)
                .ok_or_else(|| format!("Branch offset second byte out of bounds at {addr:05x}"))?;
            let raw = (((first_byte & 0x3F) as i32) << 8) | second_byte as i32;
            let offset = if raw > 8191 { raw - 16384 } else { raw };
            Ok(BranchInfo {
                on_true,
                offset: offset as i16,
                len: 2,
                next_addr: addr + 2,
            })
        }
    }

    /// Encode the branch data
    pub fn encode(&self) -> Vec<u8> {
        let polarity = if self.on_true { 0x80 } else { 0x00 };
        if self.len == 1 {
            vec![polarity | 0x40 | (self.offset as u8 & 0x3F)]
        } else {
            let raw = (self.offset as i32).rem_euclid(16384) as u16;
            vec![polarity | ((raw >> 8) as u8 & 0x3F), raw as u8]
        }
    }
}

/// A decoded Z-Machine instruction
#[derive(Debug, Clone)]
pub struct Instruction {
    /// The raw opcode value (the second byte for extended instructions)
    pub opcode: u8,
    /// The instruction form
    pub form: InstructionForm,
    /// Operand count category
    pub operand_count: OperandCount,
    /// Operand types (up to 8)
    pub operand_types: Vec<OperandType>,
    /// Operand values (up to 8)
    pub operands: Vec<u16>,
    /// Variable to store result (if applicable)
    pub store_var: Option<u8>,
    /// Branch information (if applicable)
    pub branch: Option<BranchInfo>,
    /// Encoded words of the inline string for print opcodes
    pub text: Option<Vec<u16>>,
    /// Total size of instruction in bytes
    pub size: usize,
}

impl Instruction {
    /// Decode an instruction from memory at the given address
    pub fn decode(memory: &[u8], addr: usize, version: u8) -> Result<Self, String> {
        let byte_at = |offset: usize, what: &str| -> Result<u8, String> {
            memory
                .get(offset)
                .copied()
                .ok_or_else(|| format!("{what} out of bounds at {offset:05x}"))
        };

        let mut offset = addr;
        let opcode_byte = byte_at(offset, "Instruction")?;
        offset += 1;

        // Determine instruction form based on top 2 bits; 0xBE is short 0OP:14 before v5
        let form = if opcode_byte == 0xBE && version >= 5 {
            InstructionForm::Extended
        } else {
            match opcode_byte >> 6 {
                0b11 => InstructionForm::Variable,
                0b10 => InstructionForm::Short,
                _ => InstructionForm::Long,
            }
        };

        // Get the actual opcode and operand count
        let (opcode, operand_count) = match form {
            InstructionForm::Long => (opcode_byte & 0x1F, OperandCount::OP2),
            InstructionForm::Short => {
                let op_count = if (opcode_byte >> 4) & 0x03 == 0x03 {
                    OperandCount::OP0
                } else {
                    OperandCount::OP1
                };
                (opcode_byte & 0x0F, op_count)
            }
            InstructionForm::Variable => {
                let op_count = if opcode_byte & 0x20 == 0 {
                    OperandCount::OP2
                } else {
                    OperandCount::VAR
                };
                (opcode_byte & 0x1F, op_count)
            }
            InstructionForm::Extended => {
                let ext_op = byte_at(offset, "Extended opcode")?;
                offset += 1;
                (ext_op, OperandCount::EXT)
            }
        };

        let info = opcode_tables::lookup_opcode(operand_count, opcode, version).ok_or_else(|| {
            format!(
                "Unknown opcode {operand_count}:{opcode} (0x{opcode:02x}) for version {version} at {addr:05x}"
            )
        })?;

        // Decode operand types
        let mut operand_types = Vec::new();
        match form {
            InstructionForm::Long => {
                for mask in [0x40, 0x20] {
                    operand_types.push(if opcode_byte & mask != 0 {
                        OperandType::Variable
                    } else {
                        OperandType::SmallConstant
                    });
                }
            }
            InstructionForm::Short => {
                if operand_count == OperandCount::OP1 {
                    operand_types.push(OperandType::from_bits(opcode_byte >> 4));
                }
            }
            InstructionForm::Variable | InstructionForm::Extended => {
                let type_byte_count = if Self::has_double_type_byte(operand_count, opcode) {
                    2
                } else {
                    1
                };
                let mut type_bytes = Vec::with_capacity(type_byte_count);
                for _ in 0..type_byte_count {
                    type_bytes.push(byte_at(offset, "Operand types")?);
                    offset += 1;
                }

                'types: for type_byte in type_bytes {
                    for i in 0..4 {
                        let op_type = OperandType::from_bits(type_byte >> (6 - i * 2));
                        if op_type == OperandType::Omitted {
                            break 'types;
                        }
                        operand_types.push(op_type);
                    }
                }
            }
        }

        // Read operand values
        let mut operands = Vec::with_capacity(operand_types.len());
        for op_type in &operand_types {
            match op_type {
                OperandType::LargeConstant => {
                    let high = byte_at(offset, "Large constant")? as u16;
                    let low = byte_at(offset + 1, "Large constant")? as u16;
                    operands.push((high << 8) | low);
                    offset += 2;
                }
                OperandType::SmallConstant | OperandType::Variable => {
                    operands.push(byte_at(offset, "Small constant/variable")? as u16);
                    offset += 1;
                }
                OperandType::Omitted => break,
            }
        }

        // Inline text for print / print_ret
        let text = if info.text {
            let mut words = Vec::new();
            loop {
                let high = byte_at(offset, "Inline text")? as u16;
                let low = byte_at(offset + 1, "Inline text")? as u16;
                offset += 2;
                let word = (high << 8) | low;
                words.push(word);
                if word & 0x8000 != 0 {
                    break;
                }
            }
            Some(words)
        } else {
            None
        };

        let store_var = if info.store {
            let var = byte_at(offset, "Store variable")?;
            offset += 1;
            Some(var)
        } else {
            None
        };

        let branch = if info.branch {
            let branch = BranchInfo::decode(memory, offset)?;
            offset = branch.next_addr;
            Some(branch)
        } else {
            None
        };

        let size = offset - addr;
        trace!(
            "decoded {} at {:05x}, {} bytes",
            info.name,
            addr,
            size
        );

        Ok(Instruction {
            opcode,
            form,
            operand_count,
            operand_types,
            operands,
            store_var,
            branch,
            text,
            size,
        })
    }

    /// call_vs2 and call_vn2 carry two operand type bytes
    fn has_double_type_byte(operand_count: OperandCount, opcode: u8) -> bool {
        operand_count == OperandCount::VAR && (opcode == 0x0C || opcode == 0x1A)
    }

    /// Re-encode the instruction into its byte representation
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size);
        match self.form {
            InstructionForm::Long => {
                let mut first = self.opcode & 0x1F;
                if self.operand_types.first() == Some(&OperandType::Variable) {
                    first |= 0x40;
                }
                if self.operand_types.get(1) == Some(&OperandType::Variable) {
                    first |= 0x20;
                }
                bytes.push(first);
            }
            InstructionForm::Short => {
                let type_bits = match self.operand_types.first() {
                    Some(op_type) => op_type.to_bits(),
                    None => 0b11,
                };
                bytes.push(0x80 | (type_bits << 4) | (self.opcode & 0x0F));
            }
            InstructionForm::Variable | InstructionForm::Extended => {
                if self.form == InstructionForm::Extended {
                    bytes.push(0xBE);
                    bytes.push(self.opcode);
                } else {
                    let var_bit = if self.operand_count == OperandCount::VAR {
                        0x20
                    } else {
                        0x00
                    };
                    bytes.push(0xC0 | var_bit | (self.opcode & 0x1F));
                }
                let type_byte_count = if Self::has_double_type_byte(self.operand_count, self.opcode)
                {
                    2
                } else {
                    1
                };
                for byte_index in 0..type_byte_count {
                    let mut type_byte = 0u8;
                    for slot in 0..4 {
                        let bits = self
                            .operand_types
                            .get(byte_index * 4 + slot)
                            .map(|t| t.to_bits())
                            .unwrap_or(0b11);
                        type_byte |= bits << (6 - slot * 2);
                    }
                    bytes.push(type_byte);
                }
            }
        }

        for (op_type, value) in self.operand_types.iter().zip(&self.operands) {
            match op_type {
                OperandType::LargeConstant => bytes.extend_from_slice(&value.to_be_bytes()),
                OperandType::SmallConstant | OperandType::Variable => bytes.push(*value as u8),
                OperandType::Omitted => {}
            }
        }

        if let Some(words) = &self.text {
            for word in words {
                bytes.extend_from_slice(&word.to_be_bytes());
            }
        }
        if let Some(var) = self.store_var {
            bytes.push(var);
        }
        if let Some(branch) = &self.branch {
            bytes.extend(branch.encode());
        }
        bytes
    }

    /// Length of the encoded form
    pub fn encoded_len(&self) -> usize {
        self.encode().len()
    }

    /// Metadata for this instruction in a given version
    pub fn info(&self, version: u8) -> Option<&'static OpcodeInfo> {
        opcode_tables::lookup_opcode(self.operand_count, self.opcode, version)
    }

    /// Get a human-readable name for the instruction
    pub fn name(&self, version: u8) -> &'static str {
        opcode_tables::get_instruction_name(self.operand_count, self.opcode, version)
    }

    /// Format the instruction with proper version information
    pub fn format_with_version(&self, version: u8) -> String {
        let mut result = String::from(self.name(version));

        for (i, op) in self.operands.iter().enumerate() {
            result.push_str(if i == 0 { " " } else { ", " });
            let _ = match self.operand_types[i] {
                OperandType::Variable => write!(result, "V{:02x}", op),
                _ => write!(result, "#{:04x}", op),
            };
        }

        if let Some(var) = self.store_var {
            let _ = write!(result, " -> V{:02x}", var);
        }

        if let Some(ref branch) = self.branch {
            let _ = write!(
                result,
                " [{}{}]",
                if branch.on_true { "TRUE" } else { "FALSE" },
                match branch.offset {
                    0 => " RFALSE".to_string(),
                    1 => " RTRUE".to_string(),
                    n => format!(" {:+}", n),
                }
            );
        }

        result
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        // Without a version, names are resolved as for v5
        write!(f, "{}", self.format_with_version(5))
    }
}
