use crate::interpreter::core::instruction::{Instruction, InstructionForm, OperandCount};
use crate::interpreter::opcodes::opcode_tables::{opcodes_for_version, OpcodeInfo};

/// One plausible encoding of an opcode: form byte(s), small-constant operands,
/// then inline text, store byte and branch byte as the table demands
fn sample_bytes(class: OperandCount, opcode: u8, info: &OpcodeInfo) -> Vec<u8> {
    let mut bytes = match class {
        OperandCount::OP0 => vec![0xB0 | opcode],
        OperandCount::OP1 => vec![0x90 | opcode, 0x01],
        // long form, small constant then variable
        OperandCount::OP2 => vec![0x20 | opcode, 0x01, 0x10],
        OperandCount::VAR if opcode == 0x0C || opcode == 0x1A => {
            vec![0xE0 | opcode, 0x57, 0xFF, 0x01, 0x02, 0x03]
        }
        OperandCount::VAR => vec![0xE0 | opcode, 0x1F, 0x12, 0x34, 0x05],
        OperandCount::EXT => vec![0xBE, opcode, 0x6F, 0x01, 0x10],
    };
    if info.text {
        // "hi" with the end bit
        bytes.extend_from_slice(&[0xB5, 0xC5]);
    }
    if info.store {
        bytes.push(0x10);
    }
    if info.branch {
        bytes.extend_from_slice(&[0x00, 0x20]);
    }
    bytes
}

#[test]
fn test_every_opcode_round_trips() {
    for version in 1..=8u8 {
        let table = opcodes_for_version(version);
        assert!(!table.is_empty());
        for (class, opcode, info) in table {
            let bytes = sample_bytes(class, opcode, info);
            let mut memory = bytes.clone();
            memory.extend_from_slice(&[0; 8]);

            let inst = Instruction::decode(&memory, 0, version)
                .unwrap_or_else(|e| panic!("v{version} {class}:{opcode:02x} {}: {e}", info.name));
            assert_eq!(inst.operand_count, class, "v{version} {}", info.name);
            assert_eq!(inst.size, bytes.len(), "v{version} {}", info.name);
            assert_eq!(inst.encode(), bytes, "v{version} {}", info.name);
            assert_eq!(inst.encoded_len(), inst.size);
            assert_eq!(inst.name(version), info.name);
        }
    }
}

#[test]
fn test_two_op_in_variable_form() {
    // je with four operands: VAR form of a 2OP opcode
    let memory = [0xC1, 0x55, 0x01, 0x02, 0x03, 0x04, 0xC1];
    let inst = Instruction::decode(&memory, 0, 3).unwrap();
    assert_eq!(inst.form, InstructionForm::Variable);
    assert_eq!(inst.operand_count, OperandCount::OP2);
    assert_eq!(inst.operands, vec![1, 2, 3, 4]);
    assert_eq!(inst.encode(), memory.to_vec());
}

#[test]
fn test_double_type_byte_call() {
    // call_vs2 with five operands spills into the second type byte
    let memory = [0xEC, 0x15, 0x7F, 0x12, 0x34, 0x01, 0x02, 0x03, 0x04, 0x00];
    let inst = Instruction::decode(&memory, 0, 5).unwrap();
    assert_eq!(inst.name(5), "call_vs2");
    assert_eq!(inst.operands, vec![0x1234, 1, 2, 3, 4]);
    assert_eq!(inst.store_var, Some(0));
    assert_eq!(inst.size, memory.len());
}

#[test]
fn test_extended_needs_version_five() {
    let memory = [0xBE, 0x02, 0x5F, 0x01, 0x02, 0x10];
    assert!(Instruction::decode(&memory, 0, 3).is_err());
    let inst = Instruction::decode(&memory, 0, 5).unwrap();
    assert_eq!(inst.form, InstructionForm::Extended);
    assert_eq!(inst.name(5), "log_shift");
}
