//! Per-version opcode metadata
//!
//! The meaning of an opcode depends on its operand-count class, its number
//! and the story version (0OP:9 is `pop` up to v4 and `catch` from v5, for
//! example). The table is built once on first use and never mutated.

use crate::interpreter::core::instruction::OperandCount;
use std::collections::HashMap;

/// Decoding and display metadata for one opcode over a range of versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub min_version: u8,
    pub max_version: u8,
    /// A store-variable byte follows the operands
    pub store: bool,
    /// Branch data follows the operands (and store byte)
    pub branch: bool,
    /// An inline encoded string follows the opcode
    pub text: bool,
    /// Produces output on the current streams
    pub output: bool,
}

impl OpcodeInfo {
    const fn new(name: &'static str, min_version: u8, max_version: u8) -> Self {
        OpcodeInfo {
            name,
            min_version,
            max_version,
            store: false,
            branch: false,
            text: false,
            output: false,
        }
    }

    const fn store(mut self) -> Self {
        self.store = true;
        self
    }

    const fn branch(mut self) -> Self {
        self.branch = true;
        self
    }

    const fn text(mut self) -> Self {
        self.text = true;
        self
    }

    const fn output(mut self) -> Self {
        self.output = true;
        self
    }

    pub fn covers(&self, version: u8) -> bool {
        (self.min_version..=self.max_version).contains(&version)
    }
}

use OperandCount::{EXT, OP0, OP1, OP2, VAR};

const fn all(name: &'static str) -> OpcodeInfo {
    OpcodeInfo::new(name, 1, 8)
}

const fn from(name: &'static str, min_version: u8) -> OpcodeInfo {
    OpcodeInfo::new(name, min_version, 8)
}

const fn only(name: &'static str, min_version: u8, max_version: u8) -> OpcodeInfo {
    OpcodeInfo::new(name, min_version, max_version)
}

#[rustfmt::skip]
const OPCODES: &[(OperandCount, u8, OpcodeInfo)] = &[
    // ---- 2OP ----
    (OP2, 0x01, all("je").branch()),
    (OP2, 0x02, all("jl").branch()),
    (OP2, 0x03, all("jg").branch()),
    (OP2, 0x04, all("dec_chk").branch()),
    (OP2, 0x05, all("inc_chk").branch()),
    (OP2, 0x06, all("jin").branch()),
    (OP2, 0x07, all("test").branch()),
    (OP2, 0x08, all("or").store()),
    (OP2, 0x09, all("and").store()),
    (OP2, 0x0A, all("test_attr").branch()),
    (OP2, 0x0B, all("set_attr")),
    (OP2, 0x0C, all("clear_attr")),
    (OP2, 0x0D, all("store")),
    (OP2, 0x0E, all("insert_obj")),
    (OP2, 0x0F, all("loadw").store()),
    (OP2, 0x10, all("loadb").store()),
    (OP2, 0x11, all("get_prop").store()),
    (OP2, 0x12, all("get_prop_addr").store()),
    (OP2, 0x13, all("get_next_prop").store()),
    (OP2, 0x14, all("add").store()),
    (OP2, 0x15, all("sub").store()),
    (OP2, 0x16, all("mul").store()),
    (OP2, 0x17, all("div").store()),
    (OP2, 0x18, all("mod").store()),
    (OP2, 0x19, from("call_2s", 4).store()),
    (OP2, 0x1A, from("call_2n", 5)),
    (OP2, 0x1B, from("set_colour", 5)),
    (OP2, 0x1C, from("throw", 5)),

    // ---- 1OP ----
    (OP1, 0x00, all("jz").branch()),
    (OP1, 0x01, all("get_sibling").store().branch()),
    (OP1, 0x02, all("get_child").store().branch()),
    (OP1, 0x03, all("get_parent").store()),
    (OP1, 0x04, all("get_prop_len").store()),
    (OP1, 0x05, all("inc")),
    (OP1, 0x06, all("dec")),
    (OP1, 0x07, all("print_addr").output()),
    (OP1, 0x08, from("call_1s", 4).store()),
    (OP1, 0x09, all("remove_obj")),
    (OP1, 0x0A, all("print_obj").output()),
    (OP1, 0x0B, all("ret")),
    (OP1, 0x0C, all("jump")),
    (OP1, 0x0D, all("print_paddr").output()),
    (OP1, 0x0E, all("load").store()),
    (OP1, 0x0F, only("not", 1, 4).store()),
    (OP1, 0x0F, from("call_1n", 5)),

    // ---- 0OP ----
    (OP0, 0x00, all("rtrue")),
    (OP0, 0x01, all("rfalse")),
    (OP0, 0x02, all("print").text().output()),
    (OP0, 0x03, all("print_ret").text().output()),
    (OP0, 0x04, all("nop")),
    (OP0, 0x05, only("save", 1, 3).branch()),
    (OP0, 0x05, only("save", 4, 4).store()),
    (OP0, 0x06, only("restore", 1, 3).branch()),
    (OP0, 0x06, only("restore", 4, 4).store()),
    (OP0, 0x07, all("restart")),
    (OP0, 0x08, all("ret_popped")),
    (OP0, 0x09, only("pop", 1, 4)),
    (OP0, 0x09, from("catch", 5).store()),
    (OP0, 0x0A, all("quit")),
    (OP0, 0x0B, all("new_line").output()),
    (OP0, 0x0C, only("show_status", 1, 3)),
    (OP0, 0x0D, from("verify", 3).branch()),
    (OP0, 0x0F, from("piracy", 5).branch()),

    // ---- VAR ----
    (VAR, 0x00, only("call", 1, 3).store()),
    (VAR, 0x00, from("call_vs", 4).store()),
    (VAR, 0x01, all("storew")),
    (VAR, 0x02, all("storeb")),
    (VAR, 0x03, all("put_prop")),
    (VAR, 0x04, only("sread", 1, 4)),
    (VAR, 0x04, from("aread", 5).store()),
    (VAR, 0x05, all("print_char").output()),
    (VAR, 0x06, all("print_num").output()),
    (VAR, 0x07, all("random").store()),
    (VAR, 0x08, all("push")),
    (VAR, 0x09, only("pull", 1, 5)),
    (VAR, 0x09, only("pull", 6, 6).store()),
    (VAR, 0x09, only("pull", 7, 8)),
    (VAR, 0x0A, from("split_window", 3)),
    (VAR, 0x0B, from("set_window", 3)),
    (VAR, 0x0C, from("call_vs2", 4).store()),
    (VAR, 0x0D, from("erase_window", 4)),
    (VAR, 0x0E, from("erase_line", 4)),
    (VAR, 0x0F, from("set_cursor", 4)),
    (VAR, 0x10, from("get_cursor", 4)),
    (VAR, 0x11, from("set_text_style", 4)),
    (VAR, 0x12, from("buffer_mode", 4)),
    (VAR, 0x13, from("output_stream", 3)),
    (VAR, 0x14, from("input_stream", 3)),
    (VAR, 0x15, from("sound_effect", 3)),
    (VAR, 0x16, from("read_char", 4).store()),
    (VAR, 0x17, from("scan_table", 4).store().branch()),
    (VAR, 0x18, from("not", 5).store()),
    (VAR, 0x19, from("call_vn", 5)),
    (VAR, 0x1A, from("call_vn2", 5)),
    (VAR, 0x1B, from("tokenise", 5)),
    (VAR, 0x1C, from("encode_text", 5)),
    (VAR, 0x1D, from("copy_table", 5)),
    (VAR, 0x1E, from("print_table", 5).output()),
    (VAR, 0x1F, from("check_arg_count", 5).branch()),

    // ---- EXT ----
    (EXT, 0x00, from("save", 5).store()),
    (EXT, 0x01, from("restore", 5).store()),
    (EXT, 0x02, from("log_shift", 5).store()),
    (EXT, 0x03, from("art_shift", 5).store()),
    (EXT, 0x04, from("set_font", 5).store()),
    (EXT, 0x05, only("draw_picture", 6, 6)),
    (EXT, 0x06, only("picture_data", 6, 6).branch()),
    (EXT, 0x07, only("erase_picture", 6, 6)),
    (EXT, 0x08, only("set_margins", 6, 6)),
    (EXT, 0x09, from("save_undo", 5).store()),
    (EXT, 0x0A, from("restore_undo", 5).store()),
    (EXT, 0x0B, from("print_unicode", 5).output()),
    (EXT, 0x0C, from("check_unicode", 5).store()),
    (EXT, 0x0D, from("set_true_colour", 5)),
    (EXT, 0x10, only("move_window", 6, 6)),
    (EXT, 0x11, only("window_size", 6, 6)),
    (EXT, 0x12, only("window_style", 6, 6)),
    (EXT, 0x13, only("get_wind_prop", 6, 6).store()),
    (EXT, 0x14, only("scroll_window", 6, 6)),
    (EXT, 0x15, only("pop_stack", 6, 6)),
    (EXT, 0x16, only("read_mouse", 6, 6)),
    (EXT, 0x17, only("mouse_window", 6, 6)),
    (EXT, 0x18, only("push_stack", 6, 6).branch()),
    (EXT, 0x19, only("put_wind_prop", 6, 6)),
    (EXT, 0x1A, only("print_form", 6, 6).output()),
    (EXT, 0x1B, only("make_menu", 6, 6).branch()),
    (EXT, 0x1C, only("picture_table", 6, 6)),
    (EXT, 0x1D, only("buffer_screen", 6, 6).store()),
];

lazy_static! {
    static ref OPCODE_TABLE: HashMap<(OperandCount, u8), Vec<OpcodeInfo>> = {
        let mut table: HashMap<(OperandCount, u8), Vec<OpcodeInfo>> = HashMap::new();
        for (class, opcode, info) in OPCODES {
            table.entry((*class, *opcode)).or_default().push(*info);
        }
        table
    };
}

/// Look up the metadata for an opcode in a given story version
pub fn lookup_opcode(
    operand_count: OperandCount,
    opcode: u8,
    version: u8,
) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE
        .get(&(operand_count, opcode))
        .and_then(|entries| entries.iter().find(|info| info.covers(version)))
}

/// Get the name of an opcode, or "unknown" when it is not defined for the version
pub fn get_instruction_name(operand_count: OperandCount, opcode: u8, version: u8) -> &'static str {
    lookup_opcode(operand_count, opcode, version)
        .map(|info| info.name)
        .unwrap_or("unknown")
}

pub fn stores_result(operand_count: OperandCount, opcode: u8, version: u8) -> bool {
    lookup_opcode(operand_count, opcode, version).is_some_and(|info| info.store)
}

pub fn has_branch(operand_count: OperandCount, opcode: u8, version: u8) -> bool {
    lookup_opcode(operand_count, opcode, version).is_some_and(|info| info.branch)
}

pub fn has_text(operand_count: OperandCount, opcode: u8, version: u8) -> bool {
    lookup_opcode(operand_count, opcode, version).is_some_and(|info| info.text)
}

/// Every (class, opcode) defined for a version, in table order
pub fn opcodes_for_version(version: u8) -> Vec<(OperandCount, u8, &'static OpcodeInfo)> {
    OPCODES
        .iter()
        .filter(|(_, _, info)| info.covers(version))
        .map(|(class, opcode, info)| (*class, *opcode, info))
        .collect()
}
