//! Z-Machine object tree
//!
//! Both object table formats are handled by one implementation driven by an
//! [`ObjectLayout`] chosen from the story version:
//!
//! ```text
//! v1-3: 32 attributes (4 bytes)  parent  sibling  child   properties
//!       ---------------------    1 byte  1 byte   1 byte  2 bytes      = 9 bytes
//! v4+:  48 attributes (6 bytes)  parent  sibling  child   properties
//!       ---------------------    2 bytes 2 bytes  2 bytes 2 bytes      = 14 bytes
//! ```
use crate::interpreter::core::vm::VM;
use crate::interpreter::text::text::ZText;
use bitvec::prelude::*;
use log::debug;

/// Geometry of the object table for one family of versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLayout {
    /// Width of parent/sibling/child links in bytes
    pub link_width: usize,
    /// Words in the property defaults table
    pub default_count: usize,
    /// Size of one object entry
    pub entry_size: usize,
    pub attribute_bytes: usize,
    pub parent_offset: usize,
    pub sibling_offset: usize,
    pub child_offset: usize,
    pub property_offset: usize,
    pub max_objects: u16,
}

/// Versions 1-3
pub const CLASSIC_LAYOUT: ObjectLayout = ObjectLayout {
    link_width: 1,
    default_count: 31,
    entry_size: 9,
    attribute_bytes: 4,
    parent_offset: 4,
    sibling_offset: 5,
    child_offset: 6,
    property_offset: 7,
    max_objects: 255,
};

/// Versions 4 and later
pub const MODERN_LAYOUT: ObjectLayout = ObjectLayout {
    link_width: 2,
    default_count: 63,
    entry_size: 14,
    attribute_bytes: 6,
    parent_offset: 6,
    sibling_offset: 8,
    child_offset: 10,
    property_offset: 12,
    max_objects: 65535,
};

impl ObjectLayout {
    pub fn for_version(version: u8) -> ObjectLayout {
        if version <= 3 {
            CLASSIC_LAYOUT
        } else {
            MODERN_LAYOUT
        }
    }

    pub fn attribute_count(&self) -> u16 {
        (self.attribute_bytes * 8) as u16
    }

    pub fn max_property(&self) -> u16 {
        self.default_count as u16
    }

    pub fn is_modern(&self) -> bool {
        self.link_width == 2
    }
}

/// One entry in a property list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEntry {
    pub number: u16,
    /// Length of the property data in bytes
    pub size: usize,
    /// Address of the first data byte
    pub data_addr: u32,
}

pub trait ZObjectSystem {
    fn object_addr(&self, obj_num: u16) -> Result<u32, String>;
    fn get_parent(&self, obj_num: u16) -> Result<u16, String>;
    fn set_parent(&mut self, obj_num: u16, parent: u16) -> Result<(), String>;
    fn get_sibling(&self, obj_num: u16) -> Result<u16, String>;
    fn set_sibling(&mut self, obj_num: u16, sibling: u16) -> Result<(), String>;
    fn get_child(&self, obj_num: u16) -> Result<u16, String>;
    fn set_child(&mut self, obj_num: u16, child: u16) -> Result<(), String>;
    fn test_attribute(&self, obj_num: u16, attr_num: u16) -> Result<bool, String>;
    fn set_attribute(&mut self, obj_num: u16, attr_num: u16, value: bool) -> Result<(), String>;
    fn property_table_addr(&self, obj_num: u16) -> Result<u32, String>;
    fn property_entry_at(&self, addr: u32) -> Result<Option<PropertyEntry>, String>;
    fn find_property(&self, obj_num: u16, prop_num: u16) -> Result<Option<PropertyEntry>, String>;
    fn get_property(&self, obj_num: u16, prop_num: u16) -> Result<u16, String>;
    fn put_property(&mut self, obj_num: u16, prop_num: u16, value: u16) -> Result<(), String>;
    fn get_property_addr(&self, obj_num: u16, prop_num: u16) -> Result<u16, String>;
    fn get_next_property(&self, obj_num: u16, prop_num: u16) -> Result<u16, String>;
    fn get_property_len(&self, data_addr: u16) -> Result<u16, String>;
    fn remove_object(&mut self, obj_num: u16) -> Result<(), String>;
    fn insert_object(&mut self, obj_num: u16, dest_num: u16) -> Result<(), String>;
    fn object_name(&self, obj_num: u16) -> Result<String, String>;
}

impl VM {
    fn read_link(&self, addr: u32) -> Result<u16, String> {
        if self.object_layout.is_modern() {
            self.read_word(addr)
        } else {
            self.read_byte(addr).map(u16::from)
        }
    }

    fn write_link(&mut self, addr: u32, value: u16) -> Result<(), String> {
        if self.object_layout.is_modern() {
            self.write_word(addr, value)
        } else {
            if value > 255 {
                return Err(format!("Object link {value} does not fit a v1-3 object table"));
            }
            self.write_byte(addr, value as u8)
        }
    }
}

impl ZObjectSystem for VM {
    fn object_addr(&self, obj_num: u16) -> Result<u32, String> {
        let layout = self.object_layout;
        if obj_num == 0 || obj_num > layout.max_objects {
            return Err(format!("Invalid object number: {obj_num}"));
        }
        let tree_base = self.game.header.object_table_addr + layout.default_count * 2;
        let addr = tree_base + (obj_num as usize - 1) * layout.entry_size;
        if addr + layout.entry_size > self.game.memory.len() {
            return Err(format!("Object {obj_num} lies outside the story image"));
        }
        Ok(addr as u32)
    }

    fn get_parent(&self, obj_num: u16) -> Result<u16, String> {
        let addr = self.object_addr(obj_num)?;
        self.read_link(addr + self.object_layout.parent_offset as u32)
    }

    fn set_parent(&mut self, obj_num: u16, parent: u16) -> Result<(), String> {
        let addr = self.object_addr(obj_num)?;
        self.write_link(addr + self.object_layout.parent_offset as u32, parent)
    }

    fn get_sibling(&self, obj_num: u16) -> Result<u16, String> {
        let addr = self.object_addr(obj_num)?;
        self.read_link(addr + self.object_layout.sibling_offset as u32)
    }

    fn set_sibling(&mut self, obj_num: u16, sibling: u16) -> Result<(), String> {
        let addr = self.object_addr(obj_num)?;
        self.write_link(addr + self.object_layout.sibling_offset as u32, sibling)
    }

    fn get_child(&self, obj_num: u16) -> Result<u16, String> {
        let addr = self.object_addr(obj_num)?;
        self.read_link(addr + self.object_layout.child_offset as u32)
    }

    fn set_child(&mut self, obj_num: u16, child: u16) -> Result<(), String> {
        let addr = self.object_addr(obj_num)?;
        self.write_link(addr + self.object_layout.child_offset as u32, child)
    }

    fn test_attribute(&self, obj_num: u16, attr_num: u16) -> Result<bool, String> {
        if attr_num >= self.object_layout.attribute_count() {
            debug!("Attribute {attr_num} out of range, reads as clear");
            return Ok(false);
        }
        let addr = self.object_addr(obj_num)? as usize;
        let bytes = &self.game.memory[addr..addr + self.object_layout.attribute_bytes];
        Ok(bytes.view_bits::<Msb0>()[attr_num as usize])
    }

    fn set_attribute(&mut self, obj_num: u16, attr_num: u16, value: bool) -> Result<(), String> {
        if attr_num >= self.object_layout.attribute_count() {
            debug!("Attribute {attr_num} out of range, ignored");
            return Ok(());
        }
        let addr = self.object_addr(obj_num)?;
        let byte_addr = addr + attr_num as u32 / 8;
        let mut byte = [self.read_byte(byte_addr)?];
        byte.view_bits_mut::<Msb0>().set(attr_num as usize % 8, value);
        self.write_byte(byte_addr, byte[0])
    }

    fn property_table_addr(&self, obj_num: u16) -> Result<u32, String> {
        let addr = self.object_addr(obj_num)?;
        self.read_word(addr + self.object_layout.property_offset as u32)
            .map(u32::from)
    }

    fn property_entry_at(&self, addr: u32) -> Result<Option<PropertyEntry>, String> {
        let size_byte = self.read_byte(addr)?;
        if size_byte == 0 {
            return Ok(None);
        }
        let entry = if !self.object_layout.is_modern() {
            PropertyEntry {
                number: (size_byte & 0x1F) as u16,
                size: (size_byte / 32) as usize + 1,
                data_addr: addr + 1,
            }
        } else if size_byte & 0x80 != 0 {
            let len = (self.read_byte(addr + 1)? & 0x3F) as usize;
            PropertyEntry {
                number: (size_byte & 0x3F) as u16,
                size: if len == 0 { 64 } else { len },
                data_addr: addr + 2,
            }
        } else {
            PropertyEntry {
                number: (size_byte & 0x3F) as u16,
                size: if size_byte & 0x40 != 0 { 2 } else { 1 },
                data_addr: addr + 1,
            }
        };
        Ok(Some(entry))
    }

    fn find_property(&self, obj_num: u16, prop_num: u16) -> Result<Option<PropertyEntry>, String> {
        let table = self.property_table_addr(obj_num)?;
        let text_len = self.read_byte(table)? as u32;
        let mut addr = table + 1 + 2 * text_len;

        while let Some(entry) = self.property_entry_at(addr)? {
            if entry.number == prop_num {
                return Ok(Some(entry));
            }
            if entry.number < prop_num {
                // descending order
                break;
            }
            addr = entry.data_addr + entry.size as u32;
        }
        Ok(None)
    }

    fn get_property(&self, obj_num: u16, prop_num: u16) -> Result<u16, String> {
        if prop_num == 0 || prop_num > self.object_layout.max_property() {
            return Err(format!("Property number {prop_num} is invalid"));
        }
        match self.find_property(obj_num, prop_num)? {
            Some(entry) => match entry.size {
                1 => self.read_byte(entry.data_addr).map(u16::from),
                2 => self.read_word(entry.data_addr),
                size => {
                    log::warn!(
                        "get_prop on object {obj_num} property {prop_num} of length {size}, reading first word"
                    );
                    self.read_word(entry.data_addr)
                }
            },
            None => {
                let default_addr =
                    self.game.header.object_table_addr as u32 + 2 * (prop_num as u32 - 1);
                self.read_word(default_addr)
            }
        }
    }

    fn put_property(&mut self, obj_num: u16, prop_num: u16, value: u16) -> Result<(), String> {
        let entry = self.find_property(obj_num, prop_num)?.ok_or_else(|| {
            format!("put_prop: object {obj_num} has no property {prop_num}")
        })?;
        match entry.size {
            1 => self.write_byte(entry.data_addr, (value & 0xFF) as u8),
            _ => self.write_word(entry.data_addr, value),
        }
    }

    fn get_property_addr(&self, obj_num: u16, prop_num: u16) -> Result<u16, String> {
        Ok(self
            .find_property(obj_num, prop_num)?
            .map(|entry| entry.data_addr as u16)
            .unwrap_or(0))
    }

    fn get_next_property(&self, obj_num: u16, prop_num: u16) -> Result<u16, String> {
        let next_addr = if prop_num == 0 {
            let table = self.property_table_addr(obj_num)?;
            table + 1 + 2 * self.read_byte(table)? as u32
        } else {
            let entry = self.find_property(obj_num, prop_num)?.ok_or_else(|| {
                format!("get_next_prop: object {obj_num} has no property {prop_num}")
            })?;
            entry.data_addr + entry.size as u32
        };
        Ok(self
            .property_entry_at(next_addr)?
            .map(|entry| entry.number)
            .unwrap_or(0))
    }

    fn get_property_len(&self, data_addr: u16) -> Result<u16, String> {
        if data_addr == 0 {
            return Ok(0);
        }
        let size_byte = self.read_byte(data_addr as u32 - 1)?;
        let len = if !self.object_layout.is_modern() {
            (size_byte / 32) as u16 + 1
        } else if size_byte & 0x80 != 0 {
            // second size byte of a two-byte header
            match size_byte & 0x3F {
                0 => 64,
                n => n as u16,
            }
        } else if size_byte & 0x40 != 0 {
            2
        } else {
            1
        };
        Ok(len)
    }

    fn remove_object(&mut self, obj_num: u16) -> Result<(), String> {
        let parent = self.get_parent(obj_num)?;
        if parent != 0 {
            let next = self.get_sibling(obj_num)?;
            let first = self.get_child(parent)?;
            if first == obj_num {
                self.set_child(parent, next)?;
            } else {
                let mut current = first;
                let mut steps = 0;
                while current != 0 {
                    let sibling = self.get_sibling(current)?;
                    if sibling == obj_num {
                        self.set_sibling(current, next)?;
                        break;
                    }
                    current = sibling;
                    steps += 1;
                    if steps > self.object_layout.max_objects as usize {
                        return Err(format!("Sibling chain of object {parent} loops"));
                    }
                }
            }
        }
        self.set_parent(obj_num, 0)?;
        self.set_sibling(obj_num, 0)?;
        Ok(())
    }

    fn insert_object(&mut self, obj_num: u16, dest_num: u16) -> Result<(), String> {
        // the tree must stay a forest: dest may not be obj or lie inside it
        let mut ancestor = dest_num;
        let mut steps = 0;
        while ancestor != 0 {
            if ancestor == obj_num {
                return Err(format!(
                    "insert_obj: cannot move object {obj_num} into {dest_num}, which it contains"
                ));
            }
            ancestor = self.get_parent(ancestor)?;
            steps += 1;
            if steps > self.object_layout.max_objects as usize {
                return Err(format!("Parent chain of object {dest_num} loops"));
            }
        }

        self.remove_object(obj_num)?;
        let old_child = self.get_child(dest_num)?;
        self.set_sibling(obj_num, old_child)?;
        self.set_parent(obj_num, dest_num)?;
        self.set_child(dest_num, obj_num)?;
        Ok(())
    }

    fn object_name(&self, obj_num: u16) -> Result<String, String> {
        let table = self.property_table_addr(obj_num)?;
        if self.read_byte(table)? == 0 {
            return Ok(String::new());
        }
        let text = ZText::new(&self.game.memory, &self.game.header);
        let (name, _) = text.decode_at(table as usize + 1)?;
        Ok(name)
    }
}
