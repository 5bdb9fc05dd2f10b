//! IFF (Interchange File Format) container for Quetzal saves

use indexmap::IndexMap;

/// A FORM with its chunks, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IffForm {
    /// Form type - "IFZS" for Quetzal
    pub form_type: [u8; 4],
    /// Chunks keyed by type; a repeated type keeps the first occurrence
    pub chunks: IndexMap<[u8; 4], Vec<u8>>,
}

impl IffForm {
    /// Create a new Quetzal form
    pub fn new() -> Self {
        IffForm {
            form_type: *b"IFZS",
            chunks: IndexMap::new(),
        }
    }

    /// Add a chunk to the form
    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.entry(chunk_type).or_insert(data);
    }

    /// Find a chunk by type
    pub fn chunk(&self, chunk_type: &[u8; 4]) -> Option<&[u8]> {
        self.chunks.get(chunk_type).map(Vec::as_slice)
    }

    /// Serialize, padding each chunk to even length
    pub fn to_bytes(&self) -> Vec<u8> {
        let body_size = 4 + self
            .chunks
            .values()
            .map(|data| 8 + data.len() + data.len() % 2)
            .sum::<usize>();

        let mut output = Vec::with_capacity(8 + body_size);
        output.extend_from_slice(b"FORM");
        output.extend_from_slice(&(body_size as u32).to_be_bytes());
        output.extend_from_slice(&self.form_type);

        for (chunk_type, data) in &self.chunks {
            output.extend_from_slice(chunk_type);
            output.extend_from_slice(&(data.len() as u32).to_be_bytes());
            output.extend_from_slice(data);
            if data.len() % 2 == 1 {
                output.push(0);
            }
        }
        output
    }

    /// Parse a FORM from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() < 12 {
            return Err("Save data too small".to_string());
        }
        if &data[0..4] != b"FORM" {
            return Err("Not an IFF file (missing FORM header)".to_string());
        }
        let declared = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let end = (8 + declared).min(data.len());

        let mut form_type = [0u8; 4];
        form_type.copy_from_slice(&data[8..12]);
        let mut form = IffForm {
            form_type,
            chunks: IndexMap::new(),
        };

        let mut offset = 12;
        while offset + 8 <= end {
            let mut chunk_type = [0u8; 4];
            chunk_type.copy_from_slice(&data[offset..offset + 4]);
            let size = u32::from_be_bytes([
                data[offset + 4],
                data[offset + 5],
                data[offset + 6],
                data[offset + 7],
            ]) as usize;
            offset += 8;

            if offset + size > end {
                return Err(format!(
                    "Chunk {} extends beyond the form",
                    String::from_utf8_lossy(&chunk_type)
                ));
            }
            form.add_chunk(chunk_type, data[offset..offset + size].to_vec());
            offset += size + size % 2;
        }
        Ok(form)
    }
}

impl Default for IffForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_chunks_are_padded() {
        let mut form = IffForm::new();
        form.add_chunk(*b"IFhd", vec![1, 2, 3]);
        form.add_chunk(*b"Stks", vec![4, 5]);
        let bytes = form.to_bytes();

        // 12 header + (8 + 3 + 1) + (8 + 2)
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[4..8], &26u32.to_be_bytes());
        assert_eq!(bytes[23], 0);

        let parsed = IffForm::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, form);
        assert_eq!(parsed.chunks.keys().next(), Some(b"IFhd"));
    }

    #[test]
    fn test_rejects_truncated_chunk() {
        let mut form = IffForm::new();
        form.add_chunk(*b"CMem", vec![0; 10]);
        let mut bytes = form.to_bytes();
        bytes.truncate(bytes.len() - 4);
        assert!(IffForm::from_bytes(&bytes).is_err());
        assert!(IffForm::from_bytes(b"LIST").is_err());
    }
}
