//! XOR-RLE compression for Quetzal CMem chunks
//!
//! The compression works by XORing the current memory with the original
//! story file, then run-length encoding the zeros.

use log::debug;

/// Compress dynamic memory using XOR-RLE compression.
/// A trailing run of unchanged bytes is omitted.
pub fn compress_memory(current: &[u8], original: &[u8]) -> Vec<u8> {
    let len = current.len().min(original.len());
    let mut compressed = Vec::new();
    let mut i = 0;

    while i < len {
        let xor_byte = current[i] ^ original[i];

        if xor_byte == 0 {
            let start = i;
            while i < len && current[i] == original[i] {
                i += 1;
            }
            if i == len {
                break;
            }

            // 0 followed by run-1, runs longer than 256 split
            let mut remaining = i - start;
            while remaining > 0 {
                let run = remaining.min(256);
                compressed.push(0);
                compressed.push((run - 1) as u8);
                remaining -= run;
            }
        } else {
            compressed.push(xor_byte);
            i += 1;
        }
    }

    debug!("Compressed {} bytes to {} bytes", len, compressed.len());
    compressed
}

/// Decompress memory using XOR-RLE decompression
///
/// This decompresses the RLE data and XORs with the original to get current memory
pub fn decompress_memory(compressed: &[u8], original: &[u8]) -> Result<Vec<u8>, String> {
    let mut decompressed = Vec::with_capacity(original.len());
    let mut iter = compressed.iter();

    while let Some(&byte) = iter.next() {
        if byte == 0 {
            let run_length = *iter.next().ok_or("Incomplete RLE sequence")? as usize + 1;
            if decompressed.len() + run_length > original.len() {
                return Err("RLE run extends beyond memory".to_string());
            }
            let start = decompressed.len();
            decompressed.extend_from_slice(&original[start..start + run_length]);
        } else {
            let index = decompressed.len();
            let base = original
                .get(index)
                .ok_or("Compressed data extends beyond memory")?;
            decompressed.push(base ^ byte);
        }
    }

    // Omitted trailing bytes are unchanged
    let done = decompressed.len();
    decompressed.extend_from_slice(&original[done..]);
    Ok(decompressed)
}
