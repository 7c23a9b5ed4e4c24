//! Binary STL decoder.
//!
//! Binary STL files are laid out like so (all numbers are little-endian):
//!
//! ```text
//! file     := header count *record
//! header   := 80OCTET  ; free-form, ignored
//! count    := u32      ; number of records
//! record   := normal vertex vertex vertex attr
//! normal   := f32 f32 f32
//! vertex   := f32 f32 f32
//! attr     := u16      ; "attribute byte count", ignored
//! ```
//!
//! Bytes after the last record are ignored.

use crate::Error;
use crate::Facet;
use crate::Result;
use crate::Vertex;

pub const HEADER_SIZE: usize = 80;
pub const COUNT_SIZE: usize = 4;
pub const RECORD_SIZE: usize = 50;

fn le_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn le_vertex(bytes: &[u8]) -> Vertex {
    Vertex {
        x: le_f32(&bytes[0..4]),
        y: le_f32(&bytes[4..8]),
        z: le_f32(&bytes[8..12]),
    }
}

fn decode_record(record: &[u8]) -> Facet {
    Facet::new(
        le_vertex(&record[0..12]),
        [
            le_vertex(&record[12..24]),
            le_vertex(&record[24..36]),
            le_vertex(&record[36..48]),
        ],
    )
}

/// Decodes a whole binary STL file, header included.
///
/// Exactly as many facets as the header declares are returned. The input
/// being shorter than that is an error, and no facet is returned then.
pub fn parse(input: &[u8]) -> Result<Vec<Facet>> {
    let span = tracing::info_span!("parse_binary", len = input.len());
    let _enter = span.enter();

    if input.len() < HEADER_SIZE {
        return Err(Error::BinaryHeaderTruncated { len: input.len() });
    }
    let body = &input[HEADER_SIZE..];
    if body.len() < COUNT_SIZE {
        return Err(Error::BinaryCountTruncated { len: input.len() });
    }
    let count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    let mut records = body[COUNT_SIZE..].chunks_exact(RECORD_SIZE);
    tracing::debug!(count, available = records.len(), "decoding triangles");

    // The count comes from the file, do not trust it for the allocation.
    let mut facets = Vec::with_capacity(usize::min(count as usize, records.len()));
    for index in 0..count {
        let record = records
            .next()
            .ok_or(Error::BinaryRecordTruncated { index, count })?;
        facets.push(decode_record(record));
    }

    Ok(facets)
}
