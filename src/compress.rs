//! PackBits run-length compression for channel planes.
//!
//! Compresses one rectangular channel selection at a time:
//! - Control byte 0-127: the next N+1 bytes are literal
//! - Control byte 129-255: the next byte repeats 257-N times
//! - Control byte 128 is never emitted
//!
//! A compressed plane is a table of per-row byte counts (`u16` each) followed
//! by the packed rows. Layer channels store the two parts back to back; the
//! composite image block hoists every channel's table ahead of all row data,
//! so the parts stay separate here.

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::geometry::Rect;
use crate::raster::PixelBuffer;

/// One compressed channel plane.
#[derive(Debug, Clone)]
pub struct RlePlane {
    row_counts: Vec<u8>,
    rows: Vec<u8>,
}

impl RlePlane {
    /// The per-row byte-count table, one big-endian `u16` per row.
    pub fn row_counts(&self) -> &[u8] {
        &self.row_counts
    }

    /// The packed row data, in row order.
    pub fn rows(&self) -> &[u8] {
        &self.rows
    }

    /// Total payload length: count table plus packed rows.
    pub fn payload_len(&self) -> usize {
        self.row_counts.len() + self.rows.len()
    }

    /// The layer-channel payload form: count table then packed rows.
    pub fn into_payload(self) -> Bytes {
        let mut payload = self.row_counts;
        payload.extend_from_slice(&self.rows);
        Bytes::from(payload)
    }
}

/// Worst-case compressed size of one `width` x `height` plane, including its
/// row-count table. Sizes the scratch buffer shared by every compression call
/// in a document write.
pub fn worst_case_plane_size(width: u32, height: u32) -> usize {
    2 * height as usize + 2 * (width as usize * height as usize)
}

/// Compress one channel of a rectangular region of `buffer`.
///
/// `region` is in buffer-local coordinates and must lie within the buffer;
/// `channel_offset` selects the sample within each pixel (e.g. 0/1/2/3 for
/// R/G/B/A). Returns `None` for a zero-area region. `scratch` is reused as
/// the packing area across calls and must not be retained by the caller; the
/// returned plane owns copies of its bytes.
pub fn compress_plane(
    scratch: &mut Vec<u8>,
    buffer: &PixelBuffer,
    region: Rect,
    channel_offset: usize,
) -> Option<RlePlane> {
    let (w, h) = (region.width(), region.height());
    if w == 0 || h == 0 {
        return None;
    }

    let table_len = 2 * h as usize;
    scratch.clear();
    scratch.resize(table_len, 0);

    let mut row = Vec::with_capacity(w as usize);
    for (i, y) in (region.top..region.bottom).enumerate() {
        row.clear();
        for x in region.left..region.right {
            row.push(buffer.sample(x as u32, y as u32, channel_offset));
        }
        let before = scratch.len();
        pack_bits(&row, scratch);
        let packed = scratch.len() - before;
        BigEndian::write_u16(&mut scratch[i * 2..i * 2 + 2], packed as u16);
    }

    Some(RlePlane {
        row_counts: scratch[..table_len].to_vec(),
        rows: scratch[table_len..].to_vec(),
    })
}

/// Pack one row of samples, appending to `out`.
fn pack_bits(src: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < src.len() {
        let run = run_length(&src[i..]);
        if run >= 2 {
            out.push((257 - run) as u8);
            out.push(src[i]);
            i += run;
        } else {
            // Literal stretch: until the next run of 2+ or the 128-byte cap.
            let mut len = 1;
            while i + len < src.len() && len < 128 && run_length(&src[i + len..]) < 2 {
                len += 1;
            }
            out.push((len - 1) as u8);
            out.extend_from_slice(&src[i..i + len]);
            i += len;
        }
    }
}

/// Length of the repeat run at the start of `src`, capped at 128.
#[inline]
fn run_length(src: &[u8]) -> usize {
    let first = src[0];
    src.iter().take(128).take_while(|&&b| b == first).count()
}
