//! AF (Assembly Format) packet: the outer framing the teacher's decoder
//! recognizes by its `"AF"` sync word (`shared/src/edi/frame.rs::Frame`).
//! Header layout: `"AF"(2) LEN(4) SEQ(2) AR/PT(1) PADIND(1)`, followed by
//! the concatenated TAG items, followed by a trailing CRC-16.

use crate::bits::crc16_ccitt;

const SYNC: [u8; 2] = *b"AF";
const HEADER_LEN: usize = 10;

/// Assembles one AF packet from already-encoded TAG items.
///
/// `LEN` covers the TAG section only (not the header or trailing CRC),
/// matching the teacher decoder's `len` field usage in
/// `Frame::from_bytes`.
pub fn build_af_packet(seq: u16, tags: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + tags.len() + 2);
    out.extend_from_slice(&SYNC);
    out.extend_from_slice(&(tags.len() as u32).to_be_bytes());
    out.extend_from_slice(&seq.to_be_bytes());
    out.push(b'T'); // PT: Tag packet, no FEC applied at the AF layer itself
    out.push(0x00); // PADIND: no padding
    out.extend_from_slice(tags);

    let crc = crc16_ccitt(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}
