//! TAG items (ETSI TS 102 693 clause 6): 4-octet ASCII name, 4-octet
//! length-in-bits, then the value octets. The teacher crate's EDI
//! decoder (`shared/src/edi/frame.rs::parse_tag`) recognizes these same
//! names on the way in; this module produces their wire bytes.

/// Wraps `value` in a TAG item header. `value.len()` must already be a
/// whole number of octets; the length field records it in bits.
fn build_tag(name: [u8; 4], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + value.len());
    out.extend_from_slice(&name);
    out.extend_from_slice(&((value.len() as u32) * 8).to_be_bytes());
    out.extend_from_slice(value);
    out
}

/// `*ptr` - protocol revision marker, always first in the AF payload.
pub fn ptr_tag() -> Vec<u8> {
    let mut value = Vec::with_capacity(6);
    value.extend_from_slice(b"DETI");
    value.extend_from_slice(&[0x00, 0x02]); // protocol revision 2
    build_tag(*b"*ptr", &value)
}

/// `deti` - DAB ETI(LI) management tag: flags, STAT/MID, optional ATSTF
/// (8-octet UTC-seconds+ticks timestamp) and the FIC byte stream.
pub fn deti_tag(fic: &[u8], mid: u8, atstf: Option<(u32, u32)>) -> Vec<u8> {
    let mut value = Vec::new();
    let has_atstf = atstf.is_some();
    let flags = if has_atstf { 0x80 } else { 0x00 } | 0x40; // FICF always set
    value.push(flags);
    value.push(0x00); // reserved
    value.push(0x00); // STAT: no error condition
    value.push((mid & 0x03) << 6);

    if let Some((seconds, ticks)) = atstf {
        value.extend_from_slice(&seconds.to_be_bytes());
        value.extend_from_slice(&ticks.to_be_bytes());
    }

    value.extend_from_slice(fic);
    build_tag(*b"deti", &value)
}

/// `estN` - per-stream characterization: TPL, SAD, STL followed by that
/// subchannel's raw MSC octets. `index` selects the ASCII digit suffix
/// (0-9); ensembles with more than 10 subchannels reuse digit `9` for the
/// rest, matching how the teacher's decoder only keys off the `est`
/// prefix and ignores the digit.
pub fn est_tag(index: usize, table_index: u8, sad: u16, stl: u16, payload: &[u8]) -> Vec<u8> {
    let digit = b'0' + (index.min(9) as u8);
    let mut value = Vec::with_capacity(5 + payload.len());
    value.push(table_index);
    value.extend_from_slice(&sad.to_be_bytes());
    value.extend_from_slice(&stl.to_be_bytes());
    value.extend_from_slice(payload);
    build_tag([b'e', b's', b't', digit], &value)
}

/// `*dmy` - padding tag, used to align the AF payload to a transport's
/// preferred datagram size.
pub fn dmy_tag(pad_len: usize) -> Vec<u8> {
    build_tag(*b"*dmy", &vec![0u8; pad_len])
}
