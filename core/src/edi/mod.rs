//! EDI (Ensemble Data Interface) encoder: wraps one ETI frame's FIC/MST
//! content as TAG items inside an AF packet, then PFT-fragments that
//! packet for transport.

pub mod af;
pub mod pft;
pub mod tag;
pub mod transport;

use crate::allocator::AllocatedSubchannel;

/// Monotonic sequence counters an EDI session advances once per frame.
#[derive(Debug, Default)]
pub struct EdiContext {
    af_seq: u16,
    pft_pseq: u16,
}

impl EdiContext {
    pub fn next_af_seq(&mut self) -> u16 {
        let seq = self.af_seq;
        self.af_seq = self.af_seq.wrapping_add(1);
        seq
    }

    pub fn next_pft_pseq(&mut self) -> u16 {
        let pseq = self.pft_pseq;
        self.pft_pseq = self.pft_pseq.wrapping_add(1);
        pseq
    }
}

/// Builds the TAG payload for one frame: `*ptr`, `deti` carrying the FIC
/// stream, one `estN` per allocated subchannel carrying that
/// subchannel's MST slice, in ascending `start_cu` order.
pub fn build_tag_payload(
    allocation: &[AllocatedSubchannel],
    fic: &[u8],
    mst: &[u8],
    mid: u8,
    atstf: Option<(u32, u32)>,
) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&tag::ptr_tag());
    payload.extend_from_slice(&tag::deti_tag(fic, mid, atstf));

    for (index, sc) in allocation.iter().enumerate() {
        let start = sc.start_cu as usize * 8;
        let len = sc.size_cu as usize * 8;
        let slice = &mst[start..start + len];
        payload.extend_from_slice(&tag::est_tag(
            index,
            sc.table_index,
            sc.start_cu,
            sc.size_cu,
            slice,
        ));
    }

    // `*dmy` pads the TAG payload out to a whole number of 8-octet words,
    // the AF packet's required alignment. Emitted even when `pad_len` is
    // 0 so every frame carries the same fixed tag sequence.
    let pad_len = (8 - (payload.len() % 8)) % 8;
    payload.extend_from_slice(&tag::dmy_tag(pad_len));

    payload
}

/// Wraps one frame's TAG payload as an AF packet and PFT-fragments it.
pub fn encode_frame(
    ctx: &mut EdiContext,
    allocation: &[AllocatedSubchannel],
    fic: &[u8],
    mst: &[u8],
    mid: u8,
    atstf: Option<(u32, u32)>,
) -> Result<Vec<pft::PftFragment>, pft::PftError> {
    let tags = build_tag_payload(allocation, fic, mst, mid, atstf);
    let af_seq = ctx.next_af_seq();
    let af_packet = af::build_af_packet(af_seq, &tags);
    let pseq = ctx.next_pft_pseq();
    pft::fragment(&af_packet, pseq)
}
