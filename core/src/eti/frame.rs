//! One ETI NI frame: `ERR || FSYNC || FC || STC×N || EOH || FIC || MSC ||
//! EOF || [TIST]`.
//!
//! Frame length is never hardcoded: it is always `total_len(mode, n,
//! tist_enabled)`, computed from the mode's own FIC/MST sizes, so Mode I
//! and Modes II-IV share one code path.

use crate::allocator::AllocatedSubchannel;
use crate::bits::crc16_ccitt;
use crate::model::TransmissionMode;

const FSYNC: [u8; 3] = [0x07, 0x3A, 0xB6];
const ERR_NO_ERROR: u8 = 0x00;

/// Frame-count-in-ETI, wrapping mod 250 per ETSI EN 300 799.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCounter {
    fct: u8,
}

impl FrameCounter {
    pub fn next(&mut self) -> u8 {
        let current = self.fct;
        self.fct = if self.fct == 249 { 0 } else { self.fct + 1 };
        current
    }
}

/// Total octet length of an ETI frame for a given mode/stream-count/TIST
/// combination. `ERR(1) + FSYNC(3) + FC(4) + STC(4*n) + EOH(4) +
/// FIC(mode) + MST(mode) + EOF(4) + [TIST(4)]`.
pub fn total_len(mode: TransmissionMode, n_streams: usize, tist_enabled: bool) -> usize {
    1 + 3 + 4 + 4 * n_streams + 4 + mode.fic_bytes() + mode.mst_bytes() + 4 + if tist_enabled { 4 } else { 0 }
}

#[derive(Debug, Clone)]
pub struct EtiFrame {
    pub bytes: Vec<u8>,
    pub fct: u8,
}

fn encode_fc(mode: TransmissionMode, fct: u8, nst: usize, frame_phase: u8) -> [u8; 4] {
    let ficf = 1u8; // FIC is always present
    [
        fct,
        (ficf << 7) | (nst as u8 & 0x7F),
        ((frame_phase & 0x07) << 5) | ((mode.mid() & 0x03) << 3),
        0xFF,
    ]
}

fn encode_stc(sc: &AllocatedSubchannel) -> [u8; 4] {
    [
        (sc.subchid << 2) | ((sc.start_cu >> 8) as u8 & 0x03),
        (sc.start_cu & 0xFF) as u8,
        (sc.table_index << 2) | ((sc.size_cu >> 8) as u8 & 0x03),
        (sc.size_cu & 0xFF) as u8,
    ]
}

/// Assembles one complete ETI frame.
///
/// `mst` must be exactly `mode.mst_bytes()` octets (the caller builds it
/// with [`crate::msc::build_mst`]); `fic` must be exactly
/// `mode.fic_bytes()` octets (from [`crate::fic::encode_tick`]).
pub fn assemble_frame(
    mode: TransmissionMode,
    allocation: &[AllocatedSubchannel],
    fic: &[u8],
    mst: &[u8],
    fct: u8,
    frame_phase: u8,
    tist: Option<u32>,
) -> EtiFrame {
    debug_assert_eq!(fic.len(), mode.fic_bytes());
    debug_assert_eq!(mst.len(), mode.mst_bytes());

    let mut bytes = Vec::with_capacity(total_len(mode, allocation.len(), tist.is_some()));
    bytes.push(ERR_NO_ERROR);
    bytes.extend_from_slice(&FSYNC);

    let fc = encode_fc(mode, fct, allocation.len(), frame_phase);
    bytes.extend_from_slice(&fc);

    let mut fc_stc = fc.to_vec();
    for sc in allocation {
        let stc = encode_stc(sc);
        bytes.extend_from_slice(&stc);
        fc_stc.extend_from_slice(&stc);
    }

    let eoh_crc = crc16_ccitt(&fc_stc);
    bytes.push(0xFF);
    bytes.push(0xFF);
    bytes.extend_from_slice(&eoh_crc.to_be_bytes());

    bytes.extend_from_slice(fic);
    bytes.extend_from_slice(mst);

    let eof_crc = crc16_ccitt(mst);
    bytes.extend_from_slice(&eof_crc.to_be_bytes());
    bytes.push(0xFF);
    bytes.push(0xFF);

    if let Some(tist) = tist {
        bytes.extend_from_slice(&tist.to_be_bytes());
    }

    EtiFrame { bytes, fct }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProtectionDescriptor, ProtectionForm, SubchannelKind};

    fn sc() -> AllocatedSubchannel {
        AllocatedSubchannel {
            subchid: 0,
            kind: SubchannelKind::DabAudio,
            bitrate_kbps: 128,
            start_cu: 0,
            size_cu: 140,
            table_index: 33,
            protection: ProtectionDescriptor {
                form: ProtectionForm::UepShort,
                level: 3,
            },
        }
    }

    #[test]
    fn frame_length_matches_computed_total() {
        let mode = TransmissionMode::I;
        let allocation = vec![sc()];
        let fic = vec![0u8; mode.fic_bytes()];
        let mst = vec![0u8; mode.mst_bytes()];
        let frame = assemble_frame(mode, &allocation, &fic, &mst, 0, 0, None);
        assert_eq!(frame.bytes.len(), total_len(mode, 1, false));
    }

    #[test]
    fn fsync_is_fixed_magic() {
        let mode = TransmissionMode::II;
        let fic = vec![0u8; mode.fic_bytes()];
        let mst = vec![0u8; mode.mst_bytes()];
        let frame = assemble_frame(mode, &[], &fic, &mst, 0, 0, None);
        assert_eq!(&frame.bytes[1..4], &FSYNC);
    }

    #[test]
    fn tist_appends_four_bytes() {
        let mode = TransmissionMode::II;
        let fic = vec![0u8; mode.fic_bytes()];
        let mst = vec![0u8; mode.mst_bytes()];
        let with = assemble_frame(mode, &[], &fic, &mst, 0, 0, Some(0x1234_5678));
        let without = assemble_frame(mode, &[], &fic, &mst, 0, 0, None);
        assert_eq!(with.bytes.len(), without.bytes.len() + 4);
        assert_eq!(&with.bytes[with.bytes.len() - 4..], &0x1234_5678u32.to_be_bytes());
    }

    #[test]
    fn fct_wraps_at_250() {
        let mut counter = FrameCounter::default();
        for expected in 0..249u8 {
            assert_eq!(counter.next(), expected);
        }
        assert_eq!(counter.next(), 249);
        assert_eq!(counter.next(), 0);
    }

    #[test]
    fn eoh_crc_recomputes_over_fc_and_stc() {
        let mode = TransmissionMode::II;
        let allocation = vec![sc()];
        let fic = vec![0u8; mode.fic_bytes()];
        let mst = vec![0u8; mode.mst_bytes()];
        let frame = assemble_frame(mode, &allocation, &fic, &mst, 7, 2, None);
        let fc_stc = &frame.bytes[4..4 + 4 + 4];
        let expected = crc16_ccitt(fc_stc);
        let eoh = &frame.bytes[4 + 4 + 4..4 + 4 + 4 + 4];
        assert_eq!(&eoh[2..], &expected.to_be_bytes());
    }
}
