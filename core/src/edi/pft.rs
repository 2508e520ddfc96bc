//! PFT (Protection, Fragmentation and Transport) layer: splits an AF
//! packet into fixed-size fragments and protects each group of fragments
//! with a systematic Reed-Solomon(k+r, k) code over GF(2^8), delegated to
//! the `reed_solomon_erasure` crate rather than a hand-rolled matrix
//! inverse (the teacher crate reaches for the same crate in its unwired
//! `rs_decoder.rs`, albeit for a different, shortened code).
//!
//! Fragment header: `SYNC "PF"(2) PSeq(2) Findex(2) FCount(2) FEC(2)
//! AddrF(1)`, followed by the RS symbol, followed by a trailing CRC-16
//! over header+symbol.
//!
//! GF(2^8) constraints cap a single RS group at 255 shards; an AF packet
//! whose data shards would exceed that is split across multiple PFT
//! groups (same `pseq`, contiguous `findex` ranges), never silently
//! truncated.

use crate::bits::crc16_ccitt;
use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;

pub const FRAGMENT_PAYLOAD_LEN: usize = 200;
const PARITY_SHARDS: usize = 10;
const MAX_SHARDS: usize = 255;
const MAX_DATA_SHARDS: usize = MAX_SHARDS - PARITY_SHARDS;
const HEADER_LEN: usize = 11;

const SYNC: [u8; 2] = [0x50, 0x46]; // "PF"
const ADDRF_LAST_FRAGMENT: u8 = 0x40;
const ADDRF_FEC_PRESENT: u8 = 0x80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PftError {
    #[error("reed-solomon encode failed: {0}")]
    RsEncode(String),
    #[error("reed-solomon reconstruct failed: {0}")]
    RsReconstruct(String),
    #[error("not enough fragments to reconstruct: have {have}, need {need}")]
    InsufficientFragments { have: usize, need: usize },
    #[error("fragment crc mismatch")]
    CrcMismatch,
}

#[derive(Debug, Clone)]
pub struct PftFragment {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct GroupLayout {
    data_shards: usize,
    parity_shards: usize,
    shard_len: usize,
}

/// Fragments `af_packet` into PFT fragments belonging to one or more RS
/// groups, all sharing `pseq`.
pub fn fragment(af_packet: &[u8], pseq: u16) -> Result<Vec<PftFragment>, PftError> {
    let mut fragments = Vec::new();
    let mut offset = 0;
    let total_len = af_packet.len().max(1);

    loop {
        let remaining = &af_packet[offset.min(af_packet.len())..];
        let data_shards = remaining
            .len()
            .div_ceil(FRAGMENT_PAYLOAD_LEN)
            .clamp(1, MAX_DATA_SHARDS);
        let layout = GroupLayout {
            data_shards,
            parity_shards: PARITY_SHARDS,
            shard_len: FRAGMENT_PAYLOAD_LEN,
        };

        let group_bytes = data_shards * FRAGMENT_PAYLOAD_LEN;
        let chunk_end = (offset + group_bytes).min(af_packet.len());
        let chunk = &af_packet[offset..chunk_end];
        let shards = encode_group(chunk, layout)?;

        let fcount = (layout.data_shards + layout.parity_shards) as u16;
        let is_last_group = chunk_end >= af_packet.len();

        for (i, shard) in shards.iter().enumerate() {
            let findex = i as u16;
            let is_last_fragment = is_last_group && i + 1 == shards.len();
            let mut addrf = ADDRF_FEC_PRESENT;
            if is_last_fragment {
                addrf |= ADDRF_LAST_FRAGMENT;
            }

            let mut bytes = Vec::with_capacity(HEADER_LEN + shard.len() + 2);
            bytes.extend_from_slice(&SYNC);
            bytes.extend_from_slice(&pseq.to_be_bytes());
            bytes.extend_from_slice(&findex.to_be_bytes());
            bytes.extend_from_slice(&fcount.to_be_bytes());
            bytes.extend_from_slice(&(layout.parity_shards as u16).to_be_bytes());
            bytes.push(addrf);
            bytes.extend_from_slice(shard);

            let crc = crc16_ccitt(&bytes);
            bytes.extend_from_slice(&crc.to_be_bytes());
            fragments.push(PftFragment { bytes });
        }

        offset = chunk_end;
        if chunk_end >= total_len.min(af_packet.len()) && offset >= af_packet.len() {
            break;
        }
    }

    Ok(fragments)
}

fn encode_group(chunk: &[u8], layout: GroupLayout) -> Result<Vec<Vec<u8>>, PftError> {
    let mut shards: Vec<Vec<u8>> = chunk
        .chunks(layout.shard_len)
        .map(|c| {
            let mut v = c.to_vec();
            v.resize(layout.shard_len, 0);
            v
        })
        .collect();
    shards.resize(layout.data_shards, vec![0u8; layout.shard_len]);
    shards.extend((0..layout.parity_shards).map(|_| vec![0u8; layout.shard_len]));

    let rs = ReedSolomon::new(layout.data_shards, layout.parity_shards)
        .map_err(|e| PftError::RsEncode(e.to_string()))?;
    rs.encode(&mut shards)
        .map_err(|e| PftError::RsEncode(e.to_string()))?;

    Ok(shards)
}

/// Parses a received fragment, validating sync and trailing CRC, and
/// returning `(pseq, findex, fcount, fec, symbol)`.
pub fn parse_fragment(bytes: &[u8]) -> Result<(u16, u16, u16, u16, &[u8]), PftError> {
    if bytes.len() < HEADER_LEN + 2 || bytes[0..2] != SYNC {
        return Err(PftError::CrcMismatch);
    }
    let body = &bytes[..bytes.len() - 2];
    let crc = u16::from_be_bytes([bytes[bytes.len() - 2], bytes[bytes.len() - 1]]);
    if crc16_ccitt(body) != crc {
        return Err(PftError::CrcMismatch);
    }

    let pseq = u16::from_be_bytes([bytes[2], bytes[3]]);
    let findex = u16::from_be_bytes([bytes[4], bytes[5]]);
    let fcount = u16::from_be_bytes([bytes[6], bytes[7]]);
    let fec = u16::from_be_bytes([bytes[8], bytes[9]]);
    let symbol = &bytes[HEADER_LEN..bytes.len() - 2];
    Ok((pseq, findex, fcount, fec, symbol))
}

/// Reconstructs the original AF packet bytes from a set of received
/// fragments belonging to one PFT group, tolerating up to `fec` missing
/// fragments. `received` pairs each fragment's `findex` within the group
/// with its shard bytes; missing indices are treated as erasures.
pub fn reconstruct_group(
    data_shards: usize,
    parity_shards: usize,
    shard_len: usize,
    received: &[(u16, Vec<u8>)],
) -> Result<Vec<u8>, PftError> {
    let total = data_shards + parity_shards;
    if received.len() < data_shards {
        return Err(PftError::InsufficientFragments {
            have: received.len(),
            need: data_shards,
        });
    }

    let mut shards: Vec<Option<Vec<u8>>> = vec![None; total];
    for (findex, bytes) in received {
        if (*findex as usize) < total {
            shards[*findex as usize] = Some(bytes.clone());
        }
    }

    let rs = ReedSolomon::new(data_shards, parity_shards)
        .map_err(|e| PftError::RsReconstruct(e.to_string()))?;
    rs.reconstruct(&mut shards)
        .map_err(|e| PftError::RsReconstruct(e.to_string()))?;

    let mut out = Vec::with_capacity(data_shards * shard_len);
    for shard in shards.into_iter().take(data_shards) {
        out.extend_from_slice(&shard.expect("reconstruct fills every shard"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(fragments: &[PftFragment]) -> (usize, usize, Vec<(u16, Vec<u8>)>) {
        let (_, _, fcount, fec, symbol) = parse_fragment(&fragments[0].bytes).unwrap();
        let data_shards = (fcount - fec) as usize;
        let parity_shards = fec as usize;
        let received = fragments
            .iter()
            .map(|f| {
                let (_, findex, _, _, symbol) = parse_fragment(&f.bytes).unwrap();
                (findex, symbol.to_vec())
            })
            .collect();
        let _ = symbol;
        (data_shards, parity_shards, received)
    }

    #[test]
    fn fragments_roundtrip_without_loss() {
        let af_packet: Vec<u8> = (0..500u32).map(|i| i as u8).collect();
        let fragments = fragment(&af_packet, 1).unwrap();
        let (data_shards, parity_shards, received) = unpack(&fragments);

        let reconstructed =
            reconstruct_group(data_shards, parity_shards, FRAGMENT_PAYLOAD_LEN, &received).unwrap();
        assert_eq!(&reconstructed[..af_packet.len()], &af_packet[..]);
    }

    #[test]
    fn reconstructs_after_losing_up_to_parity_count_fragments() {
        let af_packet: Vec<u8> = (0..500u32).map(|i| (i * 7) as u8).collect();
        let fragments = fragment(&af_packet, 2).unwrap();
        let (data_shards, parity_shards, mut received) = unpack(&fragments);
        received.truncate(received.len() - parity_shards);

        let reconstructed =
            reconstruct_group(data_shards, parity_shards, FRAGMENT_PAYLOAD_LEN, &received).unwrap();
        assert_eq!(&reconstructed[..af_packet.len()], &af_packet[..]);
    }

    #[test]
    fn fragment_crc_is_validated_on_parse() {
        let af_packet = vec![0x11; 50];
        let fragments = fragment(&af_packet, 9).unwrap();
        let mut corrupted = fragments[0].bytes.clone();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        assert_eq!(parse_fragment(&corrupted), Err(PftError::CrcMismatch));
    }

    #[test]
    fn last_fragment_of_last_group_is_flagged() {
        let af_packet = vec![0x22; 50];
        let fragments = fragment(&af_packet, 4).unwrap();
        let last = fragments.last().unwrap();
        assert_eq!(last.bytes[10] & ADDRF_LAST_FRAGMENT, ADDRF_LAST_FRAGMENT);
        assert_eq!(fragments[0].bytes[10] & ADDRF_LAST_FRAGMENT, 0);
    }

    #[test]
    fn large_packet_splits_across_multiple_groups_under_255_shard_cap() {
        let af_packet = vec![0xAB; (MAX_DATA_SHARDS + 50) * FRAGMENT_PAYLOAD_LEN];
        let fragments = fragment(&af_packet, 3).unwrap();
        let pseqs: std::collections::HashSet<u16> = fragments
            .iter()
            .map(|f| u16::from_be_bytes([f.bytes[2], f.bytes[3]]))
            .collect();
        assert_eq!(pseqs.len(), 1);
        assert!(fragments.len() > MAX_SHARDS);
    }

    #[test]
    fn pft_group_of_exactly_255_fragments_is_handled() {
        let af_packet = vec![0x33; MAX_DATA_SHARDS * FRAGMENT_PAYLOAD_LEN];
        let fragments = fragment(&af_packet, 5).unwrap();
        assert_eq!(fragments.len(), MAX_SHARDS);
    }
}
