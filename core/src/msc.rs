//! Main Service Channel: slots each subchannel's logical frame payload
//! into the shared MST buffer at its allocated CU offset.

use thiserror::Error;

use crate::allocator::AllocatedSubchannel;
use crate::model::TransmissionMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MscError {
    #[error("subchannel {subchid}: reader supplied {got} octets, expected exactly {expected}")]
    WrongFrameSize {
        subchid: u8,
        got: usize,
        expected: usize,
    },
}

/// Builds the MST buffer for one tick. `payloads` supplies, for each
/// subchannel in `allocation` (matched by position), the logical frame
/// octets read from its input adapter this tick; `None` means the
/// subchannel underran and its CU range is zero-filled.
pub fn build_mst(
    mode: TransmissionMode,
    allocation: &[AllocatedSubchannel],
    payloads: &[Option<Vec<u8>>],
) -> Result<Vec<u8>, MscError> {
    let mut mst = vec![0u8; mode.mst_bytes()];

    for (sc, payload) in allocation.iter().zip(payloads) {
        let expected = sc.size_cu as usize * 8;
        let Some(payload) = payload else { continue };
        if payload.len() != expected {
            return Err(MscError::WrongFrameSize {
                subchid: sc.subchid,
                got: payload.len(),
                expected,
            });
        }
        let offset = sc.start_cu as usize * 8;
        mst[offset..offset + expected].copy_from_slice(payload);
    }

    Ok(mst)
}
