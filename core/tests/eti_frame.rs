//! End-to-end ETI frame assembly: scenarios S1 and S3 from the testable
//! properties, plus the universal per-frame invariants (length, FSYNC,
//! EOH/EOF CRC, FCT wrap).

use dabmux_core::allocator::allocate;
use dabmux_core::bits::crc16_ccitt;
use dabmux_core::clock::UtcDateTime;
use dabmux_core::eti::frame::{assemble_frame, total_len, FrameCounter};
use dabmux_core::fic::{self, carousel::Carousel, dynamic_label::DynamicLabelState};
use dabmux_core::model::{
    EnsembleBuilder, Language, ProtectionDescriptor, ProtectionForm, Service, ServiceComponent,
    SubchannelKind, TransmissionMode, TransportType,
};
use dabmux_core::msc::build_mst;

fn noon() -> UtcDateTime {
    UtcDateTime {
        mjd: 60000,
        hour: 12,
        minute: 0,
        second: 0,
    }
}

/// S1 (Minimal): Mode I, one 128 kbps DAB audio subchannel at EEP_3A.
#[test]
fn s1_minimal_mode_i_frame_matches_canonical_size_and_fsync() {
    let ensemble = EnsembleBuilder::new(0xCE15, 0xE1, TransmissionMode::I)
        .label("Test")
        .with_service(Service {
            sid: 1,
            label: "Test".into(),
            short_label_mask: None,
            programme_type: 0,
            language: Language::Eng,
        })
        .with_component(ServiceComponent {
            sid: 1,
            subchid: 0,
            transport: TransportType::StreamAudio,
            scids: 0,
            primary: true,
            label: None,
            user_applications: vec![],
            dynamic_label: false,
        })
        .with_subchannel(
            0,
            SubchannelKind::DabAudio,
            128,
            ProtectionDescriptor {
                form: ProtectionForm::EepA,
                level: 3,
            },
        )
        .build()
        .unwrap();

    let allocation = allocate(&ensemble).unwrap();
    let mut carousel = Carousel::new(ensemble.mode.frame_period_ms());
    let mut dls = DynamicLabelState::new(&ensemble);
    let fic_bytes = fic::encode_tick(&ensemble, &allocation.subchannels, &mut carousel, &mut dls, 0, noon());
    let payload = vec![0u8; allocation.subchannels[0].size_cu as usize * 8];
    let mst = build_mst(
        ensemble.mode,
        &allocation.subchannels,
        &[Some(payload)],
    )
    .unwrap();

    let mut counter = FrameCounter::default();
    let frame = assemble_frame(
        ensemble.mode,
        &allocation.subchannels,
        &fic_bytes,
        &mst,
        counter.next(),
        0,
        None,
    );

    assert_eq!(frame.bytes.len(), total_len(ensemble.mode, 1, false));
    assert_eq!(frame.bytes.len(), 6144);
    assert_eq!(&frame.bytes[0..4], &[0x00, 0x07, 0x3A, 0xB6]);

    let eid_bytes = ensemble.eid.to_be_bytes();
    assert!(fic_bytes
        .windows(2)
        .any(|w| w == eid_bytes));
}

/// S3 (Capacity overflow): 11 x 128 kbps EEP_3A subchannels in Mode I
/// overflow the 864 CU cap (Sigma = 924) and must be rejected before any
/// frame is emitted.
#[test]
fn s3_capacity_overflow_is_rejected_at_allocation() {
    let mut builder = EnsembleBuilder::new(0xCE15, 0xE1, TransmissionMode::I).label("Over");
    for i in 0..11u8 {
        builder = builder.with_subchannel(
            i,
            SubchannelKind::DabAudio,
            128,
            ProtectionDescriptor {
                form: ProtectionForm::EepA,
                level: 3,
            },
        );
    }
    let ensemble = builder.build().unwrap();
    let err = allocate(&ensemble).unwrap_err();
    assert!(matches!(
        err,
        dabmux_core::allocator::AllocationError::CapacityExceeded { used_cu: 924, cap_cu: 864, .. }
    ));
}

/// Universal invariant: FCT increments modulo 250 per tick.
#[test]
fn fct_wraps_at_250() {
    let mut counter = FrameCounter::default();
    for expected in 0..250u8 {
        assert_eq!(counter.next(), expected);
    }
    assert_eq!(counter.next(), 0);
}

/// Universal invariant: EOH CRC recomputes over FC||STC, EOF CRC
/// recomputes over MST, for a multi-subchannel Mode II frame.
#[test]
fn eoh_and_eof_crc_are_internally_consistent() {
    let ensemble = EnsembleBuilder::new(0x4FFF, 0xE1, TransmissionMode::II)
        .label("Crc")
        .with_subchannel(
            0,
            SubchannelKind::DabAudio,
            64,
            ProtectionDescriptor {
                form: ProtectionForm::UepShort,
                level: 3,
            },
        )
        .with_subchannel(
            1,
            SubchannelKind::DabPlusAudio,
            96,
            ProtectionDescriptor {
                form: ProtectionForm::EepA,
                level: 2,
            },
        )
        .build()
        .unwrap();

    let allocation = allocate(&ensemble).unwrap();
    let mut carousel = Carousel::new(ensemble.mode.frame_period_ms());
    let mut dls = DynamicLabelState::new(&ensemble);
    let fic_bytes = fic::encode_tick(&ensemble, &allocation.subchannels, &mut carousel, &mut dls, 0, noon());
    let payloads: Vec<_> = allocation
        .subchannels
        .iter()
        .map(|sc| Some(vec![0xA5u8; sc.size_cu as usize * 8]))
        .collect();
    let mst = build_mst(ensemble.mode, &allocation.subchannels, &payloads).unwrap();

    let frame = assemble_frame(
        ensemble.mode,
        &allocation.subchannels,
        &fic_bytes,
        &mst,
        0,
        0,
        None,
    );

    let nst = allocation.subchannels.len();
    let fc_stc = &frame.bytes[4..4 + 4 + 4 * nst];
    let eoh_crc_offset = 4 + 4 + 4 * nst + 2;
    let eoh_crc = u16::from_be_bytes([
        frame.bytes[eoh_crc_offset],
        frame.bytes[eoh_crc_offset + 1],
    ]);
    assert_eq!(eoh_crc, crc16_ccitt(fc_stc));

    let eof_crc_offset = eoh_crc_offset + 2 + ensemble.mode.fic_bytes() + ensemble.mode.mst_bytes();
    let eof_crc = u16::from_be_bytes([
        frame.bytes[eof_crc_offset],
        frame.bytes[eof_crc_offset + 1],
    ]);
    assert_eq!(eof_crc, crc16_ccitt(&mst));
}

/// Boundary: a TIST-bearing frame is exactly 4 octets longer.
#[test]
fn tist_adds_four_trailing_octets() {
    let ensemble = EnsembleBuilder::new(0x4FFF, 0xE1, TransmissionMode::II)
        .label("Tist")
        .with_subchannel(
            0,
            SubchannelKind::DabAudio,
            64,
            ProtectionDescriptor {
                form: ProtectionForm::UepShort,
                level: 3,
            },
        )
        .build()
        .unwrap();
    let allocation = allocate(&ensemble).unwrap();
    let mut carousel = Carousel::new(ensemble.mode.frame_period_ms());
    let mut dls = DynamicLabelState::new(&ensemble);
    let fic_bytes = fic::encode_tick(&ensemble, &allocation.subchannels, &mut carousel, &mut dls, 0, noon());
    let mst = vec![0u8; ensemble.mode.mst_bytes()];

    let without = assemble_frame(ensemble.mode, &allocation.subchannels, &fic_bytes, &mst, 0, 0, None);
    let with = assemble_frame(
        ensemble.mode,
        &allocation.subchannels,
        &fic_bytes,
        &mst,
        0,
        0,
        Some(0x1234_5678),
    );
    assert_eq!(with.bytes.len(), without.bytes.len() + 4);
    assert_eq!(&with.bytes[with.bytes.len() - 4..], &0x1234_5678u32.to_be_bytes());
}
