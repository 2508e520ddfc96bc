//! Fast Information Channel: FIG encoders, the per-template carousel
//! scheduler, and FIB packing with CRC-16.

pub mod carousel;
pub mod dynamic_label;
pub mod fig;

use crate::allocator::AllocatedSubchannel;
use crate::bits::crc16_ccitt;
use crate::clock::UtcDateTime;
use crate::model::{Ensemble, TransmissionMode, TransportType};
use carousel::{Carousel, Template};
use dynamic_label::DynamicLabelState;

const FIB_PAYLOAD_LEN: usize = 30;
const FIB_LEN: usize = FIB_PAYLOAD_LEN + 2;

/// Packs a stream of encoded FIG items (each already header+body) into
/// fixed-size FIBs, padding with `0xFF` and appending the CRC-16.
fn pack_fibs(figs: &[Vec<u8>], fib_count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(fib_count * FIB_LEN);
    let mut fig_iter = figs.iter().peekable();

    for _ in 0..fib_count {
        let mut payload = Vec::with_capacity(FIB_PAYLOAD_LEN);
        while let Some(fig) = fig_iter.peek() {
            if payload.len() + fig.len() > FIB_PAYLOAD_LEN {
                break;
            }
            payload.extend_from_slice(fig_iter.next().unwrap());
        }
        payload.resize(FIB_PAYLOAD_LEN, 0xFF);
        let crc = crc16_ccitt(&payload);
        out.extend_from_slice(&payload);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    out
}

/// Drives the carousel for one tick and returns the packed FIC byte
/// stream (`mode.fic_bytes()` octets).
pub fn encode_tick(
    ensemble: &Ensemble,
    allocation: &[AllocatedSubchannel],
    carousel: &mut Carousel,
    dls: &mut DynamicLabelState,
    cif_count: u16,
    now: UtcDateTime,
) -> Vec<u8> {
    let mode = ensemble.mode;
    let due = carousel.due(mode.frame_period_ms());

    let mut figs = Vec::new();
    for template in due {
        match template {
            Template::Fig0_0 => figs.push(fig::encode_fig0_0(ensemble, cif_count)),
            Template::Fig0_1 => {
                if !allocation.is_empty() {
                    figs.push(fig::encode_fig0_1(allocation));
                }
            }
            Template::Fig0_2 => {
                if !ensemble.services.is_empty() {
                    figs.push(fig::encode_fig0_2(&ensemble.services, &ensemble.components));
                }
            }
            Template::Fig0_3 => {
                for component in ensemble
                    .components
                    .iter()
                    .filter(|c| c.transport == crate::model::TransportType::PacketData)
                {
                    figs.push(fig::encode_fig0_3(component, 0));
                }
            }
            Template::Fig0_5 => {
                if !ensemble.components.is_empty() {
                    figs.push(fig::encode_fig0_5(&ensemble.components, &ensemble.services));
                }
            }
            Template::Fig0_9 => figs.push(fig::encode_fig0_9(ensemble)),
            Template::Fig0_10 => {
                figs.push(fig::encode_fig0_10(now.mjd, now.hour, now.minute));
            }
            Template::Fig0_13 => {
                let with_uas: Vec<_> = ensemble
                    .components
                    .iter()
                    .filter(|c| !c.user_applications.is_empty())
                    .collect();
                if !with_uas.is_empty() {
                    let idx = carousel.next_cursor(Template::Fig0_13, with_uas.len());
                    figs.push(fig::encode_fig0_13(with_uas[idx]));
                }
            }
            Template::Fig1_0 => figs.push(fig::encode_fig1_0(ensemble)),
            Template::Fig1_1 => {
                if !ensemble.services.is_empty() {
                    let idx = carousel.next_cursor(Template::Fig1_1, ensemble.services.len());
                    figs.push(fig::encode_fig1_1(&ensemble.services[idx]));
                }
            }
            Template::Fig1_4 => {
                let labeled: Vec<_> = ensemble
                    .components
                    .iter()
                    .filter(|c| c.label.is_some())
                    .collect();
                if !labeled.is_empty() {
                    let idx = carousel.next_cursor(Template::Fig1_4, labeled.len());
                    if let Some(fig) = fig::encode_fig1_4(labeled[idx]) {
                        figs.push(fig);
                    }
                }
            }
            Template::Fig0_8 => {
                for component in &ensemble.components {
                    figs.push(fig::encode_fig0_8(component));
                }
            }
            Template::Fig0_17 => {
                for service in &ensemble.services {
                    figs.push(fig::encode_fig0_17(service));
                }
            }
            Template::Fig1_5 => {
                let data_services: Vec<_> = ensemble
                    .services
                    .iter()
                    .filter(|s| {
                        ensemble
                            .components
                            .iter()
                            .any(|c| c.sid == s.sid && c.transport != TransportType::StreamAudio)
                    })
                    .collect();
                if !data_services.is_empty() {
                    let idx = carousel.next_cursor(Template::Fig1_5, data_services.len());
                    figs.push(fig::encode_fig1_5(data_services[idx]));
                }
            }
            Template::Fig2Dls => {
                let with_dls: Vec<_> = ensemble
                    .components
                    .iter()
                    .filter(|c| c.dynamic_label)
                    .collect();
                if !with_dls.is_empty() {
                    let idx = carousel.next_cursor(Template::Fig2Dls, with_dls.len());
                    let component = with_dls[idx];
                    if let Some((text, toggle)) = dls.sample(component.subchid) {
                        figs.extend(fig::encode_fig2_dls(component, &text, toggle));
                    }
                }
            }
        }
    }

    pack_fibs(&figs, mode.fib_count())
}

pub fn fic_byte_len(mode: TransmissionMode) -> usize {
    mode.fic_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::model::{EnsembleBuilder, ProtectionDescriptor, ProtectionForm, SubchannelKind};

    fn sample_ensemble() -> Ensemble {
        EnsembleBuilder::new(0x4FFF, 0xE1, TransmissionMode::II)
            .label("Test")
            .with_service(crate::model::Service {
                sid: 1,
                label: "A".into(),
                short_label_mask: None,
                programme_type: 0,
                language: crate::model::Language::Eng,
            })
            .with_component(crate::model::ServiceComponent {
                sid: 1,
                subchid: 0,
                transport: crate::model::TransportType::StreamAudio,
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
                    form: ProtectionForm::UepShort,
                    level: 3,
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn tick_output_matches_mode_fic_length() {
        let ensemble = sample_ensemble();
        let allocation = allocate(&ensemble).unwrap();
        let mut carousel = Carousel::new(ensemble.mode.frame_period_ms());
        let mut dls = DynamicLabelState::new(&ensemble);
        let now = crate::clock::UtcDateTime {
            mjd: 60000,
            hour: 12,
            minute: 30,
            second: 0,
        };
        let bytes = encode_tick(&ensemble, &allocation.subchannels, &mut carousel, &mut dls, 0, now);
        assert_eq!(bytes.len(), fic_byte_len(ensemble.mode));
    }

    #[test]
    fn every_fib_ends_with_valid_crc() {
        let ensemble = sample_ensemble();
        let allocation = allocate(&ensemble).unwrap();
        let mut carousel = Carousel::new(ensemble.mode.frame_period_ms());
        let mut dls = DynamicLabelState::new(&ensemble);
        let now = crate::clock::UtcDateTime {
            mjd: 60000,
            hour: 12,
            minute: 30,
            second: 0,
        };
        let bytes = encode_tick(&ensemble, &allocation.subchannels, &mut carousel, &mut dls, 0, now);
        for fib in bytes.chunks(FIB_LEN) {
            let crc = crc16_ccitt(&fib[..FIB_PAYLOAD_LEN]);
            assert_eq!(crc.to_be_bytes(), fib[FIB_PAYLOAD_LEN..]);
        }
    }
}
