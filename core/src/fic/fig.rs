//! FIG (Fast Information Group) body encoders.
//!
//! Each `encode_*` function returns a complete FIG item: 1-octet header
//! followed by its body, ready to be packed into a FIB by
//! [`super::pack_fibs`]. Layouts mirror ETSI EN 300 401 clause 6 and are
//! the direct bitwise inverse of the teacher crate's FIG decoders
//! (`shared/src/dab/fic.rs`).

use crate::model::{
    charset, Ensemble, ProtectionForm, Service, ServiceComponent, Subchannel, TransportType,
};

fn fig0_header(cn: bool, oe: bool, pd: bool, ext: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    let mut h = 0u8;
    if cn {
        h |= 0x80;
    }
    if oe {
        h |= 0x40;
    }
    if pd {
        h |= 0x20;
    }
    h |= ext & 0x1F;
    out.push(0b000_00000 | ((body.len() + 1) as u8 & 0x1F));
    out.push(h);
    out.extend_from_slice(body);
    out
}

fn fig1_header(charset: u8, oe: bool, ext: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    let mut h = (charset & 0x0F) << 4;
    if oe {
        h |= 0x08;
    }
    h |= ext & 0x07;
    out.push(0b001_00000 | ((body.len() + 1) as u8 & 0x1F));
    out.push(h);
    out.extend_from_slice(body);
    out
}

/// FIG 0/0 - Ensemble information. Carries EId and the CIF pair count;
/// emitted every frame.
pub fn encode_fig0_0(ensemble: &Ensemble, cif_count: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&ensemble.eid.to_be_bytes());
    let al_flag = false;
    let change = 0u8; // no reconfiguration in progress
    let cif_hi = (cif_count / 250) as u8 & 0x1F;
    let cif_lo = (cif_count % 250) as u8;
    body.push(((change & 0x03) << 5) | (u8::from(al_flag) << 5) | cif_hi);
    body.push(cif_lo);
    fig0_header(true, false, false, 0, &body)
}

/// FIG 0/1 - Subchannel organization, short or long form depending on
/// protection form.
pub fn encode_fig0_1(subchannels: &[crate::allocator::AllocatedSubchannel]) -> Vec<u8> {
    let mut body = Vec::new();
    for sc in subchannels {
        body.push((sc.subchid << 2) | ((sc.start_cu >> 8) as u8 & 0x03));
        body.push((sc.start_cu & 0xFF) as u8);
        match sc.protection.form {
            ProtectionForm::UepShort => {
                body.push(sc.table_index & 0x3F);
            }
            ProtectionForm::EepA | ProtectionForm::EepB => {
                let option = if sc.protection.form == ProtectionForm::EepA {
                    0b000
                } else {
                    0b001
                };
                let pl_index = (sc.protection.level - 1) & 0x03;
                let b0 = 0x80 | (option << 4) | (pl_index << 2) | ((sc.size_cu >> 8) as u8 & 0x03);
                body.push(b0);
                body.push((sc.size_cu & 0xFF) as u8);
            }
        }
    }
    fig0_header(true, false, false, 1, &body)
}

fn transport_type_code(transport: TransportType) -> u8 {
    match transport {
        TransportType::StreamAudio => 0,
        TransportType::StreamData => 1,
        TransportType::Fidc => 2,
        TransportType::PacketData => 3,
    }
}

/// FIG 0/2 - Service organization: per-service component list.
pub fn encode_fig0_2(services: &[Service], components: &[ServiceComponent]) -> Vec<u8> {
    let mut body = Vec::new();
    for service in services {
        body.extend_from_slice(&(service.sid as u16).to_be_bytes());
        let own = components
            .iter()
            .filter(|c| c.sid == service.sid)
            .collect::<Vec<_>>();
        body.push(own.len() as u8 & 0x0F);
        for component in own {
            let tmid = transport_type_code(component.transport);
            body.push((tmid & 0x03) << 6);
            // CA flag always clear, conditional access out of scope
            let b1 = (component.subchid << 2) | (u8::from(component.primary) << 1);
            body.push(b1);
        }
    }
    fig0_header(true, false, false, 2, &body)
}

/// FIG 0/3 - Service component in packet mode.
pub fn encode_fig0_3(component: &ServiceComponent, packet_address: u16) -> Vec<u8> {
    let scid = u16::from(component.scids);
    let mut body = Vec::with_capacity(5);
    body.push((scid >> 4) as u8);
    body.push(((scid & 0x0F) as u8) << 4); // rfa = 0, scca_flag = 0
    body.push(0); // dg_flag=0, rfu=0, dscty=0
    body.push((component.subchid << 2) | ((packet_address >> 8) as u8 & 0x03));
    body.push((packet_address & 0xFF) as u8);
    fig0_header(true, false, true, 3, &body)
}

/// FIG 0/5 - Service component language, short form only.
pub fn encode_fig0_5(components: &[ServiceComponent], services: &[Service]) -> Vec<u8> {
    let mut body = Vec::new();
    for component in components {
        let Some(service) = services.iter().find(|s| s.sid == component.sid) else {
            continue;
        };
        body.push(component.scids & 0x3F);
        body.push(service.language.into());
    }
    fig0_header(true, false, false, 5, &body)
}

/// FIG 0/9 - Country, LTO & international table.
pub fn encode_fig0_9(ensemble: &Ensemble) -> Vec<u8> {
    let mut body = Vec::with_capacity(3);
    let lto = ensemble.local_time_offset_half_hours;
    let sign_bit = if lto < 0 { 0x20 } else { 0x00 };
    let magnitude = (lto.unsigned_abs()) & 0x1F;
    body.push(sign_bit | magnitude); // ext_flag = 0
    body.push(ensemble.ecc);
    body.push(0); // international table id: no announcement switching defined
    fig0_header(true, false, false, 9, &body)
}

/// FIG 0/10 - Date & time, short form, derived from a caller-supplied MJD
/// and minute-of-day (UTC). Long form (with seconds) is not emitted; the
/// scheduler only needs minute resolution for receivers' clock display.
pub fn encode_fig0_10(mjd: u32, hour: u8, minute: u8) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.push(((mjd >> 10) & 0x7F) as u8);
    body.push(((mjd >> 2) & 0xFF) as u8);
    let b2 = (((mjd & 0x03) as u8) << 6) | ((hour >> 2) & 0x07);
    body.push(b2);
    let b3 = ((hour & 0x03) << 6) | (minute & 0x3F);
    body.push(b3);
    fig0_header(true, false, false, 10, &body)
}

/// FIG 0/13 - User application information.
pub fn encode_fig0_13(component: &ServiceComponent) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(component.sid as u16).to_be_bytes());
    let num_uas = component.user_applications.len().min(0x0F) as u8;
    body.push((component.scids << 4) | num_uas);
    for ua in component.user_applications.iter().take(0x0F) {
        let code: u16 = (*ua).into();
        body.push((code >> 3) as u8);
        body.push(((code & 0x07) as u8) << 5); // no UA-specific data
    }
    fig0_header(true, false, false, 13, &body)
}

/// FIG 1/0 - Ensemble label.
pub fn encode_fig1_0(ensemble: &Ensemble) -> Vec<u8> {
    let label = charset::encode_label(&ensemble.label)
        .expect("ensemble label is validated by Ensemble::validate_structure before the scheduler starts");
    let mut body = Vec::with_capacity(18);
    body.extend_from_slice(&ensemble.eid.to_be_bytes());
    body.extend_from_slice(&padded_label(&label));
    body.extend_from_slice(&ensemble.short_label_mask.unwrap_or(0).to_be_bytes());
    fig1_header(0, false, 0, &body)
}

/// FIG 1/1 - Service label.
pub fn encode_fig1_1(service: &Service) -> Vec<u8> {
    let label = charset::encode_label(&service.label)
        .expect("service label is validated by Ensemble::validate_structure before the scheduler starts");
    let mut body = Vec::with_capacity(18);
    body.extend_from_slice(&(service.sid as u16).to_be_bytes());
    body.extend_from_slice(&padded_label(&label));
    body.extend_from_slice(&service.short_label_mask.unwrap_or(0).to_be_bytes());
    fig1_header(0, false, 1, &body)
}

/// FIG 1/4 - Service component label. `None` when the component has no
/// label configured; a configured label that fails to encode is an
/// unreachable state once `Ensemble::validate_structure` has run.
pub fn encode_fig1_4(component: &ServiceComponent) -> Option<Vec<u8>> {
    let label_str = component.label.as_deref()?;
    let label = charset::encode_label(label_str)
        .expect("component label is validated by Ensemble::validate_structure before the scheduler starts");
    let mut body = Vec::with_capacity(19);
    body.push((component.primary as u8) << 7 | (component.scids & 0x0F));
    body.extend_from_slice(&(component.sid as u16).to_be_bytes());
    body.extend_from_slice(&padded_label(&label));
    body.extend_from_slice(&0u16.to_be_bytes());
    Some(fig1_header(0, false, 4, &body))
}

fn padded_label(label: &[u8]) -> [u8; 16] {
    let mut out = [0x20u8; 16]; // EBU Latin space
    out[..label.len()].copy_from_slice(label);
    out
}

/// FIG 0/8 - Service component global definition, short form (16-bit SId,
/// subchannel-carried component). Links a component's (SId, SCIdS) pair
/// to its SubChId, the mapping FIG 0/2 leaves implicit.
pub fn encode_fig0_8(component: &ServiceComponent) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&(component.sid as u16).to_be_bytes());
    body.push(component.scids & 0x0F); // Rfu=0, LS=0 (subchannel form)
    body.push(component.subchid & 0x3F); // Rfu=0, SubChId
    fig0_header(true, false, false, 8, &body)
}

/// FIG 0/17 - Programme type. SD/L/CC flags are all clear: this mux
/// never overrides the static/dynamic PTy split or cross-references
/// another ensemble, so the only carried field is the 5-bit PTy itself.
pub fn encode_fig0_17(service: &Service) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&(service.sid as u16).to_be_bytes());
    body.push(0x00); // Rfa=0, SD=0, PS=0, L=0, Rfu=0
    body.push(service.programme_type & 0x1F); // Rfu=0, International PTy
    fig0_header(true, false, false, 17, &body)
}

/// FIG 1/5 - Data service label: a service label keyed by 32-bit SId
/// rather than the 16-bit form FIG 1/1 uses. The carousel emits this
/// only for services whose primary component carries data, not audio.
pub fn encode_fig1_5(service: &Service) -> Vec<u8> {
    let label = charset::encode_label(&service.label)
        .expect("service label is validated by Ensemble::validate_structure before the scheduler starts");
    let mut body = Vec::with_capacity(20);
    body.extend_from_slice(&service.sid.to_be_bytes());
    body.extend_from_slice(&padded_label(&label));
    body.extend_from_slice(&service.short_label_mask.unwrap_or(0).to_be_bytes());
    fig1_header(0, false, 5, &body)
}

fn fig2_header(ext: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(0b010_00000 | ((body.len() + 1) as u8 & 0x1F));
    out.push(ext & 0x07);
    out.extend_from_slice(body);
    out
}

/// Maximum text octets per FIG 2/x dynamic label segment, the 5-bit
/// `segment length - 1` field's capacity.
const DLS_SEGMENT_MAX: usize = 16;

/// FIG 2/0 - Dynamic label segment(s) for one component's scrolling
/// text. `text` is re-encoded and re-segmented every call, so callers
/// that hold a live handle (`Scheduler::dynamic_label_handle`) always
/// see the current value picked up at its next carousel slot.
///
/// Segments longer than [`DLS_SEGMENT_MAX`] octets are split across
/// multiple FIG items sharing one `toggle` epoch, each tagged with its
/// segment number and first/last markers so a receiver can reassemble
/// them in any arrival order.
pub fn encode_fig2_dls(component: &ServiceComponent, text: &str, toggle: bool) -> Vec<Vec<u8>> {
    let encoded = match charset::encode(text) {
        Ok(bytes) => bytes,
        Err(_) => return Vec::new(),
    };
    if encoded.is_empty() {
        return Vec::new();
    }

    let chunks: Vec<&[u8]> = encoded.chunks(DLS_SEGMENT_MAX).collect();
    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(seg_num, chunk)| {
            let mut body = Vec::with_capacity(3 + chunk.len());
            let first = seg_num == 0;
            let last_seg = seg_num == last;
            body.extend_from_slice(&(component.sid as u16).to_be_bytes());
            body.push(
                (u8::from(toggle) << 7)
                    | ((seg_num as u8 & 0x07) << 4)
                    | (u8::from(first) << 3)
                    | (u8::from(last_seg) << 2)
                    | (component.scids & 0x03),
            );
            body.push((chunk.len() as u8 - 1) & 0x1F);
            body.extend_from_slice(chunk);
            fig2_header(0, &body)
        })
        .collect()
}
