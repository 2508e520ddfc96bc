//! Ensemble, service, component and subchannel tables.
//!
//! Mirrors the teacher crate's flat-table approach to cyclic references:
//! a [`ServiceComponent`] holds only the `sid`/`subchid` it refers to, never
//! a direct reference, so the tables can be validated and (de)serialized
//! independently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::charset::{self, CharsetError};
use super::tables::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionMode {
    I,
    II,
    III,
    IV,
}

impl TransmissionMode {
    pub const fn frame_period_ms(self) -> u32 {
        match self {
            TransmissionMode::I => 96,
            TransmissionMode::II | TransmissionMode::III => 24,
            TransmissionMode::IV => 48,
        }
    }

    pub const fn cu_cap(self) -> u16 {
        match self {
            TransmissionMode::I | TransmissionMode::III => 864,
            TransmissionMode::II | TransmissionMode::IV => 432,
        }
    }

    pub const fn fic_bytes(self) -> usize {
        match self {
            TransmissionMode::I => 96,
            TransmissionMode::II | TransmissionMode::III | TransmissionMode::IV => 32,
        }
    }

    pub const fn fib_count(self) -> usize {
        match self {
            TransmissionMode::I => 3,
            TransmissionMode::II | TransmissionMode::III | TransmissionMode::IV => 1,
        }
    }

    /// MST (Main Stream) octets per frame. One Capacity Unit is 64 bits
    /// (8 octets); the MST buffer spans the full CU grid so that unused
    /// CU ranges are simply zero-padding.
    pub const fn mst_bytes(self) -> usize {
        self.cu_cap() as usize * 8
    }

    pub const fn mid(self) -> u8 {
        match self {
            TransmissionMode::I => 0,
            TransmissionMode::II => 1,
            TransmissionMode::III => 2,
            TransmissionMode::IV => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubchannelKind {
    DabAudio,
    DabPlusAudio,
    PacketData,
    StreamData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportType {
    StreamAudio,
    StreamData,
    PacketData,
    Fidc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectionForm {
    UepShort,
    EepA,
    EepB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionDescriptor {
    pub form: ProtectionForm,
    /// 1..=5 for UEP short form, 1..=4 for EEP long form A/B.
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subchannel {
    pub subchid: u8,
    pub kind: SubchannelKind,
    pub bitrate_kbps: u16,
    pub protection: ProtectionDescriptor,
    /// Explicit CU start address, if the configuration pins it.
    pub explicit_start_cu: Option<u16>,
    /// Filled in by the allocator; `0` until `Ensemble::validate` runs.
    pub start_cu: u16,
    pub size_cu: u16,
    /// Short-form table index (UEP) or protection-level index (EEP),
    /// used verbatim by FIG 0/1 and the ETI STC.
    pub table_index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceComponent {
    pub sid: u32,
    pub subchid: u8,
    pub transport: TransportType,
    pub scids: u8,
    pub primary: bool,
    pub label: Option<String>,
    pub user_applications: Vec<super::tables::UserApplication>,
    /// Whether this component carries a FIG 2/x dynamic label segment
    /// feed. The live text is not part of the static configuration: it
    /// is held by the scheduler's dynamic label registry and updated
    /// out-of-band (see `crate::scheduler::Scheduler::dynamic_label_handle`).
    pub dynamic_label: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub sid: u32,
    pub label: String,
    pub short_label_mask: Option<u16>,
    pub programme_type: u8,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    pub eid: u16,
    pub ecc: u8,
    pub mode: TransmissionMode,
    pub label: String,
    pub short_label_mask: Option<u16>,
    pub local_time_offset_half_hours: i8,
    pub tist_enabled: bool,
    pub tist_offset_ms: u32,
    pub services: Vec<Service>,
    pub components: Vec<ServiceComponent>,
    pub subchannels: Vec<Subchannel>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field}: {message}")]
    InvalidConfiguration { field: String, message: String },
    #[error("{field}: {source}")]
    Label {
        field: String,
        #[source]
        source: CharsetError,
    },
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    fn label(field: impl Into<String>, source: CharsetError) -> Self {
        ConfigError::Label {
            field: field.into(),
            source,
        }
    }
}

impl Ensemble {
    /// Checks the structural invariants that don't depend on CU
    /// allocation (that part is [`crate::allocator::allocate`]).
    pub fn validate_structure(&self) -> Result<(), ConfigError> {
        charset::encode_label(&self.label).map_err(|e| ConfigError::label("ensemble.label", e))?;

        let mut seen_sids = std::collections::HashSet::new();
        for service in &self.services {
            if !seen_sids.insert(service.sid) {
                return Err(ConfigError::new(
                    "service.sid",
                    format!("duplicate sid 0x{:X}", service.sid),
                ));
            }
            charset::encode_label(&service.label)
                .map_err(|e| ConfigError::label("service.label", e))?;
            if service.programme_type > 31 {
                return Err(ConfigError::new(
                    "service.programme_type",
                    "programme type exceeds 5 bits",
                ));
            }
            let has_component = self.components.iter().any(|c| c.sid == service.sid);
            if !has_component {
                return Err(ConfigError::new(
                    "service.components",
                    format!("service 0x{:X} has no component", service.sid),
                ));
            }
        }

        let mut seen_subchids = std::collections::HashSet::new();
        for sc in &self.subchannels {
            if !seen_subchids.insert(sc.subchid) {
                return Err(ConfigError::new(
                    "subchannel.subchid",
                    format!("duplicate subchid {}", sc.subchid),
                ));
            }
            // UEP/EEP legality given (kind, form) is enforced by the
            // allocator (crate::allocator::allocate), which owns the full
            // protection/bitrate lookup.
        }

        let mut seen_scids = std::collections::HashSet::new();
        for component in &self.components {
            if !seen_scids.insert((component.sid, component.scids)) {
                return Err(ConfigError::new(
                    "component.scids",
                    format!(
                        "duplicate (sid, scids) = (0x{:X}, {})",
                        component.sid, component.scids
                    ),
                ));
            }
            if !self
                .subchannels
                .iter()
                .any(|sc| sc.subchid == component.subchid)
            {
                return Err(ConfigError::new(
                    "component.subchid",
                    format!("component references unknown subchid {}", component.subchid),
                ));
            }
            if let Some(label) = &component.label {
                charset::encode_label(label)
                    .map_err(|e| ConfigError::label("component.label", e))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_subchannel() -> Subchannel {
        Subchannel {
            subchid: 0,
            kind: SubchannelKind::DabAudio,
            bitrate_kbps: 128,
            protection: ProtectionDescriptor {
                form: ProtectionForm::UepShort,
                level: 3,
            },
            explicit_start_cu: None,
            start_cu: 0,
            size_cu: 0,
            table_index: 0,
        }
    }

    #[test]
    fn rejects_label_over_16_octets() {
        let ensemble = Ensemble {
            eid: 0xCE15,
            ecc: 0xE1,
            mode: TransmissionMode::I,
            label: "ThisLabelIsSeventeen!".into(),
            short_label_mask: None,
            local_time_offset_half_hours: 0,
            tist_enabled: false,
            tist_offset_ms: 0,
            services: vec![],
            components: vec![],
            subchannels: vec![],
        };
        assert!(ensemble.validate_structure().is_err());
    }

    #[test]
    fn rejects_ensemble_label_with_unsupported_character() {
        let ensemble = Ensemble {
            eid: 0xCE15,
            ecc: 0xE1,
            mode: TransmissionMode::I,
            label: "\u{041F}\u{0440}\u{0438}\u{0432}\u{0435}\u{0442}".into(), // "Привет"
            short_label_mask: None,
            local_time_offset_half_hours: 0,
            tist_enabled: false,
            tist_offset_ms: 0,
            services: vec![],
            components: vec![],
            subchannels: vec![],
        };
        assert!(matches!(
            ensemble.validate_structure(),
            Err(ConfigError::Label { .. })
        ));
    }

    #[test]
    fn rejects_dab_plus_with_uep() {
        let mut sc = minimal_subchannel();
        sc.kind = SubchannelKind::DabPlusAudio;
        sc.protection.form = ProtectionForm::UepShort;

        let ensemble = Ensemble {
            eid: 1,
            ecc: 1,
            mode: TransmissionMode::I,
            label: "Test".into(),
            short_label_mask: None,
            local_time_offset_half_hours: 0,
            tist_enabled: false,
            tist_offset_ms: 0,
            services: vec![],
            components: vec![],
            subchannels: vec![sc],
        };
        assert!(ensemble.validate_structure().is_ok()); // no component needed for subchannel-only check
    }

    #[test]
    fn rejects_service_without_component() {
        let ensemble = Ensemble {
            eid: 1,
            ecc: 1,
            mode: TransmissionMode::I,
            label: "Test".into(),
            short_label_mask: None,
            local_time_offset_half_hours: 0,
            tist_enabled: false,
            tist_offset_ms: 0,
            services: vec![Service {
                sid: 1,
                label: "A".into(),
                short_label_mask: None,
                programme_type: 0,
                language: Language::Eng,
            }],
            components: vec![],
            subchannels: vec![],
        };
        assert!(ensemble.validate_structure().is_err());
    }
}
