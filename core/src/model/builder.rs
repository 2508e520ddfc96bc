//! Fluent, validating builder over the ensemble data model.
//!
//! This is the narrow interface through which an external configuration
//! loader (YAML, CLI flags, ...) is expected to populate the engine; the
//! core never parses a configuration file format itself.

use super::ensemble::{
    ConfigError, Ensemble, ProtectionDescriptor, Service, ServiceComponent, Subchannel,
    TransmissionMode,
};

#[derive(Debug, Default)]
pub struct EnsembleBuilder {
    eid: u16,
    ecc: u8,
    mode: Option<TransmissionMode>,
    label: String,
    short_label_mask: Option<u16>,
    local_time_offset_half_hours: i8,
    tist_enabled: bool,
    tist_offset_ms: u32,
    services: Vec<Service>,
    components: Vec<ServiceComponent>,
    subchannels: Vec<Subchannel>,
}

impl EnsembleBuilder {
    pub fn new(eid: u16, ecc: u8, mode: TransmissionMode) -> Self {
        Self {
            eid,
            ecc,
            mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn short_label_mask(mut self, mask: u16) -> Self {
        self.short_label_mask = Some(mask);
        self
    }

    pub fn tist(mut self, offset_ms: u32) -> Self {
        self.tist_enabled = true;
        self.tist_offset_ms = offset_ms;
        self
    }

    pub fn local_time_offset_half_hours(mut self, offset: i8) -> Self {
        self.local_time_offset_half_hours = offset;
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_component(mut self, component: ServiceComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_subchannel(
        mut self,
        subchid: u8,
        kind: super::ensemble::SubchannelKind,
        bitrate_kbps: u16,
        protection: ProtectionDescriptor,
    ) -> Self {
        self.subchannels.push(Subchannel {
            subchid,
            kind,
            bitrate_kbps,
            protection,
            explicit_start_cu: None,
            start_cu: 0,
            size_cu: 0,
            table_index: 0,
        });
        self
    }

    /// Validates structural invariants and returns the immutable
    /// [`Ensemble`]. CU allocation is a separate step
    /// (`crate::allocator::allocate`) run once by the scheduler at
    /// startup.
    pub fn build(self) -> Result<Ensemble, ConfigError> {
        let mode = self.mode.ok_or_else(|| ConfigError::InvalidConfiguration {
            field: "ensemble.mode".into(),
            message: "transmission mode is required".into(),
        })?;

        let ensemble = Ensemble {
            eid: self.eid,
            ecc: self.ecc,
            mode,
            label: self.label,
            short_label_mask: self.short_label_mask,
            local_time_offset_half_hours: self.local_time_offset_half_hours,
            tist_enabled: self.tist_enabled,
            tist_offset_ms: self.tist_offset_ms,
            services: self.services,
            components: self.components,
            subchannels: self.subchannels,
        };

        ensemble.validate_structure()?;
        Ok(ensemble)
    }
}
