//! The static ensemble data model: ensemble/service/component/subchannel
//! tables plus the validating builder that produces them.

pub mod builder;
pub mod charset;
pub mod ensemble;
pub mod tables;

pub use builder::EnsembleBuilder;
pub use ensemble::{
    ConfigError, Ensemble, ProtectionDescriptor, ProtectionForm, Service, ServiceComponent,
    Subchannel, SubchannelKind, TransmissionMode, TransportType,
};
pub use tables::{Language, UserApplication};
