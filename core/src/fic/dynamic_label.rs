//! Out-of-band dynamic label state (§3 Lifecycles): service-component
//! labels are the one piece of persistent state that changes during a
//! run. Each `dynamic_label`-flagged component gets a shared text handle
//! a host can update at any time; the carousel picks up whatever text is
//! current at that component's next FIG 2/x slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::Ensemble;

struct Slot {
    handle: Arc<Mutex<String>>,
    last_emitted: String,
    toggle: bool,
}

/// Scheduler-owned registry of dynamic label handles, one per
/// `dynamic_label`-flagged service component, keyed by `subchid`.
#[derive(Default)]
pub struct DynamicLabelState {
    slots: HashMap<u8, Slot>,
}

impl DynamicLabelState {
    pub fn new(ensemble: &Ensemble) -> Self {
        let slots = ensemble
            .components
            .iter()
            .filter(|c| c.dynamic_label)
            .map(|c| {
                (
                    c.subchid,
                    Slot {
                        handle: Arc::new(Mutex::new(String::new())),
                        last_emitted: String::new(),
                        toggle: false,
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// A clone-able handle a host uses to push new label text out of
    /// band. `None` if `subchid` has no dynamic label component.
    pub fn handle(&self, subchid: u8) -> Option<Arc<Mutex<String>>> {
        self.slots.get(&subchid).map(|s| Arc::clone(&s.handle))
    }

    /// Current text and FIG 2 toggle bit for `subchid`. The toggle flips
    /// the first time a changed text is sampled, per EN 300 401's
    /// requirement that receivers re-display on a toggle change rather
    /// than on every segment.
    pub fn sample(&mut self, subchid: u8) -> Option<(String, bool)> {
        let slot = self.slots.get_mut(&subchid)?;
        let text = slot.handle.lock().unwrap().clone();
        if text != slot.last_emitted {
            slot.toggle = !slot.toggle;
            slot.last_emitted = text.clone();
        }
        Some((text, slot.toggle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EnsembleBuilder, ProtectionDescriptor, ProtectionForm, Service, ServiceComponent,
        SubchannelKind, TransmissionMode, TransportType,
    };

    fn ensemble_with_dls() -> Ensemble {
        EnsembleBuilder::new(0x4FFF, 0xE1, TransmissionMode::II)
            .label("Test")
            .with_service(Service {
                sid: 1,
                label: "A".into(),
                short_label_mask: None,
                programme_type: 0,
                language: crate::model::Language::Eng,
            })
            .with_component(ServiceComponent {
                sid: 1,
                subchid: 0,
                transport: TransportType::StreamAudio,
                scids: 0,
                primary: true,
                label: None,
                user_applications: vec![],
                dynamic_label: true,
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
    fn handle_updates_are_visible_to_sample() {
        let ensemble = ensemble_with_dls();
        let mut state = DynamicLabelState::new(&ensemble);
        let handle = state.handle(0).expect("subchid 0 has a dynamic label");
        *handle.lock().unwrap() = "Now Playing".into();

        let (text, _) = state.sample(0).unwrap();
        assert_eq!(text, "Now Playing");
    }

    #[test]
    fn toggle_flips_only_when_text_changes() {
        let ensemble = ensemble_with_dls();
        let mut state = DynamicLabelState::new(&ensemble);
        let handle = state.handle(0).unwrap();

        let (_, toggle0) = state.sample(0).unwrap();
        let (_, toggle1) = state.sample(0).unwrap();
        assert_eq!(toggle0, toggle1);

        *handle.lock().unwrap() = "Changed".into();
        let (_, toggle2) = state.sample(0).unwrap();
        assert_ne!(toggle1, toggle2);
    }

    #[test]
    fn subchannel_without_dls_has_no_handle() {
        let ensemble = ensemble_with_dls();
        let state = DynamicLabelState::new(&ensemble);
        assert!(state.handle(99).is_none());
    }
}
