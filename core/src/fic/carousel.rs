//! Per-template repetition scheduler for the FIG carousel.
//!
//! Each template tracks how many ticks remain until it is next due; on
//! expiry it resets to its configured period. Multi-item templates (labels,
//! per-service FIGs) additionally carry a rotation cursor so repeated
//! emissions cycle through all items instead of only ever encoding the
//! first one.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Fig0_0,
    Fig0_1,
    Fig0_2,
    Fig0_3,
    Fig0_5,
    Fig0_8,
    Fig0_9,
    Fig0_10,
    Fig0_13,
    Fig0_17,
    Fig1_0,
    Fig1_1,
    Fig1_4,
    Fig1_5,
    /// Dynamic label segments. Not one of the spec's named repetition
    /// tiers (every-frame / 2s / 10s); scrolling text needs to refresh
    /// faster than the static 10s label tier, so it shares the 0/1-0/2
    /// "current second" cadence.
    Fig2Dls,
}

impl Template {
    /// Repetition period in ticks, given the mode's frame period.
    fn period_ticks(self, frame_period_ms: u32) -> u32 {
        let seconds = match self {
            Template::Fig0_0 => return 1,
            Template::Fig0_1 | Template::Fig0_2 | Template::Fig2Dls => 1,
            Template::Fig0_5 | Template::Fig0_8 | Template::Fig1_0 | Template::Fig1_1 => 2,
            Template::Fig0_9
            | Template::Fig0_13
            | Template::Fig0_10
            | Template::Fig0_17
            | Template::Fig1_4
            | Template::Fig1_5 => 10,
            Template::Fig0_3 => 1,
        };
        (seconds * 1000).div_ceil(frame_period_ms)
    }

    /// All templates, in emission priority order (0/0 first, as required).
    pub const ALL: [Template; 15] = [
        Template::Fig0_0,
        Template::Fig0_1,
        Template::Fig0_2,
        Template::Fig0_3,
        Template::Fig0_5,
        Template::Fig0_8,
        Template::Fig1_0,
        Template::Fig1_1,
        Template::Fig0_9,
        Template::Fig0_13,
        Template::Fig0_10,
        Template::Fig0_17,
        Template::Fig1_4,
        Template::Fig1_5,
        Template::Fig2Dls,
    ];
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    template: Template,
    ticks_remaining: u32,
    /// Round-robin cursor into the template's item list (service index,
    /// component index, ...).
    cursor: usize,
}

/// Tracks due-ness of every FIG template across ticks.
#[derive(Debug, Clone)]
pub struct Carousel {
    slots: Vec<Slot>,
}

impl Carousel {
    pub fn new(frame_period_ms: u32) -> Self {
        let slots = Template::ALL
            .iter()
            .map(|&template| Slot {
                template,
                ticks_remaining: 0, // everything due on the very first tick
                cursor: 0,
            })
            .collect();
        Self { slots }
    }

    /// Advances all slots by one tick and returns the templates due this
    /// tick, in priority order, resetting their countdown.
    pub fn due(&mut self, frame_period_ms: u32) -> Vec<Template> {
        let mut due = Vec::new();
        for slot in &mut self.slots {
            if slot.ticks_remaining == 0 {
                due.push(slot.template);
                slot.ticks_remaining = slot.template.period_ticks(frame_period_ms).saturating_sub(1);
            } else {
                slot.ticks_remaining -= 1;
            }
        }
        due
    }

    /// Current rotation cursor for a multi-item template, advancing it by
    /// one (wrapping at `len`) for next time. Returns `0` if `len == 0`.
    pub fn next_cursor(&mut self, template: Template, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.template == template)
            .expect("all templates are present in ALL");
        let current = slot.cursor % len;
        slot.cursor = (slot.cursor + 1) % len;
        current
    }
}
