//! Coach responsibility classification
//!
//! Staff directories describe duties in free text ("Assistant Coach -
//! Sprints/Hurdles & Recruiting Coordinator"). This maps that text onto
//! the event groups the lead lists filter by.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventGroup {
    Sprints,
    Hurdles,
    MiddleDistance,
    Distance,
    CrossCountry,
    Jumps,
    Throws,
    Multis,
    Relays,
}

impl EventGroup {
    pub const ALL: [EventGroup; 9] = [
        EventGroup::Sprints,
        EventGroup::Hurdles,
        EventGroup::MiddleDistance,
        EventGroup::Distance,
        EventGroup::CrossCountry,
        EventGroup::Jumps,
        EventGroup::Throws,
        EventGroup::Multis,
        EventGroup::Relays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sprints => "sprints",
            Self::Hurdles => "hurdles",
            Self::MiddleDistance => "middle_distance",
            Self::Distance => "distance",
            Self::CrossCountry => "cross_country",
            Self::Jumps => "jumps",
            Self::Throws => "throws",
            Self::Multis => "multis",
            Self::Relays => "relays",
        }
    }
}

impl fmt::Display for EventGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a coach is responsible for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityProfile {
    pub event_groups: BTreeSet<EventGroup>,
    pub head_coach: bool,
    pub recruiting_coordinator: bool,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid responsibility regex")
}

// Hurdle and middle-distance phrases are removed before the sprint and
// distance patterns run so "400m hurdles" is not also a sprint and
// "middle distance" is not also distance.
static HURDLES: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(\d{2,3}\s*m?\s*)?hurdl\w*"));
static MIDDLE_DISTANCE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(middle[\s-]*distance|mid[\s-]*distance|800\s*m?|1500\s*m?|mile)\b")
});
static SPRINTS: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(sprint\w*|dash(es)?|100\s*m|200\s*m|400\s*m)\b"));
static DISTANCE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(distance|5k|10k|5000\s*m?|10,?000\s*m?|steeple\w*)\b")
});
static CROSS_COUNTRY: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(cross[\s-]*country|xc)\b"));
static JUMPS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(jumps?|jumpers?|jumping|vault\w*|horizontals?|verticals?)\b")
});
static THROWS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(throws?|throwers?|throwing|shot[\s-]*put|shot|discus|javelin|jav|hammer)\b")
});
static MULTIS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(multis?|multi[\s-]*events?|combined[\s-]*events?|heptathlon|decathlon|pentathlon)\b")
});
static RELAYS: Lazy<Regex> = Lazy::new(|| re(r"(?i)\brelays?\b"));
static ALL_EVENTS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(all[\s-]*events|all[\s-]*event[\s-]*groups|entire[\s-]*(team|program))\b")
});
static HEAD_COACH: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bhead[\s-]*coach\b"));
static RECRUITING_COORDINATOR: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\brecruit\w*[\s-]+coord\w*"));

/// Classify free-text responsibilities (title and/or duties column).
pub fn classify_responsibilities(text: &str) -> ResponsibilityProfile {
    let mut profile = ResponsibilityProfile {
        head_coach: is_head_coach(text),
        recruiting_coordinator: RECRUITING_COORDINATOR.is_match(text),
        ..Default::default()
    };

    if ALL_EVENTS.is_match(text) {
        profile.event_groups.extend(EventGroup::ALL);
        return profile;
    }

    let groups = &mut profile.event_groups;

    if HURDLES.is_match(text) {
        groups.insert(EventGroup::Hurdles);
    }
    let rest = HURDLES.replace_all(text, " ");

    if MIDDLE_DISTANCE.is_match(&rest) {
        groups.insert(EventGroup::MiddleDistance);
    }
    let rest = MIDDLE_DISTANCE.replace_all(&rest, " ");

    let checks: [(&Lazy<Regex>, EventGroup); 7] = [
        (&SPRINTS, EventGroup::Sprints),
        (&DISTANCE, EventGroup::Distance),
        (&CROSS_COUNTRY, EventGroup::CrossCountry),
        (&JUMPS, EventGroup::Jumps),
        (&THROWS, EventGroup::Throws),
        (&MULTIS, EventGroup::Multis),
        (&RELAYS, EventGroup::Relays),
    ];
    for (pattern, group) in checks {
        if pattern.is_match(&rest) {
            groups.insert(group);
        }
    }

    profile
}

/// "Head Coach" but not "Associate/Assistant Head Coach".
fn is_head_coach(text: &str) -> bool {
    HEAD_COACH.find_iter(text).any(|m| {
        let prefix = text[..m.start()].trim_end().to_ascii_lowercase();
        !(prefix.ends_with("associate") || prefix.ends_with("assistant") || prefix.ends_with("asst."))
    })
}
