// ── Visibility & availability classification ──
//
// Precedence, first match wins:
//   1. name/type matches an ignore pattern  → hidden, no state
//   2. platform type not enabled            → hidden, no state
//   3. otherwise visible; offline devices are unavailable

use std::collections::BTreeSet;

use crate::config::PollSettings;
use crate::model::{Availability, Connection, Device, PlatformType};

pub const REASON_NAME_FILTER: &str = "hidden by name filter";
pub const REASON_CATEGORY_FILTER: &str = "hidden by category filter";
pub const REASON_OFFLINE: &str = "device is offline";

// ── Ignore patterns ─────────────────────────────────────────────────

/// One `%`-wildcard pattern, lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    /// `kitchen`
    Exact(String),
    /// `kitchen%`
    Prefix(String),
    /// `%kitchen`
    Suffix(String),
    /// `%kitchen%`
    Contains(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        let p = raw.to_lowercase();
        let leading = p.starts_with('%');
        let trailing = p.len() > 1 && p.ends_with('%');
        match (leading, trailing) {
            (true, true) => Self::Contains(p[1..p.len() - 1].to_owned()),
            (true, false) => Self::Suffix(p[1..].to_owned()),
            (false, true) => Self::Prefix(p[..p.len() - 1].to_owned()),
            (false, false) => Self::Exact(p),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(s) => candidate == s,
            Self::Prefix(s) => candidate.starts_with(s.as_str()),
            Self::Suffix(s) => candidate.ends_with(s.as_str()),
            Self::Contains(s) => candidate.contains(s.as_str()),
        }
    }
}

/// Case-insensitive matcher over a device's full name and hub type.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    /// Blank patterns are dropped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .filter_map(|p| {
                    let p = p.as_ref().trim();
                    (!p.is_empty()).then(|| Pattern::parse(p))
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any pattern matches the name or the hub type.
    pub fn matches(&self, name: &str, hub_type: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        let hub_type = hub_type.to_lowercase();
        self.patterns
            .iter()
            .any(|p| p.matches(&name) || p.matches(&hub_type))
    }
}

// ── Classifier ──────────────────────────────────────────────────────

/// Outcome of classifying one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub hidden: bool,
    pub availability: Availability,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    enabled: BTreeSet<PlatformType>,
    filter: IgnoreFilter,
}

impl Classifier {
    pub fn new(settings: &PollSettings) -> Self {
        Self {
            enabled: settings.enabled_types.clone(),
            filter: IgnoreFilter::new(&settings.ignored_patterns),
        }
    }

    pub fn verdict(&self, device: &Device) -> Verdict {
        if self.filter.matches(&device.full_name(), &device.hub_type) {
            return Verdict {
                hidden: true,
                availability: Availability::NoState,
                reason: REASON_NAME_FILTER,
            };
        }

        // Unmapped hub types are never hidden by category.
        if device
            .platform_type()
            .is_some_and(|p| !self.enabled.contains(&p))
        {
            return Verdict {
                hidden: true,
                availability: Availability::NoState,
                reason: REASON_CATEGORY_FILTER,
            };
        }

        if device.connection == Connection::Offline {
            Verdict {
                hidden: false,
                availability: Availability::Unavailable,
                reason: REASON_OFFLINE,
            }
        } else {
            Verdict {
                hidden: false,
                availability: Availability::Available,
                reason: "",
            }
        }
    }

    /// Recompute and store the classification fields on `device`.
    pub fn apply(&self, device: &mut Device) {
        let verdict = self.verdict(device);
        device.hidden = verdict.hidden;
        device.availability = verdict.availability;
        verdict.reason.clone_into(&mut device.reason);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::device::tests::device;

    use super::*;

    fn filter(patterns: &[&str]) -> IgnoreFilter {
        IgnoreFilter::new(patterns)
    }

    #[test]
    fn contains_pattern() {
        let f = filter(&["%bath%"]);
        assert!(f.matches("Guest Bathroom", ""));
        assert!(f.matches("Bathroom Light", ""));
        assert!(!f.matches("Kitchen", ""));
    }

    #[test]
    fn prefix_pattern() {
        let f = filter(&["bath%"]);
        assert!(f.matches("Bathroom", ""));
        assert!(!f.matches("Guest Bathroom", ""));
    }

    #[test]
    fn suffix_pattern() {
        let f = filter(&["%room"]);
        assert!(f.matches("Living Room", ""));
        assert!(!f.matches("Roomy Hall", ""));
    }

    #[test]
    fn exact_pattern_is_case_insensitive_and_checks_type() {
        let f = filter(&["Porch"]);
        assert!(f.matches("porch", ""));
        assert!(!f.matches("Porch Light", ""));

        let by_type = filter(&["shade"]);
        assert!(by_type.matches("Den Blind", "Shade"));
    }

    #[test]
    fn empty_filter_never_matches() {
        let f = filter(&[]);
        assert!(f.is_empty());
        assert!(!f.matches("", ""));
        assert!(filter(&["  "]).is_empty());
    }

    fn classifier(enabled: &[PlatformType], ignored: &[&str]) -> Classifier {
        Classifier::new(&PollSettings {
            enabled_types: enabled.iter().copied().collect(),
            ignored_patterns: ignored.iter().map(|s| (*s).to_owned()).collect(),
            ..PollSettings::default()
        })
    }

    #[test]
    fn name_filter_beats_category_filter() {
        let c = classifier(&[], &["%lamp"]);
        let v = c.verdict(&device("Den", "Lamp"));
        assert_eq!(v.reason, REASON_NAME_FILTER);
        assert_eq!(v.availability, Availability::NoState);
        assert!(v.hidden);
    }

    #[test]
    fn disabled_category_is_hidden_even_when_offline() {
        let c = classifier(&[PlatformType::Shade], &[]);
        let mut d = device("Den", "Lamp");
        d.connection = Connection::Offline;
        let v = c.verdict(&d);
        assert!(v.hidden);
        assert_eq!(v.reason, REASON_CATEGORY_FILTER);
        assert_ne!(v.availability, Availability::Available);
    }

    #[test]
    fn offline_visible_device_is_unavailable() {
        let c = classifier(&[PlatformType::Light], &[]);
        let mut d = device("Den", "Lamp");
        d.connection = Connection::Offline;
        c.apply(&mut d);
        assert!(!d.hidden);
        assert_eq!(d.availability, Availability::Unavailable);
        assert_eq!(d.reason, REASON_OFFLINE);

        d.connection = Connection::Online;
        c.apply(&mut d);
        assert_eq!(d.availability, Availability::Available);
        assert_eq!(d.reason, "");
    }

    #[test]
    fn unmapped_type_is_not_category_filtered() {
        let c = classifier(&[], &[]);
        let mut d = device("Den", "Gizmo");
        d.hub_type = "Gizmo".into();
        d.hub_subtype = "Gizmo".into();
        assert!(!c.verdict(&d).hidden);
    }
}
