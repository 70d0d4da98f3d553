//! Colour bands for the derived ratio columns.
//!
//! Each placement profile holds, per metric, an ordered rule list; the first
//! rule whose bound matches wins. The two profiles deliberately differ in
//! which edge of each band is inclusive.

use crate::report::ratio::{parse_percent, Metric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Green,
    Yellow,
    Red,
}

impl Band {
    /// Solid background fill, `#RRGGBB`.
    pub fn fill_color(self) -> &'static str {
        match self {
            Band::Green => "#00FF00",
            Band::Yellow => "#FFFF00",
            Band::Red => "#FF0000",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    AtMost(f64),
    Below(f64),
    AtLeast(f64),
    Above(f64),
    Any,
}

impl Bound {
    pub fn matches(self, value: f64) -> bool {
        match self {
            Bound::AtMost(b) => value <= b,
            Bound::Below(b) => value < b,
            Bound::AtLeast(b) => value >= b,
            Bound::Above(b) => value > b,
            Bound::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub bound: Bound,
    pub band: Band,
}

const fn rule(bound: Bound, band: Band) -> Rule {
    Rule { bound, band }
}

#[derive(Debug)]
pub struct PlacementProfile {
    pub label: &'static str,
    pub imps_givt: &'static [Rule],
    pub clicks_givt: &'static [Rule],
    pub viewability: &'static [Rule],
}

impl PlacementProfile {
    pub fn rules(&self, metric: Metric) -> &'static [Rule] {
        match metric {
            Metric::ImpsGivt => self.imps_givt,
            Metric::ClicksGivt => self.clicks_givt,
            Metric::Viewability => self.viewability,
        }
    }

    pub fn band(&self, metric: Metric, percentage: f64) -> Option<Band> {
        if !percentage.is_finite() {
            return None;
        }
        self.rules(metric)
            .iter()
            .find(|r| r.bound.matches(percentage))
            .map(|r| r.band)
    }
}

pub const IN_STREAM_VIDEO: PlacementProfile = PlacementProfile {
    label: "In-Stream Video",
    // green <= 1 < yellow <= 3 < red
    imps_givt: &[
        rule(Bound::AtMost(1.0), Band::Green),
        rule(Bound::AtMost(3.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
    // green <= 10 < yellow <= 20 < red
    clicks_givt: &[
        rule(Bound::AtMost(10.0), Band::Green),
        rule(Bound::AtMost(20.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
    // red < 65 <= yellow < 85 <= green
    viewability: &[
        rule(Bound::AtLeast(85.0), Band::Green),
        rule(Bound::AtLeast(65.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
};

pub const IN_BANNER: PlacementProfile = PlacementProfile {
    label: "In-Banner",
    // green < 1 <= yellow <= 3 < red
    imps_givt: &[
        rule(Bound::Below(1.0), Band::Green),
        rule(Bound::AtMost(3.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
    // green < 10 <= yellow <= 20 < red
    clicks_givt: &[
        rule(Bound::Below(10.0), Band::Green),
        rule(Bound::AtMost(20.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
    // red < 55 <= yellow <= 70 < green
    viewability: &[
        rule(Bound::Above(70.0), Band::Green),
        rule(Bound::AtLeast(55.0), Band::Yellow),
        rule(Bound::Any, Band::Red),
    ],
};

pub const PROFILES: [&PlacementProfile; 2] = [&IN_STREAM_VIDEO, &IN_BANNER];

/// Exact, case-sensitive match on the placement label.
pub fn profile_for(placement: &str) -> Option<&'static PlacementProfile> {
    PROFILES.into_iter().find(|p| p.label == placement)
}

pub fn classify(placement: Option<&str>, metric: Metric, percentage: f64) -> Option<Band> {
    profile_for(placement?)?.band(metric, percentage)
}

/// Classify a rendered ratio cell such as `"2.50%"`. The `nan%` sentinel is never banded.
pub fn classify_cell(placement: Option<&str>, metric: Metric, cell: &str) -> Option<Band> {
    classify(placement, metric, parse_percent(cell)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISV: Option<&str> = Some("In-Stream Video");
    const IB: Option<&str> = Some("In-Banner");

    #[test]
    fn test_in_stream_imps_edges() {
        assert_eq!(classify(ISV, Metric::ImpsGivt, 0.0), Some(Band::Green));
        assert_eq!(classify(ISV, Metric::ImpsGivt, 1.0), Some(Band::Green));
        assert_eq!(classify(ISV, Metric::ImpsGivt, 1.01), Some(Band::Yellow));
        assert_eq!(classify(ISV, Metric::ImpsGivt, 3.0), Some(Band::Yellow));
        assert_eq!(classify(ISV, Metric::ImpsGivt, 3.01), Some(Band::Red));
    }

    #[test]
    fn test_in_banner_imps_edges() {
        assert_eq!(classify(IB, Metric::ImpsGivt, 0.99), Some(Band::Green));
        assert_eq!(classify(IB, Metric::ImpsGivt, 1.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::ImpsGivt, 3.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::ImpsGivt, 3.01), Some(Band::Red));
    }

    #[test]
    fn test_clicks_edges() {
        assert_eq!(classify(ISV, Metric::ClicksGivt, 10.0), Some(Band::Green));
        assert_eq!(classify(ISV, Metric::ClicksGivt, 20.0), Some(Band::Yellow));
        assert_eq!(classify(ISV, Metric::ClicksGivt, 20.01), Some(Band::Red));
        assert_eq!(classify(IB, Metric::ClicksGivt, 9.99), Some(Band::Green));
        assert_eq!(classify(IB, Metric::ClicksGivt, 10.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::ClicksGivt, 20.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::ClicksGivt, 20.5), Some(Band::Red));
    }

    #[test]
    fn test_viewability_edges() {
        assert_eq!(classify(ISV, Metric::Viewability, 85.0), Some(Band::Green));
        assert_eq!(classify(ISV, Metric::Viewability, 84.99), Some(Band::Yellow));
        assert_eq!(classify(ISV, Metric::Viewability, 65.0), Some(Band::Yellow));
        assert_eq!(classify(ISV, Metric::Viewability, 64.99), Some(Band::Red));
        assert_eq!(classify(IB, Metric::Viewability, 70.01), Some(Band::Green));
        assert_eq!(classify(IB, Metric::Viewability, 70.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::Viewability, 55.0), Some(Band::Yellow));
        assert_eq!(classify(IB, Metric::Viewability, 54.99), Some(Band::Red));
    }

    #[test]
    fn test_unknown_placement_is_unclassified() {
        for placement in [None, Some(""), Some("Native"), Some("in-banner")] {
            for metric in Metric::ALL {
                assert_eq!(classify(placement, metric, 1.0), None);
            }
        }
    }

    #[test]
    fn test_classify_cell() {
        assert_eq!(classify_cell(ISV, Metric::ImpsGivt, "1.00%"), Some(Band::Green));
        assert_eq!(classify_cell(IB, Metric::ImpsGivt, "1.00%"), Some(Band::Yellow));
        assert_eq!(classify_cell(IB, Metric::ImpsGivt, "nan%"), None);
        assert_eq!(classify(IB, Metric::ImpsGivt, f64::NAN), None);
    }

    #[test]
    fn test_every_rule_list_ends_in_catch_all() {
        for profile in PROFILES {
            for metric in Metric::ALL {
                let last = profile.rules(metric).last().unwrap();
                assert_eq!(last.bound, Bound::Any, "{} {:?}", profile.label, metric);
            }
        }
    }
}
