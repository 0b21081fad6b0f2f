//! Threshold ladders mapping a continuous value to an ordinal band

/// Upper edge of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    /// `value < edge`
    Below(f64),
    /// `value <= edge`
    AtMost(f64),
}

impl Edge {
    fn contains(&self, value: f64) -> bool {
        match *self {
            Edge::Below(edge) => value < edge,
            Edge::AtMost(edge) => value <= edge,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            Edge::Below(edge) | Edge::AtMost(edge) => edge,
        }
    }
}

/// Half-open bands checked in ascending order
///
/// A value falls into the first band whose upper edge contains it, otherwise
/// into `top`. Values below `floor` have no band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLadder {
    pub name: &'static str,
    pub floor: Option<f64>,
    pub steps: &'static [(Edge, f64)],
    pub top: f64,
}

impl BandLadder {
    pub fn band(&self, value: f64) -> Option<f64> {
        if value.is_nan() || self.floor.is_some_and(|floor| value < floor) {
            return None;
        }
        Some(
            self.steps
                .iter()
                .find(|(edge, _)| edge.contains(value))
                .map_or(self.top, |&(_, band)| band),
        )
    }

    /// True when the edges strictly increase
    pub fn is_ascending(&self) -> bool {
        self.steps
            .windows(2)
            .all(|w| w[0].0.value() < w[1].0.value())
    }
}

/// Sleep latency in minutes: `[0, 15]`, `(15, 30]`, `(30, 60]`, `> 60`
pub const LATENCY_MINUTES: BandLadder = BandLadder {
    name: "latency_minutes",
    floor: Some(0.0),
    steps: &[
        (Edge::AtMost(15.0), 0.0),
        (Edge::AtMost(30.0), 1.0),
        (Edge::AtMost(60.0), 2.0),
    ],
    top: 3.0,
};

/// Hours asleep: `>= 7`, `[6, 7)`, `[5, 6)`, `< 5`
pub const DURATION_HOURS: BandLadder = BandLadder {
    name: "duration_hours",
    floor: None,
    steps: &[
        (Edge::Below(5.0), 3.0),
        (Edge::Below(6.0), 2.0),
        (Edge::Below(7.0), 1.0),
    ],
    top: 0.0,
};

/// Habitual efficiency: `>= .85`, `[.75, .85)`, `[.65, .75)`, `< .65`
pub const EFFICIENCY: BandLadder = BandLadder {
    name: "efficiency",
    floor: None,
    steps: &[
        (Edge::Below(0.65), 3.0),
        (Edge::Below(0.75), 2.0),
        (Edge::Below(0.85), 1.0),
    ],
    top: 0.0,
};

/// Sum of two 0-3 items: `0`, `1-2`, `3-4`, `5-6`
pub const PAIR_SUM: BandLadder = BandLadder {
    name: "pair_sum",
    floor: Some(0.0),
    steps: &[
        (Edge::AtMost(0.0), 0.0),
        (Edge::AtMost(2.0), 1.0),
        (Edge::AtMost(4.0), 2.0),
    ],
    top: 3.0,
};

/// Sum of nine 0-3 disturbance items: `0`, `1-9`, `10-18`, `> 18`
pub const DISTURBANCE_SUM: BandLadder = BandLadder {
    name: "disturbance_sum",
    floor: Some(0.0),
    steps: &[
        (Edge::AtMost(0.0), 0.0),
        (Edge::AtMost(9.0), 1.0),
        (Edge::AtMost(18.0), 2.0),
    ],
    top: 3.0,
};
