//! Exclusive editor selection.

use crate::id::{LineId, StationId, TransferId};

/// A rendered station pair on a line. The pair is undirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub line: LineId,
    pub a: StationId,
    pub b: StationId,
}

impl SegmentRef {
    pub fn new(line: LineId, a: StationId, b: StationId) -> Self {
        Self { line, a, b }
    }

    /// Same line and same station pair in either order.
    pub fn matches(&self, line: LineId, a: StationId, b: StationId) -> bool {
        self.line == line && ((self.a == a && self.b == b) || (self.a == b && self.b == a))
    }

    pub fn involves(&self, station: StationId) -> bool {
        self.a == station || self.b == station
    }
}

/// What the user has selected. At most one kind at a time; segment and
/// control-point selections imply their owning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Line(LineId),
    Station {
        line: LineId,
        station: StationId,
    },
    Transfer(TransferId),
    Segment(SegmentRef),
    /// One of the two Bezier handles of a segment (`index` 0 or 1).
    ControlPoint {
        segment: SegmentRef,
        index: usize,
    },
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn line(&self) -> Option<LineId> {
        match *self {
            Selection::Line(l) | Selection::Station { line: l, .. } => Some(l),
            Selection::Segment(seg) | Selection::ControlPoint { segment: seg, .. } => Some(seg.line),
            Selection::None | Selection::Transfer(_) => None,
        }
    }

    pub fn station(&self) -> Option<StationId> {
        match *self {
            Selection::Station { station, .. } => Some(station),
            _ => None,
        }
    }

    pub fn transfer(&self) -> Option<TransferId> {
        match *self {
            Selection::Transfer(t) => Some(t),
            _ => None,
        }
    }

    /// The selected segment, also when one of its handles is selected.
    pub fn segment(&self) -> Option<SegmentRef> {
        match *self {
            Selection::Segment(seg) | Selection::ControlPoint { segment: seg, .. } => Some(seg),
            _ => None,
        }
    }

    pub fn control_point(&self) -> Option<(SegmentRef, usize)> {
        match *self {
            Selection::ControlPoint { segment, index } => Some((segment, index)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;

    #[test]
    fn segment_match_ignores_order() {
        let (l, a, b) = (Id::intern("L"), Id::intern("A"), Id::intern("B"));
        let seg = SegmentRef::new(l, a, b);
        assert!(seg.matches(l, b, a));
        assert!(!seg.matches(Id::intern("M"), a, b));
    }

    #[test]
    fn control_point_implies_segment_and_line() {
        let seg = SegmentRef::new(Id::intern("L"), Id::intern("A"), Id::intern("B"));
        let sel = Selection::ControlPoint { segment: seg, index: 1 };
        assert_eq!(sel.segment(), Some(seg));
        assert_eq!(sel.line(), Some(Id::intern("L")));
        assert_eq!(sel.station(), None);
    }
}
