//=========================================================================
// Lanes
//=========================================================================
//
// Named lanes of serialized work.
//
// Untagged entries share one implicit lane that serializes strictly: a
// pending blocker stops everything queued after it. A tagged blocker
// only lets entries of its own lane through for the rest of the pass,
// so independent lanes can interleave across ticks.
//
//   pass:  [A:blocking] [ - ] [A] [B] [ - ]
//   gate:   closes(A)   skip  run skip skip
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::rc::Rc;

//=== Lane ================================================================

/// Identifier of a lane of synchronized work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lane(Rc<str>);

impl Lane {
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Lane {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=== LaneGate ============================================================

/// Per-pass record of which lanes may still run.
///
/// Open until the first entry of the pass reports it is still pending.
/// From then on only entries of the blocking lane are admitted; an
/// untagged blocker admits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum LaneGate {
    #[default]
    Open,
    Closed(Option<Lane>),
}

impl LaneGate {
    /// Returns true if an entry in `lane` may be triggered.
    pub(crate) fn admits(&self, lane: Option<&Lane>) -> bool {
        match self {
            Self::Open => true,
            Self::Closed(None) => false,
            Self::Closed(Some(blocking)) => lane == Some(blocking),
        }
    }

    /// Records a pending entry in `lane`.
    ///
    /// Only admitted entries can block, so once closed on a tagged lane
    /// the lane never changes for the rest of the pass.
    pub(crate) fn block(&mut self, lane: Option<&Lane>) {
        if let Self::Open = self {
            *self = Self::Closed(lane.cloned());
        }
    }

    pub(crate) fn is_blocked(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// The lane currently holding the gate, if tagged.
    pub(crate) fn blocking_lane(&self) -> Option<&Lane> {
        match self {
            Self::Closed(lane) => lane.as_ref(),
            Self::Open => None,
        }
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_gate_admits_everything() {
        let gate = LaneGate::default();
        assert!(gate.admits(None));
        assert!(gate.admits(Some(&Lane::new("audio"))));
        assert!(!gate.is_blocked());
    }

    #[test]
    fn untagged_blocker_admits_nothing() {
        let mut gate = LaneGate::default();
        gate.block(None);

        assert!(gate.is_blocked());
        assert!(!gate.admits(None));
        assert!(!gate.admits(Some(&Lane::new("audio"))));
    }

    #[test]
    fn tagged_blocker_admits_only_its_lane() {
        let audio = Lane::new("audio");
        let mut gate = LaneGate::default();
        gate.block(Some(&audio));

        assert!(gate.admits(Some(&Lane::new("audio"))));
        assert!(!gate.admits(Some(&Lane::new("scene"))));
        assert!(!gate.admits(None));
        assert_eq!(gate.blocking_lane(), Some(&audio));
    }

    #[test]
    fn second_block_keeps_first_lane() {
        let audio = Lane::new("audio");
        let mut gate = LaneGate::default();
        gate.block(Some(&audio));
        gate.block(Some(&audio));

        assert_eq!(gate, LaneGate::Closed(Some(audio)));
    }

    #[test]
    fn lane_displays_its_name() {
        assert_eq!(Lane::from("scene").to_string(), "scene");
    }
}
