use crate::session::TargetListId;
use crate::template::HoleLabel;

/// Failures surfaced by the guidance engine.
///
/// An out-of-range target is a normal outcome and is encoded in
/// [`crate::guidance::GuidanceResult::in_range`]; `OutOfRange` is only returned
/// by accessors that need an in-range trajectory, such as the needle snap.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuidanceError {
    #[error("no template trajectories available, guidance cannot be computed")]
    NoTemplate,
    #[error("trajectory for hole {hole} has degenerate geometry")]
    DegenerateTrajectory { hole: HoleLabel },
    #[error("target {index} is out of range (depth {depth:.1} mm)")]
    OutOfRange { index: usize, depth: f64 },
    #[error("target index {index} out of bounds for a list of {len} targets")]
    TargetIndexOutOfBounds { index: usize, len: usize },
    #[error("target position must be finite")]
    NonFiniteTarget,
    #[error("unknown target list {0}")]
    UnknownTargetList(TargetListId),
}

pub type Result<T> = std::result::Result<T, GuidanceError>;
