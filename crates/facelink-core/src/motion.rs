//! Motion data model - one decoded capture sample
//!
//! A `Frame` is immutable once constructed and is never partially
//! visible to a consumer: the decoder builds it in full before it
//! crosses any boundary.

/// 3D vector in capture-space units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// A named scalar weight for one facial expression component
#[derive(Debug, Clone, PartialEq)]
pub struct Blendshape {
    /// Normalized name (wire shorthand already expanded)
    pub name: String,
    pub value: f32,
}

impl Blendshape {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One rigid transform sample for a tracked anatomical point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Euler rotation in degrees, axis convention already corrected at
    /// decode time
    pub rotation: Vec3,
    /// Present only when the payload carried a second vector group.
    /// `None` means "unchanged from the previous frame" and is distinct
    /// from a zero position.
    pub position: Option<Vec3>,
}

impl Pose {
    /// Rotation-only pose
    pub fn rotation(rotation: Vec3) -> Self {
        Self {
            rotation,
            position: None,
        }
    }
}

/// Anatomical points recognized by the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneTarget {
    Head,
    LeftEye,
    RightEye,
}

impl BoneTarget {
    /// Map a wire-protocol bone label. Unknown labels return `None` so
    /// callers can skip protocol extensions they do not understand.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "head" => Some(BoneTarget::Head),
            "leftEye" => Some(BoneTarget::LeftEye),
            "rightEye" => Some(BoneTarget::RightEye),
            _ => None,
        }
    }

    /// Wire-protocol label for this bone
    pub fn label(&self) -> &'static str {
        match self {
            BoneTarget::Head => "head",
            BoneTarget::LeftEye => "leftEye",
            BoneTarget::RightEye => "rightEye",
        }
    }
}

/// One fully decoded capture sample
///
/// A pose slot is `None` when its bone never appeared in the datagram;
/// what that means for the rig (hold previous value, reset) is consumer
/// policy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Blendshape weights in wire order. The decoder does not dedupe
    /// names; duplicate handling is consumer-defined.
    pub blendshapes: Vec<Blendshape>,
    pub head: Option<Pose>,
    pub left_eye: Option<Pose>,
    pub right_eye: Option<Pose>,
}

impl Frame {
    /// Look up a blendshape weight by normalized name. With duplicate
    /// names the last occurrence wins.
    pub fn blendshape(&self, name: &str) -> Option<f32> {
        self.blendshapes
            .iter()
            .rev()
            .find(|b| b.name == name)
            .map(|b| b.value)
    }

    pub fn pose(&self, target: BoneTarget) -> Option<&Pose> {
        match target {
            BoneTarget::Head => self.head.as_ref(),
            BoneTarget::LeftEye => self.left_eye.as_ref(),
            BoneTarget::RightEye => self.right_eye.as_ref(),
        }
    }

    /// Set or overwrite the pose for a bone
    pub fn set_pose(&mut self, target: BoneTarget, pose: Pose) {
        match target {
            BoneTarget::Head => self.head = Some(pose),
            BoneTarget::LeftEye => self.left_eye = Some(pose),
            BoneTarget::RightEye => self.right_eye = Some(pose),
        }
    }
}
