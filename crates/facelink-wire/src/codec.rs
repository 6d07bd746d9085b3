//! Datagram codec for the iFacialMocap text protocol
//!
//! One datagram is `<blendshape-section>=<transform-section>`. The
//! blendshape section is `|`-separated `name-value` tuples; the
//! transform section is `|`-separated `bone#x,y,z[,x,y,z]` entries where
//! the first vector group is the Euler rotation and the optional second
//! group is the position.

use facelink_core::{Blendshape, BoneTarget, FaceLinkError, FaceLinkResult, Frame, Pose, Vec3};

/// Well-known iFacialMocap UDP port
pub const DEFAULT_PORT: u16 = 49983;

/// Handshake acknowledgment sent back to a newly connected capture app
pub const HANDSHAKE_ACK: &str = "iFacialMocap_sahuasouryya9218sauhuiayeta91555dy3719";

/// Entry separator within each section
const ENTRY_SEPARATOR: char = '|';

/// Decode one datagram payload into a frame.
///
/// Pure and deterministic: the same payload always yields the same frame
/// or the same error, and nothing is observable until the whole payload
/// has decoded.
pub fn decode(payload: &str) -> FaceLinkResult<Frame> {
    let (shapes, transforms) = split_sections(payload)?;
    let mut frame = Frame::default();

    for entry in shapes.split(ENTRY_SEPARATOR) {
        if entry.is_empty() {
            continue;
        }
        frame.blendshapes.push(decode_blendshape(entry)?);
    }

    for entry in transforms.split(ENTRY_SEPARATOR) {
        if entry.is_empty() {
            continue;
        }
        // Entries with no vector payload marker are treated like
        // unrecognized bones: skipped, so protocol extensions do not
        // break older receivers.
        let Some((label, vectors)) = entry.split_once('#') else {
            continue;
        };
        let Some(target) = BoneTarget::from_label(label) else {
            continue;
        };
        // A repeated bone overwrites the earlier pose.
        frame.set_pose(target, decode_pose(vectors)?);
    }

    Ok(frame)
}

/// Encode a frame back to wire text.
///
/// Fixture and diagnostics helper: the emitted payload decodes to an
/// equivalent frame, with the rotation axis correction applied exactly
/// once overall.
pub fn encode(frame: &Frame) -> String {
    let shapes = frame
        .blendshapes
        .iter()
        .map(|b| format!("{}-{}", b.name, b.value))
        .collect::<Vec<_>>()
        .join("|");

    let transforms = [BoneTarget::Head, BoneTarget::LeftEye, BoneTarget::RightEye]
        .into_iter()
        .filter_map(|target| frame.pose(target).map(|pose| encode_pose(target, pose)))
        .collect::<Vec<_>>()
        .join("|");

    format!("{shapes}={transforms}")
}

fn split_sections(payload: &str) -> FaceLinkResult<(&str, &str)> {
    let mut parts = payload.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(shapes), Some(transforms), None) => Ok((shapes, transforms)),
        _ => Err(FaceLinkError::MalformedPacket),
    }
}

fn decode_blendshape(entry: &str) -> FaceLinkResult<Blendshape> {
    // Split on the first '-' so negative values keep their sign.
    let (name, value) = entry
        .split_once('-')
        .ok_or_else(|| FaceLinkError::MalformedBlendshape(entry.to_string()))?;

    let value = parse_component(value)?;

    // Protocol shorthand keeps long blendshape names off the wire. The
    // substitution is textual and applies to every occurrence.
    let name = name.replace("_L", "Left").replace("_R", "Right");

    Ok(Blendshape { name, value })
}

fn decode_pose(payload: &str) -> FaceLinkResult<Pose> {
    let components: Vec<&str> = payload.split(',').collect();
    if components.len() % 3 != 0 {
        return Err(FaceLinkError::MalformedVector(components.len()));
    }

    let mut vectors = Vec::with_capacity(components.len() / 3);
    for chunk in components.chunks(3) {
        vectors.push(Vec3::new(
            parse_component(chunk[0])?,
            parse_component(chunk[1])?,
            parse_component(chunk[2])?,
        ));
    }

    match vectors.as_slice() {
        [rotation] => Ok(Pose {
            rotation: correct_rotation(*rotation),
            position: None,
        }),
        [rotation, position] => Ok(Pose {
            rotation: correct_rotation(*rotation),
            position: Some(*position),
        }),
        _ => Err(FaceLinkError::UnexpectedExtraVector),
    }
}

fn parse_component(text: &str) -> FaceLinkResult<f32> {
    text.trim()
        .parse::<f32>()
        .map_err(|_| FaceLinkError::InvalidNumber(text.to_string()))
}

/// The capture source reports right-handed rotations; the consuming
/// convention mirrors Y and Z.
fn correct_rotation(raw: Vec3) -> Vec3 {
    Vec3::new(raw.x, -raw.y, -raw.z)
}

fn encode_pose(target: BoneTarget, pose: &Pose) -> String {
    // Mirror Y and Z back so the decode-time correction restores the
    // stored rotation.
    let r = pose.rotation;
    let mut out = format!("{}#{},{},{}", target.label(), r.x, -r.y, -r.z);
    if let Some(p) = pose.position {
        out.push_str(&format!(",{},{},{}", p.x, p.y, p.z));
    }
    out
}
