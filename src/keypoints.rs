//! Typed view of the keypoint detector's per-image JSON output.
//!
//! The detector writes one `<image stem>_keypoints.json` per input image with
//! flat `[x, y, confidence, x, y, confidence, ...]` arrays per person.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// BODY_25 joint indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyJoint {
    Nose = 0,
    Neck = 1,
    RightShoulder = 2,
    RightElbow = 3,
    RightWrist = 4,
    LeftShoulder = 5,
    LeftElbow = 6,
    LeftWrist = 7,
    MidHip = 8,
    RightHip = 9,
    RightKnee = 10,
    RightAnkle = 11,
    LeftHip = 12,
    LeftKnee = 13,
    LeftAnkle = 14,
    RightEye = 15,
    LeftEye = 16,
    RightEar = 17,
    LeftEar = 18,
    LeftBigToe = 19,
    LeftSmallToe = 20,
    LeftHeel = 21,
    RightBigToe = 22,
    RightSmallToe = 23,
    RightHeel = 24,
}

impl BodyJoint {
    pub const COUNT: usize = 25;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::Neck),
            2 => Some(Self::RightShoulder),
            3 => Some(Self::RightElbow),
            4 => Some(Self::RightWrist),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::LeftElbow),
            7 => Some(Self::LeftWrist),
            8 => Some(Self::MidHip),
            9 => Some(Self::RightHip),
            10 => Some(Self::RightKnee),
            11 => Some(Self::RightAnkle),
            12 => Some(Self::LeftHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::LeftAnkle),
            15 => Some(Self::RightEye),
            16 => Some(Self::LeftEye),
            17 => Some(Self::RightEar),
            18 => Some(Self::LeftEar),
            19 => Some(Self::LeftBigToe),
            20 => Some(Self::LeftSmallToe),
            21 => Some(Self::LeftHeel),
            22 => Some(Self::RightBigToe),
            23 => Some(Self::RightSmallToe),
            24 => Some(Self::RightHeel),
            _ => None,
        }
    }
}

/// Single keypoint in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detection confidence (0.0 for undetected joints)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// One detected person in a keypoint file
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub pose_keypoints_2d: Vec<f32>,
    #[serde(default)]
    pub face_keypoints_2d: Vec<f32>,
    #[serde(default)]
    pub hand_left_keypoints_2d: Vec<f32>,
    #[serde(default)]
    pub hand_right_keypoints_2d: Vec<f32>,
}

fn triplets(flat: &[f32], what: &str) -> Result<Vec<Keypoint>> {
    if flat.len() % 3 != 0 {
        bail!("{what}: flat array length {} is not a multiple of 3", flat.len());
    }
    Ok(flat
        .chunks_exact(3)
        .map(|c| Keypoint::new(c[0], c[1], c[2]))
        .collect())
}

impl Person {
    /// Body keypoints; length-checked against the 25-joint format.
    pub fn body_keypoints(&self) -> Result<Vec<Keypoint>> {
        let kps = triplets(&self.pose_keypoints_2d, "pose_keypoints_2d")?;
        if kps.len() != BodyJoint::COUNT {
            bail!(
                "expected {} body keypoints, got {}",
                BodyJoint::COUNT,
                kps.len()
            );
        }
        Ok(kps)
    }

    pub fn face_keypoints(&self) -> Result<Vec<Keypoint>> {
        triplets(&self.face_keypoints_2d, "face_keypoints_2d")
    }

    pub fn left_hand_keypoints(&self) -> Result<Vec<Keypoint>> {
        triplets(&self.hand_left_keypoints_2d, "hand_left_keypoints_2d")
    }

    pub fn right_hand_keypoints(&self) -> Result<Vec<Keypoint>> {
        triplets(&self.hand_right_keypoints_2d, "hand_right_keypoints_2d")
    }

    /// Mean body-joint confidence (0.0 when the body array is empty)
    pub fn average_confidence(&self) -> f32 {
        let confidences: Vec<f32> = self
            .pose_keypoints_2d
            .chunks_exact(3)
            .map(|c| c[2])
            .collect();
        if confidences.is_empty() {
            return 0.0;
        }
        confidences.iter().sum::<f32>() / confidences.len() as f32
    }
}

/// One detector output file
#[derive(Debug, Clone, Deserialize)]
pub struct KeypointFile {
    #[serde(default)]
    pub version: f64,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl KeypointFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse keypoint JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content)
    }
}

/// Keypoint file name the detector writes for a given image stem.
pub fn keypoint_file_name(image_stem: &str) -> String {
    format!("{image_stem}_keypoints.json")
}
