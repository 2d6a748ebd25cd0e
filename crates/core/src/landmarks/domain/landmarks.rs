//! 68-point facial landmark sets and the 5-point named summary.
//!
//! Named entries are read at fixed positions of the 68-entry list:
//! eye centres average positions 37/40 and 43/46, the nose is 33 and the
//! mouth corners are 49 and 55. All named points are `(row, col)`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::shared::constants::LANDMARK_COUNT;

const LEFT_EYE: (usize, usize) = (37, 40);
const RIGHT_EYE: (usize, usize) = (43, 46);
const NOSE: usize = 33;
const MOUTH_LEFT: usize = 49;
const MOUTH_RIGHT: usize = 55;

pub const NAMED_KEYS: [&str; 5] = ["leye", "reye", "nose", "mouthleft", "mouthright"];

/// A landmark as reported by the predictor, in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn row_col(&self) -> (i64, i64) {
        (self.y, self.x)
    }

    pub fn xy(&self) -> (i64, i64) {
        (self.x, self.y)
    }
}

/// Exactly [`LANDMARK_COUNT`] points in the standard 68-point order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Landmarks {
    points: Vec<Point>,
}

impl Landmarks {
    /// Returns the points back when the count is wrong.
    pub fn new(points: Vec<Point>) -> Result<Self, Vec<Point>> {
        if points.len() != LANDMARK_COUNT {
            return Err(points);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn row_col(&self) -> Vec<(i64, i64)> {
        self.points.iter().map(Point::row_col).collect()
    }

    pub fn xy(&self) -> Vec<(i64, i64)> {
        self.points.iter().map(Point::xy).collect()
    }

    pub fn named(&self) -> NamedLandmarks {
        let at = |i: usize| self.points[i].row_col();
        let midpoint = |(a, b): (usize, usize)| {
            let (ra, ca) = at(a);
            let (rb, cb) = at(b);
            ((ra + rb).div_euclid(2), (ca + cb).div_euclid(2))
        };
        NamedLandmarks {
            leye: midpoint(LEFT_EYE),
            reye: midpoint(RIGHT_EYE),
            nose: at(NOSE),
            mouthleft: at(MOUTH_LEFT),
            mouthright: at(MOUTH_RIGHT),
        }
    }
}

/// Five synthesized landmarks, each `(row, col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NamedLandmarks {
    pub leye: (i64, i64),
    pub reye: (i64, i64),
    pub nose: (i64, i64),
    pub mouthleft: (i64, i64),
    pub mouthright: (i64, i64),
}

impl NamedLandmarks {
    pub fn to_map(&self) -> BTreeMap<&'static str, (i64, i64)> {
        BTreeMap::from([
            (NAMED_KEYS[0], self.leye),
            (NAMED_KEYS[1], self.reye),
            (NAMED_KEYS[2], self.nose),
            (NAMED_KEYS[3], self.mouthleft),
            (NAMED_KEYS[4], self.mouthright),
        ])
    }
}

/// What an extraction returns: the ordered point list or the named summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LandmarkOutput {
    Points(Vec<(i64, i64)>),
    Named(NamedLandmarks),
}
