//! Quaternion algebra for attitude telemetry.
//!
//! Components follow the telemetry layout: `q[0..3]` is the vector part and
//! `q[3]` the scalar part. Each value carries the timestamp of the sample it
//! came from; products take the timestamp of the right-hand operand.

use crate::math::matrix::MatrixHelper;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Below this magnitude (rad) vector/quaternion conversion uses the linear approximation.
pub const SMALL_ANGLE: f64 = 1.0e-7;

/// Speed of light (km/sec).
pub const SPEED_OF_LIGHT: f64 = 299_792.458;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub time: f64,
    pub q: [f64; 4],
}

/// Axis times angle encoding of a rotation (rad).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationVector {
    pub time: f64,
    pub v: [f64; 3],
}

impl Quaternion {
    pub const fn new(time: f64, q: [f64; 4]) -> Self {
        Self { time, q }
    }

    pub const fn identity(time: f64) -> Self {
        Self {
            time,
            q: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn x(&self) -> f64 {
        self.q[0]
    }

    pub fn y(&self) -> f64 {
        self.q[1]
    }

    pub fn z(&self) -> f64 {
        self.q[2]
    }

    pub fn w(&self) -> f64 {
        self.q[3]
    }

    pub fn vector_part(&self) -> [f64; 3] {
        [self.q[0], self.q[1], self.q[2]]
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn norm(&self) -> f64 {
        self.q.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Product `self ⊗ other` in the telemetry sign convention.
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        let [x1, y1, z1, w1] = self.q;
        let [x2, y2, z2, w2] = other.q;
        Quaternion {
            time: other.time,
            q: [
                w1 * x2 - z1 * y2 + y1 * z2 + x1 * w2,
                z1 * x2 + w1 * y2 - x1 * z2 + y1 * w2,
                -y1 * x2 + x1 * y2 + w1 * z2 + z1 * w2,
                -x1 * x2 - y1 * y2 - z1 * z2 + w1 * w2,
            ],
        }
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            time: self.time,
            q: [-self.q[0], -self.q[1], -self.q[2], self.q[3]],
        }
    }

    /// Unit-norm copy with the scalar part made non-negative.
    pub fn normalize(&self) -> Quaternion {
        let mag = self.norm();
        if mag == 0.0 {
            return Quaternion::identity(self.time);
        }
        let sign = if self.q[3] < 0.0 { -1.0 } else { 1.0 };
        let scale = sign / mag;
        Quaternion {
            time: self.time,
            q: self.q.map(|c| c * scale),
        }
    }

    pub fn from_vector(vector: &RotationVector) -> Quaternion {
        let angle = vector.angle();
        let [v1, v2, v3] = vector.v;
        if angle < SMALL_ANGLE {
            // first-order expansion of sin(angle/2)/angle
            return Quaternion {
                time: vector.time,
                q: [
                    v1 / 2.0,
                    v2 / 2.0,
                    v3 / 2.0,
                    (1.0 - angle * angle / 4.0).sqrt(),
                ],
            };
        }
        let scale = (angle / 2.0).sin() / angle;
        let quat = Quaternion {
            time: vector.time,
            q: [v1 * scale, v2 * scale, v3 * scale, (angle / 2.0).cos()],
        };
        if quat.w() < 0.0 {
            Quaternion {
                time: quat.time,
                q: quat.q.map(|c| -c),
            }
        } else {
            quat
        }
    }

    pub fn to_vector(&self) -> RotationVector {
        let sin_half = MatrixHelper::norm3(&self.vector_part());
        let angle = 2.0 * sin_half.atan2(self.w());
        let v = if angle < SMALL_ANGLE {
            [2.0 * self.q[0], 2.0 * self.q[1], 2.0 * self.q[2]]
        } else {
            let scale = angle / sin_half;
            [self.q[0] * scale, self.q[1] * scale, self.q[2] * scale]
        };
        RotationVector {
            time: self.time,
            v,
        }
    }

    /// Direction cosine matrix transforming reference-frame vectors into this frame.
    pub fn to_rotation_matrix(&self) -> Array2<f64> {
        let [q1, q2, q3, q4] = self.q;
        let mut m = Array2::<f64>::zeros((3, 3));
        m[[0, 0]] = q1 * q1 - q2 * q2 - q3 * q3 + q4 * q4;
        m[[0, 1]] = 2.0 * (q1 * q2 + q3 * q4);
        m[[0, 2]] = 2.0 * (q1 * q3 - q2 * q4);
        m[[1, 0]] = 2.0 * (q1 * q2 - q3 * q4);
        m[[1, 1]] = -q1 * q1 + q2 * q2 - q3 * q3 + q4 * q4;
        m[[1, 2]] = 2.0 * (q2 * q3 + q1 * q4);
        m[[2, 0]] = 2.0 * (q1 * q3 + q2 * q4);
        m[[2, 1]] = 2.0 * (q2 * q3 - q1 * q4);
        m[[2, 2]] = -q1 * q1 - q2 * q2 + q3 * q3 + q4 * q4;
        m
    }

    /// Body X axis expressed in the reference frame.
    pub fn x_axis(&self) -> [f64; 3] {
        let [q1, q2, q3, q4] = self.q;
        [
            q1 * q1 - q2 * q2 - q3 * q3 + q4 * q4,
            2.0 * (q1 * q2 + q3 * q4),
            2.0 * (q1 * q3 - q2 * q4),
        ]
    }

    /// Corrects an attitude derived from stars clustered about the X axis for
    /// stellar aberration. `velocity` is spacecraft minus sun, km/sec.
    pub fn aberration_adjust(&self, velocity: [f64; 3]) -> Quaternion {
        let beta = velocity.map(|c| c / SPEED_OF_LIGHT);
        let correction = RotationVector {
            time: self.time,
            v: MatrixHelper::cross(&self.x_axis(), &beta),
        };
        Quaternion::from_vector(&correction).multiply(self)
    }
}

impl RotationVector {
    pub const fn new(time: f64, v: [f64; 3]) -> Self {
        Self { time, v }
    }

    pub fn angle(&self) -> f64 {
        MatrixHelper::norm3(&self.v)
    }

    /// Magnitude of the pitch/yaw components.
    pub fn yz_magnitude(&self) -> f64 {
        (self.v[1] * self.v[1] + self.v[2] * self.v[2]).sqrt()
    }

    pub fn scaled(&self, factor: f64) -> RotationVector {
        RotationVector {
            time: self.time,
            v: self.v.map(|c| c * factor),
        }
    }
}
