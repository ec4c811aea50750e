use crate::world::position::Vec3;
use crate::world::raycast::Aabb;

pub const DEFAULT_EYE_HEIGHT: f64 = 1.62;

/// Where an actor stands and looks, including the previous tick's values
/// used for sub-tick interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub prev_position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub prev_yaw: f32,
    pub prev_pitch: f32,
    pub eye_height: f64,
    pub bounds: Aabb,
}

impl Pose {
    pub fn standing(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            prev_position: position,
            yaw,
            pitch,
            prev_yaw: yaw,
            prev_pitch: pitch,
            eye_height: DEFAULT_EYE_HEIGHT,
            bounds: Aabb::around_feet(position, 0.6, 1.8),
        }
    }

    pub fn eye(&self, partial_tick: f32) -> Vec3 {
        let t = f64::from(partial_tick.clamp(0.0, 1.0));
        let feet = self.prev_position.lerp(self.position, t);
        Vec3::new(feet.x, feet.y + self.eye_height, feet.z)
    }

    /// Unit look vector. Yaw 0 faces +z, positive pitch looks down.
    pub fn look(&self, partial_tick: f32) -> Vec3 {
        let t = partial_tick.clamp(0.0, 1.0);
        let yaw = lerp_angle(self.prev_yaw, self.yaw, t).to_radians();
        let pitch = (self.prev_pitch + (self.pitch - self.prev_pitch) * t).to_radians();
        let (yaw, pitch) = (f64::from(yaw), f64::from(pitch));
        Vec3::new(
            -yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.prev_position.is_finite()
            && self.yaw.is_finite()
            && self.pitch.is_finite()
            && self.prev_yaw.is_finite()
            && self.prev_pitch.is_finite()
            && self.eye_height.is_finite()
    }
}

fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    from + delta * t
}

/// Client-reported pose attached to an interaction packet. Every field is
/// optional on the wire; a packet missing any of them cannot be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AimPacket {
    pub requires_raycast: bool,
    pub partial_tick: Option<f32>,
    pub position: Option<Vec3>,
    pub prev_position: Option<Vec3>,
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
    pub prev_yaw: Option<f32>,
    pub prev_pitch: Option<f32>,
    pub eye_height: Option<f64>,
    pub bounds: Option<Aabb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketPoseError {
    #[error("packet does not request a raycast")]
    NoRaycast,
    #[error("packet is missing pose field '{0}'")]
    MissingField(&'static str),
    #[error("packet pose contains non-finite values")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportedPose {
    pub pose: Pose,
    pub partial_tick: f32,
}

impl AimPacket {
    pub fn from_pose(pose: &Pose, partial_tick: f32) -> Self {
        Self {
            requires_raycast: true,
            partial_tick: Some(partial_tick),
            position: Some(pose.position),
            prev_position: Some(pose.prev_position),
            yaw: Some(pose.yaw),
            pitch: Some(pose.pitch),
            prev_yaw: Some(pose.prev_yaw),
            prev_pitch: Some(pose.prev_pitch),
            eye_height: Some(pose.eye_height),
            bounds: Some(pose.bounds),
        }
    }

    pub fn reported_pose(&self) -> Result<ReportedPose, PacketPoseError> {
        if !self.requires_raycast {
            return Err(PacketPoseError::NoRaycast);
        }
        let pose = Pose {
            position: require(self.position, "position")?,
            prev_position: require(self.prev_position, "prev_position")?,
            yaw: require(self.yaw, "yaw")?,
            pitch: require(self.pitch, "pitch")?,
            prev_yaw: require(self.prev_yaw, "prev_yaw")?,
            prev_pitch: require(self.prev_pitch, "prev_pitch")?,
            eye_height: require(self.eye_height, "eye_height")?,
            bounds: require(self.bounds, "bounds")?,
        };
        let partial_tick = require(self.partial_tick, "partial_tick")?;
        if !pose.is_finite() || !partial_tick.is_finite() {
            return Err(PacketPoseError::NotFinite);
        }
        Ok(ReportedPose {
            pose,
            partial_tick: partial_tick.clamp(0.0, 1.0),
        })
    }
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, PacketPoseError> {
    value.ok_or(PacketPoseError::MissingField(field))
}
