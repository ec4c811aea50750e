use crate::world::position::{BlockPos, Face, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: Vec3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Vec3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }

    pub fn around_feet(feet: Vec3, width: f64, height: f64) -> Self {
        let half = width / 2.0;
        Self::new(
            Vec3::new(feet.x - half, feet.y, feet.z - half),
            Vec3::new(feet.x + half, feet.y + height, feet.z + half),
        )
    }

    pub fn distance_to(&self, point: Vec3) -> f64 {
        let nearest = Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        point.sub(nearest).length()
    }

    /// Slab test. Returns the distance along the normalized ray to the first
    /// intersection, or 0 when the origin is inside the box.
    pub fn ray_intersect(&self, origin: Vec3, dir: Vec3) -> Option<f64> {
        let inv = |d: f64| if d.abs() < 1e-9 { f64::MAX } else { 1.0 / d };
        let inv_dir = Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z));

        let t1 = (self.min.x - origin.x) * inv_dir.x;
        let t2 = (self.max.x - origin.x) * inv_dir.x;
        let t3 = (self.min.y - origin.y) * inv_dir.y;
        let t4 = (self.max.y - origin.y) * inv_dir.y;
        let t5 = (self.min.z - origin.z) * inv_dir.z;
        let t6 = (self.max.z - origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockHit {
    pub pos: BlockPos,
    pub face: Face,
    pub distance: f64,
    pub point: Vec3,
}

impl BlockHit {
    pub fn neighbor(&self) -> Option<BlockPos> {
        self.pos.step(self.face)
    }
}

/// Walks the grid cells pierced by the ray (Amanatides-Woo traversal) and
/// returns the first one for which `solid` answers true.
pub fn cast_blocks<F>(origin: Vec3, direction: Vec3, reach: f64, mut solid: F) -> Option<BlockHit>
where
    F: FnMut(BlockPos) -> bool,
{
    let length = direction.length();
    if !(length > 0.0) || !origin.is_finite() || !(reach > 0.0) {
        return None;
    }
    let dir = direction.scale(1.0 / length);
    let start = BlockPos::containing(origin);
    let mut cell = [start.x, start.y, start.z];
    let o = [origin.x, origin.y, origin.z];
    let d = [dir.x, dir.y, dir.z];
    let mut step = [0i32; 3];
    let mut t_max = [f64::INFINITY; 3];
    let mut t_delta = [f64::INFINITY; 3];
    for axis in 0..3 {
        if d[axis] > 0.0 {
            step[axis] = 1;
            t_max[axis] = (f64::from(cell[axis]) + 1.0 - o[axis]) / d[axis];
            t_delta[axis] = 1.0 / d[axis];
        } else if d[axis] < 0.0 {
            step[axis] = -1;
            t_max[axis] = (f64::from(cell[axis]) - o[axis]) / d[axis];
            t_delta[axis] = -1.0 / d[axis];
        }
    }

    let mut entered = dominant_entry_face(dir);
    let mut t = 0.0;
    loop {
        let pos = BlockPos::new(cell[0], cell[1], cell[2]);
        if solid(pos) {
            return Some(BlockHit {
                pos,
                face: entered,
                distance: t,
                point: origin.add(dir.scale(t)),
            });
        }
        let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
            0
        } else if t_max[1] <= t_max[2] {
            1
        } else {
            2
        };
        t = t_max[axis];
        if t > reach {
            return None;
        }
        cell[axis] = cell[axis].checked_add(step[axis])?;
        t_max[axis] += t_delta[axis];
        entered = entry_face(axis, step[axis]);
    }
}

fn entry_face(axis: usize, step: i32) -> Face {
    match (axis, step > 0) {
        (0, true) => Face::West,
        (0, false) => Face::East,
        (1, true) => Face::Down,
        (1, false) => Face::Up,
        (_, true) => Face::North,
        (_, false) => Face::South,
    }
}

fn dominant_entry_face(dir: Vec3) -> Face {
    let (ax, ay, az) = (dir.x.abs(), dir.y.abs(), dir.z.abs());
    if ax >= ay && ax >= az {
        entry_face(0, if dir.x >= 0.0 { 1 } else { -1 })
    } else if ay >= az {
        entry_face(1, if dir.y >= 0.0 { 1 } else { -1 })
    } else {
        entry_face(2, if dir.z >= 0.0 { 1 } else { -1 })
    }
}
