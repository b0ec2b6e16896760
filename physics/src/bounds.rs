use glam::Vec3;
use std::ops::{Add, AddAssign};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            mins: Vec3::splat(std::f32::MAX),
            maxs: Vec3::splat(-std::f32::MAX),
        }
    }

    pub fn from_min_max(mins: Vec3, maxs: Vec3) -> Self {
        Bounds { mins, maxs }
    }

    pub fn from_points(pts: &[Vec3]) -> Self {
        pts.iter().fold(Bounds::new(), |acc, pt| acc + *pt)
    }

    pub fn expand_by_point(&mut self, pt: Vec3) {
        self.add_assign(pt);
    }

    pub fn expand_by_bounds(&mut self, rhs: &Self) {
        self.mins = self.mins.min(rhs.mins);
        self.maxs = self.maxs.max(rhs.maxs);
    }

    pub fn union(&self, rhs: &Self) -> Self {
        Bounds {
            mins: self.mins.min(rhs.mins),
            maxs: self.maxs.max(rhs.maxs),
        }
    }

    pub fn grown(&self, margin: f32) -> Self {
        Bounds {
            mins: self.mins - Vec3::splat(margin),
            maxs: self.maxs + Vec3::splat(margin),
        }
    }

    // strict test, touching boxes do not intersect
    pub fn intersects(&self, rhs: &Self) -> bool {
        rhs.maxs.cmpgt(self.mins).all() && rhs.mins.cmplt(self.maxs).all()
    }

    pub fn contains(&self, rhs: &Self) -> bool {
        rhs.mins.cmpge(self.mins).all() && rhs.maxs.cmple(self.maxs).all()
    }

    pub fn contains_point(&self, pt: Vec3) -> bool {
        pt.cmpge(self.mins).all() && pt.cmple(self.maxs).all()
    }

    /// Surface area, used as the tree cost metric.
    pub fn area(&self) -> f32 {
        let w = self.width();
        2.0 * (w.x * w.y + w.y * w.z + w.z * w.x)
    }

    pub fn width(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }
}

impl Default for Bounds {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Add<Vec3> for Bounds {
    type Output = Self;
    fn add(self, pt: Vec3) -> Self::Output {
        Bounds {
            mins: Vec3::select(pt.cmplt(self.mins), pt, self.mins),
            maxs: Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs),
        }
    }
}

impl AddAssign<Vec3> for Bounds {
    fn add_assign(&mut self, pt: Vec3) {
        self.mins = Vec3::select(pt.cmplt(self.mins), pt, self.mins);
        self.maxs = Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs);
    }
}
