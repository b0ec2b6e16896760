use crate::{
    body::{BodyArena, BodyHandle},
    config::Config,
    contact::{Contact, FeatureId},
    narrowphase::{CachedAxis, Dispatch, DispatchTable, Side},
    shapes::{Shape, ShapeArena, ShapeHandle},
};
use glam::Vec3;

/// A point reported by a generator on the last run, before it is matched to a contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactPoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
    pub feature: FeatureId,
}

/// Persistent contact manifold between two shapes on different bodies.
///
/// Contacts are keyed by the feature they were generated from. A contact found again on the next
/// frame keeps its accumulated impulses, which warm start the solver.
#[derive(Debug)]
pub struct ContactSet {
    shape1: ShapeHandle,
    shape2: ShapeHandle,
    body1: BodyHandle,
    body2: BodyHandle,
    dispatch: Option<Dispatch>,
    inverted: bool,
    /// Set by generators before `sync`, points towards the first generator argument until then.
    pub(crate) normal: Vec3,
    contacts: Vec<Contact>,
    points: Vec<ContactPoint>,
    pub(crate) cache: Option<CachedAxis>,
}

impl ContactSet {
    pub(crate) fn new(
        handle1: ShapeHandle,
        shape1: &Shape,
        handle2: ShapeHandle,
        shape2: &Shape,
        table: &DispatchTable,
    ) -> Self {
        Self {
            shape1: handle1,
            shape2: handle2,
            body1: shape1.body().unwrap_or_default(),
            body2: shape2.body().unwrap_or_default(),
            dispatch: table.get(shape1.shape_type(), shape2.shape_type()),
            inverted: false,
            normal: Vec3::X,
            contacts: Vec::new(),
            points: Vec::new(),
            cache: None,
        }
    }

    pub fn shapes(&self) -> (ShapeHandle, ShapeHandle) {
        (self.shape1, self.shape2)
    }

    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body1, self.body2)
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn contains(&self, shape: ShapeHandle) -> bool {
        self.shape1 == shape || self.shape2 == shape
    }

    /// Runs the pair generator, replacing the points of the last run.
    pub(crate) fn generate(&mut self, sh1: &Shape, sh2: &Shape, delta: f32) {
        self.points.clear();
        if let Some(dispatch) = self.dispatch {
            if dispatch.flipped {
                (dispatch.func)(self, sh2, sh1, delta);
            } else {
                (dispatch.func)(self, sh1, sh2, delta);
            }
        }
    }

    /// Called by generators once the normal is set and points out of the generator argument
    /// `side`. Flips the normal so it pushes `shape1`. Contacts from the other orientation are
    /// dropped.
    pub(crate) fn sync(&mut self, side: Side) {
        let flipped = self.dispatch.map_or(false, |d| d.flipped);
        let inverted = flipped != (side == Side::B);
        if inverted != self.inverted {
            self.contacts.clear();
            self.inverted = inverted;
        }
        if inverted {
            self.normal = -self.normal;
        }
    }

    pub(crate) fn add(&mut self, position: Vec3, penetration: f32, feature: FeatureId) {
        self.points.push(ContactPoint {
            position,
            normal: self.normal,
            penetration,
            feature,
        });
    }

    /// Regenerates the contacts and builds their solver rows.
    pub(crate) fn init(&mut self, shapes: &ShapeArena, bodies: &mut BodyArena, config: &Config) {
        let (sh1, sh2) = match (shapes.get(self.shape1), shapes.get(self.shape2)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                self.contacts.clear();
                return;
            }
        };
        self.generate(sh1, sh2, config.delta);

        let mut previous = std::mem::take(&mut self.contacts);
        for point in self.points.iter() {
            // a feature reported twice keeps the last point
            if let Some(contact) = self.contacts.iter_mut().find(|c| c.feature == point.feature) {
                contact.position = point.position;
                contact.normal = point.normal;
                contact.penetration = point.penetration;
                continue;
            }
            let contact = match previous.iter().position(|c| c.feature == point.feature) {
                Some(i) => {
                    let mut contact = previous.swap_remove(i);
                    contact.position = point.position;
                    contact.normal = point.normal;
                    contact.penetration = point.penetration;
                    contact
                }
                None => Contact::new(
                    point.position,
                    point.normal,
                    point.penetration,
                    point.feature,
                    &sh1.material,
                    &sh2.material,
                ),
            };
            self.contacts.push(contact);
        }

        if self.contacts.is_empty() || self.body1 == self.body2 {
            return;
        }
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        for contact in self.contacts.iter_mut() {
            contact.init(body1, body2, config);
        }
    }

    pub(crate) fn resolve(&mut self, bodies: &mut BodyArena) {
        if self.contacts.is_empty() {
            return;
        }
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        for contact in self.contacts.iter_mut() {
            contact.resolve(body1, body2);
        }
    }

    pub(crate) fn init_position(&mut self, bodies: &BodyArena) {
        let body1 = bodies.get_body(self.body1);
        let body2 = bodies.get_body(self.body2);
        for contact in self.contacts.iter_mut() {
            contact.init_position(body1, body2);
        }
    }

    /// One correction pass, returns the deepest penetration seen.
    pub(crate) fn resolve_position(&mut self, bodies: &mut BodyArena, config: &Config) -> f32 {
        if self.contacts.is_empty() {
            return 0.0;
        }
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        self.contacts
            .iter()
            .map(|contact| contact.resolve_position(body1, body2, config))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    fn attach(
        shapes: &mut ShapeArena,
        bodies: &mut BodyArena,
        body: BodyHandle,
        mut shape: Shape,
    ) -> ShapeHandle {
        shape.body = Some(body);
        let handle = shapes.add(shape);
        let body = bodies.get_body_mut(body);
        body.attach_shape(handle);
        body.update_shape(shapes);
        body.calculate_transform(shapes);
        handle
    }

    fn sphere_on_plane() -> (ShapeArena, BodyArena, ContactSet) {
        let mut shapes = ShapeArena::new();
        let mut bodies = BodyArena::new();
        let ground = bodies.add(Body::new_static());
        let ball = bodies.add(Body::from_translation(Vec3::new(0.0, 0.0, 0.49)));
        let plane = attach(&mut shapes, &mut bodies, ground, Shape::make_plane(Vec3::Z, 0.0));
        let sphere = attach(
            &mut shapes,
            &mut bodies,
            ball,
            Shape::make_sphere(Vec3::ZERO, 0.5),
        );
        let set = ContactSet::new(
            plane,
            &shapes[plane],
            sphere,
            &shapes[sphere],
            &DispatchTable::new(),
        );
        (shapes, bodies, set)
    }

    #[test]
    fn test_normal_pushes_first_shape() {
        let (shapes, mut bodies, mut set) = sphere_on_plane();
        set.init(&shapes, &mut bodies, &Config::default());
        assert_eq!(set.contacts().len(), 1);
        // the plane is first, so the normal points down into it
        assert!(set.contacts()[0].normal.abs_diff_eq(-Vec3::Z, 1e-6));
        assert!(set.is_inverted());
    }

    #[test]
    fn test_contact_keeps_impulse_across_frames() {
        let (shapes, mut bodies, mut set) = sphere_on_plane();
        let config = Config::default();
        let ball = set.bodies().1;
        bodies.get_body_mut(ball).velocity = Vec3::new(0.0, 0.0, -1.0);
        set.init(&shapes, &mut bodies, &config);
        for _ in 0..config.iterations {
            set.resolve(&mut bodies);
        }
        let impulse = set.contacts()[0].normal_impulse();
        assert!(impulse > 0.0);

        set.init(&shapes, &mut bodies, &config);
        assert_eq!(set.contacts().len(), 1);
        assert_eq!(set.contacts()[0].normal_impulse(), impulse);
    }

    #[test]
    fn test_lost_contact_is_dropped() {
        let (mut shapes, mut bodies, mut set) = sphere_on_plane();
        let config = Config::default();
        set.init(&shapes, &mut bodies, &config);
        assert_eq!(set.contacts().len(), 1);

        let ball = set.bodies().1;
        bodies
            .get_body_mut(ball)
            .set_position(Vec3::new(0.0, 0.0, 2.0), &mut shapes);
        set.init(&shapes, &mut bodies, &config);
        assert!(set.contacts().is_empty());
    }

    #[test]
    fn test_position_correction_separates() {
        let (mut shapes, mut bodies, mut set) = sphere_on_plane();
        let config = Config::default();
        let ball = set.bodies().1;
        bodies
            .get_body_mut(ball)
            .set_position(Vec3::new(0.0, 0.0, 0.3), &mut shapes);
        set.init(&shapes, &mut bodies, &config);
        set.init_position(&bodies);
        let first = set.resolve_position(&mut bodies, &config);
        let second = set.resolve_position(&mut bodies, &config);
        assert!((first - 0.2).abs() < 1e-4);
        assert!(second < first);
        assert!(bodies.get_body(ball).position.z > 0.3);
    }
}
