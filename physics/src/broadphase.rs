//! Dynamic bounding volume tree over fattened shape bounds.
//!
//! Leaves hold one shape each, internal nodes the union of their children. The tree is kept
//! balanced with single rotations. After the first full traversal only leaves whose shape left
//! its fat box are reinserted and tested against the tree.

use crate::{
    body::BodyArena,
    bounds::Bounds,
    config::Config,
    manifold::ContactSet,
    narrowphase::DispatchTable,
    shapes::{Shape, ShapeArena, ShapeHandle},
    world::check_sleep,
};
use std::collections::{BTreeMap, HashSet};

pub(crate) const NULL_NODE: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct Node {
    bounds: Bounds,
    area: f32,
    height: u32,
    parent: u32,
    left: u32,
    right: u32,
    /// Set on leaves only.
    shape: Option<ShapeHandle>,
}

impl Node {
    fn leaf(shape: ShapeHandle, bounds: Bounds) -> Self {
        Self {
            bounds,
            area: bounds.area(),
            height: 0,
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            shape: Some(shape),
        }
    }

    fn is_leaf(&self) -> bool {
        self.shape.is_some()
    }
}

#[derive(Copy, Clone, Debug)]
struct Proxy {
    /// Insertion order, decides which shape of a pair comes first.
    id: u32,
    node: u32,
    pairs: usize,
}

pub struct BroadPhase {
    nodes: Vec<Node>,
    free_list: Vec<u32>,
    root: u32,
    margin: f32,
    next_id: u32,
    proxies: BTreeMap<ShapeHandle, Proxy>,
    pairs: Vec<ContactSet>,
    keys: HashSet<(ShapeHandle, ShapeHandle)>,
    table: DispatchTable,
    initialized: bool,
}

impl BroadPhase {
    pub fn new(margin: f32) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NULL_NODE,
            margin,
            next_id: 0,
            proxies: BTreeMap::new(),
            pairs: Vec::new(),
            keys: HashSet::new(),
            table: DispatchTable::new(),
            initialized: false,
        }
    }

    pub fn pairs(&self) -> &[ContactSet] {
        &self.pairs
    }

    pub(crate) fn pairs_mut(&mut self) -> &mut [ContactSet] {
        &mut self.pairs
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn height(&self) -> u32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Number of pairs the shape takes part in.
    pub fn pair_count(&self, shape: ShapeHandle) -> usize {
        self.proxies.get(&shape).map_or(0, |proxy| proxy.pairs)
    }

    /// The fat box stored for a shape.
    pub fn fat_bounds(&self, shape: ShapeHandle) -> Option<Bounds> {
        self.proxies
            .get(&shape)
            .map(|proxy| self.nodes[proxy.node as usize].bounds)
    }

    pub fn add_shape(
        &mut self,
        handle: ShapeHandle,
        shapes: &ShapeArena,
        bodies: &BodyArena,
    ) {
        let shape = match shapes.get(handle) {
            Some(shape) => shape,
            None => return,
        };
        if self.proxies.contains_key(&handle) {
            return;
        }
        let node = self.alloc_node(Node::leaf(handle, shape.bounds().grown(self.margin)));
        self.proxies.insert(
            handle,
            Proxy {
                id: self.next_id,
                node,
                pairs: 0,
            },
        );
        self.next_id += 1;
        self.insert_leaf(node);
        if self.initialized {
            self.collide(node, shapes, bodies);
        }
    }

    /// Removes the shape and every pair it is part of.
    pub fn remove_shape(&mut self, handle: ShapeHandle) {
        let proxy = match self.proxies.remove(&handle) {
            Some(proxy) => proxy,
            None => return,
        };
        self.remove_leaf(proxy.node);
        self.free_node(proxy.node);

        let proxies = &mut self.proxies;
        let keys = &mut self.keys;
        self.pairs.retain(|pair| {
            if !pair.contains(handle) {
                return true;
            }
            let (s1, s2) = pair.shapes();
            let other = if s1 == handle { s2 } else { s1 };
            if let Some(proxy) = proxies.get_mut(&other) {
                proxy.pairs -= 1;
            }
            keys.remove(&(s1, s2));
            false
        });
    }

    /// Updates the pair list for the current shape bounds.
    pub fn run(&mut self, shapes: &ShapeArena, bodies: &mut BodyArena, config: &Config) {
        if !self.initialized {
            self.initialized = true;
            self.collide_all(shapes, bodies);
            log::debug!(
                "broadphase: {} shapes, {} pairs, height {}",
                self.proxies.len(),
                self.pairs.len(),
                self.height()
            );
            return;
        }

        let escaped: Vec<(ShapeHandle, u32)> = self
            .proxies
            .iter()
            .filter_map(|(&handle, proxy)| {
                let shape = shapes.get(handle)?;
                if self.nodes[proxy.node as usize]
                    .bounds
                    .contains(&shape.bounds())
                {
                    None
                } else {
                    Some((handle, proxy.node))
                }
            })
            .collect();
        for &(handle, node) in escaped.iter() {
            self.remove_leaf(node);
            self.nodes[node as usize].bounds = shapes[handle].bounds().grown(self.margin);
            self.nodes[node as usize].area = self.nodes[node as usize].bounds.area();
            self.insert_leaf(node);
            self.collide(node, shapes, bodies);
        }

        let mut i = 0;
        while i < self.pairs.len() {
            let (s1, s2) = self.pairs[i].shapes();
            let overlap = match (self.proxies.get(&s1), self.proxies.get(&s2)) {
                (Some(p1), Some(p2)) => self.nodes[p1.node as usize]
                    .bounds
                    .intersects(&self.nodes[p2.node as usize].bounds),
                _ => false,
            };
            if overlap {
                i += 1;
                continue;
            }
            let pair = self.pairs.swap_remove(i);
            let (b1, b2) = pair.bodies();
            check_sleep(bodies, b1, b2, config);
            self.keys.remove(&(s1, s2));
            for shape in [s1, s2].iter() {
                if let Some(proxy) = self.proxies.get_mut(shape) {
                    proxy.pairs -= 1;
                }
            }
        }

        if !escaped.is_empty() {
            log::trace!(
                "broadphase: reinserted {}, {} pairs",
                escaped.len(),
                self.pairs.len()
            );
        }
    }

    /// Shapes whose fat box overlaps `bounds`.
    pub fn query(&self, bounds: &Bounds) -> Vec<ShapeHandle> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if !node.bounds.intersects(bounds) {
                continue;
            }
            match node.shape {
                Some(shape) => found.push(shape),
                None => {
                    stack.push(node.left);
                    stack.push(node.right);
                }
            }
        }
        found
    }

    /// Checks parent links, heights and bounds of every node below the root.
    pub fn validate(&self) -> Result<(), String> {
        if self.root == NULL_NODE {
            return if self.proxies.is_empty() {
                Ok(())
            } else {
                Err(format!("empty tree with {} proxies", self.proxies.len()))
            };
        }
        if self.nodes[self.root as usize].parent != NULL_NODE {
            return Err("root has a parent".to_string());
        }
        let mut leaves = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if let Some(shape) = node.shape {
                leaves += 1;
                match self.proxies.get(&shape) {
                    Some(proxy) if proxy.node == id => {}
                    _ => return Err(format!("leaf {} has no matching proxy", id)),
                }
                if node.height != 0 {
                    return Err(format!("leaf {} has height {}", id, node.height));
                }
                continue;
            }
            let (left, right) = (&self.nodes[node.left as usize], &self.nodes[node.right as usize]);
            if left.parent != id || right.parent != id {
                return Err(format!("children of {} have wrong parents", id));
            }
            if node.height != 1 + left.height.max(right.height) {
                return Err(format!("node {} has wrong height", id));
            }
            if !node.bounds.contains(&left.bounds) || !node.bounds.contains(&right.bounds) {
                return Err(format!("node {} does not contain its children", id));
            }
            stack.push(node.left);
            stack.push(node.right);
        }
        if leaves != self.proxies.len() {
            return Err(format!("{} leaves for {} proxies", leaves, self.proxies.len()));
        }
        Ok(())
    }

    fn allowed(sh1: &Shape, sh2: &Shape, bodies: &BodyArena) -> bool {
        let (h1, h2) = match (sh1.body(), sh2.body()) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if h1 == h2 {
            return false;
        }
        let (b1, b2) = match (bodies.get(h1), bodies.get(h2)) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if !b1.moves() && !b2.moves() {
            return false;
        }
        b1.parent != Some(h2) && b2.parent != Some(h1)
    }

    fn add_pair(
        &mut self,
        s1: ShapeHandle,
        s2: ShapeHandle,
        shapes: &ShapeArena,
        bodies: &BodyArena,
    ) {
        let (sh1, sh2) = match (shapes.get(s1), shapes.get(s2)) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };
        if !Self::allowed(sh1, sh2, bodies) {
            return;
        }
        let (id1, id2) = match (self.proxies.get(&s1), self.proxies.get(&s2)) {
            (Some(p1), Some(p2)) => (p1.id, p2.id),
            _ => return,
        };
        let (first, second) = if id1 < id2 { (s1, s2) } else { (s2, s1) };
        if !self.keys.insert((first, second)) {
            return;
        }
        self.pairs.push(ContactSet::new(
            first,
            &shapes[first],
            second,
            &shapes[second],
            &self.table,
        ));
        for shape in [first, second].iter() {
            if let Some(proxy) = self.proxies.get_mut(shape) {
                proxy.pairs += 1;
            }
        }
    }

    fn collide(&mut self, leaf: u32, shapes: &ShapeArena, bodies: &BodyArena) {
        let (shape, bounds) = match self.nodes[leaf as usize].shape {
            Some(shape) => (shape, self.nodes[leaf as usize].bounds),
            None => return,
        };
        let found: Vec<ShapeHandle> = self
            .query(&bounds)
            .into_iter()
            .filter(|&other| other != shape)
            .collect();
        for other in found {
            self.add_pair(shape, other, shapes, bodies);
        }
    }

    fn collide_all(&mut self, shapes: &ShapeArena, bodies: &BodyArena) {
        if self.root == NULL_NODE {
            return;
        }
        let mut found = Vec::new();
        let mut stack = vec![(self.root, self.root)];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (&self.nodes[a as usize], &self.nodes[b as usize]);
            if a == b {
                // pairs inside one subtree
                if !na.is_leaf() {
                    stack.push((na.left, na.left));
                    stack.push((na.right, na.right));
                    stack.push((na.left, na.right));
                }
                continue;
            }
            if !na.bounds.intersects(&nb.bounds) {
                continue;
            }
            match (na.shape, nb.shape) {
                (Some(sa), Some(sb)) => found.push((sa, sb)),
                // split the larger internal node
                _ if nb.is_leaf() || (!na.is_leaf() && na.area > nb.area) => {
                    stack.push((na.left, b));
                    stack.push((na.right, b));
                }
                _ => {
                    stack.push((a, nb.left));
                    stack.push((a, nb.right));
                }
            }
        }
        for (sa, sb) in found {
            self.add_pair(sa, sb, shapes, bodies);
        }
    }

    fn alloc_node(&mut self, node: Node) -> u32 {
        match self.free_list.pop() {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn free_node(&mut self, id: u32) {
        let node = &mut self.nodes[id as usize];
        node.parent = NULL_NODE;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.shape = None;
        self.free_list.push(id);
    }

    fn refit(&mut self, id: u32) {
        let (left, right) = {
            let node = &self.nodes[id as usize];
            (node.left, node.right)
        };
        let (lb, lh) = (self.nodes[left as usize].bounds, self.nodes[left as usize].height);
        let (rb, rh) = (self.nodes[right as usize].bounds, self.nodes[right as usize].height);
        let node = &mut self.nodes[id as usize];
        node.bounds = lb.union(&rb);
        node.area = node.bounds.area();
        node.height = 1 + lh.max(rh);
    }

    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if parent == NULL_NODE {
            self.root = new;
        } else if self.nodes[parent as usize].left == old {
            self.nodes[parent as usize].left = new;
        } else {
            self.nodes[parent as usize].right = new;
        }
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // descend while a child is a cheaper sibling than the current node
        let bounds = self.nodes[leaf as usize].bounds;
        let mut sibling = self.root;
        while !self.nodes[sibling as usize].is_leaf() {
            let node = &self.nodes[sibling as usize];
            let combined = node.bounds.union(&bounds).area();
            let cost = 2.0 * combined;
            let inherit = 2.0 * (combined - node.area);
            let child_cost = |child: &Node| {
                let area = child.bounds.union(&bounds).area() + inherit;
                if child.is_leaf() {
                    area
                } else {
                    area - child.area
                }
            };
            let left_cost = child_cost(&self.nodes[node.left as usize]);
            let right_cost = child_cost(&self.nodes[node.right as usize]);
            if cost < left_cost && cost < right_cost {
                break;
            }
            sibling = if left_cost < right_cost {
                node.left
            } else {
                node.right
            };
        }

        let old_parent = self.nodes[sibling as usize].parent;
        let parent = self.alloc_node(Node {
            bounds,
            area: 0.0,
            height: 0,
            parent: old_parent,
            left: sibling,
            right: leaf,
            shape: None,
        });
        self.replace_child(old_parent, sibling, parent);
        self.nodes[sibling as usize].parent = parent;
        self.nodes[leaf as usize].parent = parent;
        self.fix_upwards(parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }
        let parent = self.nodes[leaf as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };
        let grand_parent = self.nodes[parent as usize].parent;
        self.replace_child(grand_parent, parent, sibling);
        self.nodes[sibling as usize].parent = grand_parent;
        self.nodes[leaf as usize].parent = NULL_NODE;
        self.free_node(parent);
        self.fix_upwards(grand_parent);
    }

    fn fix_upwards(&mut self, start: u32) {
        let mut id = start;
        while id != NULL_NODE {
            self.refit(id);
            id = self.balance(id);
            id = self.nodes[id as usize].parent;
        }
    }

    fn balance(&mut self, id: u32) -> u32 {
        let node = &self.nodes[id as usize];
        if node.is_leaf() || node.height < 2 {
            return id;
        }
        let (left, right) = (node.left, node.right);
        let lh = self.nodes[left as usize].height as i64;
        let rh = self.nodes[right as usize].height as i64;
        if lh - rh > 1 {
            self.rotate(id, left)
        } else if rh - lh > 1 {
            self.rotate(id, right)
        } else {
            id
        }
    }

    // `child` takes the place of `id` and keeps its taller child, `id` takes the shorter one.
    fn rotate(&mut self, id: u32, child: u32) -> u32 {
        let (a, b) = (self.nodes[child as usize].left, self.nodes[child as usize].right);
        let give = if self.nodes[a as usize].height > self.nodes[b as usize].height {
            b
        } else {
            a
        };
        let parent = self.nodes[id as usize].parent;

        if self.nodes[id as usize].left == child {
            self.nodes[id as usize].left = give;
        } else {
            self.nodes[id as usize].right = give;
        }
        self.nodes[give as usize].parent = id;

        if self.nodes[child as usize].left == give {
            self.nodes[child as usize].left = id;
        } else {
            self.nodes[child as usize].right = id;
        }
        self.nodes[id as usize].parent = child;
        self.nodes[child as usize].parent = parent;
        self.replace_child(parent, id, child);

        self.refit(id);
        self.refit(child);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{body::Body, body::BodyHandle, math::Pose, shapes::ShapeBox};
    use glam::{EulerRot, Quat, Vec3};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    struct Scene {
        shapes: ShapeArena,
        bodies: BodyArena,
        handles: Vec<ShapeHandle>,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                shapes: ShapeArena::new(),
                bodies: BodyArena::new(),
                handles: Vec::new(),
            }
        }

        fn add(&mut self, mut body: Body, mut shape: Shape) -> (BodyHandle, ShapeHandle) {
            let handle = self.bodies.add(Body::default());
            shape.body = Some(handle);
            let shape_handle = self.shapes.add(shape);
            body.attach_shape(shape_handle);
            body.update_shape(&self.shapes);
            body.calculate_transform(&mut self.shapes);
            *self.bodies.get_body_mut(handle) = body;
            self.handles.push(shape_handle);
            (handle, shape_handle)
        }

        fn random_spheres(count: usize, seed: u64) -> Self {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut scene = Self::new();
            for _ in 0..count {
                let pos = Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                );
                let radius = rng.gen_range(0.2..1.0);
                scene.add(
                    Body::from_translation(pos),
                    Shape::make_sphere(Vec3::ZERO, radius),
                );
            }
            scene
        }

        // boxes up to 2 long, turned arbitrarily so their bounds grow past the box
        fn random_boxes(count: usize, seed: u64) -> Self {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut scene = Self::new();
            for _ in 0..count {
                let pose = random_pose(&mut rng);
                let half = Vec3::new(
                    rng.gen_range(0.1..1.0),
                    rng.gen_range(0.1..1.0),
                    rng.gen_range(0.1..1.0),
                );
                let shape = Shape::make_box(ShapeBox::new(half).unwrap());
                scene.add(Body::new(pose), shape);
            }
            scene
        }

        fn brute_force(&self) -> HashSet<(ShapeHandle, ShapeHandle)> {
            let mut pairs = HashSet::new();
            for (i, &a) in self.handles.iter().enumerate() {
                for &b in self.handles[i + 1..].iter() {
                    if self.shapes[a].bounds().intersects(&self.shapes[b].bounds()) {
                        pairs.insert((a, b));
                    }
                }
            }
            pairs
        }

        fn broadphase(&mut self) -> BroadPhase {
            let mut broadphase = BroadPhase::new(0.0);
            for &handle in self.handles.iter() {
                broadphase.add_shape(handle, &self.shapes, &self.bodies);
            }
            broadphase.run(&self.shapes, &mut self.bodies, &Config::default());
            broadphase
        }
    }

    fn random_pose(rng: &mut Pcg32) -> Pose {
        let mut coord = || rng.gen_range(-5.0..5.0);
        let position = Vec3::new(coord(), coord(), coord());
        let mut angle = || rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let orientation = Quat::from_euler(EulerRot::XYZ, angle(), angle(), angle());
        Pose::new(position, orientation)
    }

    fn pair_set(broadphase: &BroadPhase) -> HashSet<(ShapeHandle, ShapeHandle)> {
        broadphase.pairs().iter().map(|pair| pair.shapes()).collect()
    }

    #[test]
    fn test_collide_all_matches_brute_force() {
        let mut scene = Scene::random_spheres(60, 1);
        let broadphase = scene.broadphase();
        assert!(broadphase.validate().is_ok());
        let expected = scene.brute_force();
        assert!(!expected.is_empty());
        assert_eq!(pair_set(&broadphase), expected);
        assert_eq!(broadphase.pairs().len(), expected.len());
    }

    #[test]
    fn test_collide_all_rotated_boxes_matches_brute_force() {
        let mut scene = Scene::random_boxes(60, 6);
        let config = Config::default();
        let mut broadphase = scene.broadphase();
        assert!(broadphase.validate().is_ok());
        let expected = scene.brute_force();
        assert!(!expected.is_empty());
        assert_eq!(pair_set(&broadphase), expected);
        assert_eq!(broadphase.pairs().len(), expected.len());

        // turn and move boxes in place, the tree follows their new bounds
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..10 {
            let pick = scene.handles[rng.gen_range(0..scene.handles.len())];
            let body = scene.shapes[pick].body().unwrap();
            let pose = random_pose(&mut rng);
            let body = scene.bodies.get_body_mut(body);
            body.set_position(pose.p, &mut scene.shapes);
            body.set_orientation(pose.q, &mut scene.shapes);
            broadphase.run(&scene.shapes, &mut scene.bodies, &config);
            assert!(broadphase.validate().is_ok());
            assert_eq!(pair_set(&broadphase), scene.brute_force());
        }
    }

    #[test]
    fn test_incremental_matches_rebuild() {
        let mut scene = Scene::random_spheres(40, 2);
        let config = Config::default();
        let mut broadphase = scene.broadphase();

        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..10 {
            let pick = scene.handles[rng.gen_range(0..scene.handles.len())];
            let body = scene.shapes[pick].body().unwrap();
            let pos = Vec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            scene
                .bodies
                .get_body_mut(body)
                .set_position(pos, &mut scene.shapes);
            broadphase.run(&scene.shapes, &mut scene.bodies, &config);
            assert!(broadphase.validate().is_ok());

            let rebuilt = scene.broadphase();
            assert_eq!(pair_set(&broadphase), pair_set(&rebuilt));
            assert_eq!(pair_set(&broadphase), scene.brute_force());
        }
    }

    #[test]
    fn test_random_insert_remove_keeps_tree_valid() {
        let mut scene = Scene::random_spheres(50, 4);
        let mut broadphase = scene.broadphase();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut live = scene.handles.clone();
        for _ in 0..100 {
            if !live.is_empty() && rng.gen_bool(0.5) {
                let handle = live.swap_remove(rng.gen_range(0..live.len()));
                broadphase.remove_shape(handle);
                assert!(broadphase.pairs().iter().all(|pair| !pair.contains(handle)));
            } else {
                let pos = Vec3::new(rng.gen_range(-5.0..5.0), 0.0, rng.gen_range(-5.0..5.0));
                let (_, handle) = scene.add(
                    Body::from_translation(pos),
                    Shape::make_sphere(Vec3::ZERO, 0.5),
                );
                broadphase.add_shape(handle, &scene.shapes, &scene.bodies);
                live.push(handle);
            }
            assert_eq!(broadphase.validate(), Ok(()));
            assert_eq!(broadphase.len(), live.len());
        }
        let total: usize = live.iter().map(|&h| broadphase.pair_count(h)).sum();
        assert_eq!(total, 2 * broadphase.pairs().len());
    }

    #[test]
    fn test_pair_filter() {
        let mut scene = Scene::new();
        let (_, ground) = scene.add(Body::new_static(), Shape::make_plane(Vec3::Z, 0.0));
        let (_, wall) = scene.add(
            Body::new_static(),
            Shape::make_sphere(Vec3::new(0.0, 0.0, 0.2), 0.5),
        );
        let (parent, ball) = scene.add(
            Body::from_translation(Vec3::new(0.0, 0.0, 0.3)),
            Shape::make_sphere(Vec3::ZERO, 0.5),
        );
        let mut child = Body::from_translation(Vec3::new(0.5, 0.0, 0.3));
        child.parent = Some(parent);
        let (_, arm) = scene.add(child, Shape::make_sphere(Vec3::ZERO, 0.5));

        let broadphase = scene.broadphase();
        let pairs = pair_set(&broadphase);
        // two static shapes never pair, nor a child with its parent
        assert!(!pairs.contains(&(ground, wall)));
        assert!(!pairs.contains(&(ball, arm)));
        assert!(pairs.contains(&(ground, ball)));
        assert!(pairs.contains(&(wall, arm)));
    }

    #[test]
    fn test_separated_pair_is_dropped() {
        let mut scene = Scene::new();
        let config = Config::default();
        let (_, a) = scene.add(
            Body::from_translation(Vec3::ZERO),
            Shape::make_sphere(Vec3::ZERO, 0.5),
        );
        let (body, b) = scene.add(
            Body::from_translation(Vec3::new(0.8, 0.0, 0.0)),
            Shape::make_sphere(Vec3::ZERO, 0.5),
        );
        let mut broadphase = scene.broadphase();
        assert_eq!(pair_set(&broadphase).len(), 1);
        assert_eq!(broadphase.pair_count(a), 1);

        scene
            .bodies
            .get_body_mut(body)
            .set_position(Vec3::new(3.0, 0.0, 0.0), &mut scene.shapes);
        broadphase.run(&scene.shapes, &mut scene.bodies, &config);
        assert!(broadphase.pairs().is_empty());
        assert_eq!(broadphase.pair_count(b), 0);
        assert_eq!(broadphase.query(&scene.shapes[b].bounds()), vec![b]);
    }
}
