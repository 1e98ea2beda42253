//! Weighted union-find (disjoint-set) with path compression, used to cluster
//! issues that share target files.

use std::collections::HashMap;
use std::hash::Hash;

pub struct UnionFind<T> {
    parent: Vec<usize>,
    rank: Vec<u32>,
    index: HashMap<T, usize>,
    members: Vec<T>,
}

impl<T: Eq + Hash + Clone> UnionFind<T> {
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            rank: Vec::new(),
            index: HashMap::new(),
            members: Vec::new(),
        }
    }

    fn id_of(&mut self, item: &T) -> usize {
        if let Some(&id) = self.index.get(item) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        self.index.insert(item.clone(), id);
        self.members.push(item.clone());
        id
    }

    fn find(&mut self, id: usize) -> usize {
        if self.parent[id] != id {
            self.parent[id] = self.find(self.parent[id]);
        }
        self.parent[id]
    }

    pub fn union(&mut self, a: &T, b: &T) {
        let a = self.id_of(a);
        let b = self.id_of(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }

    /// Ensure `item` is tracked even if it never unions with anything.
    pub fn add(&mut self, item: &T) {
        self.id_of(item);
    }

    /// Every cluster with ≥ 1 member, grouped by root.
    pub fn clusters(&mut self) -> Vec<Vec<T>> {
        let mut groups: HashMap<usize, Vec<T>> = HashMap::new();
        for i in 0..self.members.len() {
            let root = self.find(i);
            groups.entry(root).or_default().push(self.members[i].clone());
        }
        groups.into_values().collect()
    }
}

impl<T: Eq + Hash + Clone> Default for UnionFind<T> {
    fn default() -> Self {
        Self::new()
    }
}
