//! Traversal order and junction grouping.

use petgraph::unionfind::UnionFind;
use sf_core::ElementId;
use sf_elements::ElementKind;
use std::collections::VecDeque;

use crate::network::Network;

impl Network {
    /// Breadth-first order starting from the inlet reservoirs.
    ///
    /// Elements unreachable from an inlet reservoir follow, each starting a new
    /// sweep in id order. The order fixes the positive-flow convention and is
    /// deterministic for a given network.
    pub fn topological_order(&self) -> Vec<ElementId> {
        let n = self.elements.len();
        let mut adjacency: Vec<Vec<ElementId>> = vec![Vec::new(); n];
        for c in &self.connections {
            let (a, b) = (c.from.index() as usize, c.to.index() as usize);
            if a < n && b < n {
                adjacency[a].push(c.to);
                adjacency[b].push(c.from);
            }
        }

        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let roots = self
            .elements
            .iter()
            .filter(|e| e.kind() == ElementKind::InletReservoir)
            .chain(self.elements.iter())
            .map(|e| e.id);

        for root in roots {
            if visited[root.index() as usize] {
                continue;
            }
            visited[root.index() as usize] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(id) = queue.pop_front() {
                order.push(id);
                for &next in &adjacency[id.index() as usize] {
                    if !visited[next.index() as usize] {
                        visited[next.index() as usize] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }

    /// Manifolds grouped by direct manifold-to-manifold links.
    ///
    /// Every manifold appears in exactly one group. Groups are ordered by their
    /// lowest id and list members in id order.
    pub fn junction_groups(&self) -> Vec<Vec<ElementId>> {
        let mut uf = UnionFind::<usize>::new(self.elements.len());
        for c in &self.connections {
            let (Some(a), Some(b)) = (self.element(c.from), self.element(c.to)) else {
                continue;
            };
            if a.kind() == ElementKind::Manifold && b.kind() == ElementKind::Manifold {
                uf.union(a.id.index() as usize, b.id.index() as usize);
            }
        }

        let mut groups: Vec<(usize, Vec<ElementId>)> = Vec::new();
        for e in self
            .elements
            .iter()
            .filter(|e| e.kind() == ElementKind::Manifold)
        {
            let root = uf.find(e.id.index() as usize);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(e.id),
                None => groups.push((root, vec![e.id])),
            }
        }
        groups.into_iter().map(|(_, members)| members).collect()
    }
}
