//! Fixed-capacity fragment dependency graph.
//!
//! Each fragment owns one `u128` adjacency row, so the graph never allocates
//! and a document declaring more than [`MAX_FRAGMENTS`] fragments is rejected
//! while it is being indexed.

pub(crate) const MAX_FRAGMENTS: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Debug)]
pub(crate) struct FragmentGraph {
    edges: [u128; MAX_FRAGMENTS],
    /// Fragments spread by at least one definition.
    referenced: u128,
    len: usize,
    marks: [Mark; MAX_FRAGMENTS],
}

impl Default for FragmentGraph {
    fn default() -> Self {
        Self {
            edges: [0; MAX_FRAGMENTS],
            referenced: 0,
            len: 0,
            marks: [Mark::Unvisited; MAX_FRAGMENTS],
        }
    }
}

fn bits(mut set: u128) -> impl Iterator<Item = usize> {
    std::iter::from_fn(move || {
        if set == 0 {
            return None;
        }
        let index = set.trailing_zeros() as usize;
        set &= set - 1;
        Some(index)
    })
}

impl FragmentGraph {
    pub fn reset(&mut self, len: usize) {
        debug_assert!(len <= MAX_FRAGMENTS);
        self.edges[..self.len].fill(0);
        self.referenced = 0;
        self.len = len;
    }

    /// Records that `from` (a fragment, or an operation when `None`) spreads
    /// fragment `to`.
    pub fn add_spread(&mut self, from: Option<usize>, to: usize) {
        if let Some(from) = from {
            self.edges[from] |= 1 << to;
        }
        self.referenced |= 1 << to;
    }

    pub fn first_unreferenced(&self) -> Option<usize> {
        (0..self.len).find(|&index| self.referenced & (1 << index) == 0)
    }

    /// Finds a spread cycle and returns it as a closed path, for example
    /// `[a, b, a]`.
    pub fn find_cycle(&mut self, path: &mut Vec<usize>) -> bool {
        self.marks[..self.len].fill(Mark::Unvisited);
        path.clear();
        for start in 0..self.len {
            if self.marks[start] == Mark::Unvisited && self.visit_cycle(start, path) {
                return true;
            }
        }
        false
    }

    fn visit_cycle(&mut self, node: usize, path: &mut Vec<usize>) -> bool {
        self.marks[node] = Mark::InProgress;
        path.push(node);
        for next in bits(self.edges[node]) {
            match self.marks[next] {
                Mark::InProgress => {
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    path.drain(..start);
                    path.push(next);
                    return true;
                }
                Mark::Unvisited => {
                    if self.visit_cycle(next, path) {
                        return true;
                    }
                }
                Mark::Done => {}
            }
        }
        self.marks[node] = Mark::Done;
        path.pop();
        false
    }

    /// Appends every fragment reachable from `roots` to `order`, dependencies
    /// before dependents. The graph must be acyclic.
    pub fn dependencies_first(&mut self, roots: u128, order: &mut Vec<usize>) {
        self.marks[..self.len].fill(Mark::Unvisited);
        order.clear();
        for root in bits(roots) {
            self.visit_order(root, order);
        }
    }

    fn visit_order(&mut self, node: usize, order: &mut Vec<usize>) {
        if self.marks[node] != Mark::Unvisited {
            return;
        }
        self.marks[node] = Mark::InProgress;
        for next in bits(self.edges[node]) {
            self.visit_order(next, order);
        }
        self.marks[node] = Mark::Done;
        order.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_path_is_closed() {
        let mut graph = FragmentGraph::default();
        graph.reset(2);
        graph.add_spread(Some(0), 1);
        graph.add_spread(Some(1), 0);
        let mut path = Vec::new();
        assert!(graph.find_cycle(&mut path));
        assert_eq!(path, vec![0, 1, 0]);
    }

    #[test]
    fn test_self_cycle() {
        let mut graph = FragmentGraph::default();
        graph.reset(3);
        graph.add_spread(None, 0);
        graph.add_spread(Some(0), 1);
        graph.add_spread(Some(1), 2);
        graph.add_spread(Some(2), 2);
        let mut path = Vec::new();
        assert!(graph.find_cycle(&mut path));
        assert_eq!(path, vec![2, 2]);
    }

    #[test]
    fn test_cycle_not_at_start() {
        let mut graph = FragmentGraph::default();
        graph.reset(3);
        graph.add_spread(Some(0), 1);
        graph.add_spread(Some(1), 2);
        graph.add_spread(Some(2), 1);
        let mut path = Vec::new();
        assert!(graph.find_cycle(&mut path));
        assert_eq!(path, vec![1, 2, 1]);
    }

    #[test]
    fn test_acyclic_order() {
        let mut graph = FragmentGraph::default();
        graph.reset(4);
        graph.add_spread(None, 0);
        graph.add_spread(Some(0), 1);
        graph.add_spread(Some(0), 2);
        graph.add_spread(Some(1), 2);
        graph.add_spread(None, 3);
        let mut path = Vec::new();
        assert!(!graph.find_cycle(&mut path));

        let mut order = Vec::new();
        graph.dependencies_first(1 << 0, &mut order);
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_unreferenced() {
        let mut graph = FragmentGraph::default();
        graph.reset(3);
        graph.add_spread(None, 0);
        graph.add_spread(Some(0), 2);
        assert_eq!(graph.first_unreferenced(), Some(1));
    }

    #[test]
    fn test_reset_clears_edges() {
        let mut graph = FragmentGraph::default();
        graph.reset(2);
        graph.add_spread(Some(0), 1);
        graph.add_spread(Some(1), 0);
        graph.reset(2);
        let mut path = Vec::new();
        assert!(!graph.find_cycle(&mut path));
        assert_eq!(graph.first_unreferenced(), Some(0));
    }
}
