//! Structural matching of observed leaf paths against every template at
//! once.
//!
//! Each known path carries a bitmask of the templates that require it, so a
//! request is matched in one pass over its paths. Templates may group
//! selections with `max N { ... }`; every direct option of such a group is a
//! member scope, and selecting anything inside a member scope charges the
//! group once.

use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::path::PathHash;
use crate::scan::TemplatePaths;

/// Growable bit set over template indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    words: Vec<u64>,
}

impl Mask {
    pub fn insert(&mut self, bit: usize) {
        let word = bit / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (bit % 64);
    }

    #[must_use]
    pub fn contains(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .is_some_and(|word| word & (1 << (bit % 64)) != 0)
    }

    pub fn union_with(&mut self, other: &Mask) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, other) in self.words.iter_mut().zip(&other.words) {
            *word |= other;
        }
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(index * 64 + bit)
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
struct PathEntry {
    templates: Mask,
    /// `(template, scope)` for every template owning the path.
    owners: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, Copy)]
struct ScopeEntry {
    parent: Option<u32>,
    combinator: Option<u32>,
    /// Leaves owned directly by the scope.
    required: u32,
}

#[derive(Debug, Clone, Copy)]
struct CombinatorEntry {
    template: u32,
    limit: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    paths: FxHashMap<PathHash, PathEntry>,
    scopes: Vec<ScopeEntry>,
    combinators: Vec<CombinatorEntry>,
    /// Global scope range of each template; the first scope is its root.
    templates: Vec<Range<u32>>,
}

/// Per-request counters of a [`Matcher`].
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    observed: Mask,
    rejected: Mask,
    template_counts: Vec<u32>,
    scope_counts: Vec<u32>,
    active: Vec<bool>,
    charged: Vec<u32>,
    candidates: Vec<usize>,
}

fn index(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl Matcher {
    /// Registers a template and returns its index.
    pub fn register(&mut self, paths: &TemplatePaths<'_>) -> usize {
        let template = index(self.templates.len());
        let scope_base = index(self.scopes.len());
        let combinator_base = index(self.combinators.len());

        self.scopes.extend(paths.scopes.iter().map(|scope| ScopeEntry {
            parent: scope.parent.map(|parent| scope_base + parent),
            combinator: scope.combinator.map(|combinator| combinator_base + combinator),
            required: 0,
        }));
        self.combinators
            .extend(paths.combinators.iter().map(|&limit| CombinatorEntry { template, limit }));

        for leaf in &paths.leaves {
            let scope = scope_base + leaf.scope;
            self.scopes[scope as usize].required += 1;
            let entry = self.paths.entry(leaf.hash).or_default();
            entry.templates.insert(template as usize);
            entry.owners.push((template, scope));
        }

        self.templates
            .push(scope_base..index(self.scopes.len()));
        template as usize
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: PathHash) -> bool {
        self.paths.contains_key(&path)
    }

    /// Templates, in registration order, whose structure is exactly the set
    /// of `observed` distinct leaf paths.
    pub fn find<'s>(&self, observed: &[PathHash], state: &'s mut MatchState) -> &'s [usize] {
        self.reset(state);

        for path in observed {
            let Some(entry) = self.paths.get(path) else {
                tracing::trace!(path, "path unknown to every template");
                state.candidates.clear();
                return &state.candidates;
            };
            state.observed.union_with(&entry.templates);
            for &(template, scope) in &entry.owners {
                state.template_counts[template as usize] += 1;
                state.scope_counts[scope as usize] += 1;
                self.activate(scope, state);
            }
        }

        let distinct = index(observed.len());
        for template in state.observed.iter() {
            if state.rejected.contains(template) {
                continue;
            }
            if state.template_counts[template] < distinct {
                tracing::trace!(template, "request selects paths outside the template");
                state.rejected.insert(template);
                continue;
            }
            let scopes = self.templates[template].clone();
            let root = scopes.start;
            let incomplete = scopes.map(|scope| scope as usize).any(|scope| {
                (scope == root as usize || state.active[scope])
                    && state.scope_counts[scope] < self.scopes[scope].required
            });
            if incomplete {
                tracing::trace!(template, "request omits paths of the template");
                state.rejected.insert(template);
            }
        }

        for template in state.observed.iter() {
            if !state.rejected.contains(template) {
                state.candidates.push(template);
            }
        }
        &state.candidates
    }

    fn reset(&self, state: &mut MatchState) {
        state.observed.clear();
        state.rejected.clear();
        state.candidates.clear();
        state.template_counts.clear();
        state.template_counts.resize(self.templates.len(), 0);
        state.scope_counts.clear();
        state.scope_counts.resize(self.scopes.len(), 0);
        state.active.clear();
        state.active.resize(self.scopes.len(), false);
        state.charged.clear();
        state.charged.resize(self.combinators.len(), 0);
    }

    /// Activates `scope` and every scope enclosing it, charging the
    /// combinator of each scope on its first activation.
    fn activate(&self, scope: u32, state: &mut MatchState) {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let scope = scope as usize;
            if state.active[scope] {
                return;
            }
            state.active[scope] = true;
            let entry = self.scopes[scope];
            if let Some(combinator) = entry.combinator {
                let combinator = combinator as usize;
                state.charged[combinator] += 1;
                let group = self.combinators[combinator];
                if state.charged[combinator] > group.limit {
                    tracing::trace!(
                        template = group.template,
                        limit = group.limit,
                        "max set exceeded"
                    );
                    state.rejected.insert(group.template as usize);
                }
            }
            current = entry.parent;
        }
    }
}
