//! Role hierarchy: transitive closure of role inclusions and the
//! composition table closed under sub-roles.
//!
//! With `r ⊑ s` and `s ∘ t ⊑ u`, a link over `r` followed by a link over
//! `t` must also yield a `u` link. Rather than walking the hierarchy on
//! every pair of links during saturation, the composition table is keyed
//! by every pair of sub-roles up front.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::interner::RoleId;

/// Closed role inclusions and compositions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleHierarchy {
    /// For role R, all strictly more general roles (transitive).
    generalizations: HashMap<RoleId, Vec<RoleId>>,
    /// For role R, all strictly more specific roles (transitive).
    specializations: HashMap<RoleId, Vec<RoleId>>,
    /// `(first, second)` → roles implied by a `first` link followed by a
    /// `second` link, closed under sub-roles of both positions.
    compositions: HashMap<(RoleId, RoleId), Vec<RoleId>>,
}

impl RoleHierarchy {
    /// Build from direct inclusion edges `(sub, sup)` and composition rules
    /// `(first, second, sup)`.
    pub fn build(
        inclusions: &[(RoleId, RoleId)],
        compositions: &[(RoleId, RoleId, RoleId)],
    ) -> Self {
        let mut parents_of: HashMap<RoleId, Vec<RoleId>> = HashMap::new();
        let mut children_of: HashMap<RoleId, Vec<RoleId>> = HashMap::new();
        for &(sub, sup) in inclusions {
            parents_of.entry(sub).or_default().push(sup);
            children_of.entry(sup).or_default().push(sub);
        }

        let all_roles: HashSet<RoleId> = parents_of
            .keys()
            .chain(children_of.keys())
            .copied()
            .collect();

        let mut generalizations = HashMap::new();
        let mut specializations = HashMap::new();
        for &role in &all_roles {
            let gens = reachable(role, &parents_of);
            if !gens.is_empty() {
                generalizations.insert(role, gens);
            }
            let specs = reachable(role, &children_of);
            if !specs.is_empty() {
                specializations.insert(role, specs);
            }
        }

        let mut hierarchy = Self {
            generalizations,
            specializations,
            compositions: HashMap::new(),
        };

        let mut closed: HashMap<(RoleId, RoleId), Vec<RoleId>> = HashMap::new();
        for &(first, second, sup) in compositions {
            for a in hierarchy.with_specializations(first) {
                for b in hierarchy.with_specializations(second) {
                    closed.entry((a, b)).or_default().push(sup);
                }
            }
        }
        for targets in closed.values_mut() {
            targets.sort_unstable();
            targets.dedup();
        }
        hierarchy.compositions = closed;
        hierarchy
    }

    /// All roles strictly more general than `role`.
    pub fn generalizations_of(&self, role: RoleId) -> &[RoleId] {
        self.generalizations
            .get(&role)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All roles strictly more specific than `role`.
    pub fn specializations_of(&self, role: RoleId) -> &[RoleId] {
        self.specializations
            .get(&role)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn with_specializations(&self, role: RoleId) -> Vec<RoleId> {
        let mut roles = vec![role];
        roles.extend_from_slice(self.specializations_of(role));
        roles
    }

    /// `sub ⊑* sup` (reflexive).
    pub fn is_subrole(&self, sub: RoleId, sup: RoleId) -> bool {
        sub == sup || self.generalizations_of(sub).contains(&sup)
    }

    /// Roles implied by a `first` link followed by a `second` link.
    pub fn compose(&self, first: RoleId, second: RoleId) -> &[RoleId] {
        if self.compositions.is_empty() {
            return &[];
        }
        self.compositions
            .get(&(first, second))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// BFS over `edges` from `start`, excluding `start` unless it lies on a cycle.
fn reachable(start: RoleId, edges: &HashMap<RoleId, Vec<RoleId>>) -> Vec<RoleId> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        if let Some(next) = edges.get(&current) {
            for &role in next {
                if visited.insert(role) {
                    if role != start {
                        found.push(role);
                    }
                    queue.push_back(role);
                }
            }
        }
    }
    found.sort_unstable();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(i: usize) -> RoleId {
        RoleId::from_index(i)
    }

    #[test]
    fn inclusions_are_transitive() {
        let hierarchy = RoleHierarchy::build(&[(r(0), r(1)), (r(1), r(2))], &[]);
        assert!(hierarchy.is_subrole(r(0), r(2)));
        assert!(hierarchy.is_subrole(r(0), r(0)));
        assert!(!hierarchy.is_subrole(r(2), r(0)));
        assert_eq!(hierarchy.specializations_of(r(2)), &[r(0), r(1)]);
    }

    #[test]
    fn cycles_terminate() {
        let hierarchy = RoleHierarchy::build(&[(r(0), r(1)), (r(1), r(0))], &[]);
        assert!(hierarchy.is_subrole(r(0), r(1)));
        assert!(hierarchy.is_subrole(r(1), r(0)));
        assert_eq!(hierarchy.generalizations_of(r(0)), &[r(1)]);
    }

    #[test]
    fn compositions_apply_to_subroles() {
        // r3 ⊑ r0, r0 ∘ r1 ⊑ r2
        let hierarchy = RoleHierarchy::build(&[(r(3), r(0))], &[(r(0), r(1), r(2))]);
        assert_eq!(hierarchy.compose(r(0), r(1)), &[r(2)]);
        assert_eq!(hierarchy.compose(r(3), r(1)), &[r(2)]);
        assert!(hierarchy.compose(r(1), r(0)).is_empty());
    }
}
