//! Reconciliation of a local collection against the remote one.
//!
//! [`reconcile`] is a pure function: it reads both collections and returns
//! the ordered batch converging local to remote. Updates and deletes follow
//! local order; inserts follow in remote order once local is exhausted.

use indexmap::IndexMap;

use super::types::Operation;
use crate::model::Entity;

/// Remote collection keyed by id, in arrival order.
pub type RemoteIndex<E> = IndexMap<String, E>;

/// Build the remote index from a fetched sequence.
///
/// When an id repeats, the earlier entity is dropped entirely: the index
/// is what it would be had only the later one been sent.
#[must_use]
pub fn index_remote<E: Entity>(fetched: Vec<E>) -> RemoteIndex<E> {
    let mut index = RemoteIndex::with_capacity(fetched.len());
    for entity in fetched {
        let id = entity.id().to_string();
        if index.shift_remove(&id).is_some() {
            tracing::debug!(kind = %E::KIND, id = %id, "Duplicate remote id, keeping later entity");
        }
        index.insert(id, entity);
    }
    index
}

/// Compute the batch that makes `local` equal to `remote`.
///
/// Value-equal entities produce no operation. The result never holds more
/// than `local.len() + remote.len()` operations.
#[must_use]
pub fn reconcile<E: Entity>(local: &[E], remote: RemoteIndex<E>) -> Vec<Operation<E>> {
    // None marks an entry already matched by a local entity
    let mut remaining: IndexMap<String, Option<E>> =
        remote.into_iter().map(|(id, e)| (id, Some(e))).collect();
    let mut ops = Vec::new();

    for entity in local {
        let id = entity.id();
        match remaining.get_mut(id).and_then(Option::take) {
            Some(remote_entity) if remote_entity == *entity => {}
            Some(remote_entity) => ops.push(Operation::Update {
                id: id.to_string(),
                entity: remote_entity,
            }),
            None => ops.push(Operation::Delete { id: id.to_string() }),
        }
    }

    ops.extend(remaining.into_values().flatten().map(Operation::Insert));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectCategory};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, HashSet};

    fn project(id: &str, name: &str) -> Project {
        Project::new(id, name, ProjectCategory::Software)
    }

    fn index(entities: &[Project]) -> RemoteIndex<Project> {
        index_remote(entities.to_vec())
    }

    // ── Examples ─────────────────────────────────────────────

    #[test]
    fn test_empty_local_inserts_in_remote_order() {
        let p1 = project("p1", "Rover");
        let p2 = project("p2", "Drone");

        let ops = reconcile(&[], index(&[p1.clone(), p2.clone()]));

        assert_eq!(ops, vec![Operation::Insert(p1), Operation::Insert(p2)]);
    }

    #[test]
    fn test_changed_value_is_updated() {
        let v1 = project("p1", "Rover");
        let v2 = project("p1", "Rover Mk II");

        let ops = reconcile(&[v1], index(&[v2.clone()]));

        assert_eq!(
            ops,
            vec![Operation::Update {
                id: "p1".into(),
                entity: v2
            }]
        );
    }

    #[test]
    fn test_offset_only_change_is_updated() {
        use crate::model::Event;
        use chrono::DateTime;

        let at = |s| Some(DateTime::parse_from_rfc3339(s).unwrap());
        let local = Event::new("e1", "Demo Day").with_schedule(at("2024-05-02T09:30:00+02:00"), None);
        let remote = Event::new("e1", "Demo Day").with_schedule(at("2024-05-02T10:30:00+03:00"), None);

        let ops = reconcile(&[local], index_remote(vec![remote.clone()]));

        assert_eq!(
            ops,
            vec![Operation::Update {
                id: "e1".into(),
                entity: remote
            }]
        );
    }

    #[test]
    fn test_empty_remote_deletes_in_local_order() {
        let ops = reconcile(&[project("p1", "Rover"), project("p2", "Drone")], index(&[]));

        assert_eq!(
            ops,
            vec![
                Operation::Delete { id: "p1".into() },
                Operation::Delete { id: "p2".into() },
            ]
        );
    }

    #[test]
    fn test_unchanged_kept_and_missing_deleted() {
        let p1 = project("p1", "Rover");
        let p2 = project("p2", "Drone");

        let ops = reconcile(&[p1.clone(), p2], index(&[p1]));

        assert_eq!(ops, vec![Operation::Delete { id: "p2".into() }]);
    }

    #[test]
    fn test_both_empty() {
        assert!(reconcile::<Project>(&[], index(&[])).is_empty());
    }

    #[test]
    fn test_mixed_batch_order() {
        let local = [project("a", "1"), project("b", "1"), project("c", "1")];
        let remote = index(&[project("d", "1"), project("c", "2"), project("a", "1")]);

        let ops = reconcile(&local, remote);

        assert_eq!(
            ops,
            vec![
                Operation::Delete { id: "b".into() },
                Operation::Update {
                    id: "c".into(),
                    entity: project("c", "2")
                },
                Operation::Insert(project("d", "1")),
            ]
        );
    }

    #[test]
    fn test_duplicate_remote_id_keeps_later() {
        let remote = index(&[project("a", "old"), project("b", "x"), project("a", "new")]);

        let ids: Vec<_> = remote.keys().cloned().collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(remote["a"].name, "new");

        let ops = reconcile(&[project("a", "old")], remote);
        assert_eq!(
            ops,
            vec![
                Operation::Update {
                    id: "a".into(),
                    entity: project("a", "new")
                },
                Operation::Insert(project("b", "x")),
            ]
        );
    }

    // ── Properties ───────────────────────────────────────────

    /// Local rows have unique ids (primary key).
    fn local_strategy() -> impl Strategy<Value = Vec<Project>> {
        prop::collection::btree_map("[a-f]", "[xy]", 0..6).prop_map(|rows: BTreeMap<_, _>| {
            rows.into_iter()
                .map(|(id, name)| project(&id, &name))
                .collect()
        })
    }

    /// Remote payloads may repeat ids.
    fn remote_strategy() -> impl Strategy<Value = Vec<Project>> {
        prop::collection::vec(("[a-f]", "[xy]"), 0..8).prop_map(|rows| {
            rows.into_iter()
                .map(|(id, name)| project(&id, &name))
                .collect()
        })
    }

    /// Apply a batch the way the store does, in memory.
    fn apply(mut local: Vec<Project>, ops: Vec<Operation<Project>>) -> Vec<Project> {
        for op in ops {
            match op {
                Operation::Insert(entity) => local.push(entity),
                Operation::Update { id, entity } => {
                    if let Some(slot) = local.iter_mut().find(|e| e.id == id) {
                        *slot = entity;
                    }
                }
                Operation::Delete { id } => local.retain(|e| e.id != id),
            }
        }
        local
    }

    fn ids_of(entities: &[Project]) -> HashSet<String> {
        entities.iter().map(|e| e.id.clone()).collect()
    }

    proptest! {
        #[test]
        fn every_id_handled_once(local in local_strategy(), fetched in remote_strategy()) {
            let remote = index_remote(fetched);
            let remote_ids: HashSet<String> = remote.keys().cloned().collect();
            let local_ids = ids_of(&local);
            let bound = local.len() + remote.len();

            let ops = reconcile(&local, remote.clone());
            prop_assert!(ops.len() <= bound);

            let mut seen = HashSet::new();
            for op in &ops {
                prop_assert!(seen.insert(op.id().to_string()), "id {} handled twice", op.id());
                match op {
                    Operation::Insert(e) => {
                        prop_assert!(remote_ids.contains(&e.id) && !local_ids.contains(&e.id));
                    }
                    Operation::Delete { id } => {
                        prop_assert!(local_ids.contains(id) && !remote_ids.contains(id));
                    }
                    Operation::Update { id, entity } => {
                        prop_assert!(local_ids.contains(id) && remote_ids.contains(id));
                        prop_assert_eq!(entity, &remote[id.as_str()]);
                    }
                }
            }

            for id in remote_ids.symmetric_difference(&local_ids) {
                prop_assert!(seen.contains(id), "id {} only on one side but no op", id);
            }
        }

        #[test]
        fn equal_values_produce_no_op(local in local_strategy(), fetched in remote_strategy()) {
            let remote = index_remote(fetched);
            let unchanged: HashSet<&str> = local
                .iter()
                .filter(|e| remote.get(&e.id) == Some(*e))
                .map(|e| e.id.as_str())
                .collect();

            let ops = reconcile(&local, remote.clone());
            prop_assert!(ops.iter().all(|op| !unchanged.contains(op.id())));
        }

        #[test]
        fn reapplying_is_a_no_op(local in local_strategy(), fetched in remote_strategy()) {
            let ops = reconcile(&local, index_remote(fetched.clone()));
            let converged = apply(local, ops);

            prop_assert!(reconcile(&converged, index_remote(fetched)).is_empty());
        }

        #[test]
        fn duplicate_ids_behave_as_later_only(local in local_strategy(), fetched in remote_strategy()) {
            let later_only: Vec<Project> = fetched
                .iter()
                .enumerate()
                .filter(|(i, e)| !fetched[i + 1..].iter().any(|later| later.id == e.id))
                .map(|(_, e)| e.clone())
                .collect();

            prop_assert_eq!(
                reconcile(&local, index_remote(fetched)),
                reconcile(&local, index_remote(later_only))
            );
        }
    }
}
