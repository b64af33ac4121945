// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for the view priority list.

#[cfg(test)]
mod tests {
    use crate::intent::priority::{node_key, KvTable, PriorityList, PriorityListReader, HEAD_KEY};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn order(kv: &BTreeMap<String, String>) -> Vec<String> {
        PriorityListReader::new(kv).order().unwrap()
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_empty_list() {
        let kv = BTreeMap::new();
        assert!(order(&kv).is_empty());
    }

    #[test]
    fn test_insert_at_head_three_times_reverses() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        list.insert(1, "B", true).unwrap();
        list.insert(1, "C", true).unwrap();

        assert_eq!(order(&kv), ids(&["C", "B", "A"]));
    }

    #[test]
    fn test_insert_appends_and_middle() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        list.insert(2, "C", true).unwrap();
        list.insert(2, "B", true).unwrap();

        assert_eq!(order(&kv), ids(&["A", "B", "C"]));
        assert_eq!(kv.get(&node_key("C")).map(String::as_str), Some(""));
    }

    #[test]
    fn test_insert_position_zero_clamps_to_head() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        let used = list.insert(0, "B", true).unwrap();

        assert_eq!(used, 1);
        assert_eq!(order(&kv), ids(&["B", "A"]));
    }

    #[test]
    fn test_insert_past_end_clamps_to_tail() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        list.insert(2, "B", true).unwrap();
        let used = list.insert(2 + 5, "C", true).unwrap();

        assert_eq!(used, 3);
        assert_eq!(order(&kv), ids(&["A", "B", "C"]));
        assert_eq!(kv.get(&node_key("C")).map(String::as_str), Some(""));
    }

    #[test]
    fn test_insert_duplicate_new_node_rejected() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        let err = list.insert(1, "A", true).unwrap_err();
        assert!(err.to_string().contains("already in the priority list"));
        assert_eq!(order(&kv), ids(&["A"]));
    }

    #[test]
    fn test_reinsert_requires_existing_entry() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        let err = list.insert(1, "ghost", false).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        for (pos, id) in ["A", "B", "C", "D"].iter().enumerate() {
            list.insert(pos + 1, id, true).unwrap();
        }

        assert!(list.remove("A").unwrap());
        assert_eq!(list.order().unwrap(), ids(&["B", "C", "D"]));
        assert!(list.remove("C").unwrap());
        assert_eq!(list.order().unwrap(), ids(&["B", "D"]));
        assert!(list.remove("D").unwrap());
        assert_eq!(list.order().unwrap(), ids(&["B"]));
        assert!(!kv.contains_key(&node_key("A")));
        assert!(!kv.contains_key(&node_key("D")));
    }

    #[test]
    fn test_remove_last_clears_sentinel() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        assert!(list.remove("A").unwrap());
        assert!(kv.is_empty());
    }

    #[test]
    fn test_remove_absent_is_silent_noop() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        let before = kv.clone();

        let mut list = PriorityList::new(&mut kv);
        assert!(!list.remove("Z").unwrap());
        assert_eq!(kv, before);
    }

    #[test]
    fn test_move_to_front_and_back() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        for (pos, id) in ["A", "B", "C"].iter().enumerate() {
            list.insert(pos + 1, id, true).unwrap();
        }

        list.move_to(1, "C").unwrap();
        assert_eq!(list.order().unwrap(), ids(&["C", "A", "B"]));
        list.move_to(99, "C").unwrap();
        assert_eq!(list.order().unwrap(), ids(&["A", "B", "C"]));
        list.move_to(2, "A").unwrap();
        assert_eq!(list.order().unwrap(), ids(&["B", "A", "C"]));
    }

    #[test]
    fn test_move_absent_view_not_found() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        assert!(list.move_to(1, "Z").unwrap_err().is_not_found());
    }

    #[test]
    fn test_position_of() {
        let mut kv = BTreeMap::new();
        let mut list = PriorityList::new(&mut kv);
        list.insert(1, "A", true).unwrap();
        list.insert(2, "B", true).unwrap();

        let reader = PriorityListReader::new(&kv);
        assert_eq!(reader.position_of("B").unwrap(), Some(2));
        assert_eq!(reader.position_of("Z").unwrap(), None);
    }

    #[test]
    fn test_cycle_detected() {
        let mut kv: BTreeMap<String, String> = BTreeMap::new();
        kv.put(HEAD_KEY, "A");
        kv.put(&node_key("A"), "B");
        kv.put(&node_key("B"), "A");

        let err = PriorityListReader::new(&kv).order().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_dangling_pointer_detected() {
        let mut kv: BTreeMap<String, String> = BTreeMap::new();
        kv.put(HEAD_KEY, "A");
        kv.put(&node_key("A"), "B");

        let err = PriorityListReader::new(&kv).order().unwrap_err();
        assert!(err.to_string().contains("'B'"));
    }

    #[test]
    fn test_random_operations_match_vec_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut kv = BTreeMap::new();
        let mut model: Vec<String> = Vec::new();
        let pool: Vec<String> = (0..12).map(|i| format!("v{i}")).collect();

        for _ in 0..2000 {
            let id = &pool[rng.gen_range(0..pool.len())];
            let position = rng.gen_range(0..model.len() + 4);
            let mut list = PriorityList::new(&mut kv);

            match rng.gen_range(0..3) {
                0 if !model.contains(id) => {
                    let used = list.insert(position, id, true).unwrap();
                    model.insert(used - 1, id.clone());
                }
                1 => {
                    let removed = list.remove(id).unwrap();
                    assert_eq!(removed, model.contains(id));
                    model.retain(|m| m != id);
                }
                2 if model.contains(id) => {
                    model.retain(|m| m != id);
                    let used = list.move_to(position, id).unwrap();
                    model.insert(used - 1, id.clone());
                }
                _ => {}
            }

            let walked = PriorityListReader::new(&kv).order().unwrap();
            assert_eq!(walked, model);
            // one entry per linked view plus the sentinel (absent when empty)
            let expected_keys = model.len() + usize::from(!model.is_empty());
            assert_eq!(kv.len(), expected_keys);
        }
    }
}
