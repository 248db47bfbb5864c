//! Behavioural checks every `RecordStore` backend must pass.
//!
//! Each check takes a fresh, empty store. Several rely on the store handing out ids
//! sequentially from 1, which both bundled backends do.

use matpath_core::{
    attrs, path, AttrValue, Attributes, Cascade, Direction, Error, MaterializedPathTree, Node,
    NodeId, OrderBy, RecordStore,
};

use crate::faulty::FaultyStore;
use crate::fixture::{name_of, names, ordered_names, Hierarchy};

fn seeded<S: RecordStore>(store: S) -> (MaterializedPathTree<S>, Hierarchy) {
    let mut tree = MaterializedPathTree::new(store);
    let hierarchy = Hierarchy::seed(&mut tree).expect("seed reference hierarchy");
    (tree, hierarchy)
}

fn asc() -> OrderBy {
    OrderBy::path(Direction::Asc)
}

/// Adds "Employee 3 of company 3" as a transient node under the third boss.
fn hire_third_employee<S: RecordStore>(
    tree: &mut MaterializedPathTree<S>,
    hierarchy: &mut Hierarchy,
) -> Node {
    let mut boss = hierarchy.get(tree, "Boss of company 3");
    let mut employee = Node::new(attrs([
        ("name", "Employee 3 of company 3"),
        ("position", "Subordinate of Boss of company 3"),
    ]));
    tree.move_to_child_of(&mut employee, &mut boss, Cascade::Include)
        .expect("insert under boss");
    hierarchy.remember("Employee 3 of company 3", employee.require_id().unwrap());
    employee
}

pub fn roots_are_the_bosses_in_numeric_order<S: RecordStore>(store: S) {
    let (tree, _) = seeded(store);
    let roots = tree.roots(&asc()).unwrap();
    assert_eq!(
        ordered_names(&roots),
        vec!["Boss of company 1", "Boss of company 2", "Boss of company 3"]
    );
    let paths: Vec<_> = roots.iter().map(|n| n.path().unwrap().to_string()).collect();
    assert_eq!(paths, vec!["1", "6", "11"]);

    let first = tree.root(&asc()).unwrap().unwrap();
    assert_eq!(name_of(&first), "Boss of company 1");
}

pub fn roots_follow_store_ordering_for_other_columns<S: RecordStore>(store: S) {
    let (tree, _) = seeded(store);
    let by_name = tree
        .roots(&OrderBy::attribute("name", Direction::Desc))
        .unwrap();
    assert_eq!(
        ordered_names(&by_name),
        vec!["Boss of company 3", "Boss of company 2", "Boss of company 1"]
    );
    let by_id = tree.roots(&OrderBy::id(Direction::Desc)).unwrap();
    let ids: Vec<_> = by_id.iter().map(|n| n.id().unwrap().get()).collect();
    assert_eq!(ids, vec![11, 6, 1]);
}

pub fn attribute_ordering_ranks_value_types<S: RecordStore>(store: S) {
    let mut tree = MaterializedPathTree::new(store);
    let values = [
        Some(AttrValue::Bool(true)),
        Some(AttrValue::Integer(0)),
        Some(AttrValue::Text("a".into())),
        None,
        Some(AttrValue::Bool(false)),
        Some(AttrValue::Float(1.5)),
    ];
    let mut ids = Vec::new();
    for value in values {
        let mut attributes = Attributes::new();
        if let Some(value) = value {
            attributes.insert("k".into(), value);
        }
        ids.push(tree.create_root(attributes).unwrap().require_id().unwrap());
    }
    let [flag, zero, text, missing, off, float] = ids[..] else {
        panic!("expected six roots, got {ids:?}");
    };

    let asc: Vec<NodeId> = tree
        .roots(&OrderBy::attribute("k", Direction::Asc))
        .unwrap()
        .iter()
        .filter_map(Node::id)
        .collect();
    assert_eq!(asc, vec![missing, off, flag, zero, float, text]);

    let desc: Vec<NodeId> = tree
        .roots(&OrderBy::attribute("k", Direction::Desc))
        .unwrap()
        .iter()
        .filter_map(Node::id)
        .collect();
    assert_eq!(desc, vec![text, float, zero, flag, off, missing]);
}

pub fn create_root_uses_own_id_as_path<S: RecordStore>(store: S) {
    let mut tree = MaterializedPathTree::new(store);
    let node = tree.create_root(attrs([("name", "Solo")])).unwrap();
    let id = node.require_id().unwrap();
    assert_eq!(node.path(), Some(id.to_string().as_str()));
    assert!(tree.is_root(&node).unwrap());
    assert_eq!(tree.level(&node).unwrap(), 0);
    assert_eq!(tree.root_of(&node).unwrap(), node);
    assert_eq!(tree.parent(&node).unwrap(), None);

    let stored = tree.store().find_by_id(id).unwrap().unwrap();
    assert_eq!(stored.path(), node.path());
}

pub fn save_as_root_detaches_a_child<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let mut secretary = hierarchy.get(&tree, "Secretary 1 of company 1");
    tree.save_as_root(&mut secretary).unwrap();
    assert_eq!(secretary.path(), Some("3"));
    assert_eq!(tree.roots(&asc()).unwrap().len(), 4);
    let employee = hierarchy.get(&tree, "Employee 1 of company 1");
    assert_eq!(tree.children_count(&employee).unwrap(), 0);

    let mut fresh = Node::new(attrs([("name", "Newcomer")]));
    tree.save_as_root(&mut fresh).unwrap();
    assert!(!fresh.is_transient());
    assert_eq!(fresh.path(), Some(fresh.require_id().unwrap().to_string().as_str()));
}

pub fn transient_node_moves_under_parent<S: RecordStore>(store: S) {
    let (mut tree, mut hierarchy) = seeded(store);
    let employee = hire_third_employee(&mut tree, &mut hierarchy);
    let id = employee.require_id().unwrap();
    assert_eq!(employee.path(), Some(format!("11.{id}").as_str()));

    let boss = hierarchy.get(&tree, "Boss of company 3");
    assert_eq!(tree.children_count(&boss).unwrap(), 3);
    assert_eq!(
        names(&tree.children(&boss, &asc()).unwrap()),
        vec![
            "Employee 1 of company 3",
            "Employee 2 of company 3",
            "Employee 3 of company 3"
        ]
    );
}

pub fn first_child_counts_from_zero<S: RecordStore>(store: S) {
    let mut tree = MaterializedPathTree::new(store);
    let mut boss = tree.create_root(attrs([("name", "Boss")])).unwrap();
    assert_eq!(tree.children_count(&boss).unwrap(), 0);

    let mut employee = tree.create_root(attrs([("name", "Employee")])).unwrap();
    tree.move_to_child_of(&mut employee, &mut boss, Cascade::Include).unwrap();
    assert_eq!(tree.children_count(&boss).unwrap(), 1);
    let expected = format!("{}.{}", boss.path().unwrap(), employee.require_id().unwrap());
    assert_eq!(employee.path(), Some(expected.as_str()));
}

pub fn children_honour_direction<S: RecordStore>(store: S) {
    let (mut tree, mut hierarchy) = seeded(store);
    hire_third_employee(&mut tree, &mut hierarchy);
    let boss = hierarchy.get(&tree, "Boss of company 3");

    let desc = tree.children(&boss, &OrderBy::path(Direction::Desc)).unwrap();
    assert_eq!(
        ordered_names(&desc),
        vec![
            "Employee 3 of company 3",
            "Employee 2 of company 3",
            "Employee 1 of company 3"
        ]
    );
    let by_name = tree
        .children(&boss, &OrderBy::attribute("name", Direction::Asc))
        .unwrap();
    assert_eq!(
        ordered_names(&by_name),
        vec![
            "Employee 1 of company 3",
            "Employee 2 of company 3",
            "Employee 3 of company 3"
        ]
    );
}

pub fn descendants_cover_the_subtree_only<S: RecordStore>(store: S) {
    let (tree, hierarchy) = seeded(store);
    let boss = hierarchy.get(&tree, "Boss of company 1");
    let descendants = tree.descendants(&boss, &asc()).unwrap();
    assert_eq!(
        ordered_names(&descendants),
        vec![
            "Employee 1 of company 1",
            "Secretary 1 of company 1",
            "Employee 2 of company 1",
            "Secretary 2 of company 1"
        ]
    );

    let full = tree
        .full_set(&hierarchy.get(&tree, "Employee 1 of company 1"), &asc())
        .unwrap();
    assert_eq!(
        ordered_names(&full),
        vec!["Employee 1 of company 1", "Secretary 1 of company 1"]
    );
}

pub fn ancestors_run_from_the_root<S: RecordStore>(store: S) {
    let (tree, hierarchy) = seeded(store);
    let secretary = hierarchy.get(&tree, "Secretary 1 of company 1");
    assert_eq!(
        ordered_names(&tree.ancestors(&secretary).unwrap()),
        vec!["Boss of company 1", "Employee 1 of company 1"]
    );
    assert_eq!(
        ordered_names(&tree.self_and_ancestors(&secretary).unwrap()),
        vec![
            "Boss of company 1",
            "Employee 1 of company 1",
            "Secretary 1 of company 1"
        ]
    );
    let boss = hierarchy.get(&tree, "Boss of company 1");
    assert!(tree.ancestors(&boss).unwrap().is_empty());
}

pub fn parent_and_root_lookups<S: RecordStore>(store: S) {
    let (tree, hierarchy) = seeded(store);
    let secretary = hierarchy.get(&tree, "Secretary 2 of company 2");
    let parent = tree.parent(&secretary).unwrap().unwrap();
    assert_eq!(name_of(&parent), "Employee 2 of company 2");
    assert_eq!(
        name_of(&tree.root_of(&secretary).unwrap()),
        "Boss of company 2"
    );
    assert_eq!(tree.level(&secretary).unwrap(), 2);
    assert!(!tree.is_root(&secretary).unwrap());
    assert!(tree.is_child(&secretary).unwrap());

    let boss = hierarchy.get(&tree, "Boss of company 2");
    assert!(tree.is_root(&boss).unwrap());
    assert!(!tree.is_child(&boss).unwrap());
    assert_eq!(tree.parent(&boss).unwrap(), None);
}

pub fn siblings_share_a_parent<S: RecordStore>(store: S) {
    let (mut tree, mut hierarchy) = seeded(store);
    let secretary = hierarchy.get(&tree, "Secretary 1 of company 1");
    assert!(tree.siblings(&secretary, &asc()).unwrap().is_empty());
    assert_eq!(
        ordered_names(&tree.self_and_siblings(&secretary, &asc()).unwrap()),
        vec!["Secretary 1 of company 1"]
    );

    let employee = hire_third_employee(&mut tree, &mut hierarchy);
    assert_eq!(
        names(&tree.siblings(&employee, &asc()).unwrap()),
        vec!["Employee 1 of company 3", "Employee 2 of company 3"]
    );

    let boss = hierarchy.get(&tree, "Boss of company 1");
    assert!(matches!(
        tree.self_and_siblings(&boss, &asc()),
        Err(Error::NotFound(_))
    ));
}

pub fn sort_list_by_named_column<S: RecordStore>(store: S) {
    let (tree, hierarchy) = seeded(store);
    let boss = hierarchy.get(&tree, "Boss of company 1");
    let list = tree.full_set(&boss, &asc()).unwrap();
    let column = tree.config().path_column().to_string();

    let desc = tree.sort_list_by(&list, &column, Direction::Desc).unwrap();
    assert_eq!(
        ordered_names(&desc),
        vec![
            "Boss of company 1",
            "Employee 2 of company 1",
            "Secretary 2 of company 1",
            "Employee 1 of company 1",
            "Secretary 1 of company 1"
        ]
    );
    let by_name = tree.sort_list_by(&list, "name", Direction::Asc).unwrap();
    assert_eq!(name_of(&by_name[0]), "Boss of company 1");
    assert_eq!(name_of(&by_name[4]), "Secretary 2 of company 1");
}

pub fn cascading_move_rewrites_the_subtree<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let mut employee = hierarchy.get(&tree, "Employee 1 of company 1");
    let mut new_boss = hierarchy.get(&tree, "Boss of company 2");

    let report = tree
        .move_to_child_of(&mut employee, &mut new_boss, Cascade::Include)
        .unwrap();
    assert_eq!(report.old_path.as_deref(), Some("1.2"));
    assert_eq!(report.new_path, "6.2");
    assert_eq!(report.rewritten_descendants, 1);
    assert!(!report.left_dangling());
    assert_eq!(employee.path(), Some("6.2"));

    let secretary = hierarchy.get(&tree, "Secretary 1 of company 1");
    assert_eq!(secretary.path(), Some("6.2.3"));
    assert_eq!(tree.descendants(&new_boss, &asc()).unwrap().len(), 6);
    let old_boss = hierarchy.get(&tree, "Boss of company 1");
    assert_eq!(tree.descendants(&old_boss, &asc()).unwrap().len(), 2);
    assert_eq!(tree.children_count(&old_boss).unwrap(), 1);
    assert_eq!(tree.children_count(&new_boss).unwrap(), 3);
}

pub fn uncascaded_move_leaves_descendants_behind<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let mut employee = hierarchy.get(&tree, "Employee 1 of company 1");
    let mut new_boss = hierarchy.get(&tree, "Boss of company 2");

    let report = tree
        .move_to_child_of(&mut employee, &mut new_boss, Cascade::Exclude)
        .unwrap();
    assert_eq!(report.dangling_descendants, 1);
    assert_eq!(report.rewritten_descendants, 0);
    assert!(report.left_dangling());

    let secretary = hierarchy.get(&tree, "Secretary 1 of company 1");
    assert_eq!(secretary.path(), Some("1.2.3"));
    assert_eq!(tree.children_count(&employee).unwrap(), 0);

    let old_boss = hierarchy.get(&tree, "Boss of company 1");
    let virtual_tree = tree.build_tree(&old_boss).unwrap();
    assert_eq!(virtual_tree.len(), 3);
    assert_eq!(names(virtual_tree.orphans()), vec!["Secretary 1 of company 1"]);
}

pub fn moving_under_own_subtree_is_a_cycle<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let mut boss = hierarchy.get(&tree, "Boss of company 1");
    let mut secretary = hierarchy.get(&tree, "Secretary 1 of company 1");

    let err = tree
        .move_to_child_of(&mut boss, &mut secretary, Cascade::Include)
        .unwrap_err();
    match err {
        Error::Cycle { node, new_parent } => {
            assert_eq!(node, hierarchy.id("Boss of company 1"));
            assert_eq!(new_parent, hierarchy.id("Secretary 1 of company 1"));
        }
        other => panic!("expected a cycle, got {other:?}"),
    }

    let mut itself = hierarchy.get(&tree, "Employee 1 of company 1");
    let mut same = itself.clone();
    assert!(matches!(
        tree.move_to_child_of(&mut itself, &mut same, Cascade::Include),
        Err(Error::Cycle { .. })
    ));

    assert_eq!(hierarchy.get(&tree, "Boss of company 1").path(), Some("1"));
    assert_eq!(
        hierarchy.get(&tree, "Secretary 1 of company 1").path(),
        Some("1.2.3")
    );
    assert_eq!(boss.path(), Some("1"));
}

pub fn move_under_missing_parent_is_not_found<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let mut employee = hierarchy.get(&tree, "Employee 1 of company 1");
    let mut ghost = Node::from_parts(NodeId(999), Some("999".into()), Default::default());
    assert!(matches!(
        tree.move_to_child_of(&mut employee, &mut ghost, Cascade::Include),
        Err(Error::NotFound(_))
    ));
    assert_eq!(employee.path(), Some("1.2"));
}

pub fn failed_move_rolls_back_every_write<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(FaultyStore::new(store));
    let employee_id = hierarchy.id("Employee 1 of company 1");
    tree.store_mut().fail_updates_of(employee_id);

    let mut employee = hierarchy.get(&tree, "Employee 1 of company 1");
    let mut new_boss = hierarchy.get(&tree, "Boss of company 2");
    let err = tree
        .move_to_child_of(&mut employee, &mut new_boss, Cascade::Include)
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)), "got {err:?}");

    assert_eq!(employee.path(), Some("1.2"));
    assert_eq!(
        hierarchy.get(&tree, "Employee 1 of company 1").path(),
        Some("1.2")
    );
    assert_eq!(
        hierarchy.get(&tree, "Secretary 1 of company 1").path(),
        Some("1.2.3")
    );
    assert_eq!(tree.descendants(&new_boss, &asc()).unwrap().len(), 4);

    tree.store_mut().heal();
    tree.move_to_child_of(&mut employee, &mut new_boss, Cascade::Include)
        .unwrap();
    assert_eq!(
        hierarchy.get(&tree, "Secretary 1 of company 1").path(),
        Some("6.2.3")
    );
}

pub fn failed_commit_is_a_transaction_error<S: RecordStore>(store: S) {
    let mut tree = MaterializedPathTree::new(FaultyStore::new(store));
    tree.store_mut().fail_commits();
    let err = tree.create_root(attrs([("name", "Doomed")])).unwrap_err();
    assert!(matches!(err, Error::Transaction(_)), "got {err:?}");
    assert!(tree.roots(&asc()).unwrap().is_empty());
    assert_eq!(tree.store().inner().find_by_id(NodeId(1)).unwrap(), None);
}

pub fn destroy_descendants_keeps_the_node<S: RecordStore>(store: S) {
    let (mut tree, hierarchy) = seeded(store);
    let boss = hierarchy.get(&tree, "Boss of company 1");
    assert_eq!(tree.destroy_descendants(&boss).unwrap(), 4);
    assert!(tree.descendants(&boss, &asc()).unwrap().is_empty());
    assert_eq!(hierarchy.get(&tree, "Boss of company 1").path(), Some("1"));
    assert_eq!(tree.roots(&asc()).unwrap().len(), 3);
    let other = hierarchy.get(&tree, "Boss of company 2");
    assert_eq!(tree.descendants(&other, &asc()).unwrap().len(), 4);
}

pub fn destroy_descendants_respects_segment_boundaries<S: RecordStore>(store: S) {
    let mut tree = MaterializedPathTree::new(store);
    let mut nodes = Vec::new();
    for i in 1..=22 {
        nodes.push(tree.create_root(attrs([("name", format!("n{i}"))])).unwrap());
    }
    let mut top = nodes[0].clone();
    let mut short = nodes[1].clone();
    let mut long = nodes[21].clone();
    tree.move_to_child_of(&mut short, &mut top, Cascade::Include).unwrap();
    tree.move_to_child_of(&mut long, &mut top, Cascade::Include).unwrap();
    assert_eq!(short.path(), Some("1.2"));
    assert_eq!(long.path(), Some("1.22"));

    let mut under_short = Node::new(attrs([("name", "under short")]));
    tree.move_to_child_of(&mut under_short, &mut short, Cascade::Include)
        .unwrap();
    let mut under_long = Node::new(attrs([("name", "under long")]));
    tree.move_to_child_of(&mut under_long, &mut long, Cascade::Include)
        .unwrap();

    assert_eq!(
        names(&tree.children(&short, &asc()).unwrap()),
        vec!["under short"]
    );
    assert_eq!(tree.destroy_descendants(&short).unwrap(), 1);

    let store = tree.store();
    assert_eq!(store.find_by_id(under_short.require_id().unwrap()).unwrap(), None);
    assert!(store.find_by_id(under_long.require_id().unwrap()).unwrap().is_some());
    assert!(store.find_by_id(long.require_id().unwrap()).unwrap().is_some());
    assert_eq!(tree.descendants(&top, &asc()).unwrap().len(), 3);
}

pub fn build_tree_links_each_node_to_its_path_parent<S: RecordStore>(store: S) {
    let (tree, hierarchy) = seeded(store);
    let boss = hierarchy.get(&tree, "Boss of company 1");
    let virtual_tree = tree.build_tree(&boss).unwrap();
    assert_eq!(virtual_tree.len(), 5);
    assert!(virtual_tree.orphans().is_empty());
    assert_eq!(virtual_tree.children(virtual_tree.root()).len(), 2);

    for (id, node) in virtual_tree.iter() {
        let expected = path::parent_path(node.path().unwrap()).unwrap();
        let actual = virtual_tree
            .parent(id)
            .and_then(|p| virtual_tree.node(p))
            .map(|p| p.path().unwrap().to_string());
        assert_eq!(actual, expected, "parent of {}", name_of(node));
    }
}
