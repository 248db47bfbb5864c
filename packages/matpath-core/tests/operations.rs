use matpath_core::{
    attrs, sort_by_path, Cascade, Column, Direction, Error, MaterializedPathTree, MemoryStore,
    Node, NodeId, OrderBy, RecordStore, TreeConfig, VirtualTree,
};

fn tree() -> MaterializedPathTree<MemoryStore> {
    MaterializedPathTree::new(MemoryStore::default())
}

/// Write a row with an arbitrary path, bypassing the tree's own path bookkeeping.
fn raw_row(tree: &mut MaterializedPathTree<MemoryStore>, path: &str) -> Node {
    let created = tree.store_mut().create(attrs([("name", path)])).unwrap();
    let row = Node::from_parts(
        created.id().unwrap(),
        Some(path.to_string()),
        created.attributes.clone(),
    );
    tree.store_mut().update(&row).unwrap();
    row
}

#[test]
fn custom_path_column_resolves_as_path() {
    let config = TreeConfig::new("lineage").unwrap();
    let tree = MaterializedPathTree::with_config(MemoryStore::default(), config);
    assert_eq!(tree.column("lineage"), Column::Path);
    assert_eq!(tree.column("id"), Column::Id);
    assert_eq!(
        tree.column("path_string"),
        Column::Attribute("path_string".into())
    );
}

#[test]
fn config_rejects_unusable_columns() {
    assert!(matches!(TreeConfig::new("id"), Err(Error::InvalidConfig(_))));
    assert!(matches!(
        TreeConfig::new("path; DROP TABLE"),
        Err(Error::InvalidConfig(_))
    ));
    assert!(TreeConfig::new("").is_err());
}

#[test]
fn transient_nodes_have_no_position() {
    let mut tree = tree();
    let transient = Node::new(attrs([("name", "floating")]));
    assert!(matches!(
        tree.children(&transient, &OrderBy::default()),
        Err(Error::InvalidPath(_))
    ));
    assert!(matches!(
        tree.destroy_descendants(&transient),
        Err(Error::InvalidPath(_))
    ));

    let mut node = tree.create_root(attrs([("name", "a")])).unwrap();
    let mut parent = Node::new(attrs([("name", "unsaved parent")]));
    assert!(matches!(
        tree.move_to_child_of(&mut node, &mut parent, Cascade::Include),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn moving_a_fresh_node_reports_no_previous_path() {
    let mut tree = tree();
    let mut parent = tree.create_root(attrs([("name", "parent")])).unwrap();
    let mut child = Node::new(attrs([("name", "child")]));
    let report = tree
        .move_to_child_of(&mut child, &mut parent, Cascade::Exclude)
        .unwrap();
    assert_eq!(report.old_path, None);
    assert_eq!(report.new_path, "1.2");
    assert_eq!(report.dangling_descendants, 0);
    assert_eq!(child.path(), Some("1.2"));
    assert_eq!(tree.store().len(), 2);
}

#[test]
fn move_keeps_caller_attributes() {
    let mut tree = tree();
    let mut parent = tree.create_root(attrs([("name", "parent")])).unwrap();
    let mut node = tree.create_root(attrs([("name", "before")])).unwrap();
    node.attributes.insert("name".into(), "after".into());
    tree.move_to_child_of(&mut node, &mut parent, Cascade::Include)
        .unwrap();
    let stored = tree.store().find_by_id(node.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.attribute("name").and_then(|v| v.as_text()), Some("after"));
    assert_eq!(stored.path(), Some("1.2"));
}

#[test]
fn save_as_root_leaves_descendants_in_place() {
    let mut tree = tree();
    let mut top = tree.create_root(attrs([("name", "top")])).unwrap();
    let mut middle = Node::new(attrs([("name", "middle")]));
    tree.move_to_child_of(&mut middle, &mut top, Cascade::Include)
        .unwrap();
    let mut leaf = Node::new(attrs([("name", "leaf")]));
    tree.move_to_child_of(&mut leaf, &mut middle, Cascade::Include)
        .unwrap();
    assert_eq!(leaf.path(), Some("1.2.3"));

    tree.save_as_root(&mut middle).unwrap();
    assert_eq!(middle.path(), Some("2"));
    let stored_leaf = tree.store().find_by_id(NodeId(3)).unwrap().unwrap();
    assert_eq!(stored_leaf.path(), Some("1.2.3"));
    assert_eq!(tree.children_count(&middle).unwrap(), 0);
}

#[test]
fn malformed_stored_paths_surface_on_path_ordering() {
    let mut tree = tree();
    let top = tree.create_root(attrs([("name", "top")])).unwrap();
    raw_row(&mut tree, "1.x");

    assert!(matches!(
        tree.descendants(&top, &OrderBy::default()),
        Err(Error::InvalidPath(_))
    ));
    // Store-side ordering never parses the path.
    let by_id = tree.descendants(&top, &OrderBy::id(Direction::Asc)).unwrap();
    assert_eq!(by_id.len(), 1);
}

#[test]
fn missing_ancestors_are_not_found() {
    let mut tree = tree();
    let stray = raw_row(&mut tree, "99.1");
    assert!(matches!(tree.parent(&stray), Err(Error::NotFound(_))));
    assert!(matches!(tree.root_of(&stray), Err(Error::NotFound(_))));
    assert!(tree.ancestors(&stray).unwrap().is_empty());
    assert!(!tree.is_root(&stray).unwrap());
}

#[test]
fn is_child_checks_the_trailing_segment() {
    let mut tree = tree();
    let row = raw_row(&mut tree, "7.8");
    // The row's own id is 1, not 8.
    assert!(!tree.is_child(&row).unwrap());
}

#[test]
fn sort_by_path_leaves_input_alone_on_error() {
    let mut nodes = vec![
        Node::from_parts(NodeId(3), Some("1.3".into()), Default::default()),
        Node::from_parts(NodeId(4), Some("1..4".into()), Default::default()),
        Node::from_parts(NodeId(2), Some("1.2".into()), Default::default()),
    ];
    let before = nodes.clone();
    assert!(matches!(
        sort_by_path(&mut nodes, Direction::Asc),
        Err(Error::InvalidPath(_))
    ));
    assert_eq!(nodes, before);
}

#[test]
fn sort_list_by_uses_configured_column_name() {
    let config = TreeConfig::new("lineage").unwrap();
    let tree = MaterializedPathTree::with_config(MemoryStore::default(), config);
    let list = vec![
        Node::from_parts(NodeId(10), Some("1.10".into()), attrs([("rank", 1)])),
        Node::from_parts(NodeId(9), Some("1.9".into()), attrs([("rank", 2)])),
        Node::from_parts(NodeId(1), Some("1".into()), attrs([("rank", 3)])),
    ];
    let by_path = tree.sort_list_by(&list, "lineage", Direction::Asc).unwrap();
    let paths: Vec<_> = by_path.iter().map(|n| n.path().unwrap()).collect();
    assert_eq!(paths, vec!["1", "1.9", "1.10"]);

    let by_rank = tree.sort_list_by(&list, "rank", Direction::Desc).unwrap();
    let ids: Vec<_> = by_rank.iter().map(|n| n.id().unwrap().get()).collect();
    assert_eq!(ids, vec![1, 9, 10]);
}

#[test]
fn virtual_tree_refuses_unreachable_descendants() {
    let root = Node::from_parts(NodeId(1), Some("1".into()), Default::default());
    let lost = Node::from_parts(NodeId(5), Some("1.4.5".into()), Default::default());
    assert!(matches!(
        VirtualTree::from_descendants(root, vec![lost]),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn build_tree_of_a_leaf_is_just_the_leaf() {
    let mut tree = tree();
    let leaf = tree.create_root(attrs([("name", "leaf")])).unwrap();
    let virtual_tree = tree.build_tree(&leaf).unwrap();
    assert_eq!(virtual_tree.len(), 1);
    assert!(virtual_tree.children(virtual_tree.root()).is_empty());
    assert_eq!(virtual_tree.node(virtual_tree.root()), Some(&leaf));
}

#[test]
fn memory_transaction_survives_nested_use() {
    let mut store = MemoryStore::default();
    let result: matpath_core::Result<()> = store.with_transaction(|outer| {
        outer.create(attrs([("name", "kept")]))?;
        let inner: matpath_core::Result<()> = outer.with_transaction(|inner| {
            inner.create(attrs([("name", "dropped")]))?;
            Err(Error::Storage("inner failure".into()))
        });
        assert!(inner.is_err());
        Ok(())
    });
    result.unwrap();
    assert_eq!(store.len(), 1);
    assert!(!store.in_transaction());
}
