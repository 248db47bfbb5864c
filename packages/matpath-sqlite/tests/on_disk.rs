use matpath_core::{attrs, Cascade, Direction, Node, OrderBy, RecordStore, TreeConfig};
use matpath_sqlite::{open_tree, SqliteStore};
use matpath_test_support::{ordered_names, Hierarchy};

#[test]
fn tree_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("org.db");
    let file = file.to_str().unwrap();

    {
        let mut tree = open_tree(file, TreeConfig::default()).unwrap();
        Hierarchy::seed(&mut tree).unwrap();
    }

    let tree = open_tree(file, TreeConfig::default()).unwrap();
    let roots = tree.roots(&OrderBy::path(Direction::Asc)).unwrap();
    assert_eq!(roots.len(), 3);
    let boss = &roots[0];
    assert_eq!(
        ordered_names(&tree.descendants(boss, &OrderBy::default()).unwrap()),
        vec![
            "Employee 1 of company 1",
            "Secretary 1 of company 1",
            "Employee 2 of company 1",
            "Secretary 2 of company 1"
        ]
    );
}

#[test]
fn custom_path_column_is_used_for_storage() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("custom.db");
    let file = file.to_str().unwrap();
    let config = TreeConfig::new("lineage").unwrap();

    let mut tree = open_tree(file, config.clone()).unwrap();
    let mut parent = tree.create_root(attrs([("name", "parent")])).unwrap();
    let mut child = Node::new(attrs([("name", "child")]));
    tree.move_to_child_of(&mut child, &mut parent, Cascade::Include)
        .unwrap();

    let stored: String = tree
        .store()
        .connection()
        .query_row("SELECT lineage FROM nodes WHERE id = 2", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, "1.2");

    let by_column = tree
        .sort_list_by(
            &tree.full_set(&parent, &OrderBy::default()).unwrap(),
            "lineage",
            Direction::Desc,
        )
        .unwrap();
    assert_eq!(ordered_names(&by_column), vec!["parent", "child"]);
}

#[test]
fn store_is_usable_without_a_tree() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    let node = store.create(attrs([("name", "bare")])).unwrap();
    let found = store.find_by_ids(&[node.id().unwrap()]).unwrap();
    assert_eq!(found, vec![node]);
}
