use std::collections::BTreeMap;

use matpath_core::{attrs, Cascade, MaterializedPathTree, Node, NodeId, RecordStore, Result};

pub const COMPANIES: u32 = 3;
pub const EMPLOYEES_PER_BOSS: u32 = 2;

/// The reference hierarchy: three companies, each a boss with two employees, each employee
/// with one secretary. Nodes are looked up by their `name` attribute.
pub struct Hierarchy {
    ids: BTreeMap<String, NodeId>,
}

impl Hierarchy {
    /// Populate the tree the same way an application would: every node starts as a root and
    /// is then moved under its superior.
    pub fn seed<S: RecordStore>(tree: &mut MaterializedPathTree<S>) -> Result<Self> {
        let mut ids = BTreeMap::new();
        for i in 1..=COMPANIES {
            let boss_name = format!("Boss of company {i}");
            let mut boss = tree.create_root(attrs([
                ("name", boss_name.clone()),
                ("position", "Boss".to_string()),
            ]))?;
            ids.insert(boss_name.clone(), boss.require_id()?);
            for j in 1..=EMPLOYEES_PER_BOSS {
                let employee_name = format!("Employee {j} of company {i}");
                let mut employee = tree.create_root(attrs([
                    ("name", employee_name.clone()),
                    ("position", format!("Subordinate of {boss_name}")),
                ]))?;
                tree.move_to_child_of(&mut employee, &mut boss, Cascade::Include)?;
                ids.insert(employee_name.clone(), employee.require_id()?);

                let secretary_name = format!("Secretary {j} of company {i}");
                let mut secretary = tree.create_root(attrs([
                    ("name", secretary_name.clone()),
                    ("position", format!("Secretary of {employee_name}")),
                ]))?;
                tree.move_to_child_of(&mut secretary, &mut employee, Cascade::Include)?;
                ids.insert(secretary_name, secretary.require_id()?);
            }
        }
        Ok(Self { ids })
    }

    pub fn id(&self, name: &str) -> NodeId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("no fixture node named `{name}`"))
    }

    /// Fresh copy of a fixture node from the store.
    pub fn get<S: RecordStore>(&self, tree: &MaterializedPathTree<S>, name: &str) -> Node {
        tree.store()
            .find_by_id(self.id(name))
            .expect("store lookup")
            .unwrap_or_else(|| panic!("`{name}` is missing from the store"))
    }

    pub fn remember(&mut self, name: impl Into<String>, id: NodeId) {
        self.ids.insert(name.into(), id);
    }
}

/// Names of the given nodes, sorted, for order-insensitive assertions.
pub fn names(nodes: &[Node]) -> Vec<String> {
    let mut out: Vec<String> = nodes.iter().map(name_of).collect();
    out.sort();
    out
}

/// Names in the order given.
pub fn ordered_names(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(name_of).collect()
}

pub fn name_of(node: &Node) -> String {
    node.attribute("name")
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}
