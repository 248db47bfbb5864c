use matpath_core::{
    config::validate_identifier, error::Error, Attributes, Column, Direction, Node, NodeId,
    OrderBy, PathRewrite, Predicate, RecordStore, TreeConfig,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TABLE: &str = "nodes";

/// SQLite-backed `RecordStore`. One row per node; paths are plain `TEXT`.
pub struct SqliteStore {
    conn: Connection,
    path_column: String,
    depth: usize,
}

impl SqliteStore {
    pub fn new_in_memory() -> matpath_core::Result<Self> {
        Self::in_memory_with(&TreeConfig::default())
    }

    pub fn in_memory_with(config: &TreeConfig) -> matpath_core::Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        Self::from_connection(conn, config)
    }

    pub fn open(path: &str, config: &TreeConfig) -> matpath_core::Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        Self::from_connection(conn, config)
    }

    /// Adopt an existing connection, creating the table if it is missing.
    pub fn from_connection(conn: Connection, config: &TreeConfig) -> matpath_core::Result<Self> {
        let mut store = Self {
            conn,
            path_column: config.path_column().to_string(),
            depth: 0,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_schema(&mut self) -> matpath_core::Result<()> {
        let col = &self.path_column;
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {TABLE} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    {col} TEXT,
                    attributes TEXT NOT NULL DEFAULT '{{}}'
                );
                CREATE INDEX IF NOT EXISTS idx_{TABLE}_{col} ON {TABLE}({col});"
            ))
            .map_err(|e| Error::Storage(e.to_string()))?;
        tracing::debug!(table = TABLE, path_column = %col, "sqlite schema ready");
        Ok(())
    }

    fn select_sql(&self) -> String {
        format!("SELECT id, {}, attributes FROM {TABLE}", self.path_column)
    }

    /// `WHERE` body and its positional parameters.
    fn where_clause(&self, predicate: &Predicate) -> matpath_core::Result<(String, Vec<Value>)> {
        let col = &self.path_column;
        Ok(match predicate {
            Predicate::Roots => (
                format!("{col} IS NOT NULL AND instr({col}, '.') = 0"),
                Vec::new(),
            ),
            Predicate::DirectChild(prefix) => {
                (format!("{col} = ? || id"), vec![Value::Text(prefix.clone())])
            }
            Predicate::PathLike(pattern) => {
                (format!("{col} LIKE ?"), vec![Value::Text(pattern.clone())])
            }
            Predicate::IdIn(ids) if ids.is_empty() => ("0".to_string(), Vec::new()),
            Predicate::IdIn(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let values = ids
                    .iter()
                    .map(|id| id_to_sql(*id).map(Value::Integer))
                    .collect::<matpath_core::Result<Vec<_>>>()?;
                (format!("id IN ({placeholders})"), values)
            }
        })
    }

    fn order_clause(&self, order: Option<&OrderBy>) -> matpath_core::Result<String> {
        let Some(order) = order else {
            return Ok("ORDER BY id ASC".to_string());
        };
        let dir = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        let key = match &order.column {
            Column::Path => self.path_column.clone(),
            Column::Id => "id".to_string(),
            Column::Attribute(name) => {
                validate_identifier(name)?;
                // null < bool < number < text, matching `AttrValue::cmp_natural`.
                let rank = format!(
                    "CASE json_type(attributes, '$.{name}') \
                     WHEN 'true' THEN 1 WHEN 'false' THEN 1 \
                     WHEN 'integer' THEN 2 WHEN 'real' THEN 2 \
                     WHEN 'text' THEN 3 ELSE 0 END"
                );
                let value = format!("json_extract(attributes, '$.{name}') COLLATE NOCASE");
                return Ok(format!("ORDER BY {rank} {dir}, {value} {dir}, id ASC"));
            }
        };
        Ok(format!("ORDER BY {key} {dir}, id ASC"))
    }

    fn query_nodes(&self, sql: &str, values: Vec<Value>) -> matpath_core::Result<Vec<Node>> {
        tracing::trace!(%sql, "sqlite query");
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), row_to_parts)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut nodes = Vec::new();
        for row in rows {
            let parts = row.map_err(|e| Error::Storage(e.to_string()))?;
            nodes.push(parts_to_node(parts)?);
        }
        Ok(nodes)
    }

    fn savepoint_name(depth: usize) -> String {
        format!("matpath_tx_{depth}")
    }
}

impl RecordStore for SqliteStore {
    fn create(&mut self, attributes: Attributes) -> matpath_core::Result<Node> {
        let json = serde_json::to_string(&attributes).map_err(|e| Error::Storage(e.to_string()))?;
        self.conn
            .execute(
                &format!("INSERT INTO {TABLE} (attributes) VALUES (?1)"),
                params![json],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        let id = id_from_sql(self.conn.last_insert_rowid())?;
        Ok(Node::from_parts(id, None, attributes))
    }

    fn find_by_id(&self, id: NodeId) -> matpath_core::Result<Option<Node>> {
        let sql = format!("{} WHERE id = ?1", self.select_sql());
        let parts = self
            .conn
            .query_row(&sql, params![id_to_sql(id)?], row_to_parts)
            .optional()
            .map_err(|e| Error::Storage(e.to_string()))?;
        parts.map(parts_to_node).transpose()
    }

    fn find_where(
        &self,
        predicate: &Predicate,
        order: Option<&OrderBy>,
    ) -> matpath_core::Result<Vec<Node>> {
        let (clause, values) = self.where_clause(predicate)?;
        let sql = format!(
            "{} WHERE {clause} {}",
            self.select_sql(),
            self.order_clause(order)?
        );
        self.query_nodes(&sql, values)
    }

    fn count_where(&self, predicate: &Predicate) -> matpath_core::Result<u64> {
        let (clause, values) = self.where_clause(predicate)?;
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {TABLE} WHERE {clause}"),
                params_from_iter(values),
                |row| row.get(0),
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(count as u64)
    }

    fn update(&mut self, node: &Node) -> matpath_core::Result<()> {
        let id = node.require_id()?;
        let json =
            serde_json::to_string(&node.attributes).map_err(|e| Error::Storage(e.to_string()))?;
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {TABLE} SET {} = ?1, attributes = ?2 WHERE id = ?3",
                    self.path_column
                ),
                params![node.path(), json, id_to_sql(id)?],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        if changed == 0 {
            return Err(Error::NotFound(format!("node {id}")));
        }
        Ok(())
    }

    fn bulk_update(
        &mut self,
        predicate: &Predicate,
        rewrite: &PathRewrite,
    ) -> matpath_core::Result<u64> {
        let col = &self.path_column;
        let (clause, values) = self.where_clause(predicate)?;
        let prefix_len = rewrite.old_prefix.chars().count() as i64;

        // Every matching row must start with the old prefix before anything is rewritten.
        let mut check_values = values.clone();
        check_values.push(Value::Integer(prefix_len));
        check_values.push(Value::Text(rewrite.old_prefix.clone()));
        let mismatched: i64 = self
            .conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {TABLE} WHERE ({clause})
                     AND ({col} IS NULL OR substr({col}, 1, ?) != ?)"
                ),
                params_from_iter(check_values),
                |row| row.get(0),
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        if mismatched > 0 {
            return Err(Error::InvalidPath(format!(
                "{mismatched} rows do not start with `{}`",
                rewrite.old_prefix
            )));
        }

        let mut update_values = vec![
            Value::Text(rewrite.new_prefix.clone()),
            Value::Integer(prefix_len + 1),
        ];
        update_values.extend(values);
        let changed = self
            .conn
            .execute(
                &format!("UPDATE {TABLE} SET {col} = ? || substr({col}, ?) WHERE {clause}"),
                params_from_iter(update_values),
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        tracing::trace!(
            old_prefix = %rewrite.old_prefix,
            new_prefix = %rewrite.new_prefix,
            changed,
            "bulk path rewrite"
        );
        Ok(changed as u64)
    }

    fn delete_where(&mut self, predicate: &Predicate) -> matpath_core::Result<u64> {
        let (clause, values) = self.where_clause(predicate)?;
        let changed = self
            .conn
            .execute(
                &format!("DELETE FROM {TABLE} WHERE {clause}"),
                params_from_iter(values),
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(changed as u64)
    }

    fn begin(&mut self) -> matpath_core::Result<()> {
        self.conn
            .execute_batch(&format!("SAVEPOINT {}", Self::savepoint_name(self.depth)))
            .map_err(|e| Error::Transaction(e.to_string()))?;
        self.depth += 1;
        Ok(())
    }

    fn commit(&mut self) -> matpath_core::Result<()> {
        let depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| Error::Transaction("commit without an open transaction".into()))?;
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {}", Self::savepoint_name(depth)))
            .map_err(|e| Error::Transaction(e.to_string()))?;
        self.depth = depth;
        Ok(())
    }

    fn rollback(&mut self) -> matpath_core::Result<()> {
        let depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| Error::Transaction("rollback without an open transaction".into()))?;
        let name = Self::savepoint_name(depth);
        self.conn
            .execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};"
            ))
            .map_err(|e| Error::Transaction(e.to_string()))?;
        self.depth = depth;
        Ok(())
    }
}

type RowParts = (i64, Option<String>, String);

fn row_to_parts(row: &Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn parts_to_node((id, path, attributes): RowParts) -> matpath_core::Result<Node> {
    let attributes: Attributes =
        serde_json::from_str(&attributes).map_err(|e| Error::Storage(e.to_string()))?;
    Ok(Node::from_parts(id_from_sql(id)?, path, attributes))
}

fn id_to_sql(id: NodeId) -> matpath_core::Result<i64> {
    i64::try_from(id.get()).map_err(|_| Error::Storage(format!("id {id} overflows INTEGER")))
}

fn id_from_sql(id: i64) -> matpath_core::Result<NodeId> {
    u64::try_from(id)
        .ok()
        .filter(|v| *v > 0)
        .map(NodeId)
        .ok_or_else(|| Error::Storage(format!("row id {id} is not a valid node id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matpath_core::{attrs, AttrValue};

    fn node_with_path(store: &mut SqliteStore, path: &str) -> Node {
        let created = store.create(attrs([("name", path)])).unwrap();
        let node = Node::from_parts(
            created.id().unwrap(),
            Some(path.to_string()),
            created.attributes.clone(),
        );
        store.update(&node).unwrap();
        node
    }

    #[test]
    fn create_and_find_round_trip() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut attributes = attrs([("name", "a")]);
        attributes.insert("rank".into(), AttrValue::Integer(3));
        let created = store.create(attributes).unwrap();
        assert_eq!(created.id(), Some(NodeId(1)));
        assert_eq!(created.path(), None);

        let found = store.find_by_id(NodeId(1)).unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(store.find_by_id(NodeId(2)).unwrap(), None);
    }

    #[test]
    fn direct_child_and_like_predicates() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        node_with_path(&mut store, "1");
        node_with_path(&mut store, "1.2");
        node_with_path(&mut store, "1.2.3");
        // Row 4 pretends to sit at 1.22.
        let row = store.create(Attributes::new()).unwrap();
        store
            .update(&Node::from_parts(row.id().unwrap(), Some("1.22".into()), Attributes::new()))
            .unwrap();

        let children = store
            .find_where(&Predicate::DirectChild("1.".into()), None)
            .unwrap();
        let paths: Vec<_> = children.iter().map(|n| n.path().unwrap()).collect();
        assert_eq!(paths, vec!["1.2"]);

        assert_eq!(store.count_where(&Predicate::PathLike("1.2.%".into())).unwrap(), 1);
        assert_eq!(store.count_where(&Predicate::PathLike("1.%".into())).unwrap(), 3);
        assert_eq!(store.count_where(&Predicate::Roots).unwrap(), 1);
        assert_eq!(store.count_where(&Predicate::IdIn(Vec::new())).unwrap(), 0);
    }

    #[test]
    fn bulk_update_rewrites_prefix_only() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        node_with_path(&mut store, "1");
        node_with_path(&mut store, "1.2");
        node_with_path(&mut store, "1.2.3");
        let rewrite = PathRewrite {
            old_prefix: "1.2".into(),
            new_prefix: "9.2".into(),
        };
        let changed = store
            .bulk_update(&Predicate::PathLike("1.2.%".into()), &rewrite)
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(
            store.find_by_id(NodeId(3)).unwrap().unwrap().path(),
            Some("9.2.3")
        );

        let bad = PathRewrite {
            old_prefix: "7".into(),
            new_prefix: "8".into(),
        };
        assert!(matches!(
            store.bulk_update(&Predicate::Roots, &bad),
            Err(Error::InvalidPath(_))
        ));
        assert_eq!(store.find_by_id(NodeId(1)).unwrap().unwrap().path(), Some("1"));
    }

    #[test]
    fn savepoints_nest() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.begin().unwrap();
        store.create(Attributes::new()).unwrap();
        store.begin().unwrap();
        store.create(Attributes::new()).unwrap();
        store.rollback().unwrap();
        store.commit().unwrap();
        assert_eq!(store.count_where(&Predicate::IdIn(vec![NodeId(1), NodeId(2)])).unwrap(), 1);
        assert!(matches!(store.commit(), Err(Error::Transaction(_))));
    }

    #[test]
    fn attribute_ordering_rejects_injection() {
        let store = SqliteStore::new_in_memory().unwrap();
        let order = OrderBy::attribute("name') --", Direction::Asc);
        assert!(matches!(
            store.find_where(&Predicate::Roots, Some(&order)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn attribute_ordering_ranks_booleans_below_numbers() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut ids = Vec::new();
        for value in [AttrValue::Bool(true), AttrValue::Integer(0)] {
            let mut attributes = Attributes::new();
            attributes.insert("k".into(), value);
            let id = store.create(attributes.clone()).unwrap().id().unwrap();
            store
                .update(&Node::from_parts(id, Some(id.to_string()), attributes))
                .unwrap();
            ids.push(id);
        }

        let order = OrderBy::attribute("k", Direction::Asc);
        let sorted: Vec<_> = store
            .find_where(&Predicate::Roots, Some(&order))
            .unwrap()
            .iter()
            .filter_map(Node::id)
            .collect();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn update_of_missing_row_is_not_found() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let ghost = Node::from_parts(NodeId(5), Some("5".into()), Attributes::new());
        assert!(matches!(store.update(&ghost), Err(Error::NotFound(_))));
    }
}
