use matpath_core::{
    Attributes, Error, Node, NodeId, OrderBy, PathRewrite, Predicate, RecordStore, Result,
};

/// Wraps a store and injects failures: `update` of one chosen row, or every commit. Lets tests
/// break a mutation halfway through its transaction.
pub struct FaultyStore<S> {
    inner: S,
    fail_update_of: Option<NodeId>,
    fail_commits: bool,
}

impl<S: RecordStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_update_of: None,
            fail_commits: false,
        }
    }

    pub fn fail_updates_of(&mut self, id: NodeId) {
        self.fail_update_of = Some(id);
    }

    pub fn fail_commits(&mut self) {
        self.fail_commits = true;
    }

    pub fn heal(&mut self) {
        self.fail_update_of = None;
        self.fail_commits = false;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RecordStore> RecordStore for FaultyStore<S> {
    fn create(&mut self, attributes: Attributes) -> Result<Node> {
        self.inner.create(attributes)
    }

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        self.inner.find_by_id(id)
    }

    fn find_where(&self, predicate: &Predicate, order: Option<&OrderBy>) -> Result<Vec<Node>> {
        self.inner.find_where(predicate, order)
    }

    fn count_where(&self, predicate: &Predicate) -> Result<u64> {
        self.inner.count_where(predicate)
    }

    fn update(&mut self, node: &Node) -> Result<()> {
        if self.fail_update_of.is_some() && node.id() == self.fail_update_of {
            return Err(Error::Storage(format!(
                "injected failure updating {}",
                node.require_id()?
            )));
        }
        self.inner.update(node)
    }

    fn bulk_update(&mut self, predicate: &Predicate, rewrite: &PathRewrite) -> Result<u64> {
        self.inner.bulk_update(predicate, rewrite)
    }

    fn delete_where(&mut self, predicate: &Predicate) -> Result<u64> {
        self.inner.delete_where(predicate)
    }

    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        if self.fail_commits {
            return Err(Error::Storage("injected commit failure".into()));
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }
}
