use bayes_core::NodeId;

/// Converts a [`NodeId`] into its slot within the arena.
pub(crate) fn node_index(id: NodeId) -> usize {
    id.as_raw() as usize
}

/// Creates a [`NodeId`] from an arena slot.
pub(crate) fn make_node(index: usize) -> NodeId {
    NodeId::from_raw(index as u64)
}
