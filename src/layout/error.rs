use thiserror::Error;

/// Failure reported by a [`LayoutEngine`](super::LayoutEngine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("layout engine failed: {0}")]
    Failed(String),
    #[error("layout engine panicked: {0}")]
    Panicked(String),
    #[error("edge `{edge}` references node `{node}` absent from the layout request")]
    UnknownNode { edge: String, node: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("node id `{0}` appears more than once")]
    DuplicateNode(String),
    #[error("edge id `{0}` appears more than once")]
    DuplicateEdge(String),
    #[error("edge `{edge}` references unknown node `{node}`")]
    UnknownEdgeEndpoint { edge: String, node: String },
    #[error("parent references form a cycle through node `{0}`")]
    ParentCycle(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("layout result has no position for node `{0}`")]
    MissingPosition(String),
    #[error("node `{0}` is missing from the layout result")]
    MissingNode(String),
    #[error("edge `{0}` is missing from the layout result")]
    MissingEdge(String),
}

impl LayoutError {
    /// Input errors detected before the engine runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LayoutError::DuplicateNode(_)
                | LayoutError::DuplicateEdge(_)
                | LayoutError::UnknownEdgeEndpoint { .. }
                | LayoutError::ParentCycle(_)
        )
    }
}
