use thiserror::Error;

/// Structural problems with a molecular graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Atom index {0} is out of range for a graph of {1} atoms")]
    AtomOutOfRange(usize, usize),
    #[error("Bond from atom {0} to itself")]
    SelfLoop(usize),
    #[error("Atoms {0} and {1} are already bonded")]
    DuplicateBond(usize, usize),
    #[error("Graph {graph} cannot be duplicated: {reason}")]
    Malformed { graph: String, reason: String },
}

/// Errors raised by the fixture SMILES reader.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SmilesError {
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Ring closure digit '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(char, usize),
    #[error("Unclosed ring closures {0:?}")]
    UnclosedRing(Vec<char>),
    #[error("Unclosed branch '('")]
    UnclosedBranch,
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Malformed bracket atom '[{0}]'")]
    BadBracketAtom(String),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures of chemical perception. These are recoverable: the graph keeps
/// whatever state perception reached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerceptionError {
    #[error("Atom {atom} ({symbol}) carries {valence} bond-order units, more than its maximum of {max}")]
    ValenceExceeded {
        atom: usize,
        symbol: &'static str,
        valence: u32,
        max: u32,
    },
    #[error("Ring {0:?} is flagged aromatic but cannot be kekulized")]
    InconsistentAromaticRing(Vec<usize>),
}

/// Failures inside the embedding/isomorphism engines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Graph {graph} is not a simple graph: {reason}")]
    MalformedInput { graph: String, reason: String },
    #[error("Engine produced a non-bijective correspondence: atom {0} is mapped twice")]
    NonBijective(usize),
}

/// The terminal failure of one matching task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Failed to duplicate input graph")]
    Duplication(#[from] GraphError),
    #[error("Chemistry engine failure")]
    Engine(#[from] EngineError),
    #[error("Input graph could not be normalized")]
    Normalization(#[from] PerceptionError),
}
