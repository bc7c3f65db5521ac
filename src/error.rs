//! Error types for the BDD engine
//!
//! Errors are organized by source and operation. Each error source has its
//! own enum with specific variants, and operations have wrapper enums that
//! combine only the errors they can produce.

use std::fmt;

use crate::types::{DiagramKind, VarId};

// ============================================================================
// Source-Level Error Enums
// ============================================================================

/// An operation is not implemented for the manager's diagram variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantError {
    /// The operation that was requested
    pub operation: &'static str,
    /// The manager's variant
    pub kind: DiagramKind,
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operation '{}' is not supported for {} managers",
            self.operation, self.kind
        )
    }
}

impl std::error::Error for VariantError {}

/// A caller-supplied argument does not denote anything in this manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// No variable with the given name exists
    UnknownVariable {
        /// The name that was looked up
        name: String,
    },
    /// No formula with the given name exists
    FormulaNotFound {
        /// The name that was looked up
        name: String,
    },
    /// An index is outside the table it indexes
    IndexOutOfRange {
        /// The index that was requested
        index: usize,
        /// Number of entries in the table
        len: usize,
    },
    /// Two variables are not adjacent in the ordering
    NotAdjacent {
        /// The topmore variable
        low: VarId,
        /// The variable expected to sit directly below it
        high: VarId,
    },
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::UnknownVariable { name } => {
                write!(f, "Unknown variable '{}'", name)
            }
            ArgumentError::FormulaNotFound { name } => {
                write!(f, "Formula '{}' not found", name)
            }
            ArgumentError::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range (table holds {} entries)", index, len)
            }
            ArgumentError::NotAdjacent { low, high } => {
                write!(
                    f,
                    "Variables {} and {} are not adjacent in the ordering",
                    low, high
                )
            }
        }
    }
}

impl std::error::Error for ArgumentError {}

/// A usage rule of the engine was violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The constant formulas in slots 0 and 1 cannot be deleted
    ConstantFormula {
        /// The slot that was addressed
        index: usize,
    },
    /// The constant variable cannot be renamed
    ConstantVariable,
    /// The requested variable name is already taken
    NameTaken {
        /// The conflicting name
        name: String,
    },
    /// A local-info scratchpad is active, so no node may be created or
    /// collected until it is released
    ScratchpadActive,
    /// A scratchpad already exists; only one may be active at a time
    ScratchpadExists,
    /// The managers passed to a cross-manager operation are the same
    SameManager,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::ConstantFormula { index } => {
                write!(f, "Formula slot {} holds a constant and cannot be deleted", index)
            }
            UsageError::ConstantVariable => {
                write!(f, "The constant variable cannot be renamed")
            }
            UsageError::NameTaken { name } => {
                write!(f, "Name '{}' is already in use", name)
            }
            UsageError::ScratchpadActive => {
                write!(f, "A local-info scratchpad is active; release it first")
            }
            UsageError::ScratchpadExists => {
                write!(f, "A local-info scratchpad already exists for this manager")
            }
            UsageError::SameManager => {
                write!(f, "Source and destination manager must differ")
            }
        }
    }
}

impl std::error::Error for UsageError {}

/// The engine ran out of representable nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityError {
    /// Number of node slots already allocated
    pub allocated: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node identifier space exhausted after {} slots",
            self.allocated
        )
    }
}

impl std::error::Error for CapacityError {}

// ============================================================================
// Operation-Level Error Enums
// ============================================================================

/// Errors that can occur while creating a node.
///
/// Returned by `BddManager::foa_node` and the operations built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Usage rule violated
    Usage(UsageError),
    /// Out of node identifiers
    Capacity(CapacityError),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Usage(e) => write!(f, "{}", e),
            NodeError::Capacity(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Usage(e) => Some(e),
            NodeError::Capacity(e) => Some(e),
        }
    }
}

impl From<UsageError> for NodeError {
    fn from(err: UsageError) -> Self {
        NodeError::Usage(err)
    }
}

impl From<CapacityError> for NodeError {
    fn from(err: CapacityError) -> Self {
        NodeError::Capacity(err)
    }
}

/// Errors that can occur while manipulating the formula registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    /// A caller-supplied argument was invalid
    Argument(ArgumentError),
    /// Usage rule violated
    Usage(UsageError),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Argument(e) => write!(f, "{}", e),
            FormulaError::Usage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FormulaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormulaError::Argument(e) => Some(e),
            FormulaError::Usage(e) => Some(e),
        }
    }
}

impl From<ArgumentError> for FormulaError {
    fn from(err: ArgumentError) -> Self {
        FormulaError::Argument(err)
    }
}

impl From<UsageError> for FormulaError {
    fn from(err: UsageError) -> Self {
        FormulaError::Usage(err)
    }
}

/// Errors that can occur while reordering variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    /// Reordering is not available for this variant
    Variant(VariantError),
    /// A caller-supplied argument was invalid
    Argument(ArgumentError),
    /// Usage rule violated
    Usage(UsageError),
    /// Node creation failed during the rewrite
    Node(NodeError),
}

impl fmt::Display for ReorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderError::Variant(e) => write!(f, "{}", e),
            ReorderError::Argument(e) => write!(f, "{}", e),
            ReorderError::Usage(e) => write!(f, "{}", e),
            ReorderError::Node(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReorderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReorderError::Variant(e) => Some(e),
            ReorderError::Argument(e) => Some(e),
            ReorderError::Usage(e) => Some(e),
            ReorderError::Node(e) => Some(e),
        }
    }
}

impl From<VariantError> for ReorderError {
    fn from(err: VariantError) -> Self {
        ReorderError::Variant(err)
    }
}

impl From<ArgumentError> for ReorderError {
    fn from(err: ArgumentError) -> Self {
        ReorderError::Argument(err)
    }
}

impl From<UsageError> for ReorderError {
    fn from(err: UsageError) -> Self {
        ReorderError::Usage(err)
    }
}

impl From<NodeError> for ReorderError {
    fn from(err: NodeError) -> Self {
        ReorderError::Node(err)
    }
}

impl From<CopyError> for ReorderError {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::Variant(e) => ReorderError::Variant(e),
            CopyError::Argument(e) => ReorderError::Argument(e),
            CopyError::Usage(e) => ReorderError::Usage(e),
            CopyError::Node(e) => ReorderError::Node(e),
        }
    }
}

/// Errors that can occur while copying or converting between managers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    /// The conversion is not available for this pair of variants
    Variant(VariantError),
    /// A caller-supplied argument was invalid
    Argument(ArgumentError),
    /// Usage rule violated
    Usage(UsageError),
    /// Node creation failed in the destination manager
    Node(NodeError),
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::Variant(e) => write!(f, "{}", e),
            CopyError::Argument(e) => write!(f, "{}", e),
            CopyError::Usage(e) => write!(f, "{}", e),
            CopyError::Node(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CopyError::Variant(e) => Some(e),
            CopyError::Argument(e) => Some(e),
            CopyError::Usage(e) => Some(e),
            CopyError::Node(e) => Some(e),
        }
    }
}

impl From<VariantError> for CopyError {
    fn from(err: VariantError) -> Self {
        CopyError::Variant(err)
    }
}

impl From<ArgumentError> for CopyError {
    fn from(err: ArgumentError) -> Self {
        CopyError::Argument(err)
    }
}

impl From<UsageError> for CopyError {
    fn from(err: UsageError) -> Self {
        CopyError::Usage(err)
    }
}

impl From<NodeError> for CopyError {
    fn from(err: NodeError) -> Self {
        CopyError::Node(err)
    }
}
