//! Flow Engine - The dataflow graph engine for FlowCanvas
//!
//! This crate implements the core of an interactive visual data-analysis
//! tool: a directed graph of processing nodes connected by typed ports,
//! through which data packages and selection state propagate as the user
//! edits the diagram. It provides:
//!
//! - Typed ports with arity limits and dirty-flag tracking
//! - Validated edges (type compatibility, arity, cycle rejection)
//! - A deterministic, single-pass topological propagation scheduler with
//!   per-node failure isolation
//! - Chain-composed node serialization and all-or-nothing diagram loading
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! `Graph` owns the authoritative node and edge registries; all mutation
//! goes through it and is validated before it is applied. Node kinds
//! implement `NodeBehavior` and are instantiated through the open
//! `NodeRegistry` when a `Diagram` snapshot loads. Collaborators (rendering,
//! interaction) observe the engine through `EventSink`.
//!
//! The execution model is single-threaded and cooperative: update routines
//! run to completion between scheduler steps, so no package is ever read
//! while being written.
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{Graph, PortRef};
//! use flow_engine::nodes::{DataSource, RangeFilter};
//!
//! let mut graph = Graph::new();
//! graph.add_node("source-1", Box::new(DataSource::new().with_dataset(dataset)))?;
//! graph.add_node("filter-1", Box::new(RangeFilter::new().with_column(0)))?;
//! graph.connect(PortRef::new("source-1", "out"), PortRef::new("filter-1", "in"))?;
//! graph.touch("source-1")?;
//! graph.propagate(&["source-1".to_string()]);
//! ```

pub mod builder;
pub mod connectivity;
pub mod data;
pub mod diagram;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod package;
pub mod port;
pub mod propagation;
pub mod registry;
pub mod testing;
pub mod types;
pub mod undo;

// Re-export key types
pub use builder::GraphBuilder;
pub use connectivity::{check_connectivity, Connectivity, ConnectivityViolation};
pub use data::{Column, ColumnType, Dataset};
pub use diagram::{Diagram, EdgeSave};
pub use error::{FlowError, Result};
pub use events::{EventSink, FlowEvent, NullEventSink, VecEventSink};
pub use graph::{Edge, Graph};
pub use node::{Node, NodeBehavior, SerializationChain, UpdateContext};
pub use package::{Package, VisualProperties};
pub use port::{Port, PortDirection};
pub use propagation::{FailedUpdate, PropagationReport};
pub use registry::{NodeMetadata, NodeRegistry};
pub use types::{EdgeId, NodeCategory, NodeId, PortArity, PortId, PortRef, PortSpec, PortType};
pub use undo::UndoStack;
