// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph core for the Weave circuit editor.
//!
//! This crate provides the model and engine behind the editor:
//! - Typed values and sockets
//! - Elements (logic gates, constants, converters, math)
//! - A registry of element types for the palette and for loading
//! - Packages: graphs of nodes and links that nest as elements
//! - A pass-based engine that tolerates feedback loops
//!
//! ## Architecture
//!
//! A [`Package`] owns its [`Node`]s and [`Link`]s. Every node owns a boxed
//! [`Element`]. Evaluation runs in passes over a [`Schedule`] built from the
//! link graph: values flow along forward links within a pass, and along
//! feedback links from one pass to the next. A tick repeats passes until
//! nothing changes or the pass budget in [`EngineConfig`] runs out.

pub mod config;
pub mod element;
pub mod elements;
pub mod engine;
pub mod handle;
pub mod link;
pub mod node;
pub mod package;
pub mod persist;
pub mod registry;
pub mod socket;
pub mod value;

pub use config::EngineConfig;
pub use element::{Element, ElementError, EvaluateError};
pub use engine::{NodeFault, PackageState, Schedule, TickOutcome, TickReport};
pub use handle::PackageHandle;
pub use link::{Link, LinkId, SocketAddr};
pub use node::{Node, NodeId};
pub use package::{GraphError, Package};
pub use persist::{PackageDef, PersistError};
pub use registry::{ElementMeta, MetaInfo, Registry, RegistryError};
pub use socket::{Socket, SocketBounds, SocketDirection, SocketError, Sockets};
pub use value::{Value, ValueType};
