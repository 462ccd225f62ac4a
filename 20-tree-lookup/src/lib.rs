//! One node of a tree-shaped key/value lookup network.
//!
//! Every node owns a small persistent store seeded from a preset and knows at
//! most one other node: its parent. A lookup is answered from the local store
//! when possible; on a miss the node asks its parent over HTTP and reports the
//! parent's value as its own answer. Chaining nodes this way builds a lookup
//! tree of any depth in which no node knows more than one hop in each
//! direction.
//!
//! # Modules
//!
//! - [`config`]: preset catalog (node name → seed data) and node settings
//! - [`store`]: sled-backed store holding one bucket per node
//! - [`protocol`]: JSON envelope and request decoding for the lookup endpoint
//! - [`client`]: outbound calls to the parent node
//! - [`node`]: the resolution algorithm (local hit, root miss, escalation)
//! - [`server`]: axum router and serve loop
//! - [`cli`]: command-line surface of the `tree-lookup` binary
//!
//! # Example chain
//!
//! ```bash
//! # Terminal 1: root holding a, b, c
//! cargo run --bin tree-lookup -- one 8000 none
//! # Terminal 2: child of the root holding a, b
//! cargo run --bin tree-lookup -- two 8001 8000
//! # Terminal 3: grandchild holding only a
//! cargo run --bin tree-lookup -- three 8002 8001
//!
//! curl 'http://127.0.0.1:8002/?value=c'
//! # {"URL":"127.0.0.1:8002","Value":"c value","Found":true}
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod node;
pub mod protocol;
pub mod server;
pub mod store;
