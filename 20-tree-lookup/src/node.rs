//! The lookup node and its resolution algorithm.
//!
//! A [`Node`] answers from its own store when it can. On a miss it either
//! reports "not found" (root) or escalates to its parent and relays the
//! parent's value under its own address. Only the value travels back down the
//! chain; every node names itself as the answering node.

use thiserror::Error;
use tracing::{debug, info};

use crate::client::{ParentClient, ParentError};
use crate::config::{NodeConfig, SeedData};
use crate::protocol::{LookupRequest, LookupResponse};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("node has not been initialized")]
    Uninitialized,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("lookup exceeded {max} hops; the parent chain may contain a cycle")]
    HopLimit { max: u32 },

    #[error("parent {addr} failed: {source}")]
    Parent {
        addr: String,
        #[source]
        source: ParentError,
    },
}

pub struct Node {
    name: String,
    self_addr: String,
    parent: Option<ParentClient>,
    seed: SeedData,
    max_hops: u32,
    /// Present only once the store has been opened and seeded.
    store: Option<Store>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let parent = config
            .parent_addr
            .map(|addr| ParentClient::new(addr, config.parent_timeout));

        Self {
            name: config.name,
            self_addr: config.self_addr,
            parent,
            seed: config.seed,
            max_hops: config.max_hops,
            store: None,
        }
    }

    /// Seeds `store` with this node's preset data and starts serving from it.
    ///
    /// Must succeed before any lookup; a failed seed leaves the node
    /// uninitialized.
    pub fn initialize(&mut self, mut store: Store) -> Result<(), StoreError> {
        store.seed_load(&self.seed)?;
        info!(
            node = %self.name,
            bucket = store.bucket(),
            entries = self.seed.len(),
            "store seeded"
        );
        self.store = Some(store);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn parent_addr(&self) -> Option<&str> {
        self.parent.as_ref().map(ParentClient::addr)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Resolves `key`, escalating to the parent on a local miss.
    ///
    /// `hops` is the number of escalations the incoming request has already
    /// gone through; the outgoing request carries `hops + 1`, which may not
    /// exceed the configured maximum.
    pub async fn resolve(&self, key: &str, hops: u32) -> Result<LookupResponse, ResolveError> {
        let store = self.store.as_ref().ok_or(ResolveError::Uninitialized)?;

        if let Some(value) = store.get(key)? {
            debug!(key, "local hit");
            return Ok(LookupResponse::hit(&self.self_addr, value));
        }

        let Some(parent) = &self.parent else {
            debug!(key, "miss at root");
            return Ok(LookupResponse::miss(&self.self_addr));
        };

        let next_hops = hops.saturating_add(1);
        if next_hops > self.max_hops {
            return Err(ResolveError::HopLimit { max: self.max_hops });
        }

        info!(key, parent = parent.addr(), hops = next_hops, "escalating to parent");
        let request = LookupRequest {
            requester: self.self_addr.clone(),
            key: key.to_string(),
            hops: next_hops,
        };
        let reply = parent
            .query(&request)
            .await
            .map_err(|source| ResolveError::Parent {
                addr: parent.addr().to_string(),
                source,
            })?;

        Ok(LookupResponse {
            answering: self.self_addr.clone(),
            value: reply.value,
            found: reply.found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresetCatalog;

    // Nothing listens on port 1; any escalation fails fast with a refused connection.
    const DEAD_PARENT: &str = "127.0.0.1:1";

    fn node(name: &str, parent: Option<&str>) -> Node {
        let catalog = PresetCatalog::from_json_str(
            r#"{"leaf": {"a": "a value", "blank": ""}, "root": {"a": "a value"}}"#,
        )
        .unwrap();
        let config = NodeConfig::from_preset(
            name,
            "127.0.0.1:9000",
            parent.map(str::to_string),
            &catalog,
        )
        .unwrap();
        let mut node = Node::new(config);
        node.initialize(Store::temporary(name).unwrap()).unwrap();
        node
    }

    #[tokio::test]
    async fn uninitialized_node_refuses_lookups() {
        let config =
            NodeConfig::from_preset("one", "127.0.0.1:9000", None, &PresetCatalog::builtin())
                .unwrap();
        let node = Node::new(config);

        assert!(!node.is_initialized());
        assert!(matches!(
            node.resolve("a", 0).await,
            Err(ResolveError::Uninitialized)
        ));
    }

    #[tokio::test]
    async fn local_hit_answers_without_parent_call() {
        let node = node("leaf", Some(DEAD_PARENT));

        let response = node.resolve("a", 0).await.unwrap();
        assert_eq!(response, LookupResponse::hit("127.0.0.1:9000", "a value"));
    }

    #[tokio::test]
    async fn stored_empty_value_is_a_local_hit() {
        let node = node("leaf", Some(DEAD_PARENT));

        let response = node.resolve("blank", 0).await.unwrap();
        assert!(response.found);
        assert_eq!(response.value, "");
    }

    #[tokio::test]
    async fn root_miss_is_not_found() {
        let node = node("root", None);
        assert!(node.is_root());

        let response = node.resolve("z", 0).await.unwrap();
        assert_eq!(response, LookupResponse::miss("127.0.0.1:9000"));
    }

    #[tokio::test]
    async fn unreachable_parent_fails_the_lookup() {
        let node = node("leaf", Some(DEAD_PARENT));

        let err = node.resolve("z", 0).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Parent { ref addr, source: ParentError::Unreachable(_) } if addr == DEAD_PARENT
        ));
    }

    #[tokio::test]
    async fn hop_limit_stops_escalation() {
        let catalog = PresetCatalog::builtin();
        let config = NodeConfig::from_preset(
            "three",
            "127.0.0.1:9000",
            Some(DEAD_PARENT.to_string()),
            &catalog,
        )
        .unwrap()
        .with_max_hops(2);
        let mut node = Node::new(config);
        node.initialize(Store::temporary("three").unwrap()).unwrap();

        assert!(matches!(
            node.resolve("c", 2).await,
            Err(ResolveError::HopLimit { max: 2 })
        ));
        // Local hits are served no matter how far the request travelled.
        assert!(node.resolve("a", 2).await.unwrap().found);
    }
}
