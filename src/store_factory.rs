//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Opening [`Store`]s from connection settings.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

use crate::client::GridClient;
use crate::error::{client_description, GridError, RequestError};
use crate::memory::{MemoryClient, MemoryCluster, ERR_ARGUMENT, ERR_STATE};
use crate::store::Store;
use crate::store_config::StoreConfig;

/// Turns connection properties into a request layer session.
///
/// Properties are the `(name, value)` pairs produced by
/// [`StoreConfig::properties()`].
pub trait Connector: Send + Sync + std::fmt::Debug {
    fn connect(&self, properties: &[(String, String)]) -> Result<Arc<dyn GridClient>, RequestError>;
}

const KNOWN_PROPERTIES: &[&str] = &[
    "host",
    "port",
    "notificationAddress",
    "notificationPort",
    "notificationMember",
    "notificationProvider",
    "clusterName",
    "database",
    "user",
    "password",
    "consistency",
    "transactionTimeout",
    "failoverTimeout",
    "containerCacheSize",
];

/// Connects to in-memory clusters, one per cluster name. Stores opened with
/// the same cluster name share their data.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    clusters: Mutex<HashMap<String, Arc<MemoryCluster>>>,
}

impl MemoryConnector {
    pub fn new() -> MemoryConnector {
        MemoryConnector::default()
    }

    /// The cluster registered under `name`, if a store was ever opened on it.
    pub fn cluster(&self, name: &str) -> Option<Arc<MemoryCluster>> {
        match self.clusters.lock() {
            Ok(c) => c.get(name).cloned(),
            Err(_) => None,
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, properties: &[(String, String)]) -> Result<Arc<dyn GridClient>, RequestError> {
        let mut cluster_name = None;
        for (k, v) in properties {
            if !KNOWN_PROPERTIES.contains(&k.as_str()) {
                return Err(RequestError::new(
                    ERR_ARGUMENT,
                    &format!("unknown connection property {}", k),
                ));
            }
            if k == "clusterName" {
                cluster_name = Some(v.as_str());
            }
        }
        let name = match cluster_name {
            Some(n) if !n.is_empty() => n,
            _ => {
                return Err(RequestError::new(
                    ERR_ARGUMENT,
                    "connection property clusterName is required",
                ))
            }
        };
        let mut clusters = self
            .clusters
            .lock()
            .map_err(|_| RequestError::new(ERR_STATE, "cluster registry lock poisoned"))?;
        let cluster = clusters
            .entry(name.to_string())
            .or_insert_with(MemoryCluster::new)
            .clone();
        debug!("connected to in-memory cluster {}", name);
        Ok(Arc::new(MemoryClient::connect(&cluster)))
    }
}

/// Entry point for opening stores.
///
/// The shared instance connects through a [`MemoryConnector`]:
/// ```
/// use griddb_rust_client::{StoreConfig, StoreFactory};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoreConfig::new().cluster_name("myCluster")?;
/// let mut store = StoreFactory::get_instance().get_store(&config)?;
/// assert!(store.get_container("sensors")?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StoreFactory {
    connector: Arc<dyn Connector>,
}

impl StoreFactory {
    /// The process-wide factory.
    pub fn get_instance() -> &'static StoreFactory {
        static INSTANCE: OnceLock<StoreFactory> = OnceLock::new();
        INSTANCE.get_or_init(|| StoreFactory::with_connector(Arc::new(MemoryConnector::new())))
    }

    /// A factory that opens stores through `connector`.
    pub fn with_connector(connector: Arc<dyn Connector>) -> StoreFactory {
        StoreFactory { connector }
    }

    /// Name and version of this client library.
    pub fn get_version(&self) -> &'static str {
        client_description()
    }

    pub fn get_store(&self, config: &StoreConfig) -> Result<Store, GridError> {
        let client = self.connector.connect(&config.properties())?;
        debug!("opened store on cluster {}", config.get_cluster_name());
        Ok(Store::new(client))
    }

    /// Open a store from individual settings. Empty strings and a `None`
    /// port leave the setting out.
    #[allow(clippy::too_many_arguments)]
    pub fn get_store_with(
        &self,
        host: &str,
        port: Option<i32>,
        cluster_name: &str,
        database: &str,
        user: &str,
        password: &str,
        notification_member: &str,
        notification_provider: &str,
    ) -> Result<Store, GridError> {
        let mut config = StoreConfig::new();
        if !host.is_empty() {
            config = config.host(host)?;
        }
        if let Some(p) = port {
            config = config.port(p)?;
        }
        if !cluster_name.is_empty() {
            config = config.cluster_name(cluster_name)?;
        }
        if !database.is_empty() {
            config = config.database(database)?;
        }
        if !user.is_empty() {
            config = config.user(user)?;
        }
        if !password.is_empty() {
            config = config.password(password)?;
        }
        if !notification_member.is_empty() {
            config = config.notification_member(notification_member)?;
        }
        if !notification_provider.is_empty() {
            config = config.notification_provider(notification_provider)?;
        }
        self.get_store(&config)
    }
}
