//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Connection settings for a [`Store`](crate::Store)
//!
use ini::Ini;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ia_err;
use crate::error::GridError;

/// Profile used by [`StoreConfig::from_file()`].
pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Read consistency of a store connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Consistency {
    #[default]
    Immediate,
    Eventual,
}

impl Consistency {
    fn as_str(&self) -> &'static str {
        match self {
            Consistency::Immediate => "IMMEDIATE",
            Consistency::Eventual => "EVENTUAL",
        }
    }
}

/// Settings used by [`StoreFactory`](crate::StoreFactory) to open a
/// [`Store`](crate::Store).
///
/// Settings can be collected from a config file, from the environment, and
/// from code, in that order, each overriding the previous one:
///```no_run
/// # use griddb_rust_client::StoreConfig;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoreConfig::new()
///     .from_file("~/.griddb/config")?
///     .from_environment()?
///     .cluster_name("myCluster")?;
/// # Ok(())
/// # }
///```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub(crate) host: String,
    pub(crate) port: Option<u16>,
    pub(crate) notification_member: String,
    pub(crate) notification_provider: String,
    pub(crate) cluster_name: String,
    pub(crate) database: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) consistency: Option<Consistency>,
    pub(crate) transaction_timeout: Option<Duration>,
    pub(crate) failover_timeout: Option<Duration>,
    pub(crate) container_cache_size: Option<u32>,
}

pub(crate) fn expand_user_home(file_path: &str) -> String {
    if file_path.starts_with("~/") || file_path.starts_with("~\\") {
        if let Some(home_dir) = dirs::home_dir() {
            let full_path = home_dir.join(PathBuf::from(&file_path[2..]));
            return format!("{}", full_path.display());
        }
    }
    file_path.to_string()
}

/// Returns true if `host` is an IPv4 multicast address (224.0.0.0/4).
pub(crate) fn is_multicast(host: &str) -> bool {
    match host.split('.').next().map(|o| o.parse::<u8>()) {
        Some(Ok(octet)) => host.split('.').count() == 4 && (octet >> 4) == 0xE,
        _ => false,
    }
}

fn parse_secs(key: &str, val: &str) -> Result<Duration, GridError> {
    match val.trim().parse::<u64>() {
        Ok(s) => Ok(Duration::from_secs(s)),
        Err(_) => ia_err!("invalid value '{}' for {}: expected seconds", val, key),
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        StoreConfig {
            ..Default::default()
        }
    }

    /// Read settings from the [`DEFAULT_PROFILE`] section of an INI file.
    ///
    /// Recognized keys are `host`, `port`, `notificationMember`,
    /// `notificationProvider`, `clusterName`, `database`, `user`, `password`,
    /// `consistency`, `transactionTimeout`, `failoverTimeout` (both in
    /// seconds) and `containerCacheSize`. Keys before any section header are
    /// treated as part of the default profile.
    pub fn from_file(self, path: &str) -> Result<Self, GridError> {
        self.from_file_with_profile(path, DEFAULT_PROFILE)
    }

    pub fn from_file_with_profile(mut self, path: &str, profile: &str) -> Result<Self, GridError> {
        let file_path = expand_user_home(path);
        tracing::debug!("reading store config from {} profile {}", file_path, profile);
        let config = Ini::load_from_file(&file_path)?;
        let props = match config.section(Some(profile)) {
            Some(p) => p,
            None if profile == DEFAULT_PROFILE => config.general_section(),
            None => {
                return ia_err!(
                    "error reading config file '{}': missing profile '{}'",
                    file_path,
                    profile
                )
            }
        };
        for (k, v) in props.iter() {
            self = match k {
                "host" => self.host(v)?,
                "port" => self.port_str(v)?,
                "notificationMember" => self.notification_member(v)?,
                "notificationProvider" => self.notification_provider(v)?,
                "clusterName" => self.cluster_name(v)?,
                "database" => self.database(v)?,
                "user" => self.user(v)?,
                "password" => self.password(v)?,
                "consistency" => self.consistency_str(v)?,
                "transactionTimeout" => self.transaction_timeout(parse_secs(k, v)?)?,
                "failoverTimeout" => self.failover_timeout(parse_secs(k, v)?)?,
                "containerCacheSize" => match v.trim().parse::<u32>() {
                    Ok(n) => self.container_cache_size(n)?,
                    Err(_) => return ia_err!("invalid value '{}' for containerCacheSize", v),
                },
                _ => {
                    tracing::debug!("ignoring unknown key '{}' in {}", k, file_path);
                    self
                }
            };
        }
        Ok(self)
    }

    /// Gather settings from the current environment.
    ///
    /// | variable | description |
    /// | -------- | ----------- |
    /// | `GRIDDB_CONFIG_FILE` | A config file read first, see [`StoreConfig::from_file()`]. |
    /// | `GRIDDB_HOST` | See [`StoreConfig::host()`]. |
    /// | `GRIDDB_PORT` | See [`StoreConfig::port()`]. |
    /// | `GRIDDB_CLUSTER_NAME` | See [`StoreConfig::cluster_name()`]. |
    /// | `GRIDDB_DATABASE` | See [`StoreConfig::database()`]. |
    /// | `GRIDDB_USER` | See [`StoreConfig::user()`]. |
    /// | `GRIDDB_PASSWORD` | See [`StoreConfig::password()`]. |
    /// | `GRIDDB_NOTIFICATION_MEMBER` | See [`StoreConfig::notification_member()`]. |
    /// | `GRIDDB_NOTIFICATION_PROVIDER` | See [`StoreConfig::notification_provider()`]. |
    ///
    pub fn from_environment(mut self) -> Result<Self, GridError> {
        if let Ok(val) = env::var("GRIDDB_CONFIG_FILE") {
            self = self.from_file(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_HOST") {
            self = self.host(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_PORT") {
            self = self.port_str(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_CLUSTER_NAME") {
            self = self.cluster_name(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_DATABASE") {
            self = self.database(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_USER") {
            self = self.user(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_PASSWORD") {
            self = self.password(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_NOTIFICATION_MEMBER") {
            self = self.notification_member(&val)?;
        }
        if let Ok(val) = env::var("GRIDDB_NOTIFICATION_PROVIDER") {
            self = self.notification_provider(&val)?;
        }
        Ok(self)
    }

    /// Host of the cluster. A multicast address (224.0.0.0 to
    /// 239.255.255.255) is used as the notification address.
    pub fn host(mut self, host: &str) -> Result<Self, GridError> {
        if host.contains(char::is_whitespace) {
            return ia_err!("invalid host '{}'", host);
        }
        self.host = host.to_string();
        Ok(self)
    }

    pub fn port(mut self, port: i32) -> Result<Self, GridError> {
        if port <= 0 || port > u16::MAX as i32 {
            return ia_err!("port must be between 1 and {}, got {}", u16::MAX, port);
        }
        self.port = Some(port as u16);
        Ok(self)
    }

    fn port_str(self, port: &str) -> Result<Self, GridError> {
        match port.trim().parse::<i32>() {
            Ok(p) => self.port(p),
            Err(_) => ia_err!("invalid port '{}'", port),
        }
    }

    /// Fixed list of cluster members, `address:port[,address:port...]`.
    pub fn notification_member(mut self, member: &str) -> Result<Self, GridError> {
        self.notification_member = member.to_string();
        Ok(self)
    }

    /// URL of a provider that returns the cluster's member list.
    pub fn notification_provider(mut self, url: &str) -> Result<Self, GridError> {
        self.notification_provider = url.to_string();
        Ok(self)
    }

    pub fn cluster_name(mut self, name: &str) -> Result<Self, GridError> {
        if name.is_empty() {
            return ia_err!("cluster name must be non-empty");
        }
        self.cluster_name = name.to_string();
        Ok(self)
    }

    pub fn database(mut self, database: &str) -> Result<Self, GridError> {
        self.database = database.to_string();
        Ok(self)
    }

    pub fn user(mut self, user: &str) -> Result<Self, GridError> {
        self.user = user.to_string();
        Ok(self)
    }

    pub fn password(mut self, password: &str) -> Result<Self, GridError> {
        self.password = password.to_string();
        Ok(self)
    }

    pub fn consistency(mut self, consistency: Consistency) -> Result<Self, GridError> {
        self.consistency = Some(consistency);
        Ok(self)
    }

    fn consistency_str(self, val: &str) -> Result<Self, GridError> {
        match val.to_uppercase().as_str() {
            "IMMEDIATE" => self.consistency(Consistency::Immediate),
            "EVENTUAL" => self.consistency(Consistency::Eventual),
            _ => ia_err!("invalid consistency '{}': expected IMMEDIATE or EVENTUAL", val),
        }
    }

    /// Timeout of a transaction. Sent in whole seconds.
    pub fn transaction_timeout(mut self, timeout: Duration) -> Result<Self, GridError> {
        if timeout.as_secs() == 0 {
            return ia_err!("transaction timeout must be at least one second");
        }
        self.transaction_timeout = Some(timeout);
        Ok(self)
    }

    /// Time spent retrying after a failover before giving up.
    pub fn failover_timeout(mut self, timeout: Duration) -> Result<Self, GridError> {
        self.failover_timeout = Some(timeout);
        Ok(self)
    }

    pub fn container_cache_size(mut self, size: u32) -> Result<Self, GridError> {
        self.container_cache_size = Some(size);
        Ok(self)
    }

    pub fn get_cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    /// The connection properties handed to a [`Connector`](crate::Connector),
    /// in a fixed order. Empty settings are left out.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut props: Vec<(String, String)> = Vec::new();
        let mut add = |k: &str, v: String| {
            if !v.is_empty() {
                props.push((k.to_string(), v));
            }
        };
        let port = self.port.map(|p| p.to_string()).unwrap_or_default();
        if is_multicast(&self.host) {
            add("notificationAddress", self.host.clone());
            add("notificationPort", port);
        } else {
            add("host", self.host.clone());
            add("port", port);
        }
        add("notificationMember", self.notification_member.clone());
        add("notificationProvider", self.notification_provider.clone());
        add("clusterName", self.cluster_name.clone());
        add("database", self.database.clone());
        add("user", self.user.clone());
        add("password", self.password.clone());
        if let Some(c) = self.consistency {
            add("consistency", c.as_str().to_string());
        }
        if let Some(t) = self.transaction_timeout {
            add("transactionTimeout", t.as_secs().to_string());
        }
        if let Some(t) = self.failover_timeout {
            add("failoverTimeout", t.as_secs().to_string());
        }
        if let Some(n) = self.container_cache_size {
            add("containerCacheSize", n.to_string());
        }
        props
    }
}
