//! Named engines, one per configured host.

use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "docker")]
use std::time::Duration;

use deck_engine::{ContainerEngine, HostConfig};
#[cfg(feature = "docker")]
use deck_engine::DockerEngine;

use crate::error::{FleetError, FleetResult};

/// Engines keyed by host name, in configuration order.
#[derive(Default)]
pub struct HostPool {
    hosts: Vec<HostConfig>,
    engines: HashMap<String, Arc<dyn ContainerEngine>>,
}

impl std::fmt::Debug for HostPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPool")
            .field("hosts", &self.hosts)
            .finish_non_exhaustive()
    }
}

impl HostPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a Docker engine for every host.
    ///
    /// # Errors
    ///
    /// Returns error if a host endpoint is unsupported or a name repeats.
    #[cfg(feature = "docker")]
    pub fn connect(hosts: &[HostConfig], timeout: Duration) -> FleetResult<Self> {
        let mut pool = Self::new();
        for host in hosts {
            let engine = DockerEngine::connect(host, timeout)?;
            pool.insert(host.clone(), Arc::new(engine))?;
        }
        Ok(pool)
    }

    /// Registers an engine under `host.name`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateHost`] if the name is taken.
    pub fn insert(
        &mut self,
        host: HostConfig,
        engine: Arc<dyn ContainerEngine>,
    ) -> FleetResult<()> {
        if self.engines.contains_key(&host.name) {
            return Err(FleetError::DuplicateHost { name: host.name });
        }
        self.engines.insert(host.name.clone(), engine);
        self.hosts.push(host);
        Ok(())
    }

    /// Adds an engine, builder style.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateHost`] if the name is taken.
    pub fn with_engine(
        mut self,
        host: HostConfig,
        engine: Arc<dyn ContainerEngine>,
    ) -> FleetResult<Self> {
        self.insert(host, engine)?;
        Ok(self)
    }

    /// Looks up the engine of a host.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownHost`] for an unregistered name.
    pub fn engine(&self, name: &str) -> FleetResult<Arc<dyn ContainerEngine>> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| FleetError::UnknownHost {
                name: name.to_string(),
            })
    }

    /// Configured hosts, in registration order.
    #[must_use]
    pub fn hosts(&self) -> &[HostConfig] {
        &self.hosts
    }

    /// Host names paired with their engines.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ContainerEngine>)> {
        self.hosts
            .iter()
            .filter_map(|host| Some((host.name.as_str(), self.engines.get(&host.name)?)))
    }

    /// Number of hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if no host is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
