//! Cluster inspector combining the host driver and cluster configuration.

use tracing::debug;

use crate::domain::{HostState, Route};
use crate::error::{Error, Result};
use crate::ports::{ClusterConfigLoader, ClusterInspector, HostDriver};

/// Inspects one named machine.
pub struct MachineInspector<D, C> {
    machine_name: String,
    driver: D,
    config: C,
}

impl<D, C> MachineInspector<D, C> {
    pub fn new(machine_name: impl Into<String>, driver: D, config: C) -> Self {
        Self {
            machine_name: machine_name.into(),
            driver,
            config,
        }
    }
}

impl<D: HostDriver, C: ClusterConfigLoader> ClusterInspector for MachineInspector<D, C> {
    async fn state(&self) -> Result<HostState> {
        self.driver.state(&self.machine_name).await
    }

    async fn state_and_route(&self) -> Result<(HostState, Route)> {
        let state = self.driver.state(&self.machine_name).await?;
        if state != HostState::Running {
            return Err(Error::Inspection(format!(
                "{} is not running (state: {})",
                self.machine_name, state
            )));
        }

        let ip = self.driver.ip(&self.machine_name).await?;
        let cidr = self.config.service_cidr(&self.machine_name).await?;
        let route = Route::new(ip, cidr);
        debug!(machine = %self.machine_name, route = %route, "computed tunnel route");

        Ok((state, route))
    }
}
