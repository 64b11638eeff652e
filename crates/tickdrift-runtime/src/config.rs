//! Machine and cluster configuration

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tickdrift_clock::TickRate;
use tickdrift_core::{MachineId, SimError, SimResult};
use tickdrift_transport::DEFAULT_REQUEST_TIMEOUT;

/// Per-machine settings
#[derive(Clone, Debug, Default)]
pub struct MachineConfig {
    /// RNG seed; entropy when `None`
    pub seed: Option<u64>,
    /// Pin the tick rate instead of drawing it
    pub tick_rate: Option<TickRate>,
}

/// Settings for a whole run
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub num_machines: u32,
    pub host: IpAddr,
    /// Machine i listens on `base_port + i`
    pub base_port: u16,
    pub run_duration: Duration,
    /// Directory receiving `machine_<id>.log`
    pub log_dir: PathBuf,
    /// Machine i is seeded with `seed + i`
    pub seed: Option<u64>,
    pub tick_rate: Option<TickRate>,
    /// Bound on one connect or request/reply exchange
    pub request_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            num_machines: 3,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 50050,
            run_duration: Duration::from_secs(60),
            log_dir: PathBuf::from("."),
            seed: None,
            tick_rate: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.num_machines == 0 {
            return Err(SimError::InvalidConfig(
                "num_machines must be at least 1".into(),
            ));
        }
        if self.base_port == 0 {
            return Err(SimError::InvalidConfig("base_port must be non-zero".into()));
        }
        let last_port = self.base_port as u64 + self.num_machines as u64 - 1;
        if last_port > u16::MAX as u64 {
            return Err(SimError::InvalidConfig(format!(
                "ports {}..={} exceed {}",
                self.base_port,
                last_port,
                u16::MAX
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(SimError::InvalidConfig(
                "request_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = MachineId> {
        (0..self.num_machines).map(MachineId::new)
    }

    /// `{ id: host:(base_port + id) }` for every machine
    pub fn address_table(&self) -> SimResult<BTreeMap<MachineId, SocketAddr>> {
        self.validate()?;
        Ok(self
            .machine_ids()
            .map(|id| {
                let port = self.base_port + id.index() as u16;
                (id, SocketAddr::new(self.host, port))
            })
            .collect())
    }

    pub fn machine_config(&self, id: MachineId) -> MachineConfig {
        MachineConfig {
            seed: self.seed.map(|seed| seed.wrapping_add(id.index() as u64)),
            tick_rate: self.tick_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.num_machines, 3);
        assert_eq!(config.base_port, 50050);
        assert_eq!(config.run_duration, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_table() {
        let table = ClusterConfig::default().address_table().unwrap();
        let ports: Vec<u16> = table.values().map(|addr| addr.port()).collect();
        assert_eq!(ports, vec![50050, 50051, 50052]);
        assert!(table.values().all(|addr| addr.ip().is_loopback()));
    }

    #[test]
    fn test_invalid_configs() {
        let zero = ClusterConfig {
            num_machines: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let overflow = ClusterConfig {
            num_machines: 10,
            base_port: 65530,
            ..Default::default()
        };
        assert!(overflow.address_table().is_err());

        let no_port = ClusterConfig {
            base_port: 0,
            ..Default::default()
        };
        assert!(no_port.validate().is_err());
    }

    #[test]
    fn test_seed_derivation() {
        let config = ClusterConfig {
            seed: Some(100),
            ..Default::default()
        };
        assert_eq!(config.machine_config(MachineId(0)).seed, Some(100));
        assert_eq!(config.machine_config(MachineId(2)).seed, Some(102));
        assert_eq!(ClusterConfig::default().machine_config(MachineId(1)).seed, None);
    }
}
