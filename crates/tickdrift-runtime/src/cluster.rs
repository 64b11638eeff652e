//! Cluster orchestration
//!
//! Builds every machine, starts every RPC server before any event loop, and
//! collects one report per machine on shutdown. A machine that fails does
//! not stop its siblings; its error is reported alongside their results.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use tickdrift_core::{MachineId, SimError, SimResult};
use tickdrift_transport::{LocalNetwork, RpcServer, ServerHandle, TcpTransport};

use crate::{ClusterConfig, EventLog, Machine, MachineHandle, MachineReport};

/// A machine whose loop ended with an error
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineFailure {
    pub id: MachineId,
    pub error: String,
}

/// Outcome of a whole run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusterReport {
    pub machines: Vec<MachineReport>,
    pub failures: Vec<MachineFailure>,
    pub run_duration_secs: f64,
}

impl ClusterReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::Report(e.to_string()))
    }

    pub fn write_json(&self, path: &Path) -> SimResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| SimError::Report(format!("{}: {}", path.display(), e)))
    }

    /// Plain-text table, one row per machine
    pub fn summary_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>7} {:>5} {:>8} {:>6} {:>8} {:>9} {:>8} {:>7}",
            "machine", "rate", "clock", "sends", "receives", "internals", "max_jump", "failed"
        );
        for m in &self.machines {
            let _ = writeln!(
                out,
                "{:>7} {:>5} {:>8} {:>6} {:>8} {:>9} {:>8} {:>7}",
                m.id.to_string(),
                m.tick_rate.to_string(),
                m.logical_clock,
                m.events.send,
                m.events.receive,
                m.events.internal,
                m.drift.max_jump,
                m.send_failures
            );
        }
        for f in &self.failures {
            let _ = writeln!(out, "machine {} failed: {}", f.id, f.error);
        }
        out
    }
}

pub struct Cluster {
    machines: Vec<MachineHandle>,
    servers: Vec<ServerHandle>,
    started_at: Instant,
}

impl Cluster {
    /// Bind `host:(base_port + i)` for every machine, then launch
    pub async fn launch_tcp(config: &ClusterConfig) -> SimResult<Self> {
        let table = config.address_table()?;
        let mut servers = Vec::with_capacity(table.len());
        for (id, addr) in &table {
            servers.push(RpcServer::bind(*id, *addr).await?);
        }
        Self::launch_with_servers(config, servers)
    }

    /// Launch on servers that are already bound, `servers[i]` belonging to
    /// machine i. Peers are addressed by the servers' actual local
    /// addresses, so port 0 binds work.
    pub fn launch_with_servers(config: &ClusterConfig, servers: Vec<RpcServer>) -> SimResult<Self> {
        config.validate()?;
        if servers.len() != config.num_machines as usize {
            return Err(SimError::InvalidConfig(format!(
                "{} servers for {} machines",
                servers.len(),
                config.num_machines
            )));
        }

        let addresses: BTreeMap<MachineId, SocketAddr> = config
            .machine_ids()
            .zip(servers.iter().map(|server| server.local_addr()))
            .collect();

        let mut machines = Vec::with_capacity(servers.len());
        let mut handles = Vec::with_capacity(servers.len());
        for (id, server) in config.machine_ids().zip(servers) {
            let transport = TcpTransport::new(id, &addresses, config.request_timeout);
            let peers = transport.peer_ids();
            let log = EventLog::create(&config.log_dir, id)?;
            let machine = Machine::new(id, peers, transport, log, &config.machine_config(id));

            handles.push(server.serve(Arc::new(machine.inbox_sender())));
            machines.push(machine);
        }

        Ok(Cluster {
            machines: machines.into_iter().map(Machine::start).collect(),
            servers: handles,
            started_at: Instant::now(),
        })
    }

    /// Launch every machine on one in-process network
    pub fn launch_local(config: &ClusterConfig) -> SimResult<(Self, Arc<LocalNetwork>)> {
        config.validate()?;
        let network = Arc::new(LocalNetwork::new());

        let mut machines = Vec::with_capacity(config.num_machines as usize);
        for id in config.machine_ids() {
            let log = EventLog::create(&config.log_dir, id)?;
            let machine = Machine::new(
                id,
                config.machine_ids(),
                Arc::clone(&network),
                log,
                &config.machine_config(id),
            );
            network.register(id, Arc::new(machine.inbox_sender()));
            machines.push(machine);
        }

        let cluster = Cluster {
            machines: machines.into_iter().map(Machine::start).collect(),
            servers: Vec::new(),
            started_at: Instant::now(),
        };
        Ok((cluster, network))
    }

    pub fn machines(&self) -> &[MachineHandle] {
        &self.machines
    }

    pub fn server_addrs(&self) -> Vec<SocketAddr> {
        self.servers.iter().map(ServerHandle::local_addr).collect()
    }

    /// Signal every loop to stop without waiting
    pub fn stop(&self) {
        for machine in &self.machines {
            machine.stop();
        }
    }

    /// Stop every loop, wait for all of them, then close the servers
    pub async fn shutdown(self) -> ClusterReport {
        self.stop();
        let run_duration_secs = self.started_at.elapsed().as_secs_f64();

        let mut report = ClusterReport {
            run_duration_secs,
            ..Default::default()
        };
        for machine in self.machines {
            let id = machine.id();
            match machine.join().await {
                Ok(machine_report) => report.machines.push(machine_report),
                Err(e) => {
                    tracing::error!(machine = %id, "machine ended with error: {}", e);
                    report.failures.push(MachineFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }

        for server in self.servers {
            server.shutdown();
        }
        report
    }

    /// Let the cluster run for `duration`, then shut it down
    pub async fn run_for(self, duration: Duration) -> ClusterReport {
        tokio::time::sleep(duration).await;
        self.shutdown().await
    }
}
