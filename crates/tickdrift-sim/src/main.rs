//! tickdrift simulator
//!
//! Starts a cluster of machines on consecutive local ports, lets them run
//! for a fixed time, then stops them and prints what each one did.
//!
//! # Usage
//!
//! ```bash
//! # Three machines on 50050..50052 for one minute
//! tickdrift-sim
//!
//! # Five reproducible machines for ten seconds, logs under ./logs
//! tickdrift-sim --num_machines 5 --run_duration 10 --seed 7 --log_dir logs
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use tickdrift_runtime::{init_tracing, Cluster, ClusterConfig};

/// Run a cluster of Lamport clock machines over local TCP
#[derive(Parser, Debug)]
#[command(name = "tickdrift-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of machines
    #[arg(long = "num_machines", default_value_t = 3)]
    num_machines: u32,

    /// Port of machine 0; machine i listens on base_port + i
    #[arg(long = "base_port", default_value_t = 50050)]
    base_port: u16,

    /// Seconds to run before stopping every machine
    #[arg(long = "run_duration", default_value_t = 60)]
    run_duration: u64,

    /// Address every machine binds to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Directory for machine_<id>.log files
    #[arg(long = "log_dir", default_value = ".")]
    log_dir: PathBuf,

    /// Seed for reproducible tick rates and draws (machine i uses seed + i)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Diagnostic filter when RUST_LOG is unset
    #[arg(long = "log_level", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            num_machines: self.num_machines,
            host: self.host,
            base_port: self.base_port,
            run_duration: Duration::from_secs(self.run_duration),
            log_dir: self.log_dir.clone(),
            seed: self.seed,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.cluster_config();
    config.validate()?;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           tickdrift - Lamport Clock Simulation             ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Machines: {}  Ports: {}..={}  Run duration: {}s",
        config.num_machines,
        config.base_port,
        config.base_port as u32 + config.num_machines - 1,
        config.run_duration.as_secs()
    );
    println!("Logs: {}", config.log_dir.display());
    println!();

    let cluster = Cluster::launch_tcp(&config).await?;
    for (machine, addr) in cluster.machines().iter().zip(cluster.server_addrs()) {
        println!("[machine {}] server listening on {}", machine.id(), addr);
    }
    for machine in cluster.machines() {
        println!(
            "[machine {}] event loop started at {}",
            machine.id(),
            machine.tick_rate()
        );
    }

    let report = cluster.run_for(config.run_duration).await;

    println!();
    for machine in &report.machines {
        println!(
            "[machine {}] stopped at logical clock {}",
            machine.id, machine.logical_clock
        );
    }
    for failure in &report.failures {
        tracing::warn!(machine = %failure.id, "machine did not finish cleanly");
    }

    println!();
    println!("Ran for {:.1}s", report.run_duration_secs);
    print!("{}", report.summary_table());

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tickdrift-sim"]).unwrap();
        let config = cli.cluster_config();
        assert_eq!(config.num_machines, 3);
        assert_eq!(config.base_port, 50050);
        assert_eq!(config.run_duration, Duration::from_secs(60));
        assert!(config.host.is_loopback());
        assert_eq!(config.seed, None);
        assert!(cli.report.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_underscore_long_names() {
        let cli = Cli::try_parse_from([
            "tickdrift-sim",
            "--num_machines",
            "5",
            "--base_port",
            "6000",
            "--run_duration",
            "2",
            "--seed",
            "11",
            "--log_dir",
            "/tmp/logs",
        ])
        .unwrap();
        let config = cli.cluster_config();
        assert_eq!(config.num_machines, 5);
        assert_eq!(config.base_port, 6000);
        assert_eq!(config.run_duration, Duration::from_secs(2));
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["tickdrift-sim", "--base_port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["tickdrift-sim", "--host", "nowhere"]).is_err());

        let cli = Cli::try_parse_from(["tickdrift-sim", "--num_machines", "0"]).unwrap();
        assert!(cli.cluster_config().validate().is_err());
    }
}
