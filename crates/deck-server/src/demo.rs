//! Seeded in-memory hosts for running the dashboard without a daemon.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use deck_engine::{ContainerInfo, HostConfig, InMemoryEngine};
use deck_fleet::{FleetResult, HostPool};
use deck_logs::LogChunk;
use deck_metrics::{CpuStats, CpuUsage, MemoryStats, UsageSnapshot};

/// Interval of the synthetic lines appended to followed demo logs.
pub const DEMO_LIVE_INTERVAL: Duration = Duration::from_secs(2);

const MIB: u64 = 1024 * 1024;

/// Host entries of the demo pool.
pub fn demo_hosts() -> Vec<HostConfig> {
    vec![
        HostConfig::new("local", "local"),
        HostConfig::new("staging", "tcp://staging.internal:2375"),
    ]
}

/// Builds a pool of two in-memory hosts with a handful of containers.
///
/// # Errors
///
/// Returns an error only if the demo host names collide.
pub fn demo_pool() -> FleetResult<HostPool> {
    let hosts = demo_hosts();
    let mut pool = HostPool::new();
    let engines = [local_engine(), staging_engine()];
    for (host, engine) in hosts.into_iter().zip(engines) {
        pool.insert(host, Arc::new(engine))?;
    }
    Ok(pool)
}

fn local_engine() -> InMemoryEngine {
    InMemoryEngine::new()
        .with_live_interval(DEMO_LIVE_INTERVAL)
        .with_container(container(
            "3f4e1a9b2c7d",
            "web",
            "nginx:1.25",
            "running",
            "Up 3 hours",
            &[("com.docker.compose.project", "shop"), ("tier", "frontend")],
        ))
        .with_container(container(
            "8a21c0d4e5f6",
            "api",
            "shop/api:2.4.1",
            "running",
            "Up 3 hours",
            &[("com.docker.compose.project", "shop"), ("tier", "backend")],
        ))
        .with_container(container(
            "c9d8e7f6a5b4",
            "migrate",
            "shop/api:2.4.1",
            "exited",
            "Exited (0) 3 hours ago",
            &[("com.docker.compose.project", "shop")],
        ))
        .with_logs(
            "3f4e1a9b2c7d",
            vec![
                LogChunk::stdout(
                    "10.0.0.12 - - [15/Jan/2024:10:30:00 +0000] \"GET / HTTP/1.1\" 200 612\n",
                ),
                LogChunk::stderr(
                    "2024/01/15 10:30:02 [warn] 29#29: *1 upstream server temporarily disabled\n",
                ),
                LogChunk::stderr(
                    "2024/01/15 10:30:05 [error] 29#29: *3 connect() failed (111: Connection refused)\n",
                ),
            ],
        )
        .with_usage("3f4e1a9b2c7d", usage(1_200, 60_000, 2, 48 * MIB, 512 * MIB))
        .with_logs(
            "8a21c0d4e5f6",
            vec![
                LogChunk::stdout("2024-01-15T10:29:58.120Z INFO starting api on :8000\n"),
                LogChunk::stdout(
                    "2024-01-15T10:30:01.004Z WARN \x1b[1mslow query\x1b[0m took 1.8s\n",
                ),
                LogChunk::stdout("2024-01-15 10:30:03,551 DEBUG cache warm: 312 keys\n"),
                LogChunk::stderr("Traceback (most recent call last):\n"),
                LogChunk::stderr("  ValueError: invalid literal for int()\n"),
            ],
        )
        .with_usage("8a21c0d4e5f6", usage(9_000, 50_000, 4, 310 * MIB, 1_024 * MIB))
        .with_logs(
            "c9d8e7f6a5b4",
            vec![LogChunk::stdout(
                "Mon Jan 15 10:25:00 2024 applied 14 migrations\n",
            )],
        )
}

fn staging_engine() -> InMemoryEngine {
    InMemoryEngine::new()
        .with_live_interval(DEMO_LIVE_INTERVAL)
        .with_container(container(
            "0b1c2d3e4f5a",
            "postgres",
            "postgres:16",
            "running",
            "Up 2 days",
            &[("tier", "data")],
        ))
        .with_logs(
            "0b1c2d3e4f5a",
            vec![
                LogChunk::stdout(
                    "2024-01-15 10:20:00.000 UTC [1] LOG:  database system is ready to accept connections\n",
                ),
                LogChunk::stderr(
                    "2024-01-15 10:31:12.310 UTC [88] FATAL:  password authentication failed for user \"shop\"\n",
                ),
            ],
        )
        .with_usage("0b1c2d3e4f5a", usage(700, 80_000, 2, 900 * MIB, 2_048 * MIB))
}

fn container(
    id: &str,
    name: &str,
    image: &str,
    state: &str,
    status: &str,
    labels: &[(&str, &str)],
) -> ContainerInfo {
    ContainerInfo {
        id: id.to_string(),
        names: vec![format!("/{name}")],
        image: image.to_string(),
        state: state.to_string(),
        status: status.to_string(),
        created: 1_705_300_000,
        labels: labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
        ..Default::default()
    }
}

/// A snapshot whose counters advanced by `cpu_delta` over `system_delta`.
fn usage(cpu_delta: u64, system_delta: u64, cpus: u64, used: u64, limit: u64) -> UsageSnapshot {
    let base = 1_000_000_u64;
    UsageSnapshot {
        cpu_stats: CpuStats {
            cpu_usage: CpuUsage {
                total_usage: Some(base + cpu_delta),
                percpu_usage: None,
            },
            system_cpu_usage: Some(base * 10 + system_delta),
            online_cpus: Some(cpus),
        },
        precpu_stats: CpuStats {
            cpu_usage: CpuUsage {
                total_usage: Some(base),
                percpu_usage: None,
            },
            system_cpu_usage: Some(base * 10),
            online_cpus: Some(cpus),
        },
        memory_stats: MemoryStats {
            usage: Some(used),
            limit: Some(limit),
            stats: None,
        },
    }
}
