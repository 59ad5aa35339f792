use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;
use taskstash::ServiceConfig;

/// Runtime configuration for the `taskstash-server` binary.
///
/// These settings name the backend tables and control the concurrency and
/// admission limits of the cache-miss worker pool. All values are parsed from
/// CLI arguments or environment variables (a `.env` file is honored), with
/// defaults suitable for a single local instance.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskstash-server",
    version,
    about = "An HTTP service serving a record catalog through a read-through cache"
)]
pub struct CliArgs {
    /// Region label of the backend.
    ///
    /// Logged at startup and written into the snapshot file when `DATA_FILE`
    /// is set.
    ///
    /// Environment variable: `AWS_REGION`
    #[arg(long, env = "AWS_REGION", default_value_t = String::from("local"))]
    pub region: String,

    /// Table holding the records.
    ///
    /// Environment variable: `DYNAMODB_TABLE_NAME`
    #[arg(long, env = "DYNAMODB_TABLE_NAME", default_value_t = String::from("tasks"))]
    pub table_name: String,

    /// Table holding the identifier counter.
    ///
    /// Environment variable: `COUNTER_TABLE_NAME`
    #[arg(long, env = "COUNTER_TABLE_NAME", default_value_t = String::from("counter"))]
    pub counter_table: String,

    /// Path of the JSON snapshot backing the store. Without it, records live
    /// in memory only and are lost on exit.
    ///
    /// Environment variable: `DATA_FILE`
    #[arg(long, env = "DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Number of worker tasks resolving cache misses concurrently.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 10)]
    pub num_workers: usize,

    /// Capacity of the cache-miss request queue.
    ///
    /// When the queue is full, further misses wait for a free slot. Lower
    /// values shed load onto the caller sooner; higher values absorb bursts.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 10)]
    pub queue_capacity: usize,

    /// Maximum time, in milliseconds, a request waits for a cache-miss fetch.
    /// `0` waits indefinitely.
    ///
    /// Environment variable: `FETCH_TIMEOUT_MS`
    #[arg(long, env = "FETCH_TIMEOUT_MS", default_value_t = 5_000)]
    pub fetch_timeout_ms: u64,

    /// Seconds to wait for in-flight fetches during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on.
    ///
    /// Example: "0.0.0.0:8080"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub region: String,
    pub data_file: Option<PathBuf>,
    pub server_addr: String,
    pub service: ServiceConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }

        if args.table_name.trim().is_empty() {
            bail!("DYNAMODB_TABLE_NAME must not be empty");
        }

        if args.counter_table.trim().is_empty() {
            bail!("COUNTER_TABLE_NAME must not be empty");
        }

        if args.table_name == args.counter_table {
            bail!(
                "DYNAMODB_TABLE_NAME and COUNTER_TABLE_NAME must differ (both are `{}`)",
                args.table_name
            );
        }

        let fetch_timeout =
            (args.fetch_timeout_ms > 0).then(|| Duration::from_millis(args.fetch_timeout_ms));

        Ok(Self {
            region: args.region,
            data_file: args.data_file,
            server_addr: args.server_addr,
            service: ServiceConfig {
                num_workers: args.num_workers,
                queue_capacity: args.queue_capacity,
                fetch_timeout,
                drain_timeout: Duration::from_secs(args.shutdown_timeout),
                table_name: args.table_name,
                counter_table: args.counter_table,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["taskstash-server"];
        argv.extend_from_slice(extra);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn explicit_flags_build_service_config() {
        let config = parse(&[
            "--region",
            "eu-west-1",
            "--table-name",
            "todo",
            "--counter-table",
            "ids",
            "--num-workers",
            "3",
            "--queue-capacity",
            "7",
            "--fetch-timeout-ms",
            "250",
            "--shutdown-timeout",
            "1",
            "--server-addr",
            "127.0.0.1:9000",
        ])
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.server_addr, "127.0.0.1:9000");
        assert_eq!(config.service.num_workers, 3);
        assert_eq!(config.service.queue_capacity, 7);
        assert_eq!(config.service.fetch_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.service.drain_timeout, Duration::from_secs(1));
        assert_eq!(config.service.table_name, "todo");
        assert_eq!(config.service.counter_table, "ids");
    }

    #[test]
    fn zero_fetch_timeout_disables_it() {
        let config = parse(&["--fetch-timeout-ms", "0"]).unwrap();
        assert_eq!(config.service.fetch_timeout, None);
    }

    #[test]
    fn rejects_invalid_limits() {
        assert!(parse(&["--num-workers", "0"]).is_err());
        assert!(parse(&["--queue-capacity", "0"]).is_err());
        assert!(parse(&["--table-name", "same", "--counter-table", "same"]).is_err());
    }
}
