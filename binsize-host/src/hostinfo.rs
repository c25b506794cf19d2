//! CPU and memory introspection backed by procfs.

use std::io::{self, BufRead};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostInfoError {
    #[error("host introspection is only supported on Linux")]
    Unsupported,

    #[error("failed to read {path}")]
    Read {
        path: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("missing field {field:?} in {path}")]
    MissingField {
        field: &'static str,
        path: &'static str,
    },
}

/// Logical processor and core counts for the local machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTopology {
    /// Number of `processor` entries.
    pub logical_cpus: u32,

    /// First reported `cpu cores` value, when present.
    pub cores_per_package: Option<u32>,
}

impl CpuTopology {
    /// Reads the topology from `/proc/cpuinfo`.
    #[cfg(target_os = "linux")]
    pub fn read() -> Result<Self, HostInfoError> {
        let file = std::fs::File::open("/proc/cpuinfo").map_err(|source| HostInfoError::Read {
            path: "/proc/cpuinfo",
            source,
        })?;
        Self::parse(io::BufReader::new(file))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read() -> Result<Self, HostInfoError> {
        Err(HostInfoError::Unsupported)
    }

    /// Parses `/proc/cpuinfo`-formatted text.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, HostInfoError> {
        let mut logical = 0u32;
        let mut cores = None;

        for line in reader.lines() {
            let line = line.map_err(|source| HostInfoError::Read {
                path: "/proc/cpuinfo",
                source,
            })?;
            if line.starts_with("processor") {
                logical += 1;
            } else if cores.is_none() && line.starts_with("cpu cores") {
                cores = line.split(':').nth(1).and_then(|v| v.trim().parse().ok());
            }
        }

        if logical == 0 {
            return Err(HostInfoError::MissingField {
                field: "processor",
                path: "/proc/cpuinfo",
            });
        }

        Ok(CpuTopology {
            logical_cpus: logical,
            cores_per_package: cores,
        })
    }
}

/// Peak and current resident set size of this process, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub peak_rss_kib: u64,
    pub current_rss_kib: u64,
}

impl MemoryUsage {
    /// Reads the usage counters from `/proc/self/status`.
    #[cfg(target_os = "linux")]
    pub fn read() -> Result<Self, HostInfoError> {
        let file =
            std::fs::File::open("/proc/self/status").map_err(|source| HostInfoError::Read {
                path: "/proc/self/status",
                source,
            })?;
        Self::parse(io::BufReader::new(file))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read() -> Result<Self, HostInfoError> {
        Err(HostInfoError::Unsupported)
    }

    /// Parses `/proc/self/status`-formatted text.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, HostInfoError> {
        let mut peak = None;
        let mut current = None;

        for line in reader.lines() {
            let line = line.map_err(|source| HostInfoError::Read {
                path: "/proc/self/status",
                source,
            })?;
            if let Some(rest) = line.strip_prefix("VmHWM:") {
                peak = parse_kib(rest);
            } else if let Some(rest) = line.strip_prefix("VmRSS:") {
                current = parse_kib(rest);
            }
        }

        match (peak, current) {
            (Some(peak_rss_kib), Some(current_rss_kib)) => Ok(MemoryUsage {
                peak_rss_kib,
                current_rss_kib,
            }),
            (None, _) => Err(HostInfoError::MissingField {
                field: "VmHWM",
                path: "/proc/self/status",
            }),
            (_, None) => Err(HostInfoError::MissingField {
                field: "VmRSS",
                path: "/proc/self/status",
            }),
        }
    }
}

fn parse_kib(value: &str) -> Option<u64> {
    value.trim().trim_end_matches("kB").trim().parse().ok()
}
