use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::art;

/// Ping with an ASCII-art animation and colorized replies
#[derive(Parser, Debug, Clone)]
#[command(name = "artping")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Target host (IP address or hostname)
    #[arg(required_unless_present = "version")]
    pub host: Option<String>,

    /// Number of packets to send
    #[arg(short = 'c', long = "count", default_value_t = art::BUILTIN_ART.len() as u64)]
    pub count: u64,

    /// Interval between packets in seconds
    #[arg(short = 'i', long = "interval", default_value_t = 1.0)]
    pub interval: f64,

    /// Reply timeout in seconds
    #[arg(long = "timeout", default_value_t = 3.0)]
    pub timeout: f64,

    /// Use raw sockets (privileged mode)
    #[arg(short = 'p', long = "privileged")]
    pub privileged: bool,

    /// Read art frames from a newline-delimited file instead of the built-in set
    #[arg(long = "art")]
    pub art: Option<PathBuf>,

    /// Suppress colorized output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

impl Args {
    /// Get packet interval as Duration
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Get reply timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("Count must be at least 1".into());
        }

        if self.interval <= 0.0 {
            return Err("Interval must be positive".into());
        }

        if self.timeout <= 0.0 {
            return Err("Timeout must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_host_parses() {
        let args = Args::try_parse_from(["artping", "127.0.0.1"]).unwrap();
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert!(!args.privileged);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_positional_args_rejected() {
        assert!(Args::try_parse_from(["artping"]).is_err());
    }

    #[test]
    fn test_two_positional_args_rejected() {
        assert!(Args::try_parse_from(["artping", "a.example", "b.example"]).is_err());
    }

    #[test]
    fn test_version_flag_needs_no_host() {
        let args = Args::try_parse_from(["artping", "-v"]).unwrap();
        assert!(args.version);
        assert!(args.host.is_none());
    }

    #[test]
    fn test_count_defaults_to_art_length() {
        let args = Args::try_parse_from(["artping", "localhost"]).unwrap();
        assert_eq!(args.count, art::BUILTIN_ART.len() as u64);
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let args = Args::try_parse_from(["artping", "-c", "0", "localhost"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_interval() {
        let args = Args::try_parse_from(["artping", "-i", "0", "localhost"]).unwrap();
        assert!(args.validate().is_err());
    }
}
