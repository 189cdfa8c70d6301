use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
    #[arg(long, help = "Load pool configuration from <CONFIG>.")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Bind the stratum listener to <ADDRESS>.")]
    pub address: Option<String>,

    #[arg(long, help = "Listen for miners on <PORT>.")]
    pub port: Option<u16>,

    #[arg(long, help = "Validate miner addresses against testnet patterns.")]
    pub testnet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::try_parse_from(["remora"]).unwrap();
        assert!(options.config.is_none());
        assert!(options.port.is_none());
        assert!(!options.testnet);
    }

    #[test]
    fn parse_overrides() {
        let options = Options::try_parse_from([
            "remora",
            "--config",
            "/etc/remora.toml",
            "--port",
            "13333",
            "--testnet",
        ])
        .unwrap();

        assert_eq!(options.config, Some(PathBuf::from("/etc/remora.toml")));
        assert_eq!(options.port, Some(13333));
        assert!(options.testnet);
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Options::try_parse_from(["remora", "--port", "nope"]).is_err());
    }
}
