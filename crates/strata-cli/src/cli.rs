use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata — hierarchical replica storage middleware",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Topology and vault configuration file.
    #[arg(long, global = true, default_value = "strata.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest a local file as a data object
    Put(PutArgs),
    /// Print the recorded checksum of an object (empty if none)
    Checksum(ChecksumArgs),
    /// List objects, or the replicas of one object
    Ls(LsArgs),
    /// Render the resource hierarchy
    Lsresc(LsrescArgs),
    /// Remove an object and its replica bytes
    Rm(RmArgs),
}

#[derive(Args)]
pub struct PutArgs {
    /// Local file to read.
    pub file: PathBuf,
    /// Destination logical path.
    pub path: String,
    /// Target resource.
    #[arg(short = 'R', long = "resource")]
    pub resource: String,
    /// Register a checksum computed from the source stream.
    #[arg(short = 'k', long = "register", conflicts_with = "verify")]
    pub register: bool,
    /// Verify the stored bytes against the source checksum.
    #[arg(short = 'K', long = "verify")]
    pub verify: bool,
    /// Overwrite an existing object.
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

#[derive(Args)]
pub struct ChecksumArgs {
    pub path: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct LsrescArgs {}

#[derive(Args)]
pub struct RmArgs {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put_with_flags() {
        let cli = Cli::try_parse_from([
            "strata", "put", "-R", "demo_resc", "-K", "-f", "local.dat", "/zone/home/obj",
        ])
        .unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.resource, "demo_resc");
            assert!(args.verify);
            assert!(!args.register);
            assert!(args.force);
            assert_eq!(args.path, "/zone/home/obj");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_put_register() {
        let cli =
            Cli::try_parse_from(["strata", "put", "-R", "r", "-k", "f", "/zone/obj"]).unwrap();
        if let Command::Put(args) = cli.command {
            assert!(args.register);
            assert!(!args.verify);
            assert!(!args.force);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn register_and_verify_conflict() {
        assert!(
            Cli::try_parse_from(["strata", "put", "-R", "r", "-k", "-K", "f", "/zone/obj"])
                .is_err()
        );
    }

    #[test]
    fn parse_checksum() {
        let cli = Cli::try_parse_from(["strata", "checksum", "/zone/obj"]).unwrap();
        if let Command::Checksum(args) = cli.command {
            assert_eq!(args.path, "/zone/obj");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_variants() {
        let cli = Cli::try_parse_from(["strata", "ls"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert!(args.path.is_none());
        } else {
            panic!("wrong command");
        }

        let cli = Cli::try_parse_from(["strata", "ls", "/zone/obj"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.path.as_deref(), Some("/zone/obj"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_config_override() {
        let cli =
            Cli::try_parse_from(["strata", "--config", "/etc/strata.toml", "lsresc"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/strata.toml"));
        assert!(matches!(cli.command, Command::Lsresc(_)));
    }
}
