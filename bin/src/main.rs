//! Huelva CLI binary.
//!
//! Runs the stages of the futures research pipeline over a `[bgn, stp)`
//! range of trading dates: universe, test returns, factors, factor tests,
//! weight optimization and signals.

mod cmd;
mod config;
mod fanout;
mod project;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::Run;
use config::{DEFAULT_CONFIG, ProjectConfig};
use huelva::eval::TestKind;
use project::Project;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huelva")]
#[command(about = "Factor research, testing and signal combination for futures", long_about = None)]
#[command(version)]
struct Cli {
    /// Project file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// First trading date (YYYYMMDD)
    #[arg(long, global = true)]
    bgn: Option<String>,

    /// Stop trading date, exclusive (YYYYMMDD, defaults to the last session)
    #[arg(long, global = true)]
    stp: Option<String>,

    /// Debug logging and detailed listings
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run units one after the other
    #[arg(long, global = true)]
    nomp: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the available universe
    Available,

    /// Compute cross-section statistics and the weight throttle
    Css,

    /// Compute forward test returns
    TestReturn,

    /// Estimate instrument covariances
    Covariance,

    /// Compute factor families per instrument
    Factor {
        /// Factor class (all configured classes when omitted)
        #[arg(long)]
        fclass: Option<String>,

        /// Stop at the first failing instrument instead of isolating it
        #[arg(long)]
        abort: bool,
    },

    /// Test factors against forward returns
    Qtest {
        /// Test kind (ic, vt, ot)
        #[arg(long)]
        kind: TestKind,

        /// Factor class (all configured classes when omitted)
        #[arg(long)]
        fclass: Option<String>,

        /// Volatility-adjusted variant
        #[arg(long)]
        weighted: bool,
    },

    /// Optimize strategy factor weights
    Optimize {
        /// Strategy (all configured strategies when omitted)
        #[arg(long)]
        strategy: Option<String>,

        /// Optimization method (vt, eq)
        #[arg(long, default_value = "vt")]
        method: String,
    },

    /// Build instrument weight signals
    Signals {
        #[command(subcommand)]
        target: SignalTarget,
    },

    /// Summarize factor tests by year
    Report {
        /// Test kind (ic, vt, ot)
        #[arg(long)]
        kind: TestKind,

        /// Factor class (all configured classes when omitted)
        #[arg(long)]
        fclass: Option<String>,

        /// Volatility-adjusted variant
        #[arg(long)]
        weighted: bool,
    },

    /// Cross-sectional rank correlation of two factors
    Fcorr {
        /// First factor name
        #[arg(long)]
        f0: String,

        /// Second factor name
        #[arg(long)]
        f1: String,
    },

    /// List registered factor classes
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum SignalTarget {
    /// Rank weights of each factor
    Factors {
        /// Factor class (all configured classes when omitted)
        #[arg(long)]
        fclass: Option<String>,
    },

    /// Optimized, risk-balanced and throttled strategy weights
    Strategies {
        /// Strategy (all configured strategies when omitted)
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Strategy weights blended per portfolio
    Portfolios {
        /// Portfolio (all configured portfolios when omitted)
        #[arg(long)]
        portfolio: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::List { category } = &cli.command {
        return cmd::list::list_factors(category.as_deref(), cli.verbose);
    }

    let config = ProjectConfig::from_file(&cli.config)?;
    let project = Arc::new(Project::open(config)?);
    let run = Run::new(project, cli.bgn, cli.stp, !cli.nomp)?;

    match cli.command {
        Commands::Available => cmd::data::available(&run).await,
        Commands::Css => cmd::data::css(&run).await,
        Commands::TestReturn => cmd::data::test_returns(&run).await,
        Commands::Covariance => cmd::data::covariance(&run).await,
        Commands::Factor { fclass, abort } => cmd::factor::factors(&run, fclass, abort).await,
        Commands::Qtest {
            kind,
            fclass,
            weighted,
        } => cmd::qtest::qtest(&run, kind, fclass, weighted).await,
        Commands::Optimize { strategy, method } => {
            cmd::combine::optimize(&run, strategy, &method).await
        }
        Commands::Signals { target } => match target {
            SignalTarget::Factors { fclass } => cmd::combine::factor_signals(&run, fclass).await,
            SignalTarget::Strategies { strategy } => {
                cmd::combine::strategy_signals(&run, strategy).await
            }
            SignalTarget::Portfolios { portfolio } => {
                cmd::combine::portfolio_signals(&run, portfolio).await
            }
        },
        Commands::Report {
            kind,
            fclass,
            weighted,
        } => cmd::qtest::report(&run, kind, fclass, weighted).await,
        Commands::Fcorr { f0, f1 } => cmd::qtest::fcorr(&run, &f0, &f1),
        Commands::List { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_qtest() {
        let cli = Cli::try_parse_from([
            "huelva", "--bgn", "20240102", "qtest", "--kind", "vt", "--fclass", "KURT",
            "--weighted",
        ])
        .unwrap();
        assert_eq!(cli.bgn.as_deref(), Some("20240102"));
        assert!(!cli.nomp);
        match cli.command {
            Commands::Qtest {
                kind,
                fclass,
                weighted,
            } => {
                assert_eq!(kind, TestKind::Vt);
                assert_eq!(fclass.as_deref(), Some("KURT"));
                assert!(weighted);
            }
            _ => panic!("expected qtest"),
        }
    }

    #[test]
    fn test_parse_signals_and_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "huelva", "signals", "strategies", "--bgn", "20240102", "--nomp",
        ])
        .unwrap();
        assert!(cli.nomp);
        assert!(matches!(
            cli.command,
            Commands::Signals {
                target: SignalTarget::Strategies { strategy: None }
            }
        ));
    }

    #[test]
    fn test_invalid_test_kind_is_rejected() {
        assert!(Cli::try_parse_from(["huelva", "qtest", "--kind", "xx"]).is_err());
    }
}
