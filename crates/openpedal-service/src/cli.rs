//! Command line of `pedald`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use openpedal_calibration::Pedal;

#[derive(Debug, Parser)]
#[command(name = "pedald")]
#[command(about = "Pedal input daemon: reads the pedals, applies calibration, drives the virtual joystick")]
#[command(version)]
pub struct Cli {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file instead of the default location
    #[arg(long, global = true, env = "OPENPEDAL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the input pipeline until Ctrl+C
    Run {
        /// Use a simulated pedal device and no virtual joystick
        #[arg(long)]
        simulate: bool,

        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration_secs: Option<u64>,
    },

    /// Curve preset management
    #[command(subcommand)]
    Curves(CurveCommands),

    /// Calibration inspection
    #[command(subcommand)]
    Calibration(CalibrationCommands),

    /// Pedal device inspection
    #[command(subcommand)]
    Device(DeviceCommands),
}

#[derive(Debug, Subcommand)]
pub enum CurveCommands {
    /// List the curve presets of a pedal
    List {
        pedal: Pedal,
    },

    /// Print one curve preset as JSON
    Show {
        pedal: Pedal,
        name: String,
    },

    /// Delete a curve preset
    Delete {
        pedal: Pedal,
        name: String,
    },

    /// Write the built-in presets that are missing
    Seed,
}

#[derive(Debug, Subcommand)]
pub enum CalibrationCommands {
    /// Print the stored calibration, ranges, and axis mapping
    Show,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommands {
    /// Show the configured device and the attached HID devices
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_run_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["pedald", "run"])?;
        assert_eq!(cli.verbose, 0);
        assert!(matches!(
            cli.command,
            Commands::Run {
                simulate: false,
                duration_secs: None
            }
        ));
        Ok(())
    }

    #[test]
    fn test_parse_run_simulated_with_duration() -> TestResult {
        let cli = Cli::try_parse_from(["pedald", "-vv", "run", "--simulate", "--duration-secs", "5"])?;
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Run {
                simulate: true,
                duration_secs: Some(5)
            }
        ));
        Ok(())
    }

    #[test]
    fn test_parse_curve_commands() -> TestResult {
        let cli = Cli::try_parse_from(["pedald", "curves", "show", "Brake", "Threshold"])?;
        match cli.command {
            Commands::Curves(CurveCommands::Show { pedal, name }) => {
                assert_eq!(pedal, Pedal::Brake);
                assert_eq!(name, "Threshold");
            }
            other => return Err(format!("unexpected command {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_unknown_pedal_rejected() {
        assert!(Cli::try_parse_from(["pedald", "curves", "list", "gearstick"]).is_err());
    }

    #[test]
    fn test_global_config_flag() -> TestResult {
        let cli = Cli::try_parse_from(["pedald", "calibration", "show", "--config", "/tmp/pedals.json"])?;
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pedals.json")));
        Ok(())
    }
}
