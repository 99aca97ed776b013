use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emu_core::logging::{LogCategory, LogConfig, LogLevel};
use emu_core::memory::MapDirection;
use emu_core::{Bus, Machine};
use emu_e01::{E01Config, E01System};
use emu_oric::{OricConfig, OricRoms, OricSystem};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "emu_cli", about = "Inspect Oric and E01 machines through their buses")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Core log level for every category: off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "off")]
    log_level: String,

    /// Per-category core log level as CATEGORY=LEVEL, e.g. fdc=debug
    #[arg(long = "log-category", global = true)]
    log_categories: Vec<String>,

    /// Write core logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the read and write windows after reset
    Map {
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Dump bytes through the bus
    Peek {
        #[command(flatten)]
        machine: MachineArgs,

        /// First address, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_number)]
        addr: u32,

        /// Number of bytes
        #[arg(default_value_t = 16)]
        len: u32,

        /// Register writes applied first, as ADDR=VALUE
        #[arg(long = "write")]
        writes: Vec<String>,
    },
    /// Write a save state as pretty JSON
    State {
        #[command(flatten)]
        machine: MachineArgs,

        /// Output file; standard output when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MachineKind {
    Oric,
    E01,
}

#[derive(clap::Args)]
struct MachineArgs {
    machine: MachineKind,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Oric model: oric1, atmos, telestrat
    #[arg(long)]
    model: Option<String>,

    /// Oric disk interface: none, microdisc, jasmin, apple2, apple2_v2
    #[arg(long)]
    interface: Option<String>,

    /// Oric: vertical sync on VIA CB1
    #[arg(long)]
    vsync_cable: bool,

    /// E01: front flap open
    #[arg(long)]
    front_flap_open: bool,

    /// E01: switch SW3 closed
    #[arg(long)]
    sw3: bool,

    /// OS ROM (Oric) or system ROM (E01); blank when omitted
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Oric disk interface ROM
    #[arg(long)]
    interface_rom: Option<PathBuf>,

    /// Disk image as MOUNT=PATH, e.g. Floppy0=games.dsk
    #[arg(long = "disk")]
    disks: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_core_logging(&args)?;

    match &args.command {
        Command::Map { machine } | Command::Peek { machine, .. } | Command::State { machine, .. } => {
            match machine.machine {
                MachineKind::Oric => run(build_oric(machine)?, machine, &args.command),
                MachineKind::E01 => run(build_e01(machine)?, machine, &args.command),
            }
        }
    }
}

fn configure_core_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    let level = LogLevel::from_str(&args.log_level).ok_or_else(|| anyhow!("Unknown log level: {}", args.log_level))?;
    config.set_global_level(level);

    for spec in &args.log_categories {
        let (category, level) = split_pair(spec)?;
        let category = LogCategory::from_str(category).ok_or_else(|| anyhow!("Unknown log category: {}", category))?;
        let level = LogLevel::from_str(level).ok_or_else(|| anyhow!("Unknown log level: {}", level))?;
        config.set_level(category, level);
    }

    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("Opening log file {}", path.display()))?;
    }
    Ok(())
}

fn build_oric(args: &MachineArgs) -> Result<OricSystem> {
    let mut config: OricConfig = match &args.config {
        Some(path) => OricConfig::from_json(&read_text(path)?)?,
        None => OricConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model = parse_enum(model)?;
    }
    if let Some(interface) = &args.interface {
        config.interface = parse_enum(interface)?;
    }
    config.vsync_cable |= args.vsync_cable;

    let os = load_rom(args.rom.as_deref(), config.os_rom_size(), "OS")?;
    let interface = match config.effective_interface().rom_size() {
        Some(size) => Some(load_rom(args.interface_rom.as_deref(), size, "interface")?),
        None => None,
    };
    log::info!("Oric {:?} with {:?} interface", config.model, config.effective_interface());
    Ok(OricSystem::new(config, OricRoms { os, interface })?)
}

fn build_e01(args: &MachineArgs) -> Result<E01System> {
    let mut config: E01Config = match &args.config {
        Some(path) => E01Config::from_json(&read_text(path)?)?,
        None => E01Config::default(),
    };
    config.front_flap_open |= args.front_flap_open;
    config.sw3 |= args.sw3;

    let rom = load_rom(args.rom.as_deref(), emu_e01::ROM_SIZE, "system")?;
    log::info!("E01 with {:?}", config);
    Ok(E01System::new(config, rom)?)
}

fn run<M: Machine>(mut machine: M, args: &MachineArgs, command: &Command) -> Result<()> {
    for disk in &args.disks {
        let (mount, path) = split_pair(disk)?;
        let data = fs::read(path).with_context(|| format!("Reading disk image {}", path))?;
        machine.mount(mount, &data)?;
        log::info!("Mounted {} in {}", path, mount);
    }
    machine.reset();

    match command {
        Command::Map { .. } => {
            for entry in machine.memory_map() {
                let direction = match entry.direction {
                    MapDirection::Read => "R",
                    MapDirection::Write => "W",
                };
                println!(
                    "{} {:04X}-{:04X} mirror {:04X}  {}",
                    direction, entry.start, entry.end, entry.mirror, entry.target
                );
            }
        }
        Command::Peek { addr, len, writes, .. } => {
            for write in writes {
                let (target, value) = split_pair(write)?;
                let target = parse_number(target).map_err(|e| anyhow!(e))?;
                let value = parse_number(value).map_err(|e| anyhow!(e))?;
                let value = u8::try_from(value).with_context(|| format!("Value {:#x} is not a byte", value))?;
                log::debug!("write {:04X} <- {:02X}", target, value);
                machine.write8(target, value);
            }
            let bytes: Vec<u8> = (0..*len).map(|i| machine.read8(addr.wrapping_add(i))).collect();
            for (row, chunk) in bytes.chunks(16).enumerate() {
                let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
                println!("{:04X}: {}", addr.wrapping_add(row as u32 * 16), hex.join(" "));
            }
        }
        Command::State { output, .. } => {
            let state = serde_json::to_string_pretty(&machine.save_state())?;
            match output {
                Some(path) => {
                    fs::write(path, state).with_context(|| format!("Writing {}", path.display()))?;
                    log::info!("Save state written to {}", path.display());
                }
                None => println!("{}", state),
            }
        }
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))
}

/// ROM image from `path`, or a blank one of the expected size.
fn load_rom(path: Option<&Path>, size: usize, name: &str) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("Reading {} ROM {}", name, path.display())),
        None => {
            log::warn!("No {} ROM given, using a blank {:#x} byte image", name, size);
            Ok(vec![0xFF; size])
        }
    }
}

/// A config enum by its JSON name, so flags accept what config files do.
fn parse_enum<T: DeserializeOwned>(name: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(name.to_lowercase()))
        .map_err(|_| anyhow!("Unknown value: {}", name))
}

fn split_pair(text: &str) -> Result<(&str, &str)> {
    text.split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got {}", text))
}

fn parse_number(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix('$')) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("Invalid number {}: {}", text, e))
}
