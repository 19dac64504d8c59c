// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line front-end

use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use modbus_probe::{
    address::AddressMode,
    app::{AppContext, Event, Page, ReadForm},
    config::Config,
};

/// Read registers of Modbus RTU and TCP devices
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory that keeps the last uploaded dataset
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Slave (unit) id of the device
    #[arg(long, global = true)]
    unit_id: Option<u8>,

    /// Connect and read timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a page with its choices and form defaults
    Page {
        #[arg(value_enum, default_value_t = PageArg::Home)]
        page: PageArg,
    },

    /// Read from a serial (RTU) device
    Rtu {
        /// Serial port, e.g. COM3 or /dev/ttyUSB0
        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        baud_rate: Option<u32>,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Read from a Modbus TCP device
    Tcp {
        #[arg(long)]
        host: Option<String>,

        /// Defaults to 502
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        read: ReadArgs,
    },

    /// Import a CSV or XLSX dataset
    Import {
        /// File to upload
        file: Option<PathBuf>,
    },

    /// Show the last imported dataset again
    Reload,
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Function code: 1 coils, 2 discrete inputs, 3 holding registers, 4 input registers
    #[arg(short = 'f', long)]
    function: Option<u8>,

    /// Starting address, e.g. 40001
    #[arg(short = 's', long)]
    start: Option<u32>,

    /// Number of registers or bits to read
    #[arg(short = 'n', long)]
    count: Option<u16>,

    /// Treat the starting address as 0-based protocol offset
    #[arg(long)]
    raw: bool,
}

impl From<ReadArgs> for ReadForm {
    fn from(args: ReadArgs) -> Self {
        let ReadArgs {
            function,
            start,
            count,
            raw,
        } = args;
        Self {
            function,
            start,
            count,
            address_mode: if raw {
                AddressMode::Raw
            } else {
                AddressMode::Conventional
            },
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PageArg {
    Home,
    Rtu,
    Tcp,
    Csv,
}

impl From<PageArg> for Page {
    fn from(page: PageArg) -> Self {
        match page {
            PageArg::Home => Page::Home,
            PageArg::Rtu => Page::ModbusRtu,
            PageArg::Tcp => Page::ModbusTcp,
            PageArg::Csv => Page::CsvImport,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(upload_dir) = &cli.upload_dir {
        config.storage.upload_dir.clone_from(upload_dir);
    }
    if let Some(unit_id) = cli.unit_id {
        config.modbus.unit_id = unit_id;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.modbus.connect_timeout_ms = timeout_ms;
        config.modbus.read_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

fn upload_event(file: Option<PathBuf>) -> anyhow::Result<Event> {
    let Some(path) = file else {
        return Ok(Event::Upload {
            filename: None,
            contents: None,
        });
    };
    let contents =
        fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    Ok(Event::Upload {
        filename,
        contents: Some(contents),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let app = AppContext::from_config(config);

    let event = match cli.command {
        Command::Page { page } => Event::Navigate(page.into()),
        Command::Rtu {
            port,
            baud_rate,
            read,
        } => Event::ReadRtu {
            port,
            baud_rate,
            form: read.into(),
        },
        Command::Tcp { host, port, read } => Event::ReadTcp {
            host,
            port,
            form: read.into(),
        },
        Command::Import { file } => upload_event(file)?,
        Command::Reload => Event::ReloadLast,
    };

    println!("{}", app.handle(event).await);
    Ok(())
}
