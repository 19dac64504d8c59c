// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application context and operator events
//!
//! A presentation layer translates operator input into [`Event`]s and
//! shows the text that [`AppContext::handle`] returns.

use std::{fmt, fmt::Write as _};

use crate::{
    address::{default_starting_address, max_quantity, resolve, AddressMode},
    config::Config,
    dataset::{DatasetError, DatasetStore, PREVIEW_ROWS},
    dispatch::{Connector, ModbusConnector, ReadDispatcher},
    outcome::{FailureKind, ReadOutcome},
    transport::TransportDescriptor,
    FunctionCode,
};

/// Default port of Modbus TCP.
pub const DEFAULT_TCP_PORT: u16 = 502;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    ModbusRtu,
    ModbusTcp,
    CsvImport,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Home => "Home",
            Self::ModbusRtu => "Modbus RTU",
            Self::ModbusTcp => "Modbus TCP",
            Self::CsvImport => "CSV Import",
        })
    }
}

/// Fields of a read form, each of them may still be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadForm {
    pub function: Option<u8>,
    pub start: Option<u32>,
    pub count: Option<u16>,
    pub address_mode: AddressMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Navigate(Page),
    ReadRtu {
        port: Option<String>,
        baud_rate: Option<u32>,
        form: ReadForm,
    },
    ReadTcp {
        host: Option<String>,
        port: Option<u16>,
        form: ReadForm,
    },
    Upload {
        filename: Option<String>,
        contents: Option<Vec<u8>>,
    },
    ReloadLast,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ReadOutcome> {
    value.ok_or_else(|| ReadOutcome::failure(FailureKind::MissingInput, format!("missing {field}")))
}

/// Everything that lives for the whole session of the operator.
#[derive(Debug)]
pub struct AppContext<C = ModbusConnector> {
    config: Config,
    dispatcher: ReadDispatcher<C>,
    datasets: DatasetStore,
}

impl AppContext {
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let connector = ModbusConnector::new(config.slave());
        Self::new(config, connector)
    }
}

impl<C> AppContext<C>
where
    C: Connector,
{
    pub fn new(config: Config, connector: C) -> Self {
        let dispatcher = ReadDispatcher::new(connector, config.modbus.timeouts());
        let datasets = DatasetStore::new(config.storage.upload_dir.clone());
        Self {
            config,
            dispatcher,
            datasets,
        }
    }

    /// Process a single event and render the operator notice.
    pub async fn handle(&self, event: Event) -> String {
        log::debug!("Handling {event:?}");
        match event {
            Event::Navigate(page) => self.render_page(page),
            Event::ReadRtu {
                port,
                baud_rate,
                form,
            } => self.read_rtu(port, baud_rate, form).await.to_string(),
            Event::ReadTcp { host, port, form } => {
                self.read_tcp(host, port, form).await.to_string()
            }
            Event::Upload { filename, contents } => self.upload(filename, contents),
            Event::ReloadLast => self.reload_last(),
        }
    }

    async fn read_rtu(
        &self,
        port: Option<String>,
        baud_rate: Option<u32>,
        form: ReadForm,
    ) -> ReadOutcome {
        let (port, baud_rate) = match (required(port, "port"), required(baud_rate, "baud rate")) {
            (Ok(port), Ok(baud_rate)) => (port, baud_rate),
            (Err(outcome), _) | (_, Err(outcome)) => return outcome,
        };
        if !self.config.serial.baud_rates.contains(&baud_rate) {
            log::warn!("Baud rate {baud_rate} is not one of the configured rates");
        }
        let transport = TransportDescriptor::serial(port, baud_rate);
        self.read(&transport, form).await
    }

    async fn read_tcp(&self, host: Option<String>, port: Option<u16>, form: ReadForm) -> ReadOutcome {
        let host = match required(host, "host") {
            Ok(host) => host,
            Err(outcome) => return outcome,
        };
        let transport = TransportDescriptor::network(host, port.unwrap_or(DEFAULT_TCP_PORT));
        self.read(&transport, form).await
    }

    /// Resolve the form and perform the read.
    pub async fn read(&self, transport: &TransportDescriptor, form: ReadForm) -> ReadOutcome {
        let ReadForm {
            function,
            start,
            count,
            address_mode,
        } = form;
        let (code, start, count) = match (
            required(function, "function code"),
            required(start, "starting address"),
            required(count, "count"),
        ) {
            (Ok(code), Ok(start), Ok(count)) => (code, start, count),
            (Err(outcome), _, _) | (_, Err(outcome), _) | (_, _, Err(outcome)) => return outcome,
        };
        let function = match FunctionCode::try_from(code) {
            Ok(function) => function,
            Err(err) => return ReadOutcome::failure(FailureKind::UnsupportedFunction, err.to_string()),
        };
        let offset = match resolve(function, address_mode, start) {
            Ok(offset) => offset,
            Err(err) => return ReadOutcome::failure(err.kind(), err.to_string()),
        };
        self.dispatcher
            .read_registers(transport, function, offset, count)
            .await
    }

    fn upload(&self, filename: Option<String>, contents: Option<Vec<u8>>) -> String {
        let (Some(filename), Some(contents)) = (filename, contents) else {
            return "No file uploaded.".to_owned();
        };
        match self.datasets.import(&filename, &contents) {
            Ok(dataset) => format!(
                "Uploaded File: {filename}\n{}",
                dataset.preview(PREVIEW_ROWS)
            ),
            Err(DatasetError::UnsupportedFormat { .. }) => "Unsupported file format.".to_owned(),
            Err(err) => {
                log::warn!("Failed to import {filename}: {err}");
                format!("Error processing file: {err}")
            }
        }
    }

    fn reload_last(&self) -> String {
        match self.datasets.load_last() {
            Ok(dataset) => format!("Reloaded Last File:\n{}", dataset.preview(PREVIEW_ROWS)),
            Err(DatasetError::NotFound) => "No previous file to reload.".to_owned(),
            Err(err) => format!("Error processing file: {err}"),
        }
    }

    fn render_page(&self, page: Page) -> String {
        let mut out = format!("== {page} ==\n");
        match page {
            Page::Home => {
                out.push_str(
                    "Read registers of Modbus RTU and Modbus TCP devices or import a CSV dataset.\n",
                );
                for page in [Page::ModbusRtu, Page::ModbusTcp, Page::CsvImport] {
                    let _ = writeln!(out, "  * {page}");
                }
            }
            Page::ModbusRtu => {
                let _ = writeln!(out, "Ports: {}", self.config.serial.ports.join(", "));
                let rates: Vec<String> = self
                    .config
                    .serial
                    .baud_rates
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                let _ = writeln!(out, "Baud rates: {}", rates.join(", "));
                self.render_functions(&mut out);
            }
            Page::ModbusTcp => {
                let _ = writeln!(out, "Port: {DEFAULT_TCP_PORT} (default)");
                self.render_functions(&mut out);
            }
            Page::CsvImport => {
                out.push_str("Upload a CSV or Excel (XLSX/XLS) file.\n");
                let _ = writeln!(out, "Upload directory: {}", self.datasets.dir().display());
                let last = if self.datasets.load_last().is_ok() {
                    "available"
                } else {
                    "none"
                };
                let _ = writeln!(out, "Last uploaded file: {last}");
            }
        }
        out
    }

    fn render_functions(&self, out: &mut String) {
        let _ = writeln!(out, "Unit id: {}", self.config.slave());
        out.push_str("Functions:\n");
        for function in FunctionCode::ALL {
            let _ = writeln!(
                out,
                "  {}: starting address {}, up to {} per read",
                function.label(),
                default_starting_address(function),
                max_quantity(function)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use async_trait::async_trait;

    use crate::{
        address::ProtocolOffset,
        dispatch::Session,
        Quantity,
    };

    use super::*;

    /// Device with holding registers `[0, 0, 11, 22, 33, 44, 55, 0, ...]`.
    #[derive(Default)]
    struct FakeDevice {
        opens: Arc<AtomicUsize>,
        refuse: bool,
    }

    struct FakeSession;

    #[async_trait]
    impl Connector for FakeDevice {
        async fn open(&self, _transport: &TransportDescriptor) -> io::Result<Box<dyn Session>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(io::ErrorKind::ConnectionRefused.into());
            }
            Ok(Box::new(FakeSession))
        }
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn read(
            &mut self,
            _function: FunctionCode,
            offset: ProtocolOffset,
            count: Quantity,
        ) -> crate::Result<Vec<u16>> {
            let mut memory = vec![0, 0, 11, 22, 33, 44, 55];
            memory.resize(0x1_0000, 0);
            let start = usize::from(offset);
            Ok(Ok(memory[start..start + usize::from(count)].to_vec()))
        }

        async fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn context(device: FakeDevice) -> (AppContext<FakeDevice>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        (AppContext::new(config, device), dir)
    }

    fn holding_form(start: u32, count: u16) -> ReadForm {
        ReadForm {
            function: Some(3),
            start: Some(start),
            count: Some(count),
            address_mode: AddressMode::Conventional,
        }
    }

    #[tokio::test]
    async fn read_tcp_renders_values() {
        // Given
        let (app, _dir) = context(FakeDevice::default());

        // When
        let text = app
            .handle(Event::ReadTcp {
                host: Some("127.0.0.1".to_owned()),
                port: None,
                form: holding_form(40_005, 3),
            })
            .await;

        // Then
        assert_eq!(text, "Data: [33, 44, 55]");
    }

    #[tokio::test]
    async fn read_rtu_with_raw_offset() {
        let (app, _dir) = context(FakeDevice::default());

        let text = app
            .handle(Event::ReadRtu {
                port: Some("COM3".to_owned()),
                baud_rate: Some(9600),
                form: ReadForm {
                    address_mode: AddressMode::Raw,
                    ..holding_form(2, 2)
                },
            })
            .await;

        assert_eq!(text, "Data: [11, 22]");
    }

    #[tokio::test]
    async fn refused_connection_names_transport() {
        let (app, _dir) = context(FakeDevice {
            refuse: true,
            ..FakeDevice::default()
        });

        let text = app
            .handle(Event::ReadRtu {
                port: Some("COM1".to_owned()),
                baud_rate: Some(19200),
                form: holding_form(40_001, 1),
            })
            .await;

        assert_eq!(text, "Unable to connect to RTU device.");
    }

    #[tokio::test]
    async fn incomplete_form_does_no_io() {
        // Given
        let device = FakeDevice::default();
        let opens = Arc::clone(&device.opens);
        let (app, _dir) = context(device);

        // When
        let text = app
            .handle(Event::ReadTcp {
                host: Some("127.0.0.1".to_owned()),
                port: Some(502),
                form: ReadForm {
                    count: None,
                    ..holding_form(40_001, 1)
                },
            })
            .await;

        // Then
        assert_eq!(text, "Error: missing count");
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_host_is_reported() {
        let (app, _dir) = context(FakeDevice::default());

        let text = app
            .handle(Event::ReadTcp {
                host: None,
                port: None,
                form: holding_form(40_001, 1),
            })
            .await;

        assert_eq!(text, "Error: missing host");
    }

    #[tokio::test]
    async fn address_outside_band_is_reported() {
        let (app, _dir) = context(FakeDevice::default());

        let text = app
            .handle(Event::ReadTcp {
                host: Some("plc".to_owned()),
                port: None,
                form: holding_form(30_001, 1),
            })
            .await;

        assert_eq!(
            text,
            "Error: address 30001 is outside of the holding registers range 40001..=49999"
        );
    }

    #[tokio::test]
    async fn unsupported_function_is_reported() {
        let (app, _dir) = context(FakeDevice::default());

        let text = app
            .handle(Event::ReadTcp {
                host: Some("plc".to_owned()),
                port: None,
                form: ReadForm {
                    function: Some(16),
                    ..holding_form(40_001, 1)
                },
            })
            .await;

        assert_eq!(text, "Error: unsupported function code: 16");
    }

    #[tokio::test]
    async fn upload_and_reload() {
        // Given
        let (app, _dir) = context(FakeDevice::default());

        // When
        let before = app.handle(Event::ReloadLast).await;
        let uploaded = app
            .handle(Event::Upload {
                filename: Some("meters.csv".to_owned()),
                contents: Some(b"meter,flow\nFT-101,12.5\n".to_vec()),
            })
            .await;
        let reloaded = app.handle(Event::ReloadLast).await;

        // Then
        assert_eq!(before, "No previous file to reload.");
        assert_eq!(uploaded, "Uploaded File: meters.csv\n    meter  flow\n0  FT-101  12.5");
        assert_eq!(reloaded, "Reloaded Last File:\n    meter  flow\n0  FT-101  12.5");
    }

    #[tokio::test]
    async fn rejected_uploads() {
        let (app, _dir) = context(FakeDevice::default());

        let none = app
            .handle(Event::Upload {
                filename: None,
                contents: None,
            })
            .await;
        let corrupt = app
            .handle(Event::Upload {
                filename: Some("meters.xlsx".to_owned()),
                contents: Some(vec![0x50, 0x4B]),
            })
            .await;
        let text = app
            .handle(Event::Upload {
                filename: Some("notes.txt".to_owned()),
                contents: Some(b"hi".to_vec()),
            })
            .await;

        assert_eq!(none, "No file uploaded.");
        assert!(corrupt.starts_with("Error processing file: "));
        assert_eq!(text, "Unsupported file format.");
    }

    #[tokio::test]
    async fn navigate_shows_prefill() {
        let (app, _dir) = context(FakeDevice::default());

        let rtu = app.handle(Event::Navigate(Page::ModbusRtu)).await;
        let home = app.handle(Event::Navigate(Page::Home)).await;
        let csv = app.handle(Event::Navigate(Page::CsvImport)).await;

        assert!(rtu.starts_with("== Modbus RTU ==\n"));
        assert!(rtu.contains("Ports: COM1, COM2,"));
        assert!(rtu.contains("Read Holding Registers (FC=3): starting address 40000, up to 125 per read"));
        assert!(rtu.contains("Read Coils (FC=1): starting address 1, up to 2000 per read"));
        assert!(home.contains("  * CSV Import"));
        assert!(csv.contains(&format!(
            "Upload directory: {}",
            app.config.storage.upload_dir.display()
        )));
        assert!(csv.contains("Last uploaded file: none"));
    }
}
