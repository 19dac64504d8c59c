// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A hand-written Modbus TCP device for integration tests.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Register memory `[0, 0, 11, 22, 33, 44, 55, 0, ...]`, 100 entries.
pub fn sample_registers() -> Vec<u16> {
    let mut registers = vec![0, 0, 11, 22, 33, 44, 55];
    registers.resize(100, 0);
    registers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answer every read from the register memory.
    Answer,
    /// Accept connections but never respond.
    Silent,
    /// Answer register reads with one register more than requested.
    Padded,
}

pub struct FakeDevice {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeDevice {
    pub async fn spawn(registers: Vec<u16>, behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let registers = Arc::new(registers);
        let task = {
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    let registers = Arc::clone(&registers);
                    tokio::spawn(serve(stream, registers, behavior));
                }
            })
        };
        Self {
            addr,
            connections,
            task,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, registers: Arc<Vec<u16>>, behavior: Behavior) {
    loop {
        let mut header = [0u8; 7];
        if stream.read_exact(&mut header).await.is_err() {
            // Client closed the connection.
            return;
        }
        let len = usize::from(u16::from_be_bytes([header[4], header[5]]));
        let mut request = vec![0u8; len - 1];
        if stream.read_exact(&mut request).await.is_err() {
            return;
        }
        if behavior == Behavior::Silent {
            continue;
        }

        let pdu = respond(&request, &registers, behavior == Behavior::Padded);
        let mut frame = Vec::with_capacity(7 + pdu.len());
        frame.extend_from_slice(&header[0..4]);
        frame.extend_from_slice(&u16::try_from(pdu.len() + 1).unwrap().to_be_bytes());
        frame.push(header[6]);
        frame.extend_from_slice(&pdu);
        if stream.write_all(&frame).await.is_err() {
            return;
        }
    }
}

fn respond(request: &[u8], registers: &[u16], padded: bool) -> Vec<u8> {
    let function = request[0];
    let start = usize::from(u16::from_be_bytes([request[1], request[2]]));
    let count = usize::from(u16::from_be_bytes([request[3], request[4]]));
    if start + count > registers.len() {
        return vec![function | 0x80, 0x02];
    }
    match function {
        0x03 | 0x04 => {
            let end = (start + count + usize::from(padded)).min(registers.len());
            let values = &registers[start..end];
            let mut pdu = vec![function, u8::try_from(values.len() * 2).unwrap()];
            for value in values {
                pdu.extend_from_slice(&value.to_be_bytes());
            }
            pdu
        }
        0x01 | 0x02 => {
            let values = &registers[start..start + count];
            let mut packed = vec![0u8; count.div_ceil(8)];
            for (i, value) in values.iter().enumerate() {
                if *value != 0 {
                    packed[i / 8] |= 1 << (i % 8);
                }
            }
            let mut pdu = vec![function, u8::try_from(packed.len()).unwrap()];
            pdu.extend_from_slice(&packed);
            pdu
        }
        _ => vec![function | 0x80, 0x01],
    }
}
