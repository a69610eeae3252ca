//! Serial transport layer for Modbus RTU communication
//!
//! [`SerialTransport`] owns the physical serial connection: line parameter
//! configuration, raw frame writes, silence-delimited frame reads with
//! byte/response timeouts, input flushing, and half-duplex RS-485
//! turnaround. The [`RtuLink`] trait abstracts these operations so the
//! transaction engine can run against a scripted link in tests.
//!
//! Frame boundaries on an RTU line are temporal: a response is complete
//! when the line has been quiet for longer than the byte timeout after at
//! least a minimum-length frame has arrived. The response timeout bounds
//! the wait for the first byte and is the caller's per-transaction
//! deadline.

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, trace, warn};

use crate::config::SerialConfig;
use crate::constants::{MAX_ADU_SIZE, MIN_ADU_SIZE};
use crate::error::{RtuError, RtuResult};

/// Lifecycle of a serial connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device held; `open`/`reopen` required before use
    Closed,
    /// Device held and believed usable
    Open,
    /// A transaction failed and left the link in an unknown state;
    /// calls fail fast until the link is reopened
    Degraded,
}

/// Transport layer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub timeouts: u64,
    pub reconnects: u64,
    pub input_flushes: u64,
}

/// Format raw bytes as hex for packet traces
fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Link operations the transaction engine drives.
///
/// Implemented by [`SerialTransport`] for real serial devices and by
/// scripted mocks in tests.
pub trait RtuLink: Send {
    /// Write a complete ADU and push it onto the wire
    fn write_frame(&mut self, bytes: &[u8]) -> impl Future<Output = RtuResult<()>> + Send;

    /// Read one ADU using the configured timeouts
    fn read_frame(&mut self) -> impl Future<Output = RtuResult<Vec<u8>>> + Send;

    /// Discard any unread bytes on the line
    fn flush_input(&mut self) -> impl Future<Output = RtuResult<()>> + Send;

    /// Close and reopen the device with the original configuration
    fn reopen(&mut self) -> impl Future<Output = RtuResult<()>> + Send;

    /// Release the device; a no-op when already closed
    fn close(&mut self) -> impl Future<Output = RtuResult<()>> + Send;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Mark the link Degraded after a surfaced link failure
    fn mark_degraded(&mut self);

    /// Communication statistics
    fn stats(&self) -> TransportStats;
}

/// Serial transport over a `tokio-serial` stream
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<SerialStream>,
    state: ConnectionState,
    stats: TransportStats,
}

impl SerialTransport {
    /// Open the configured device and apply its line parameters.
    ///
    /// Fails with [`RtuError::Configuration`] when the driver rejects the
    /// parameters and [`RtuError::DeviceUnavailable`] when the path cannot
    /// be opened.
    pub fn open(config: SerialConfig) -> RtuResult<Self> {
        config.validate()?;
        let port = Self::open_port(&config)?;
        debug!(path = %config.path, baud = config.baud_rate, "serial device opened");
        Ok(Self {
            config,
            port: Some(port),
            state: ConnectionState::Open,
            stats: TransportStats::default(),
        })
    }

    /// The configuration this transport was opened with
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn open_port(config: &SerialConfig) -> RtuResult<SerialStream> {
        let builder = tokio_serial::new(&config.path, config.baud_rate)
            .parity(config.parity)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .flow_control(tokio_serial::FlowControl::None);

        let mut port = builder.open_native_async().map_err(|e| match e.kind {
            tokio_serial::ErrorKind::InvalidInput => RtuError::configuration(format!(
                "serial parameters rejected for {}: {}",
                config.path, e
            )),
            _ => RtuError::device_unavailable(format!("failed to open {}: {}", config.path, e)),
        })?;

        if config.rs485 {
            // Idle in receive mode until the first write asserts RTS
            port.write_request_to_send(false).map_err(|e| {
                RtuError::configuration(format!(
                    "RTS control unavailable on {}: {}",
                    config.path, e
                ))
            })?;
        }

        Ok(port)
    }

    async fn write_frame_impl(&mut self, bytes: &[u8]) -> RtuResult<()> {
        let rs485 = self.config.rs485;
        let Self { port, stats, .. } = self;
        let port = port
            .as_mut()
            .ok_or_else(|| RtuError::connection("serial port is not open"))?;

        if rs485 {
            port.write_request_to_send(true)
                .map_err(|e| RtuError::io(format!("failed to assert RTS: {e}")))?;
        }

        trace!(frame = %format_hex(bytes), "TX");
        let result = async {
            port.write_all(bytes).await?;
            // Wait for the transmit buffer to drain before releasing the line
            port.flush().await
        }
        .await;

        if rs485 {
            // De-assert even when the write failed, or the line stays driven
            let _ = port.write_request_to_send(false);
        }

        result.map_err(|e| RtuError::io(format!("serial write failed: {e}")))?;
        stats.requests_sent += 1;
        stats.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    /// Read one frame with explicit limits, independent of the configured
    /// timeouts. The trait-level [`RtuLink::read_frame`] delegates here
    /// with the values from [`SerialConfig`].
    pub async fn read_frame_with(
        &mut self,
        max_bytes: usize,
        byte_timeout: Duration,
        response_timeout: Duration,
    ) -> RtuResult<Vec<u8>> {
        let Self { port, stats, .. } = self;
        let port = port
            .as_mut()
            .ok_or_else(|| RtuError::connection("serial port is not open"))?;

        let started = Instant::now();
        let mut buf = BytesMut::with_capacity(max_bytes.min(MAX_ADU_SIZE));
        let mut scratch = [0u8; MAX_ADU_SIZE];

        // The response timeout bounds the wait for the first byte
        let first = max_bytes.min(scratch.len());
        match timeout(response_timeout, port.read(&mut scratch[..first])).await {
            Ok(Ok(0)) => return Err(RtuError::connection("serial port closed during read")),
            Ok(Ok(n)) => buf.extend_from_slice(&scratch[..n]),
            Ok(Err(e)) => return Err(RtuError::io(format!("serial read failed: {e}"))),
            Err(_) => {
                stats.timeouts += 1;
                return Err(RtuError::timeout(response_timeout.as_millis() as u64, 0));
            }
        }

        // Then bytes accumulate until inter-byte silence ends the frame
        while buf.len() < max_bytes {
            let room = (max_bytes - buf.len()).min(scratch.len());
            match timeout(byte_timeout, port.read(&mut scratch[..room])).await {
                Ok(Ok(0)) => return Err(RtuError::connection("serial port closed during read")),
                Ok(Ok(n)) => buf.extend_from_slice(&scratch[..n]),
                Ok(Err(e)) => return Err(RtuError::io(format!("serial read failed: {e}"))),
                Err(_) => {
                    if buf.len() >= MIN_ADU_SIZE {
                        break;
                    }
                    // Silence before a plausible frame arrived: died mid-frame
                    stats.timeouts += 1;
                    return Err(RtuError::timeout(
                        started.elapsed().as_millis() as u64,
                        buf.len(),
                    ));
                }
            }
        }

        stats.responses_received += 1;
        stats.bytes_received += buf.len() as u64;
        trace!(frame = %format_hex(&buf), "RX");
        Ok(buf.to_vec())
    }

    async fn flush_input_impl(&mut self) -> RtuResult<()> {
        let Self { port, stats, .. } = self;
        let port = port
            .as_mut()
            .ok_or_else(|| RtuError::connection("serial port is not open"))?;
        port.clear(tokio_serial::ClearBuffer::Input)
            .map_err(|e| RtuError::io(format!("failed to clear input buffer: {e}")))?;
        stats.input_flushes += 1;
        debug!("serial input buffer flushed");
        Ok(())
    }

    async fn reopen_impl(&mut self) -> RtuResult<()> {
        self.port = None;
        self.state = ConnectionState::Closed;
        let port = Self::open_port(&self.config)?;
        self.port = Some(port);
        self.state = ConnectionState::Open;
        self.stats.reconnects += 1;
        warn!(path = %self.config.path, "serial device reopened");
        Ok(())
    }

    async fn close_impl(&mut self) -> RtuResult<()> {
        if self.port.take().is_some() {
            debug!(path = %self.config.path, "serial device closed");
        }
        self.state = ConnectionState::Closed;
        Ok(())
    }
}

impl RtuLink for SerialTransport {
    fn write_frame(&mut self, bytes: &[u8]) -> impl Future<Output = RtuResult<()>> + Send {
        self.write_frame_impl(bytes)
    }

    fn read_frame(&mut self) -> impl Future<Output = RtuResult<Vec<u8>>> + Send {
        let max_bytes = MAX_ADU_SIZE;
        let byte_timeout = self.config.byte_timeout;
        let response_timeout = self.config.response_timeout;
        self.read_frame_with(max_bytes, byte_timeout, response_timeout)
    }

    fn flush_input(&mut self) -> impl Future<Output = RtuResult<()>> + Send {
        self.flush_input_impl()
    }

    fn reopen(&mut self) -> impl Future<Output = RtuResult<()>> + Send {
        self.reopen_impl()
    }

    fn close(&mut self) -> impl Future<Output = RtuResult<()>> + Send {
        self.close_impl()
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn mark_degraded(&mut self) {
        if self.state != ConnectionState::Degraded {
            warn!(path = %self.config.path, "serial link degraded");
        }
        self.state = ConnectionState::Degraded;
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
