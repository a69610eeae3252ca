//! Transaction engine and high-level RTU master
//!
//! [`RtuMaster`] drives one request/response exchange at a time over an
//! [`RtuLink`]: encode the request frame, write it, read the reply under
//! the configured timeouts, decode and cross-check it, and on failure let
//! the [`RecoveryPolicy`] decide between reopening the device, flushing
//! the line, or surfacing the error.
//!
//! Each call moves through Sending → AwaitingResponse → Validating; a
//! failure in any of those phases consults the recovery policy before the
//! call either retries from Sending or fails. `execute` takes `&mut self`,
//! so a connection can never carry two transactions at once and recovery
//! actions can never race an in-flight read.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ampere_rtu::{RecoveryMode, RtuMaster, RtuResult, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> RtuResult<()> {
//!     let config = SerialConfig::new("/dev/ttyUSB0", 9600);
//!     let mut master = RtuMaster::open_with_recovery(config, RecoveryMode::all())?;
//!
//!     // Read 4 coils from slave 35, starting at address 0
//!     let bits = master.read_coils(35, 0, 4).await?;
//!     println!("coils: {:?}", bits);
//!
//!     master.close().await?;
//!     Ok(())
//! }
//! ```

use tracing::{debug, warn};

use crate::address_space::AddressSpace;
use crate::config::SerialConfig;
use crate::constants::{BROADCAST_ADDRESS, EXCEPTION_FLAG, MAX_SLAVE_ADDRESS};
use crate::error::{RtuError, RtuResult};
use crate::frame::{self, Frame};
use crate::protocol::{ExceptionCode, FunctionCode, Request, Response, SlaveAddress};
use crate::recovery::{FailureClass, RecoveryAction, RecoveryMode, RecoveryPolicy, RetryBudget};
use crate::transport::{ConnectionState, RtuLink, SerialTransport, TransportStats};

/// Modbus RTU master bound to a single serial link
pub struct RtuMaster<L: RtuLink> {
    link: L,
    policy: RecoveryPolicy,
    address_space: AddressSpace,
}

impl RtuMaster<SerialTransport> {
    /// Open a serial device and bind a master to it, recovery disabled
    pub fn open(config: SerialConfig) -> RtuResult<Self> {
        Ok(Self::new(SerialTransport::open(config)?))
    }

    /// Open a serial device with the given recovery mode
    pub fn open_with_recovery(config: SerialConfig, mode: RecoveryMode) -> RtuResult<Self> {
        Ok(Self::new(SerialTransport::open(config)?).with_recovery(mode))
    }
}

impl<L: RtuLink> RtuMaster<L> {
    /// Bind a master to an already-open link
    pub fn new(link: L) -> Self {
        Self {
            link,
            policy: RecoveryPolicy::default(),
            address_space: AddressSpace::default(),
        }
    }

    /// Set the recovery mode flags
    pub fn with_recovery(mut self, mode: RecoveryMode) -> Self {
        self.policy = RecoveryPolicy::new(mode);
        self
    }

    /// Declare the device's address map for pre-flight validation
    pub fn with_address_space(mut self, address_space: AddressSpace) -> Self {
        self.address_space = address_space;
        self
    }

    /// Reference to the underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable reference to the underlying link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Communication statistics
    pub fn stats(&self) -> TransportStats {
        self.link.stats()
    }

    /// Close the link; safe to call repeatedly
    pub async fn close(&mut self) -> RtuResult<()> {
        self.link.close().await
    }

    /// Explicitly reopen a Closed or Degraded link
    pub async fn reopen(&mut self) -> RtuResult<()> {
        self.link.reopen().await
    }

    /// Execute one request/response transaction.
    ///
    /// Pre-flight checks (slave address range, address-space validation,
    /// request encoding) surface immediately; transport and validation
    /// failures go through the recovery policy with at most one retry per
    /// failure class. A slave exception comes back as
    /// [`RtuError::SlaveException`] with the link still Open.
    pub async fn execute(&mut self, request: &Request) -> RtuResult<Response> {
        self.ensure_open()?;
        validate_slave(request.slave)?;
        if request.is_broadcast() && !request.function.is_write() {
            return Err(RtuError::invalid_data(format!(
                "{} cannot be broadcast",
                request.function
            )));
        }
        self.address_space.validate(request)?;

        let payload = request.pdu_payload()?;
        let adu = frame::encode(request.slave, request.function.to_u8(), &payload)?;
        let reply_from = (!request.is_broadcast()).then_some(request.slave);

        self.transact(&adu, reply_from, &|reply: Option<&Frame>| match reply {
            // Broadcast writes complete at the wire; there is nothing to read
            None => Ok(Response::new(request.slave, request.function, Vec::new())),
            Some(reply) => {
                let function = FunctionCode::from_u8(reply.function_byte()).map_err(|_| {
                    RtuError::unexpected_response(format!(
                        "unknown function byte {:#04X} in response",
                        reply.function_byte()
                    ))
                })?;
                let response = Response::new(reply.slave(), function, reply.payload().to_vec());
                response.validate_against(request)?;
                Ok(response)
            }
        })
        .await
    }

    /// Send an arbitrary PDU and return the raw response payload.
    ///
    /// The frame still gets CRC and address validation and the recovery
    /// policy still applies, but no function-specific checks run. This is
    /// the escape hatch for vendor-specific function codes.
    pub async fn execute_raw(
        &mut self,
        slave: SlaveAddress,
        function: u8,
        payload: &[u8],
    ) -> RtuResult<Vec<u8>> {
        self.ensure_open()?;
        validate_slave(slave)?;
        let adu = frame::encode(slave, function, payload)?;
        let reply_from = (slave != BROADCAST_ADDRESS).then_some(slave);

        self.transact(&adu, reply_from, &|reply: Option<&Frame>| match reply {
            None => Ok(Vec::new()),
            Some(reply) => Ok(reply.payload().to_vec()),
        })
        .await
    }

    /// Run the send/receive/validate cycle under the recovery policy
    async fn transact<T, F>(
        &mut self,
        adu: &Frame,
        reply_from: Option<SlaveAddress>,
        validate: &F,
    ) -> RtuResult<T>
    where
        F: Fn(Option<&Frame>) -> RtuResult<T>,
    {
        let mut budget = RetryBudget::new();
        loop {
            match self.attempt(adu, reply_from, validate).await {
                Ok(value) => return Ok(value),
                // The link worked; the slave said no. Never retried.
                Err(err) if err.is_slave_exception() => return Err(err),
                Err(err) => match self.policy.decide(&err, &budget) {
                    RecoveryAction::Reconnect => {
                        budget.spend(FailureClass::Link);
                        warn!(error = %err, "link failure, reopening device for one retry");
                        if let Err(reopen_err) = self.link.reopen().await {
                            self.link.mark_degraded();
                            return Err(reopen_err);
                        }
                    }
                    RecoveryAction::FlushAndRetry => {
                        budget.spend(FailureClass::Protocol);
                        warn!(error = %err, "protocol failure, flushing input for one retry");
                        if let Err(flush_err) = self.link.flush_input().await {
                            self.link.mark_degraded();
                            return Err(flush_err);
                        }
                    }
                    RecoveryAction::Fail => {
                        if FailureClass::classify(&err) == Some(FailureClass::Link) {
                            self.link.mark_degraded();
                        }
                        return Err(err);
                    }
                },
            }
        }
    }

    /// One pass through Sending → AwaitingResponse → Validating
    async fn attempt<T, F>(
        &mut self,
        adu: &Frame,
        reply_from: Option<SlaveAddress>,
        validate: &F,
    ) -> RtuResult<T>
    where
        F: Fn(Option<&Frame>) -> RtuResult<T>,
    {
        debug!(
            slave = adu.slave(),
            function = adu.function_byte(),
            len = adu.len(),
            "sending request"
        );
        self.link.write_frame(adu.as_bytes()).await?;

        let Some(expected_slave) = reply_from else {
            debug!("broadcast sent, no response expected");
            return validate(None);
        };

        debug!(slave = expected_slave, "awaiting response");
        let raw = self.link.read_frame().await?;
        let reply = frame::decode(&raw, Some(expected_slave))?;

        if reply.is_exception() {
            let code = reply.exception_code().ok_or_else(|| {
                RtuError::unexpected_response("exception frame without exception code")
            })?;
            let function = reply.function_byte() & !EXCEPTION_FLAG;
            debug!(function, code, "slave returned exception");
            return Err(RtuError::SlaveException {
                function,
                code: ExceptionCode::from_u8(code),
            });
        }

        debug!(len = reply.len(), "validating response");
        validate(Some(&reply))
    }

    fn ensure_open(&self) -> RtuResult<()> {
        match self.link.state() {
            ConnectionState::Open => Ok(()),
            ConnectionState::Degraded => Err(RtuError::connection(
                "link is degraded; reopen it before issuing requests",
            )),
            ConnectionState::Closed => Err(RtuError::connection("link is closed")),
        }
    }

    // ===== Typed operations =====

    /// Read coils (function code 0x01)
    pub async fn read_coils(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        quantity: u16,
    ) -> RtuResult<Vec<bool>> {
        let request = Request::read_coils(slave, address, quantity);
        let response = self.execute(&request).await?;
        Ok(response
            .parse_bits()?
            .into_iter()
            .take(quantity as usize)
            .collect())
    }

    /// Read discrete inputs (function code 0x02)
    pub async fn read_discrete_inputs(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        quantity: u16,
    ) -> RtuResult<Vec<bool>> {
        let request = Request::read_discrete_inputs(slave, address, quantity);
        let response = self.execute(&request).await?;
        Ok(response
            .parse_bits()?
            .into_iter()
            .take(quantity as usize)
            .collect())
    }

    /// Read holding registers (function code 0x03)
    pub async fn read_holding_registers(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        quantity: u16,
    ) -> RtuResult<Vec<u16>> {
        let request = Request::read_holding_registers(slave, address, quantity);
        let response = self.execute(&request).await?;
        response.parse_registers()
    }

    /// Read input registers (function code 0x04)
    pub async fn read_input_registers(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        quantity: u16,
    ) -> RtuResult<Vec<u16>> {
        let request = Request::read_input_registers(slave, address, quantity);
        let response = self.execute(&request).await?;
        response.parse_registers()
    }

    /// Write a single coil (function code 0x05)
    pub async fn write_single_coil(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        value: bool,
    ) -> RtuResult<()> {
        let request = Request::write_single_coil(slave, address, value);
        self.execute(&request).await?;
        Ok(())
    }

    /// Write a single register (function code 0x06)
    pub async fn write_single_register(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        value: u16,
    ) -> RtuResult<()> {
        let request = Request::write_single_register(slave, address, value);
        self.execute(&request).await?;
        Ok(())
    }

    /// Diagnostics (function code 0x08).
    ///
    /// Returns the echoed sub-function and the returned data word (the
    /// request data for echo sub-functions, a counter or status otherwise).
    pub async fn diagnostics(
        &mut self,
        slave: SlaveAddress,
        sub_function: u16,
        data: u16,
    ) -> RtuResult<(u16, u16)> {
        let request = Request::diagnostics(slave, sub_function, data);
        let response = self.execute(&request).await?;
        let payload = response.data();
        Ok((
            u16::from_be_bytes([payload[0], payload[1]]),
            u16::from_be_bytes([payload[2], payload[3]]),
        ))
    }

    /// Write multiple coils (function code 0x0F)
    pub async fn write_multiple_coils(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        values: &[bool],
    ) -> RtuResult<()> {
        let request = Request::write_multiple_coils(slave, address, values);
        self.execute(&request).await?;
        Ok(())
    }

    /// Write multiple registers (function code 0x10)
    pub async fn write_multiple_registers(
        &mut self,
        slave: SlaveAddress,
        address: u16,
        values: &[u16],
    ) -> RtuResult<()> {
        let request = Request::write_multiple_registers(slave, address, values);
        self.execute(&request).await?;
        Ok(())
    }
}

fn validate_slave(slave: SlaveAddress) -> RtuResult<()> {
    if slave > MAX_SLAVE_ADDRESS {
        return Err(RtuError::invalid_data(format!(
            "slave address {slave} is reserved (valid: 0 broadcast, 1-{MAX_SLAVE_ADDRESS} unicast)"
        )));
    }
    Ok(())
}
