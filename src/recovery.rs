//! Link and protocol error recovery policy
//!
//! Transport failures are sorted into two classes. A *link* failure means
//! the device itself stopped cooperating: an I/O error, a lost connection,
//! or a timeout where the slave never sent a byte. A *protocol* failure
//! means the line carried something, but not a usable frame: a CRC
//! mismatch, a short or garbled frame, a reply from the wrong address, or
//! a response that died mid-frame.
//!
//! [`RecoveryPolicy::decide`] maps a failure to an action under the
//! configured [`RecoveryMode`] flags and the per-call [`RetryBudget`]:
//! reopen the device and retry (link), flush stale input and retry
//! (protocol), or surface the error. Each class gets at most one retry per
//! call. Request-shape errors and slave exceptions are never retried.

use tracing::debug;

use crate::error::RtuError;

/// Independently togglable recovery flags, both off by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryMode {
    /// Reopen the serial device on link-level failure
    pub link: bool,
    /// Flush stale bytes and retry on frame/CRC/timeout failure
    pub protocol: bool,
}

impl RecoveryMode {
    /// No recovery: every failure surfaces immediately
    pub fn none() -> Self {
        Self::default()
    }

    /// Both link and protocol recovery enabled
    pub fn all() -> Self {
        Self {
            link: true,
            protocol: true,
        }
    }

    /// Set the link recovery flag
    pub fn with_link(mut self, enabled: bool) -> Self {
        self.link = enabled;
        self
    }

    /// Set the protocol recovery flag
    pub fn with_protocol(mut self, enabled: bool) -> Self {
        self.protocol = enabled;
        self
    }
}

/// The two recoverable failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Device I/O error, lost connection, or timeout with zero bytes
    Link,
    /// Checksum/garbled frame, wrong-address reply, or timeout mid-frame
    Protocol,
}

impl FailureClass {
    /// Classify an error, or `None` for errors that are never retried
    /// (malformed requests, pre-flight rejections, slave exceptions).
    pub fn classify(error: &RtuError) -> Option<Self> {
        match error {
            RtuError::Io { .. }
            | RtuError::Connection { .. }
            | RtuError::DeviceUnavailable { .. } => Some(FailureClass::Link),
            RtuError::Timeout { bytes_received, .. } => {
                if *bytes_received == 0 {
                    Some(FailureClass::Link)
                } else {
                    Some(FailureClass::Protocol)
                }
            }
            RtuError::Checksum { .. }
            | RtuError::ShortFrame { .. }
            | RtuError::AddressMismatch { .. }
            | RtuError::UnexpectedResponse { .. } => Some(FailureClass::Protocol),
            RtuError::Configuration { .. }
            | RtuError::AddressRange { .. }
            | RtuError::Encoding { .. }
            | RtuError::SlaveException { .. }
            | RtuError::InvalidFunction { .. }
            | RtuError::InvalidData { .. } => None,
        }
    }
}

/// What the transaction engine should do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Close and reopen the serial device, then retry the transaction
    Reconnect,
    /// Flush unread bytes off the line, then retry the transaction
    FlushAndRetry,
    /// Surface the error to the caller
    Fail,
}

/// Per-call retry budget: exactly one retry per failure class
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryBudget {
    link_spent: bool,
    protocol_spent: bool,
}

impl RetryBudget {
    /// Fresh budget for a new transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the class still has its retry
    pub fn available(&self, class: FailureClass) -> bool {
        match class {
            FailureClass::Link => !self.link_spent,
            FailureClass::Protocol => !self.protocol_spent,
        }
    }

    /// Consume the class's retry
    pub fn spend(&mut self, class: FailureClass) {
        match class {
            FailureClass::Link => self.link_spent = true,
            FailureClass::Protocol => self.protocol_spent = true,
        }
    }
}

/// Decides, per failure class, whether to reconnect, flush-and-retry, or fail
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryPolicy {
    mode: RecoveryMode,
}

impl RecoveryPolicy {
    /// Create a policy from the given mode flags
    pub fn new(mode: RecoveryMode) -> Self {
        Self { mode }
    }

    /// The configured mode flags
    pub fn mode(&self) -> RecoveryMode {
        self.mode
    }

    /// Map a failure to the action the engine should take
    pub fn decide(&self, error: &RtuError, budget: &RetryBudget) -> RecoveryAction {
        let action = match FailureClass::classify(error) {
            Some(FailureClass::Link) if self.mode.link && budget.available(FailureClass::Link) => {
                RecoveryAction::Reconnect
            }
            Some(FailureClass::Protocol)
                if self.mode.protocol && budget.available(FailureClass::Protocol) =>
            {
                RecoveryAction::FlushAndRetry
            }
            _ => RecoveryAction::Fail,
        };
        debug!(error = %error, ?action, "recovery decision");
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ExceptionCode;

    fn checksum_error() -> RtuError {
        RtuError::Checksum {
            expected: 0x1234,
            actual: 0x4321,
        }
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(
            FailureClass::classify(&RtuError::io("read failed")),
            Some(FailureClass::Link)
        );
        assert_eq!(
            FailureClass::classify(&RtuError::timeout(500, 0)),
            Some(FailureClass::Link)
        );
        assert_eq!(
            FailureClass::classify(&RtuError::timeout(500, 3)),
            Some(FailureClass::Protocol)
        );
        assert_eq!(
            FailureClass::classify(&checksum_error()),
            Some(FailureClass::Protocol)
        );
        assert_eq!(
            FailureClass::classify(&RtuError::ShortFrame { len: 2 }),
            Some(FailureClass::Protocol)
        );
        assert_eq!(
            FailureClass::classify(&RtuError::address_range("too many")),
            None
        );
        assert_eq!(
            FailureClass::classify(&RtuError::SlaveException {
                function: 0x01,
                code: ExceptionCode::SlaveDeviceBusy,
            }),
            None
        );
    }

    #[test]
    fn test_all_flags_off_surfaces_everything() {
        let policy = RecoveryPolicy::new(RecoveryMode::none());
        let budget = RetryBudget::new();
        assert_eq!(
            policy.decide(&RtuError::timeout(500, 0), &budget),
            RecoveryAction::Fail
        );
        assert_eq!(
            policy.decide(&checksum_error(), &budget),
            RecoveryAction::Fail
        );
    }

    #[test]
    fn test_flags_select_their_class_only() {
        // LinkRecovery on, ProtocolRecovery off: checksum failures surface
        let policy = RecoveryPolicy::new(RecoveryMode::none().with_link(true));
        let budget = RetryBudget::new();
        assert_eq!(
            policy.decide(&RtuError::timeout(500, 0), &budget),
            RecoveryAction::Reconnect
        );
        assert_eq!(
            policy.decide(&checksum_error(), &budget),
            RecoveryAction::Fail
        );

        let policy = RecoveryPolicy::new(RecoveryMode::none().with_protocol(true));
        assert_eq!(
            policy.decide(&checksum_error(), &budget),
            RecoveryAction::FlushAndRetry
        );
        assert_eq!(
            policy.decide(&RtuError::io("gone"), &budget),
            RecoveryAction::Fail
        );
    }

    #[test]
    fn test_budget_is_one_retry_per_class() {
        let policy = RecoveryPolicy::new(RecoveryMode::all());
        let mut budget = RetryBudget::new();

        assert_eq!(
            policy.decide(&checksum_error(), &budget),
            RecoveryAction::FlushAndRetry
        );
        budget.spend(FailureClass::Protocol);
        assert_eq!(
            policy.decide(&checksum_error(), &budget),
            RecoveryAction::Fail
        );

        // The link class keeps its own retry
        assert_eq!(
            policy.decide(&RtuError::io("gone"), &budget),
            RecoveryAction::Reconnect
        );
        budget.spend(FailureClass::Link);
        assert_eq!(
            policy.decide(&RtuError::io("gone"), &budget),
            RecoveryAction::Fail
        );
    }

    #[test]
    fn test_never_retried_errors() {
        let policy = RecoveryPolicy::new(RecoveryMode::all());
        let budget = RetryBudget::new();
        assert_eq!(
            policy.decide(&RtuError::address_range("2001 bits"), &budget),
            RecoveryAction::Fail
        );
        assert_eq!(
            policy.decide(
                &RtuError::SlaveException {
                    function: 0x03,
                    code: ExceptionCode::IllegalDataAddress,
                },
                &budget
            ),
            RecoveryAction::Fail
        );
    }
}
