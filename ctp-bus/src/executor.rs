//! Blocking transaction executor.
//!
//! Every transaction is attempted up to [`RETRY_COUNT`] times. An attempt
//! starts the transfer, polls the controller every [`POLL_DELAY_MS`] until it
//! is no longer busy (at most [`POLL_COUNT`] polls) and classifies the final
//! status. Failed attempts are followed by a controller recovery, except when
//! the transfer could not be started at all.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::SevenBitAddress;

use crate::controller::{BusController, ControllerStatus, Transfer};
use crate::err::TransportError;

/// Attempts per transaction before giving up.
pub const RETRY_COUNT: u8 = 5;
/// Status polls per attempt.
pub const POLL_COUNT: u8 = 5;
/// Delay between two status polls.
pub const POLL_DELAY_MS: u32 = 1;

/// Runs complete write and read transactions on a [`BusController`].
pub struct BusTransactionExecutor<B, D> {
    bus: B,
    delay: D,
}

impl<B, D> BusTransactionExecutor<B, D>
where
    B: BusController,
    D: DelayNs,
{
    /// Creates a new executor.
    ///
    /// # Arguments
    ///
    /// * `bus` - A configured and enabled bus controller.
    /// * `delay` - The delay provider used between status polls.
    pub fn new(bus: B, delay: D) -> Self {
        Self { bus, delay }
    }

    /// Writes all of `bytes` to the target at `address`.
    ///
    /// The write only succeeds if the controller reports every byte as
    /// transferred.
    pub fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
    ) -> Result<(), TransportError<B::Error>> {
        self.execute(&mut Transfer::write(address, bytes))
    }

    /// Fills `buffer` with bytes read from the target at `address`.
    ///
    /// The content of `buffer` is unspecified if an error is returned.
    pub fn read(
        &mut self,
        address: SevenBitAddress,
        buffer: &mut [u8],
    ) -> Result<(), TransportError<B::Error>> {
        self.execute(&mut Transfer::read(address, buffer))
    }

    /// Returns the bus controller and delay provider.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn execute(&mut self, transfer: &mut Transfer<'_>) -> Result<(), TransportError<B::Error>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.attempt(transfer) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            log::warn!(
                "i2c 0x{:02X}: attempt {attempt}/{RETRY_COUNT} failed: {err:?}",
                transfer.address
            );
            if attempt >= RETRY_COUNT {
                log::error!(
                    "i2c 0x{:02X}: giving up after {RETRY_COUNT} attempts",
                    transfer.address
                );
                return Err(err);
            }
        }
    }

    fn attempt(&mut self, transfer: &mut Transfer<'_>) -> Result<(), TransportError<B::Error>> {
        // Nothing reached the bus, so there is nothing to recover from.
        self.bus.start(transfer).map_err(TransportError::Issue)?;

        let status = self.wait_for_completion(transfer);
        if self.completed(transfer, status) {
            return Ok(());
        }

        log::debug!("i2c 0x{:02X}: recovering controller", transfer.address);
        self.bus.recover();
        Err(TransportError::Fault(status))
    }

    fn wait_for_completion(&mut self, transfer: &mut Transfer<'_>) -> ControllerStatus {
        let mut status = self.bus.status(transfer);
        let mut polls = 1;
        while status.busy() && polls < POLL_COUNT {
            self.delay.delay_ms(POLL_DELAY_MS);
            status = self.bus.status(transfer);
            polls += 1;
        }
        if status.busy() {
            // The last poll also gets its full time slot.
            self.delay.delay_ms(POLL_DELAY_MS);
            log::trace!("i2c 0x{:02X}: still busy after {polls} polls", transfer.address);
        }
        status
    }

    fn completed(&mut self, transfer: &Transfer<'_>, status: ControllerStatus) -> bool {
        // A transfer still running after the poll budget counts as stalled.
        if status.busy() || status.is_error() {
            return false;
        }
        if transfer.is_write() {
            let transferred = self.bus.transfer_count();
            if transferred != transfer.len() {
                log::trace!(
                    "i2c 0x{:02X}: short write, {transferred} of {} bytes",
                    transfer.address,
                    transfer.len()
                );
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TransferBuffer;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Refused;

    /// How one started transfer plays out.
    #[derive(Clone, Copy)]
    struct Attempt {
        busy_polls: usize,
        status: ControllerStatus,
        count: Option<usize>,
    }

    impl Attempt {
        fn ok() -> Self {
            Self {
                busy_polls: 0,
                status: ControllerStatus::idle(),
                count: None,
            }
        }

        fn with_status(status: ControllerStatus) -> Self {
            Self {
                status,
                ..Self::ok()
            }
        }
    }

    #[derive(Default)]
    struct ScriptedBus {
        refused_starts: usize,
        script: Vec<Attempt>,
        fill: u8,
        starts: usize,
        running: usize,
        polls: usize,
        polls_this_attempt: usize,
        last_len: usize,
        disables: usize,
        enables: usize,
    }

    impl ScriptedBus {
        fn current(&self) -> Attempt {
            let index = self.running.saturating_sub(1);
            self.script
                .get(index)
                .or(self.script.last())
                .copied()
                .unwrap_or_else(Attempt::ok)
        }
    }

    impl BusController for ScriptedBus {
        type Error = Refused;

        fn start(&mut self, transfer: &mut Transfer<'_>) -> Result<(), Self::Error> {
            self.starts += 1;
            if self.refused_starts > 0 {
                self.refused_starts -= 1;
                return Err(Refused);
            }
            self.running += 1;
            self.polls_this_attempt = 0;
            self.last_len = transfer.len();
            Ok(())
        }

        fn status(&mut self, transfer: &mut Transfer<'_>) -> ControllerStatus {
            self.polls += 1;
            self.polls_this_attempt += 1;
            let attempt = self.current();
            if self.polls_this_attempt <= attempt.busy_polls {
                return ControllerStatus::in_progress();
            }
            if let TransferBuffer::Read(buffer) = &mut transfer.buffer {
                buffer.fill(self.fill);
            }
            attempt.status
        }

        fn transfer_count(&mut self) -> usize {
            self.current().count.unwrap_or(self.last_len)
        }

        fn disable(&mut self) {
            self.disables += 1;
        }

        fn enable(&mut self) {
            assert_eq!(self.enables + 1, self.disables, "enable without disable");
            self.enables += 1;
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.ms += ms;
        }
    }

    fn run<F>(bus: &mut ScriptedBus, delay: &mut CountingDelay, op: F) -> Result<(), TransportError<Refused>>
    where
        F: FnOnce(&mut BusTransactionExecutor<&mut ScriptedBus, &mut CountingDelay>) -> Result<(), TransportError<Refused>>,
    {
        let mut executor = BusTransactionExecutor::new(bus, delay);
        op(&mut executor)
    }

    #[test]
    fn test_read_succeeds_first_attempt() {
        let mut bus = ScriptedBus {
            fill: 0xA5,
            ..Default::default()
        };
        let mut delay = CountingDelay::default();
        let mut buf = [0u8; 32];

        let result = run(&mut bus, &mut delay, |ex| ex.read(0x38, &mut buf));

        assert_eq!(result, Ok(()));
        assert!(buf.iter().all(|b| *b == 0xA5));
        assert_eq!(bus.starts, 1);
        assert_eq!(bus.disables, 0);
        assert_eq!(delay.ms, 0);
    }

    #[test]
    fn test_address_nak_exhausts_retry_budget() {
        let nak = ControllerStatus::idle().with_addr_nak();
        let mut bus = ScriptedBus {
            script: vec![Attempt::with_status(nak)],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();

        let result = run(&mut bus, &mut delay, |ex| ex.write(0x38, &[0x00, 0x00]));

        assert_eq!(result, Err(TransportError::Fault(nak)));
        assert_eq!(bus.starts, RETRY_COUNT as usize);
        assert_eq!(bus.disables, RETRY_COUNT as usize);
        assert_eq!(bus.enables, RETRY_COUNT as usize);
    }

    #[test]
    fn test_short_write_is_retried_like_a_fault() {
        let mut bus = ScriptedBus {
            script: vec![Attempt {
                count: Some(1),
                ..Attempt::ok()
            }],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();

        let result = run(&mut bus, &mut delay, |ex| ex.write(0x38, &[0x00, 0x00]));

        assert_eq!(result, Err(TransportError::Fault(ControllerStatus::idle())));
        assert_eq!(bus.starts, RETRY_COUNT as usize);
        assert_eq!(bus.disables, RETRY_COUNT as usize);
        assert_eq!(bus.enables, RETRY_COUNT as usize);
    }

    #[test]
    fn test_short_write_then_complete_write() {
        let mut bus = ScriptedBus {
            script: vec![
                Attempt {
                    count: Some(0),
                    ..Attempt::ok()
                },
                Attempt::ok(),
            ],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();

        let result = run(&mut bus, &mut delay, |ex| ex.write(0x38, &[0x01]));

        assert_eq!(result, Ok(()));
        assert_eq!(bus.starts, 2);
        assert_eq!(bus.disables, 1);
        assert_eq!(bus.enables, 1);
    }

    #[test]
    fn test_read_ignores_transfer_count() {
        let mut bus = ScriptedBus {
            script: vec![Attempt {
                count: Some(3),
                ..Attempt::ok()
            }],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();
        let mut buf = [0u8; 32];

        let result = run(&mut bus, &mut delay, |ex| ex.read(0x38, &mut buf));

        assert_eq!(result, Ok(()));
        assert_eq!(bus.starts, 1);
    }

    #[test]
    fn test_refused_start_retries_without_recovery() {
        let mut bus = ScriptedBus {
            refused_starts: usize::MAX,
            ..Default::default()
        };
        let mut delay = CountingDelay::default();

        let result = run(&mut bus, &mut delay, |ex| ex.write(0x38, &[0x01]));

        assert_eq!(result, Err(TransportError::Issue(Refused)));
        assert_eq!(bus.starts, RETRY_COUNT as usize);
        assert_eq!(bus.polls, 0);
        assert_eq!(bus.disables, 0);
        assert_eq!(delay.ms, 0);
    }

    #[test]
    fn test_refused_starts_share_the_budget() {
        let mut bus = ScriptedBus {
            refused_starts: 2,
            ..Default::default()
        };
        let mut delay = CountingDelay::default();

        let result = run(&mut bus, &mut delay, |ex| ex.write(0x38, &[0x01]));

        assert_eq!(result, Ok(()));
        assert_eq!(bus.starts, 3);
        assert_eq!(bus.disables, 0);
    }

    #[test]
    fn test_stalled_transfer_times_out() {
        let mut bus = ScriptedBus {
            script: vec![Attempt {
                busy_polls: usize::MAX,
                ..Attempt::ok()
            }],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();
        let mut buf = [0u8; 32];

        let result = run(&mut bus, &mut delay, |ex| ex.read(0x38, &mut buf));

        assert_eq!(
            result,
            Err(TransportError::Fault(ControllerStatus::in_progress()))
        );
        assert_eq!(bus.polls, (RETRY_COUNT * POLL_COUNT) as usize);
        assert_eq!(delay.ms, (RETRY_COUNT * POLL_COUNT) as u32 * POLL_DELAY_MS);
        assert_eq!(bus.disables, RETRY_COUNT as usize);
    }

    #[test]
    fn test_busy_then_done_within_poll_budget() {
        let mut bus = ScriptedBus {
            script: vec![Attempt {
                busy_polls: 2,
                ..Attempt::ok()
            }],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();
        let mut buf = [0u8; 4];

        let result = run(&mut bus, &mut delay, |ex| ex.read(0x38, &mut buf));

        assert_eq!(result, Ok(()));
        assert_eq!(bus.polls, 3);
        assert_eq!(delay.ms, 2);
        assert_eq!(bus.disables, 0);
    }

    #[test]
    fn test_error_reports_last_attempt() {
        let arb = ControllerStatus::idle().with_arb_lost();
        let bus_err = ControllerStatus::idle().with_bus_err();
        let mut bus = ScriptedBus {
            script: vec![
                Attempt::with_status(arb),
                Attempt::with_status(arb),
                Attempt::with_status(arb),
                Attempt::with_status(arb),
                Attempt::with_status(bus_err),
            ],
            ..Default::default()
        };
        let mut delay = CountingDelay::default();
        let mut buf = [0u8; 4];

        let result = run(&mut bus, &mut delay, |ex| ex.read(0x38, &mut buf));

        assert_eq!(result, Err(TransportError::Fault(bus_err)));
        assert_eq!(result.unwrap_err().status(), Some(bus_err));
    }
}
