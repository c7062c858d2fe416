//! Mock collaborators and a minimal executor for unit tests.

extern crate std;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use blepad_proto::CALIBRATION_RECORD_LEN;

use crate::app::{InputSnapshot, StatusIndicator};
use crate::battery::{CalibrationStore, PowerMonitor, StorageError};
use crate::calibration::PowerReading;
use crate::input::{InputError, RawStickSample, StickInput};
use crate::telemetry::{PowerTelemetry, TelemetryError, TelemetrySink};
use crate::transport::{LinkEvent, Transport, TransportError};

/// Run a future that never returns `Pending` to completion.
pub fn block_on<F: Future>(mut f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);

    // SAFETY: We don't move f after pinning
    let mut f = unsafe { Pin::new_unchecked(&mut f) };

    match f.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => panic!("Mock future returned Pending unexpectedly"),
    }
}

/// One call recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Report(Vec<u8>),
    Battery(u8),
    Advertise,
    Telemetry(PowerTelemetry),
}

#[derive(Default)]
struct TransportFlags {
    fail_sends: bool,
    fail_advertising: bool,
}

/// Transport recording every call. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub sent: Arc<Mutex<Vec<Sent>>>,
    events: Arc<Mutex<VecDeque<LinkEvent>>>,
    flags: Arc<Mutex<TransportFlags>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&self, event: LinkEvent) {
        self.events.lock().unwrap().push_back(event);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.flags.lock().unwrap().fail_sends = fail;
    }

    pub fn fail_advertising(&self, fail: bool) {
        self.flags.lock().unwrap().fail_advertising = fail;
    }

    fn record(&self, sent: Sent) -> Result<(), TransportError> {
        if self.flags.lock().unwrap().fail_sends {
            return Err(TransportError::Io);
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

impl Transport for MockTransport {
    fn send_report(&mut self, report: &[u8]) -> impl Future<Output = Result<(), TransportError>> {
        core::future::ready(self.record(Sent::Report(report.to_vec())))
    }

    fn send_battery_level(
        &mut self,
        percent: u8,
    ) -> impl Future<Output = Result<(), TransportError>> {
        core::future::ready(self.record(Sent::Battery(percent)))
    }

    fn resume_advertising(&mut self) -> impl Future<Output = Result<(), TransportError>> {
        let result = if self.flags.lock().unwrap().fail_advertising {
            Err(TransportError::Advertising)
        } else {
            self.sent.lock().unwrap().push(Sent::Advertise);
            Ok(())
        };
        core::future::ready(result)
    }

    fn poll_link_event(&mut self) -> Option<LinkEvent> {
        self.events.lock().unwrap().pop_front()
    }
}

impl TelemetrySink for MockTransport {
    fn publish(&mut self, data: &PowerTelemetry) -> impl Future<Output = Result<(), TelemetryError>> {
        let result = self
            .record(Sent::Telemetry(*data))
            .map_err(|_| TelemetryError::Io);
        core::future::ready(result)
    }

    fn supports_telemetry(&self) -> bool {
        true
    }
}

/// Stick returning queued samples, then `NoResponse`.
#[derive(Clone, Default)]
pub struct MockStick {
    samples: Arc<Mutex<VecDeque<Result<RawStickSample, InputError>>>>,
}

impl MockStick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: Result<RawStickSample, InputError>) {
        self.samples.lock().unwrap().push_back(sample);
    }
}

impl StickInput for MockStick {
    fn read_stick(&mut self) -> impl Future<Output = Result<RawStickSample, InputError>> {
        let next = self
            .samples
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(InputError::NoResponse));
        core::future::ready(next)
    }
}

/// One PMIC side effect recorded by [`MockPmic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmicCall {
    EnableCounter,
    ClearCounter,
    WriteRecord([u8; CALIBRATION_RECORD_LEN]),
}

struct PmicState {
    readings: VecDeque<Result<PowerReading, InputError>>,
    record: [u8; CALIBRATION_RECORD_LEN],
    fail_storage: bool,
    fail_clear: bool,
}

/// PMIC with a queue of readings and an in-memory record register.
#[derive(Clone)]
pub struct MockPmic {
    pub calls: Arc<Mutex<Vec<PmicCall>>>,
    state: Arc<Mutex<PmicState>>,
}

impl MockPmic {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(PmicState {
                readings: VecDeque::new(),
                record: [0; CALIBRATION_RECORD_LEN],
                fail_storage: false,
                fail_clear: false,
            })),
        }
    }

    pub fn push_reading(&self, reading: Result<PowerReading, InputError>) {
        self.state.lock().unwrap().readings.push_back(reading);
    }

    pub fn set_record(&self, record: [u8; CALIBRATION_RECORD_LEN]) {
        self.state.lock().unwrap().record = record;
    }

    pub fn record(&self) -> [u8; CALIBRATION_RECORD_LEN] {
        self.state.lock().unwrap().record
    }

    pub fn fail_storage(&self, fail: bool) {
        self.state.lock().unwrap().fail_storage = fail;
    }

    /// Make `clear_coulomb_counter` report a bus error. Failed clears are
    /// not recorded in `calls`.
    pub fn fail_clear(&self, fail: bool) {
        self.state.lock().unwrap().fail_clear = fail;
    }
}

impl PowerMonitor for MockPmic {
    fn read_power(&mut self) -> impl Future<Output = Result<PowerReading, InputError>> {
        let next = self
            .state
            .lock()
            .unwrap()
            .readings
            .pop_front()
            .unwrap_or(Err(InputError::NoResponse));
        core::future::ready(next)
    }

    fn enable_coulomb_counter(&mut self) -> impl Future<Output = Result<(), InputError>> {
        self.calls.lock().unwrap().push(PmicCall::EnableCounter);
        core::future::ready(Ok(()))
    }

    fn clear_coulomb_counter(&mut self) -> impl Future<Output = Result<(), InputError>> {
        let result = if self.state.lock().unwrap().fail_clear {
            Err(InputError::Io)
        } else {
            self.calls.lock().unwrap().push(PmicCall::ClearCounter);
            Ok(())
        };
        core::future::ready(result)
    }
}

impl CalibrationStore for MockPmic {
    fn read_record(
        &mut self,
    ) -> impl Future<Output = Result<[u8; CALIBRATION_RECORD_LEN], StorageError>> {
        let state = self.state.lock().unwrap();
        let result = if state.fail_storage {
            Err(StorageError::Io)
        } else {
            Ok(state.record)
        };
        core::future::ready(result)
    }

    fn write_record(
        &mut self,
        record: &[u8; CALIBRATION_RECORD_LEN],
    ) -> impl Future<Output = Result<(), StorageError>> {
        let mut state = self.state.lock().unwrap();
        let result = if state.fail_storage {
            Err(StorageError::Io)
        } else {
            state.record = *record;
            self.calls.lock().unwrap().push(PmicCall::WriteRecord(*record));
            Ok(())
        };
        core::future::ready(result)
    }
}

/// One indicator update recorded by [`MockIndicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Inputs(InputSnapshot),
    Link(bool),
}

#[derive(Clone, Default)]
pub struct MockIndicator {
    pub shown: Arc<Mutex<Vec<Shown>>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusIndicator for MockIndicator {
    fn show_inputs(&mut self, snapshot: &InputSnapshot) {
        self.shown.lock().unwrap().push(Shown::Inputs(*snapshot));
    }

    fn show_link(&mut self, connected: bool) {
        self.shown.lock().unwrap().push(Shown::Link(connected));
    }
}
