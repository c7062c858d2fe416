//! End-to-end: raw button levels and stick samples to report bytes, and a
//! calibration surviving a restart.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use blepad_core::{
    AppConfig, ButtonPanel, ButtonSampler, CalibrationStore, Debouncer, Delivery, GamepadApp,
    InputError, LinkEvent, LoadStatus, NullIndicator, PowerMonitor, PowerReading, PowerTelemetry,
    RawStickSample, SlotTiming, StickInput, StorageError, TelemetryError, TelemetrySink,
    Transport, TransportError,
};
use blepad_proto::{decode_report, Buttons, InputPowerStatus, GAMEPAD_REPORT_SIZE};

fn block_on<F: Future>(f: F) -> F::Output {
    let mut f = pin!(f);
    let mut cx = Context::from_waker(Waker::noop());
    match f.as_mut().poll(&mut cx) {
        Poll::Ready(out) => out,
        Poll::Pending => panic!("future returned Pending"),
    }
}

#[derive(Default)]
struct Radio {
    events: VecDeque<LinkEvent>,
    reports: Vec<Vec<u8>>,
    levels: Vec<u8>,
    advertised: usize,
}

#[derive(Clone, Default)]
struct SharedRadio(Rc<RefCell<Radio>>);

impl Transport for SharedRadio {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        self.0.borrow_mut().reports.push(report.to_vec());
        Ok(())
    }

    async fn send_battery_level(&mut self, percent: u8) -> Result<(), TransportError> {
        self.0.borrow_mut().levels.push(percent);
        Ok(())
    }

    async fn resume_advertising(&mut self) -> Result<(), TransportError> {
        self.0.borrow_mut().advertised += 1;
        Ok(())
    }

    fn poll_link_event(&mut self) -> Option<LinkEvent> {
        self.0.borrow_mut().events.pop_front()
    }
}

impl TelemetrySink for SharedRadio {
    async fn publish(&mut self, _data: &PowerTelemetry) -> Result<(), TelemetryError> {
        Ok(())
    }
}

struct FixedStick(RawStickSample);

impl StickInput for FixedStick {
    async fn read_stick(&mut self) -> Result<RawStickSample, InputError> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct Pmic {
    readings: VecDeque<PowerReading>,
    register: [u8; 6],
    clears: usize,
}

#[derive(Clone, Default)]
struct SharedPmic(Rc<RefCell<Pmic>>);

impl PowerMonitor for SharedPmic {
    async fn read_power(&mut self) -> Result<PowerReading, InputError> {
        self.0.borrow_mut().readings.pop_front().ok_or(InputError::NoResponse)
    }

    async fn enable_coulomb_counter(&mut self) -> Result<(), InputError> {
        Ok(())
    }

    async fn clear_coulomb_counter(&mut self) -> Result<(), InputError> {
        self.0.borrow_mut().clears += 1;
        Ok(())
    }
}

impl CalibrationStore for SharedPmic {
    async fn read_record(&mut self) -> Result<[u8; 6], StorageError> {
        Ok(self.0.borrow().register)
    }

    async fn write_record(&mut self, record: &[u8; 6]) -> Result<(), StorageError> {
        self.0.borrow_mut().register = *record;
        Ok(())
    }
}

/// Active-low pins: `false` on the wire means pressed.
struct Pins<'a>(&'a [bool; 2]);

impl ButtonSampler for Pins<'_> {
    fn read_level(&mut self, index: usize) -> Result<bool, InputError> {
        self.0.get(index).map(|high| !high).ok_or(InputError::Io)
    }
}

#[test]
fn test_debounced_press_reaches_report_bytes() {
    let panel: ButtonPanel<2> = ButtonPanel::new();
    let mut debouncer: Debouncer<2> = Debouncer::new();
    let radio = SharedRadio::default();
    radio.0.borrow_mut().events.push_back(LinkEvent::Connected);

    let mut app = GamepadApp::new(
        &panel,
        [Buttons::A, Buttons::B],
        FixedStick(RawStickSample::new(122, 100, false)),
        radio.clone(),
        SharedPmic::default(),
        NullIndicator,
        AppConfig::DEFAULT,
    );
    block_on(app.start()).unwrap();

    // Button 0 held low for three ticks, with one bounce before
    for pins in [[true, true], [false, true], [true, true], [false, true], [false, true], [false, true]] {
        debouncer.poll(&mut Pins(&pins), &panel).unwrap();
    }

    let report = block_on(app.run_slot());
    assert_eq!(report.delivery, Some(Delivery::Sent));
    assert!(matches!(app.finish_slot(1_000), SlotTiming::Idle { remaining_us: 24_000 }));

    let radio = radio.0.borrow();
    assert_eq!(radio.reports.len(), 1);
    let bytes = &radio.reports[0];
    assert_eq!(bytes.len(), GAMEPAD_REPORT_SIZE);
    assert_eq!(bytes[0], 0x01);
    assert_eq!(bytes[1], 0x00);
    // Y: -(100 - 122) << 8 = 5632
    assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 5632);

    let state = decode_report(bytes).unwrap();
    assert_eq!(state.buttons, Buttons::A);
}

#[test]
fn test_disconnect_stops_reports_and_readvertises() {
    let panel: ButtonPanel<2> = ButtonPanel::new();
    let radio = SharedRadio::default();
    radio.0.borrow_mut().events.push_back(LinkEvent::Connected);

    let mut app = GamepadApp::new(
        &panel,
        [Buttons::A, Buttons::B],
        FixedStick(RawStickSample::new(122, 122, false)),
        radio.clone(),
        SharedPmic::default(),
        NullIndicator,
        AppConfig::DEFAULT,
    );
    block_on(app.start()).unwrap();

    block_on(app.run_slot());
    app.finish_slot(0);
    radio.0.borrow_mut().events.push_back(LinkEvent::Disconnected);
    let report = block_on(app.run_slot());

    assert_eq!(report.link, Some(LinkEvent::Disconnected));
    assert_eq!(report.delivery, Some(Delivery::Skipped));
    let radio = radio.0.borrow();
    assert_eq!(radio.reports.len(), 1);
    assert_eq!(radio.advertised, 1);
}

#[test]
fn test_calibration_survives_restart() {
    let pmic = SharedPmic::default();
    let radio = SharedRadio::default();
    let panel: ButtonPanel<1> = ButtonPanel::new();
    let config = AppConfig::DEFAULT;

    // Charging past the (default zero) reference on the first battery slot
    pmic.0.borrow_mut().readings.push_back(PowerReading {
        voltage_v: 4.0,
        charge_current_ma: 200.0,
        coulomb_mah: 850.0,
        input: InputPowerStatus(0b0011_0100),
        ..PowerReading::default()
    });

    {
        let mut app = GamepadApp::new(
            &panel,
            [Buttons::A],
            FixedStick(RawStickSample::new(122, 122, false)),
            radio.clone(),
            pmic.clone(),
            NullIndicator,
            config,
        );
        let start = block_on(app.start()).unwrap();
        assert!(!start.load.is_restored());

        let battery_slot = config.schedule.battery.phase;
        for _ in 0..=battery_slot {
            block_on(app.run_slot());
            app.finish_slot(0);
        }
        assert_eq!(app.battery().max_charge_mah(), 850.0);
    }
    // Never connected: level not sent; charging never clears the counter
    assert!(radio.0.borrow().levels.is_empty());
    assert_eq!(pmic.0.borrow().clears, 0);

    let mut app = GamepadApp::new(
        &panel,
        [Buttons::A],
        FixedStick(RawStickSample::new(122, 122, false)),
        radio,
        pmic,
        NullIndicator,
        config,
    );
    let start = block_on(app.start()).unwrap();
    assert_eq!(start.load, LoadStatus::Restored(850.0));
}
