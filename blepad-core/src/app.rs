//! GamepadApp: one scheduler slot of the whole device.
//!
//! Every slot drains link events, reads the stick, builds and sends the
//! input report. Slower jobs (status output, link indicator, battery
//! calibration, cycle statistics) run when the scheduler says they are due.
//!
//! No step aborts the slot. Failures are collected in the returned
//! [`SlotReport`] for the caller to log.

use heapless::Vec;

use blepad_proto::{
    encode_report, verify_report_layout, AnalogStick, Buttons, GamepadState, LayoutError,
    REPORT_DESCRIPTOR,
};

use crate::battery::{BatteryError, BatteryMonitor, BatteryUpdate, CalibrationStore, LoadStatus, PowerMonitor};
use crate::config::{AppConfig, Periodic};
use crate::connection::{Delivery, HidLink};
use crate::debounce::ButtonPanel;
use crate::input::{InputError, RawStickSample, StickInput};
use crate::scheduler::{CycleScheduler, ScheduleError, SlotStats, SlotTiming};
use crate::stick::normalize;
use crate::telemetry::{PowerTelemetry, TelemetryError, TelemetrySink};
use crate::transport::{LinkEvent, Transport, TransportError};

/// Button reported for the joystick push.
pub const STICK_BUTTON: Buttons = Buttons::LS;

/// Capacity of the job table.
pub const MAX_JOBS: usize = 4;

/// Upper bound of errors collected in one slot.
pub const MAX_SLOT_ERRORS: usize = 8;

/// Periodic work driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Job {
    /// Refresh the input status output.
    Status,
    /// Refresh the connection indicator.
    LinkIndicator,
    /// Read telemetry, calibrate, publish the battery level.
    Battery,
    /// Hand out slot statistics once per cycle.
    CycleReport,
}

/// What the status output shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSnapshot {
    pub buttons: Buttons,
    pub stick: AnalogStick,
    pub battery_level: u8,
    pub connected: bool,
}

/// Display/LED collaborator.
pub trait StatusIndicator {
    fn show_inputs(&mut self, snapshot: &InputSnapshot);
    fn show_link(&mut self, connected: bool);
}

/// Indicator that shows nothing.
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn show_inputs(&mut self, _snapshot: &InputSnapshot) {}
    fn show_link(&mut self, _connected: bool) {}
}

/// Error type for application operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppError {
    /// Report descriptor and encoder disagree. Fatal.
    Layout(LayoutError),
    /// Stick read failed; previous sample kept.
    Input(InputError),
    /// Transport call failed.
    Transport(TransportError),
    /// Telemetry read, counter or storage failure.
    Battery(BatteryError),
    /// Power telemetry could not be published.
    Telemetry(TelemetryError),
    /// Job registration failed.
    Schedule(ScheduleError),
}

impl core::fmt::Display for AppError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "report layout: {}", e),
            Self::Input(e) => write!(f, "input: {}", e),
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::Battery(e) => write!(f, "battery: {}", e),
            Self::Telemetry(e) => write!(f, "telemetry: {}", e),
            Self::Schedule(e) => write!(f, "schedule: {}", e),
        }
    }
}

impl From<LayoutError> for AppError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl From<InputError> for AppError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<BatteryError> for AppError {
    fn from(e: BatteryError) -> Self {
        Self::Battery(e)
    }
}

impl From<TelemetryError> for AppError {
    fn from(e: TelemetryError) -> Self {
        Self::Telemetry(e)
    }
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// Result of [`GamepadApp::start`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartReport {
    pub load: LoadStatus,
    /// Enabling the coulomb counter failed.
    pub counter_error: Option<BatteryError>,
}

/// Everything that happened in one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub slot: u16,
    /// Last link event drained this slot.
    pub link: Option<LinkEvent>,
    /// Input report delivery; `None` when the send failed.
    pub delivery: Option<Delivery>,
    pub battery: Option<BatteryUpdate>,
    /// Statistics of the cycle ending with this slot.
    pub cycle: Option<SlotStats>,
    pub errors: Vec<AppError, MAX_SLOT_ERRORS>,
}

impl SlotReport {
    fn new(slot: u16) -> Self {
        Self {
            slot,
            link: None,
            delivery: None,
            battery: None,
            cycle: None,
            errors: Vec::new(),
        }
    }

    fn push_error(&mut self, error: impl Into<AppError>) {
        // Beyond capacity the earliest errors are the interesting ones
        let _ = self.errors.push(error.into());
    }
}

/// Wires the collaborators to the scheduler.
///
/// `panel` is written by the sampling context; the app only reads and
/// clears it. `button_map[i]` is the report button of panel index `i`.
pub struct GamepadApp<'a, T, S, P, D, const N: usize> {
    panel: &'a ButtonPanel<N>,
    button_map: [Buttons; N],
    stick: S,
    link: HidLink<T>,
    battery: BatteryMonitor<P>,
    indicator: D,
    scheduler: CycleScheduler<Job, MAX_JOBS>,
    config: AppConfig,
    last_sample: RawStickSample,
    state: GamepadState,
}

impl<'a, T, S, P, D, const N: usize> GamepadApp<'a, T, S, P, D, N>
where
    T: Transport + TelemetrySink,
    S: StickInput,
    P: PowerMonitor + CalibrationStore,
    D: StatusIndicator,
{
    pub fn new(
        panel: &'a ButtonPanel<N>,
        button_map: [Buttons; N],
        stick: S,
        transport: T,
        pmic: P,
        indicator: D,
        config: AppConfig,
    ) -> Self {
        Self {
            panel,
            button_map,
            stick,
            link: HidLink::new(transport),
            battery: BatteryMonitor::new(pmic, config.calibration),
            indicator,
            scheduler: CycleScheduler::new(&config.schedule),
            last_sample: RawStickSample::new(config.stick.x.center, config.stick.y.center, false),
            config,
            state: GamepadState::neutral(),
        }
    }

    /// Check the report layout, register jobs, restore calibration.
    ///
    /// Call once. A layout error must stop the device before it advertises.
    pub async fn start(&mut self) -> Result<StartReport, AppError> {
        self.start_with_descriptor(REPORT_DESCRIPTOR).await
    }

    /// [`start`](Self::start) against the descriptor actually registered
    /// with the host.
    pub async fn start_with_descriptor(&mut self, descriptor: &[u8]) -> Result<StartReport, AppError> {
        verify_report_layout(descriptor)?;

        let schedule = self.config.schedule;
        let last = self.scheduler.slots_per_cycle();
        self.scheduler.add_job(schedule.status, Job::Status)?;
        self.scheduler.add_job(schedule.link_indicator, Job::LinkIndicator)?;
        self.scheduler.add_job(schedule.battery, Job::Battery)?;
        self.scheduler.add_job(Periodic::new(last, last - 1), Job::CycleReport)?;

        let (load, counter) = self.battery.start().await;
        Ok(StartReport {
            load,
            counter_error: counter.err(),
        })
    }

    /// Run the current slot. Always returns.
    pub async fn run_slot(&mut self) -> SlotReport {
        let mut report = SlotReport::new(self.scheduler.slot());

        match self.link.poll_link().await {
            Ok(event) => report.link = event,
            Err(e) => report.push_error(e),
        }

        match self.stick.read_stick().await {
            Ok(sample) => self.last_sample = sample,
            Err(e) => report.push_error(e),
        }

        self.state = self.build_state();
        let bytes = encode_report(&self.state);
        match self.link.update_input_report(&bytes).await {
            Ok(delivery) => report.delivery = Some(delivery),
            Err(e) => report.push_error(e),
        }

        let mut due: Vec<Job, MAX_JOBS> = Vec::new();
        for job in self.scheduler.due_jobs() {
            let _ = due.push(job);
        }
        for job in due {
            self.run_job(job, &mut report).await;
        }

        report
    }

    /// Close the slot; see [`CycleScheduler::finish_slot`].
    pub fn finish_slot(&mut self, elapsed_us: u32) -> SlotTiming {
        self.scheduler.finish_slot(elapsed_us)
    }

    async fn run_job(&mut self, job: Job, report: &mut SlotReport) {
        match job {
            Job::Status => {
                let snapshot = self.snapshot();
                self.indicator.show_inputs(&snapshot);
            }
            Job::LinkIndicator => self.indicator.show_link(self.link.is_connected()),
            Job::Battery => match self.battery.refresh().await {
                Ok(update) => {
                    if let Some(e) = update.error {
                        report.push_error(e);
                    }
                    if let Err(e) = self.link.update_battery_level(update.level).await {
                        report.push_error(e);
                    }
                    if self.link.is_connected() && self.link.transport().supports_telemetry() {
                        let telemetry =
                            PowerTelemetry::from_reading(&update.reading, update.outcome.coulomb_mah);
                        if let Err(e) = self.link.transport_mut().publish(&telemetry).await {
                            report.push_error(e);
                        }
                    }
                    report.battery = Some(update);
                }
                Err(e) => report.push_error(e),
            },
            Job::CycleReport => report.cycle = Some(*self.scheduler.stats()),
        }
    }

    fn build_state(&self) -> GamepadState {
        let mut buttons = Buttons::NONE;
        for (active, button) in self.panel.activations().iter().zip(self.button_map.iter()) {
            if *active {
                buttons |= *button;
            }
        }
        if self.last_sample.pressed {
            buttons |= STICK_BUTTON;
        }

        GamepadState {
            buttons,
            left_stick: normalize(self.last_sample, &self.config.stick),
            ..GamepadState::neutral()
        }
    }

    /// Current inputs for the status output.
    #[must_use]
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            buttons: self.state.buttons,
            stick: self.state.left_stick,
            battery_level: self.battery.level(),
            connected: self.link.is_connected(),
        }
    }

    /// State encoded in the last slot.
    #[must_use]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    pub fn link(&self) -> &HidLink<T> {
        &self.link
    }

    pub fn battery(&self) -> &BatteryMonitor<P> {
        &self.battery
    }

    pub fn battery_mut(&mut self) -> &mut BatteryMonitor<P> {
        &mut self.battery
    }

    pub fn scheduler(&self) -> &CycleScheduler<Job, MAX_JOBS> {
        &self.scheduler
    }

    pub fn indicator(&self) -> &D {
        &self.indicator
    }
}
