#![no_std]
#![no_main]

use blepad_core::{
    AppError, ButtonPanel, Debouncer, GamepadApp, LinkEvent, LoadStatus, SlotReport, SlotTiming,
};
use blepad_firmware::{
    ble, config, Axp192, BleLink, BleTransport, GamepadServer, GpioButtons, Joystick,
    LedIndicator, REPORT_DESCRIPTOR,
};
use blepad_proto::verify_report_layout;
use defmt::{debug, error, info, warn};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt;
use embassy_nrf::interrupt::{InterruptExt, Priority};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::{Duration, Instant, Ticker, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    TWISPI1 => twim::InterruptHandler<peripherals::TWISPI1>;
});

const BUTTON_COUNT: usize = config::BUTTON_MAP.len();

/// Debounced button latches. Written only by the sampling task, read and
/// cleared by the main loop.
static PANEL: ButtonPanel<BUTTON_COUNT> = ButtonPanel::new();

/// Link state between the BLE task and the main loop.
static LINK: BleLink = BleLink::new();

/// GATT table, shared by the BLE task and the transport.
static SERVER: StaticCell<GamepadServer> = StaticCell::new();

/// TWIM transmit buffers (EasyDMA cannot read from flash).
static STICK_TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static PMIC_TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();

/// Executor for the button sampling tick, above thread mode.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn EGU0_SWI0() {
    EXECUTOR_HIGH.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("blepad starting...");

    // SoftDevice reserves priorities 0, 1 and 4
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    interrupt::TWISPI0.set_priority(Priority::P5);
    interrupt::TWISPI1.set_priority(Priority::P5);
    interrupt::EGU0_SWI0.set_priority(Priority::P3);

    // --- SoftDevice and GATT table ---
    // No HID service unless the report map matches the encoder
    if let Err(e) = verify_report_layout(REPORT_DESCRIPTOR) {
        error!("report layout mismatch: {}", e);
        halt();
    }
    let sd = Softdevice::enable(&ble::softdevice_config());
    let server: &'static GamepadServer = match GamepadServer::new(sd, REPORT_DESCRIPTOR) {
        Ok(server) => SERVER.init(server),
        Err(e) => {
            error!("GATT registration failed: {:?}", e);
            halt();
        }
    };
    let sd: &'static Softdevice = sd;
    spawner.spawn(softdevice_task(sd).unwrap());

    // --- Buttons (sampling context) ---
    let buttons = GpioButtons::new([
        Input::new(p.P0_11, Pull::Up), // BLUE
        Input::new(p.P0_12, Pull::Up), // RED
    ]);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::EGU0_SWI0);
    high_spawner.spawn(button_task(buttons).unwrap());

    // --- I2C: joystick unit and PMIC ---
    let stick_bus = Twim::new(
        p.TWISPI0,
        Irqs,
        p.P0_26, // SDA
        p.P0_27, // SCL
        twim_config(),
        STICK_TX_BUF.init([0; 16]),
    );
    let pmic_bus = Twim::new(
        p.TWISPI1,
        Irqs,
        p.P0_30, // SDA
        p.P0_31, // SCL
        twim_config(),
        PMIC_TX_BUF.init([0; 16]),
    );

    let stick = Joystick::new(
        stick_bus,
        config::JOYSTICK_ADDRESS,
        Duration::from_millis(config::JOYSTICK_TIMEOUT_MS),
    );
    let mut pmic = Axp192::new(pmic_bus, Duration::from_millis(config::PMIC_TIMEOUT_MS));
    if let Err(e) = pmic.init().await {
        warn!("PMIC ADC enable failed: {}", e);
    }

    // Link LED, active low, starts off
    let led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    let mut app = GamepadApp::new(
        &PANEL,
        config::BUTTON_MAP,
        stick,
        BleTransport::new(sd, server, &LINK),
        pmic,
        LedIndicator::new(led),
        config::APP_CONFIG,
    );

    // Calibration restore, before anything is advertised
    match app.start().await {
        Ok(start) => {
            log_load(&start.load);
            if let Some(e) = start.counter_error {
                warn!("coulomb counter enable failed: {}", e);
            }
        }
        Err(AppError::Layout(e)) => {
            error!("report layout mismatch: {}", e);
            halt();
        }
        Err(e) => {
            error!("startup failed: {}", e);
            halt();
        }
    }

    spawner.spawn(ble_task(sd, server, &LINK).unwrap());
    info!("blepad initialized, advertising as {}", config::DEVICE_NAME);

    loop {
        let started = Instant::now();
        let report = app.run_slot().await;
        log_slot(&report);

        let elapsed_us = u32::try_from(started.elapsed().as_micros()).unwrap_or(u32::MAX);
        match app.finish_slot(elapsed_us) {
            SlotTiming::Idle { remaining_us } => {
                Timer::after_micros(u64::from(remaining_us)).await;
            }
            SlotTiming::Overrun {
                elapsed_us,
                budget_us,
            } => {
                warn!("slot {} overrun: {} us > {} us", report.slot, elapsed_us, budget_us);
            }
        }
    }
}

fn twim_config() -> twim::Config {
    let mut bus = twim::Config::default();
    bus.frequency = twim::Frequency::K400;
    bus
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}

fn log_load(load: &LoadStatus) {
    match load {
        LoadStatus::Restored(max) => info!("calibration restored: {} mAh", max),
        LoadStatus::KeyMismatch { found } => {
            warn!("calibration key mismatch ({=u16:#06x}), starting uncalibrated", found)
        }
        LoadStatus::OutOfRange { value } => {
            warn!("stored calibration {} mAh out of range, starting uncalibrated", value)
        }
        LoadStatus::ReadFailed(e) => error!("calibration read failed: {}", e),
    }
}

fn log_slot(report: &SlotReport) {
    match report.link {
        Some(LinkEvent::Connected) => info!("host connected"),
        Some(LinkEvent::Disconnected) => info!("host disconnected, advertising"),
        None => {}
    }

    if let Some(update) = &report.battery {
        debug!("power: {} level={}%", update.reading, update.level);
        if !update.outcome.fired.is_empty() {
            info!(
                "calibration rules {=u8:#06b}: max {} mAh, counter {} mAh",
                update.outcome.fired.bits(),
                update.outcome.max_charge_mah,
                update.outcome.coulomb_mah
            );
        }
    }

    if let Some(stats) = &report.cycle {
        debug!("cycle: {}", stats);
    }

    for e in &report.errors {
        warn!("slot {}: {}", report.slot, e);
    }
}

/// SoftDevice event loop.
#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// BLE task - advertising and the GATT server.
#[embassy_executor::task]
async fn ble_task(
    sd: &'static Softdevice,
    server: &'static GamepadServer,
    link: &'static BleLink,
) -> ! {
    ble::run(sd, server, link).await
}

/// Button task - samples every button each tick and publishes debounced
/// edges to the panel.
#[embassy_executor::task]
async fn button_task(mut buttons: GpioButtons<'static, BUTTON_COUNT>) {
    let mut debouncer: Debouncer<BUTTON_COUNT> = Debouncer::new();
    let mut ticker = Ticker::every(Duration::from_millis(config::BUTTON_SAMPLE_MS));
    loop {
        if let Err(e) = debouncer.poll(&mut buttons, &PANEL) {
            warn!("button read failed: {}", e);
        }
        ticker.next().await;
    }
}
