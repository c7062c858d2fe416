//! BLE HID peripheral on the S140 SoftDevice.
//!
//! [`GamepadServer`] registers the GATT table once at startup: HID over GATT,
//! battery, device information and a vendor power service. [`run`] is the
//! BLE task body; it advertises, serves one host at a time and reports link
//! changes through [`BleLink`]. The main loop reaches the host through
//! [`BleTransport`].

use core::cell::RefCell;
use core::mem;

use blepad_core::{
    LinkEvent, PowerTelemetry, TelemetryError, TelemetrySink, Transport, TransportError,
};
use blepad_proto::{GAMEPAD_REPORT_ID, GAMEPAD_REPORT_SIZE};
use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{
    self, CharacteristicHandles, NotifyValueError, RegisterError, WriteOp,
};
use nrf_softdevice::ble::{peripheral, Connection, Uuid};
use nrf_softdevice::{raw, RawError, Softdevice};
use portable_atomic::{AtomicBool, Ordering};

use crate::config;

const HID_SERVICE: Uuid = Uuid::new_16(0x1812);
const HID_INFO: Uuid = Uuid::new_16(0x2a4a);
const HID_REPORT_MAP: Uuid = Uuid::new_16(0x2a4b);
const HID_CONTROL_POINT: Uuid = Uuid::new_16(0x2a4c);
const HID_REPORT: Uuid = Uuid::new_16(0x2a4d);
const HID_PROTOCOL_MODE: Uuid = Uuid::new_16(0x2a4e);
const HID_REPORT_REF: Uuid = Uuid::new_16(0x2908);

const BATTERY_SERVICE: Uuid = Uuid::new_16(0x180f);
const BATTERY_LEVEL: Uuid = Uuid::new_16(0x2a19);

const DEVICE_INFORMATION: Uuid = Uuid::new_16(0x180a);
const MANUFACTURER_NAME: Uuid = Uuid::new_16(0x2a29);
const PNP_ID: Uuid = Uuid::new_16(0x2a50);

/// Report reference descriptor: report type input.
const REPORT_TYPE_INPUT: u8 = 0x01;
/// Protocol mode characteristic: report protocol.
const PROTOCOL_MODE_REPORT: u8 = 0x01;

/// Vendor power service base UUID (8c4bxxxx-6f1d-4b9e-a3c2-5d7e1f0a9b36),
/// little-endian. Bytes 12..14 carry the attribute id.
const POWER_UUID_BASE: [u8; 16] = [
    0x36, 0x9b, 0x0a, 0x1f, 0x7e, 0x5d, 0xc2, 0xa3, 0x9e, 0x4b, 0x1d, 0x6f, 0x00, 0x00, 0x4b, 0x8c,
];
const POWER_SERVICE_ID: u16 = 0x0001;
const POWER_VOLTAGE_ID: u16 = 0x0002;
const POWER_POWER_ID: u16 = 0x0003;
const POWER_CHARGE_CURRENT_ID: u16 = 0x0004;
const POWER_COULOMB_ID: u16 = 0x0005;
const POWER_FLAGS_ID: u16 = 0x0006;

const LINK_EVENT_DEPTH: usize = 4;

const APPEARANCE: [u8; 2] = config::APPEARANCE_GAMEPAD.to_le_bytes();

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(
        ServiceList::Incomplete,
        &[ServiceUuid16::HUMAN_INTERFACE_DEVICE, ServiceUuid16::BATTERY],
    )
    .raw(AdvertisementDataType::APPEARANCE, &APPEARANCE)
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(config::DEVICE_NAME)
    .build();

/// SoftDevice configuration: one peripheral link, internal RC clock.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as *mut u8,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            // SAFETY: an all-zero security mode is a valid "no access" value
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// A readable characteristic with notifications the host may enable.
struct Notifiable {
    value: u16,
    cccd: u16,
    enabled: AtomicBool,
}

impl Notifiable {
    fn new(handles: CharacteristicHandles) -> Self {
        Self {
            value: handles.value_handle,
            cccd: handles.cccd_handle,
            enabled: AtomicBool::new(false),
        }
    }

    /// Track a CCCD write. Returns `true` when `handle` belongs to this
    /// characteristic.
    fn on_cccd_write(&self, handle: u16, data: &[u8]) -> bool {
        if handle != self.cccd {
            return false;
        }
        let notify = data.first().is_some_and(|bits| bits & 0x01 != 0);
        self.enabled.store(notify, Ordering::Relaxed);
        true
    }

    /// Store the value for reads and notify it if subscribed.
    fn update(
        &self,
        sd: &Softdevice,
        conn: &Connection,
        value: &[u8],
    ) -> Result<(), TransportError> {
        gatt_server::set_value(sd, self.value, value).map_err(|_| TransportError::Io)?;
        if !self.enabled.load(Ordering::Relaxed) {
            return Ok(());
        }
        gatt_server::notify_value(conn, self.value, value).map_err(|e| match e {
            NotifyValueError::Disconnected => TransportError::NotConnected,
            NotifyValueError::Raw(RawError::Resources) => TransportError::Busy,
            NotifyValueError::Raw(_) => TransportError::Io,
        })
    }

    fn unsubscribe(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }
}

/// Vendor power service characteristics, one float32 LE value each plus a
/// flags byte.
struct PowerCharacteristics {
    voltage: Notifiable,
    power: Notifiable,
    charge_current: Notifiable,
    coulomb: Notifiable,
    flags: Notifiable,
}

/// GATT table of the gamepad.
pub struct GamepadServer {
    report: Notifiable,
    battery_level: Notifiable,
    power: PowerCharacteristics,
}

impl GamepadServer {
    /// Register every service. `report_map` is served verbatim as the HID
    /// report map.
    pub fn new(sd: &mut Softdevice, report_map: &'static [u8]) -> Result<Self, RegisterError> {
        let report = register_hid(sd, report_map)?;
        let battery_level = register_battery(sd)?;
        register_device_information(sd)?;
        let power = register_power(sd)?;
        Ok(Self {
            report,
            battery_level,
            power,
        })
    }

    fn notifiables(&self) -> [&Notifiable; 7] {
        [
            &self.report,
            &self.battery_level,
            &self.power.voltage,
            &self.power.power,
            &self.power.charge_current,
            &self.power.coulomb,
            &self.power.flags,
        ]
    }

    /// Forget every subscription. Nothing is bonded, so CCCDs start over on
    /// each connection.
    fn unsubscribe_all(&self) {
        for characteristic in self.notifiables() {
            characteristic.unsubscribe();
        }
    }
}

impl gatt_server::Server for GamepadServer {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        // Control point and protocol mode writes need no action: there is no
        // boot protocol and no suspend handling.
        let _ = self
            .notifiables()
            .iter()
            .any(|characteristic| characteristic.on_cccd_write(handle, data));
        None
    }
}

fn register_hid(sd: &mut Softdevice, report_map: &'static [u8]) -> Result<Notifiable, RegisterError> {
    let mut service = ServiceBuilder::new(sd, HID_SERVICE)?;
    service
        .add_characteristic(
            HID_INFO,
            Attribute::new(config::HID_INFO),
            Metadata::new(Properties::new().read()),
        )?
        .build();
    service
        .add_characteristic(
            HID_REPORT_MAP,
            Attribute::new(report_map),
            Metadata::new(Properties::new().read()),
        )?
        .build();
    service
        .add_characteristic(
            HID_CONTROL_POINT,
            Attribute::new([0u8]),
            Metadata::new(Properties::new().write_without_response()),
        )?
        .build();
    service
        .add_characteristic(
            HID_PROTOCOL_MODE,
            Attribute::new([PROTOCOL_MODE_REPORT]),
            Metadata::new(Properties::new().read().write_without_response()),
        )?
        .build();

    let mut report = service.add_characteristic(
        HID_REPORT,
        Attribute::new([0u8; GAMEPAD_REPORT_SIZE]),
        Metadata::new(Properties::new().read().notify()),
    )?;
    report.add_descriptor(
        HID_REPORT_REF,
        Attribute::new([GAMEPAD_REPORT_ID, REPORT_TYPE_INPUT]),
    )?;
    let report = Notifiable::new(report.build());

    let _ = service.build();
    Ok(report)
}

fn register_battery(sd: &mut Softdevice) -> Result<Notifiable, RegisterError> {
    let mut service = ServiceBuilder::new(sd, BATTERY_SERVICE)?;
    let level = service
        .add_characteristic(
            BATTERY_LEVEL,
            Attribute::new([0u8]),
            Metadata::new(Properties::new().read().notify()),
        )?
        .build();
    let _ = service.build();
    Ok(Notifiable::new(level))
}

fn register_device_information(sd: &mut Softdevice) -> Result<(), RegisterError> {
    let mut service = ServiceBuilder::new(sd, DEVICE_INFORMATION)?;
    service
        .add_characteristic(
            MANUFACTURER_NAME,
            Attribute::new(config::MANUFACTURER.as_bytes()),
            Metadata::new(Properties::new().read()),
        )?
        .build();
    service
        .add_characteristic(
            PNP_ID,
            Attribute::new(config::PNP_ID),
            Metadata::new(Properties::new().read()),
        )?
        .build();
    let _ = service.build();
    Ok(())
}

fn power_uuid(id: u16) -> Uuid {
    let mut uuid = POWER_UUID_BASE;
    uuid[12..14].copy_from_slice(&id.to_le_bytes());
    Uuid::new_128(&uuid)
}

fn register_power(sd: &mut Softdevice) -> Result<PowerCharacteristics, RegisterError> {
    let mut service = ServiceBuilder::new(sd, power_uuid(POWER_SERVICE_ID))?;
    let mut add = |id: u16, initial: &[u8]| -> Result<Notifiable, RegisterError> {
        let handles = service
            .add_characteristic(
                power_uuid(id),
                Attribute::new(initial),
                Metadata::new(Properties::new().read().notify()),
            )?
            .build();
        Ok(Notifiable::new(handles))
    };
    let power = PowerCharacteristics {
        voltage: add(POWER_VOLTAGE_ID, &[0; 4])?,
        power: add(POWER_POWER_ID, &[0; 4])?,
        charge_current: add(POWER_CHARGE_CURRENT_ID, &[0; 4])?,
        coulomb: add(POWER_COULOMB_ID, &[0; 4])?,
        flags: add(POWER_FLAGS_ID, &[0])?,
    };
    let _ = service.build();
    Ok(power)
}

/// Link state shared between the BLE task and the main loop.
pub struct BleLink {
    conn: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>>,
    events: Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>,
    advertise: Signal<CriticalSectionRawMutex, ()>,
}

impl BleLink {
    pub const fn new() -> Self {
        Self {
            conn: Mutex::new(RefCell::new(None)),
            events: Channel::new(),
            advertise: Signal::new(),
        }
    }

    fn connected(&self, conn: &Connection) {
        self.advertise.reset();
        self.conn.lock(|c| *c.borrow_mut() = Some(conn.clone()));
        self.post(LinkEvent::Connected);
    }

    fn disconnected(&self) {
        self.conn.lock(|c| c.borrow_mut().take());
        self.post(LinkEvent::Disconnected);
    }

    fn post(&self, event: LinkEvent) {
        if self.events.try_send(event).is_err() {
            warn!("link event dropped: {}", event);
        }
    }

    fn connection(&self) -> Option<Connection> {
        self.conn.lock(|c| c.borrow().clone())
    }
}

impl Default for BleLink {
    fn default() -> Self {
        Self::new()
    }
}

/// BLE task body: advertise, serve one connection, wait for the main loop
/// to re-arm advertising, repeat.
pub async fn run(
    sd: &'static Softdevice,
    server: &'static GamepadServer,
    link: &'static BleLink,
) -> ! {
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &peripheral::Config::default())
            .await
        {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {:?}", e);
                Timer::after_millis(config::ADVERTISE_RETRY_MS).await;
                continue;
            }
        };

        info!("BLE connection established");
        let params = raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        };
        if conn.set_conn_params(params).is_err() {
            warn!("connection parameter request rejected");
        }

        link.connected(&conn);
        let _ = gatt_server::run(&conn, server, |_| {}).await;
        link.disconnected();
        server.unsubscribe_all();
        drop(conn);

        link.advertise.wait().await;
    }
}

/// [`Transport`] and [`TelemetrySink`] over the GATT server.
pub struct BleTransport {
    sd: &'static Softdevice,
    server: &'static GamepadServer,
    link: &'static BleLink,
}

impl BleTransport {
    pub fn new(
        sd: &'static Softdevice,
        server: &'static GamepadServer,
        link: &'static BleLink,
    ) -> Self {
        Self { sd, server, link }
    }

    fn connection(&self) -> Result<Connection, TransportError> {
        self.link.connection().ok_or(TransportError::NotConnected)
    }
}

impl Transport for BleTransport {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let conn = self.connection()?;
        self.server.report.update(self.sd, &conn, report)
    }

    async fn send_battery_level(&mut self, percent: u8) -> Result<(), TransportError> {
        let conn = self.connection()?;
        self.server
            .battery_level
            .update(self.sd, &conn, &[percent])
    }

    async fn resume_advertising(&mut self) -> Result<(), TransportError> {
        self.link.advertise.signal(());
        Ok(())
    }

    fn poll_link_event(&mut self) -> Option<LinkEvent> {
        self.link.events.try_receive().ok()
    }
}

impl TelemetrySink for BleTransport {
    async fn publish(&mut self, data: &PowerTelemetry) -> Result<(), TelemetryError> {
        let conn = self.connection().map_err(|_| TelemetryError::Io)?;
        let power = &self.server.power;
        let values = [
            (&power.voltage, data.voltage_v),
            (&power.power, data.power_mw),
            (&power.charge_current, data.charge_current_ma),
            (&power.coulomb, data.coulomb_c),
        ];
        for (characteristic, value) in values {
            characteristic
                .update(self.sd, &conn, &value.to_le_bytes())
                .map_err(telemetry_error)?;
        }
        power
            .flags
            .update(self.sd, &conn, &[data.flags()])
            .map_err(telemetry_error)
    }

    fn supports_telemetry(&self) -> bool {
        true
    }
}

fn telemetry_error(error: TransportError) -> TelemetryError {
    match error {
        TransportError::Busy => TelemetryError::BufferFull,
        _ => TelemetryError::Io,
    }
}
