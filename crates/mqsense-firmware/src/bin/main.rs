#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use esp_hal::clock::CpuClock;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

use mqsense_core::config::{NODE_CONFIG, SCD41_SAMPLING, SHT31_SAMPLING, SPS30_SAMPLING};
use mqsense_core::cycle::{calibrate_gauge_if_needed, run_wake_cycle};
use mqsense_core::duty_cycle::DutyCycleController;
use mqsense_core::gauge::Bq27441;
use mqsense_core::orchestrator::{Orchestrator, SensorSlot};
use mqsense_core::sensors::{Scd41, Sht31, Sps30};
use mqsense_core::time::Clock;
use mqsense_firmware::hardware::{self, PanelPins};
use mqsense_firmware::power::RtcPower;
use mqsense_firmware::timebase::EmbassyTimebase;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// One wake cycle per boot: every timer wake restarts here.
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    if NODE_CONFIG.diagnostics {
        rtt_target::rtt_init_log!();
    }

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let timebase = EmbassyTimebase;
    let power = RtcPower::new(Rtc::new(peripherals.LPWR), NODE_CONFIG.sleep_interval);
    let controller = DutyCycleController::new(power, &NODE_CONFIG, timebase.now());
    info!("Awake, sampling");

    let i2c = match hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO21, peripherals.GPIO22)
    {
        Ok(i2c) => i2c,
        Err(e) => {
            error!("{}", e);
            controller.enter_low_power();
        }
    };

    let pins = PanelPins {
        clk: peripherals.GPIO18,
        din: peripherals.GPIO23,
        cs: peripherals.GPIO5,
        dc: peripherals.GPIO17,
        rst: peripherals.GPIO16,
        busy: peripherals.GPIO4,
    };
    let mut display = match hardware::create_panel(peripherals.SPI2, pins) {
        Ok(display) => display,
        Err(e) => {
            error!("{}", e);
            controller.enter_low_power();
        }
    };

    let mut orchestrator = Orchestrator::new(i2c, timebase);
    let mut gauge = Bq27441::new();

    if NODE_CONFIG.calibrate_gauge
        && let Err(e) = calibrate_gauge_if_needed(&mut orchestrator, &mut gauge, &NODE_CONFIG.gauge).await
    {
        warn!("Gauge calibration skipped: {}", e);
    }

    let mut sensors = (
        SensorSlot::new(Sps30::new(), SPS30_SAMPLING),
        SensorSlot::new(Sht31::new(), SHT31_SAMPLING),
        SensorSlot::new(Scd41::new(), SCD41_SAMPLING),
    );

    let report = run_wake_cycle(&mut orchestrator, &mut sensors, &mut gauge, &mut display).await;
    info!(
        "{} valid, {} invalid, battery {}",
        report.valid,
        report.invalid,
        if report.battery.is_some() { "read" } else { "unavailable" }
    );

    controller.check_active_budget(orchestrator.timebase().now());
    controller.enter_low_power()
}
