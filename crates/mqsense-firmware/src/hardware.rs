//! Peripheral setup for the ESP32-WROOM-32E board
//!
//! Pin map:
//! - I2C0: SDA GPIO21, SCL GPIO22 at 100 kHz (sensors and fuel gauge)
//! - SPI2 to the e-paper panel: CLK GPIO18, DIN GPIO23, CS GPIO5,
//!   DC GPIO17, RST GPIO16, BUSY GPIO4

use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::Async;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{
    GPIO4, GPIO5, GPIO16, GPIO17, GPIO18, GPIO21, GPIO22, GPIO23, I2C0, SPI2,
};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use log::info;
use mqsense_core::display::FrameBuffer;
use static_cell::ConstStaticCell;
use thiserror_no_std::Error;

use crate::epd::Il0398;
use crate::panel::EpaperDisplay;

const I2C_FREQUENCY_KHZ: u32 = 100;
const PANEL_SPI_FREQUENCY_MHZ: u32 = 4;

pub type PanelSpi = ExclusiveDevice<Spi<'static, Async>, Output<'static>, NoDelay>;
pub type Panel = EpaperDisplay<PanelSpi, Output<'static>, Output<'static>, Input<'static>>;

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("I2C configuration rejected: {0:?}")]
    I2c(esp_hal::i2c::master::ConfigError),
    #[error("SPI configuration rejected: {0:?}")]
    Spi(esp_hal::spi::master::ConfigError),
}

/// Pins wired to the e-paper panel
pub struct PanelPins {
    pub clk: GPIO18<'static>,
    pub din: GPIO23<'static>,
    pub cs: GPIO5<'static>,
    pub dc: GPIO17<'static>,
    pub rst: GPIO16<'static>,
    pub busy: GPIO4<'static>,
}

/// Create the sensor bus.
pub fn create_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO21<'static>,
    scl: GPIO22<'static>,
) -> Result<I2c<'static, Async>, HardwareError> {
    let i2c = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .map_err(HardwareError::I2c)?
    .with_sda(sda)
    .with_scl(scl)
    .into_async();

    info!("I2C bus ready at {} kHz", I2C_FREQUENCY_KHZ);
    Ok(i2c)
}

/// Create the panel driver and hand it the static frame buffer.
///
/// Must only be called once per boot.
pub fn create_panel(spi2: SPI2<'static>, pins: PanelPins) -> Result<Panel, HardwareError> {
    static FRAME: ConstStaticCell<FrameBuffer> = ConstStaticCell::new(FrameBuffer::new());

    let bus = Spi::new(
        spi2,
        SpiConfig::default().with_frequency(Rate::from_mhz(PANEL_SPI_FREQUENCY_MHZ)),
    )
    .map_err(HardwareError::Spi)?
    .with_sck(pins.clk)
    .with_mosi(pins.din)
    .into_async();

    let cs = Output::new(pins.cs, Level::High, OutputConfig::default());
    let Ok(spi) = ExclusiveDevice::new_no_delay(bus, cs);

    let dc = Output::new(pins.dc, Level::Low, OutputConfig::default());
    let rst = Output::new(pins.rst, Level::High, OutputConfig::default());
    let busy = Input::new(pins.busy, InputConfig::default().with_pull(Pull::None));

    Ok(EpaperDisplay::new(
        Il0398::new(spi, dc, rst, busy),
        FRAME.take(),
    ))
}
