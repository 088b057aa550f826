//! IL0398 controller of the 4.2" 400x300 black/white e-paper panel
//!
//! Full refresh only, with the waveform LUT from the controller's OTP. The
//! BUSY line is low while the controller is working.

use embassy_time::{Duration, Timer, with_timeout};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::SpiDevice;
use log::debug;
use mqsense_core::display::{BUFFER_LEN, HEIGHT_PX, WIDTH_PX};
use thiserror_no_std::Error;

const CMD_PANEL_SETTING: u8 = 0x00;
const CMD_POWER_SETTING: u8 = 0x01;
const CMD_POWER_OFF: u8 = 0x02;
const CMD_BOOSTER_SOFT_START: u8 = 0x06;
const CMD_POWER_ON: u8 = 0x04;
const CMD_DEEP_SLEEP: u8 = 0x07;
const CMD_DATA_START_OLD: u8 = 0x10;
const CMD_DISPLAY_REFRESH: u8 = 0x12;
const CMD_DATA_START_NEW: u8 = 0x13;
const CMD_PLL_CONTROL: u8 = 0x30;
const CMD_VCOM_DATA_INTERVAL: u8 = 0x50;
const CMD_RESOLUTION: u8 = 0x61;
const CMD_VCOM_DC: u8 = 0x82;

/// Check code required by the deep sleep command
const DEEP_SLEEP_CHECK: u8 = 0xA5;

const RESET_PULSE: Duration = Duration::from_millis(10);
/// A full refresh takes about four seconds at room temperature
const BUSY_TIMEOUT: Duration = Duration::from_secs(20);

/// Bytes sent per SPI transaction when streaming the frame
const CHUNK_LEN: usize = 1000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpdError {
    #[error("SPI transfer to the panel failed")]
    Spi,
    #[error("panel control pin failed")]
    Pin,
    #[error("panel stayed busy")]
    Timeout,
}

pub struct Il0398<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
}

impl<SPI, DC, RST, BUSY> Il0398<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY) -> Self {
        Self { spi, dc, rst, busy }
    }

    /// Hardware reset and power-up. Needed after every deep sleep.
    pub async fn init(&mut self) -> Result<(), EpdError> {
        self.rst.set_low().map_err(|_| EpdError::Pin)?;
        Timer::after(RESET_PULSE).await;
        self.rst.set_high().map_err(|_| EpdError::Pin)?;
        Timer::after(RESET_PULSE).await;
        self.wait_idle().await?;

        self.command(CMD_POWER_SETTING, &[0x03, 0x00, 0x2B, 0x2B, 0xFF])
            .await?;
        self.command(CMD_BOOSTER_SOFT_START, &[0x17, 0x17, 0x17])
            .await?;
        // B/W mode, LUT from OTP
        self.command(CMD_PANEL_SETTING, &[0x1F]).await?;
        self.command(CMD_PLL_CONTROL, &[0x3A]).await?;

        let [w_hi, w_lo] = (WIDTH_PX as u16).to_be_bytes();
        let [h_hi, h_lo] = (HEIGHT_PX as u16).to_be_bytes();
        self.command(CMD_RESOLUTION, &[w_hi, w_lo, h_hi, h_lo]).await?;
        self.command(CMD_VCOM_DC, &[0x12]).await?;
        self.command(CMD_VCOM_DATA_INTERVAL, &[0x97]).await?;

        self.command(CMD_POWER_ON, &[]).await?;
        self.wait_idle().await
    }

    /// Write a full frame and refresh the panel.
    pub async fn display_frame(&mut self, frame: &[u8]) -> Result<(), EpdError> {
        debug_assert_eq!(frame.len(), BUFFER_LEN);

        // Old data is all white so the refresh never ghosts the previous cycle
        self.command(CMD_DATA_START_OLD, &[]).await?;
        let white = [0xFF; CHUNK_LEN];
        for _ in 0..BUFFER_LEN / CHUNK_LEN {
            self.data(&white).await?;
        }

        self.command(CMD_DATA_START_NEW, &[]).await?;
        for chunk in frame.chunks(CHUNK_LEN) {
            self.data(chunk).await?;
        }

        self.command(CMD_DISPLAY_REFRESH, &[]).await?;
        self.wait_idle().await?;
        debug!("Panel refreshed");
        Ok(())
    }

    /// Power off and enter deep sleep; only a hardware reset wakes the controller.
    pub async fn sleep(&mut self) -> Result<(), EpdError> {
        self.command(CMD_VCOM_DATA_INTERVAL, &[0xF7]).await?;
        self.command(CMD_POWER_OFF, &[]).await?;
        self.wait_idle().await?;
        self.command(CMD_DEEP_SLEEP, &[DEEP_SLEEP_CHECK]).await
    }

    async fn command(&mut self, command: u8, data: &[u8]) -> Result<(), EpdError> {
        self.dc.set_low().map_err(|_| EpdError::Pin)?;
        self.spi.write(&[command]).await.map_err(|_| EpdError::Spi)?;
        if !data.is_empty() {
            self.data(data).await?;
        }
        Ok(())
    }

    async fn data(&mut self, data: &[u8]) -> Result<(), EpdError> {
        self.dc.set_high().map_err(|_| EpdError::Pin)?;
        self.spi.write(data).await.map_err(|_| EpdError::Spi)
    }

    async fn wait_idle(&mut self) -> Result<(), EpdError> {
        match with_timeout(BUSY_TIMEOUT, self.busy.wait_for_high()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(EpdError::Pin),
            Err(_) => Err(EpdError::Timeout),
        }
    }
}
