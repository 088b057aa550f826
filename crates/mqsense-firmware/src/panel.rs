//! The e-paper panel as the core's [`Display`]

use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::SpiDevice;
use log::info;
use mqsense_core::display::{Display, FrameBuffer, draw_summary};
use mqsense_core::gauge::BatteryStatus;
use mqsense_core::snapshot::Snapshot;

use crate::epd::{EpdError, Il0398};

/// Draws the summary into RAM, then wakes the panel, refreshes and puts it back to sleep.
pub struct EpaperDisplay<SPI, DC, RST, BUSY> {
    epd: Il0398<SPI, DC, RST, BUSY>,
    frame: &'static mut FrameBuffer,
}

impl<SPI, DC, RST, BUSY> EpaperDisplay<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    pub fn new(epd: Il0398<SPI, DC, RST, BUSY>, frame: &'static mut FrameBuffer) -> Self {
        Self { epd, frame }
    }
}

impl<SPI, DC, RST, BUSY> Display for EpaperDisplay<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    type Error = EpdError;

    async fn render(
        &mut self,
        snapshot: &Snapshot,
        battery: Option<&BatteryStatus>,
    ) -> Result<(), EpdError> {
        let Ok(()) = draw_summary(&mut *self.frame, snapshot, battery);

        self.epd.init().await?;
        self.epd.display_frame(self.frame.as_bytes()).await?;
        self.epd.sleep().await?;
        info!("Summary rendered");
        Ok(())
    }
}
