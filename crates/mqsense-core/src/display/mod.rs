//! Summary screen for the e-paper panel
//!
//! [`draw_summary`] lays out a snapshot and the battery status on any 1-bit
//! `embedded-graphics` target. The firmware draws into a [`FrameBuffer`] and
//! pushes it to the panel through its [`Display`] implementation.

mod framebuffer;

use core::fmt::Write as _;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};

use crate::gauge::BatteryStatus;
use crate::metrics::QualityLevel;
use crate::reading::{ChannelInfo, SensorReading, Validity};
use crate::snapshot::Snapshot;

pub use framebuffer::{BUFFER_LEN, FrameBuffer, HEIGHT_PX, WIDTH_PX};

/// Longest line the summary formats
pub const LINE_LEN: usize = 48;

pub type Line48 = heapless::String<LINE_LEN>;

const MARGIN_PX: i32 = 10;
const TITLE_HEIGHT_PX: i32 = 28;
const HEADING_HEIGHT_PX: i32 = 18;
const CHANNEL_HEIGHT_PX: i32 = 16;
const BLOCK_GAP_PX: i32 = 6;
const CHANNEL_INDENT_PX: i32 = 16;
const FOOTER_HEIGHT_PX: i32 = 14;

/// Where a cycle's snapshot ends up.
pub trait Display {
    type Error: core::fmt::Debug;

    fn render(
        &mut self,
        snapshot: &Snapshot,
        battery: Option<&BatteryStatus>,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Status tag shown next to a sensor whose reading holds no data.
///
/// Snapshot entries are never `NotReady`; a raw slot reading passed in by
/// another caller gets the same tag as an invalid one.
pub fn status_tag(reading: &SensorReading) -> Option<&'static str> {
    match reading.validity() {
        Validity::Valid => None,
        Validity::NotReady | Validity::Invalid => Some("no data"),
    }
}

/// Sensor heading, e.g. `CO2 - Moderate` or `Particulates [no data]`.
pub fn format_heading(reading: &SensorReading) -> Line48 {
    let mut line = Line48::new();
    let label = reading.sensor_id().label();
    // A full buffer truncates the line rather than failing the render
    let _ = match (status_tag(reading), QualityLevel::for_reading(reading)) {
        (Some(tag), _) => write!(line, "{} [{}]", label, tag),
        (None, Some(level)) => write!(line, "{} - {}", label, level.label()),
        (None, None) => write!(line, "{}", label),
    };
    line
}

/// One channel line, e.g. `PM2.5   12.3 ug/m3`. Missing values show as `--`.
pub fn format_channel(reading: &SensorReading, index: usize, info: &ChannelInfo) -> Line48 {
    let mut line = Line48::new();
    let _ = match reading.value(index) {
        Some(value) => write!(
            line,
            "{:<6}{:>8.*} {}",
            info.label, info.precision, value, info.unit
        ),
        None => write!(line, "{:<6}{:>8} {}", info.label, "--", info.unit),
    };
    line
}

pub fn format_battery(battery: Option<&BatteryStatus>) -> Line48 {
    let mut line = Line48::new();
    let _ = match battery {
        Some(b) => write!(
            line,
            "Battery {}%  {} mV  {} mA",
            b.soc_percent, b.voltage_mv, b.current_ma
        ),
        None => write!(line, "Battery --"),
    };
    line
}

/// Draw the whole summary screen onto `target`, clearing it first.
pub fn draw_summary<D>(
    target: &mut D,
    snapshot: &Snapshot,
    battery: Option<&BatteryStatus>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let title_style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let body_style = MonoTextStyle::new(&FONT_9X15, BinaryColor::On);
    let small_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let rule = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    let size = target.bounding_box().size;
    let right = size.width as i32 - MARGIN_PX;
    let bottom = size.height as i32 - MARGIN_PX;

    target.clear(BinaryColor::Off)?;

    Text::with_baseline("Air quality", Point::new(MARGIN_PX, MARGIN_PX), title_style, Baseline::Top)
        .draw(target)?;
    let mut y = MARGIN_PX + TITLE_HEIGHT_PX;
    Line::new(Point::new(MARGIN_PX, y - 4), Point::new(right, y - 4))
        .into_styled(rule)
        .draw(target)?;

    for reading in snapshot.iter() {
        let heading = format_heading(reading);
        Text::with_baseline(&heading, Point::new(MARGIN_PX, y), body_style, Baseline::Top)
            .draw(target)?;
        y += HEADING_HEIGHT_PX;

        for (index, info) in reading.sensor_id().channels().iter().enumerate() {
            let line = format_channel(reading, index, info);
            Text::with_baseline(
                &line,
                Point::new(MARGIN_PX + CHANNEL_INDENT_PX, y),
                body_style,
                Baseline::Top,
            )
            .draw(target)?;
            y += CHANNEL_HEIGHT_PX;
        }
        y += BLOCK_GAP_PX;
    }

    let footer_y = bottom - FOOTER_HEIGHT_PX;
    Line::new(Point::new(MARGIN_PX, footer_y - 4), Point::new(right, footer_y - 4))
        .into_styled(rule)
        .draw(target)?;
    Text::with_baseline(
        &format_battery(battery),
        Point::new(MARGIN_PX, footer_y),
        small_style,
        Baseline::Top,
    )
    .draw(target)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorId;
    use crate::sensors::ReadError;
    use crate::snapshot::SnapshotBuilder;
    use embassy_time::Instant;
    use embedded_graphics::primitives::Rectangle;

    fn t() -> Instant {
        Instant::from_millis(0)
    }

    #[test]
    fn test_valid_channel_uses_precision_and_unit() {
        let pm = SensorReading::valid(SensorId::ParticulateMatter, t(), &[5.0, 12.34, 14.0, 15.0]);
        let info = &SensorId::ParticulateMatter.channels()[1];
        assert_eq!(format_channel(&pm, 1, info).as_str(), "PM2.5     12.3 ug/m3");

        let co2 = SensorReading::valid(SensorId::CarbonDioxide, t(), &[812.0]);
        let info = &SensorId::CarbonDioxide.channels()[0];
        assert_eq!(format_channel(&co2, 0, info).as_str(), "CO2        812 ppm");
    }

    #[test]
    fn test_invalid_reading_never_shows_zero() {
        let missing = SensorReading::no_data(SensorId::Climate, t());
        let info = &SensorId::Climate.channels()[0];

        let line = format_channel(&missing, 0, info);
        assert_eq!(line.as_str(), "Temp        -- C");
        assert!(!line.contains("0.0"));
        assert_eq!(format_heading(&missing).as_str(), "Climate [no data]");
    }

    #[test]
    fn test_not_ready_slot_is_tagged_no_data() {
        let pending = SensorReading::failed(SensorId::Climate, t(), &ReadError::NotReady);
        assert_eq!(pending.validity(), Validity::NotReady);
        assert_eq!(status_tag(&pending), Some("no data"));
        assert_eq!(format_heading(&pending).as_str(), "Climate [no data]");
    }

    #[test]
    fn test_heading_includes_quality_level() {
        let co2 = SensorReading::valid(SensorId::CarbonDioxide, t(), &[1000.0]);
        assert_eq!(format_heading(&co2).as_str(), "CO2 - Moderate");

        let climate = SensorReading::valid(SensorId::Climate, t(), &[22.0, 40.0]);
        assert_eq!(format_heading(&climate).as_str(), "Climate");
    }

    #[test]
    fn test_battery_line() {
        let status = BatteryStatus {
            soc_percent: 64,
            voltage_mv: 3987,
            current_ma: -123,
            ..Default::default()
        };
        assert_eq!(
            format_battery(Some(&status)).as_str(),
            "Battery 64%  3987 mV  -123 mA"
        );
        assert_eq!(format_battery(None).as_str(), "Battery --");
    }

    #[test]
    fn test_draw_summary_inks_title_and_footer() {
        let mut builder = SnapshotBuilder::new(t());
        builder.record(SensorReading::valid(
            SensorId::ParticulateMatter,
            t(),
            &[3.0, 5.0, 6.0, 7.0],
        ));
        builder.record(SensorReading::no_data(SensorId::Climate, t()));
        let snapshot = builder.finish();

        let mut fb = FrameBuffer::new();
        draw_summary(&mut fb, &snapshot, None).unwrap();

        let title = Rectangle::new(Point::new(0, 0), Size::new(WIDTH_PX, 30));
        let footer = Rectangle::new(Point::new(0, 270), Size::new(WIDTH_PX, 30));
        assert!(fb.ink_count(&title) > 0);
        assert!(fb.ink_count(&footer) > 0);
    }
}
