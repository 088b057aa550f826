//! Test doubles for the bus, time and sensors

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::reading::{Channels, SensorId};
use crate::sensors::{ReadError, Sensor, SleepError, WakeError};
use crate::time::Clock;

/// Bus that acknowledges everything and reads zeros. For tests whose sensors ignore the bus.
pub struct NullBus;

impl ErrorType for NullBus {
    type Error = Infallible;
}

impl I2c for NullBus {
    async fn transaction(
        &mut self,
        _address: u8,
        _operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockI2cError(pub ErrorKind);

impl embedded_hal_async::i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Outcome of the next bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Ack,
    Nack,
    Read(Vec<u8>),
    Fail(ErrorKind),
}

/// Bus that answers transactions from a queue of steps and records every write.
///
/// With an empty queue, write-only transactions are acknowledged and reads are NACKed.
#[derive(Default)]
pub struct ScriptedI2c {
    steps: VecDeque<Step>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl ScriptedI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push_back(step);
        self
    }

    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Commands written so far, decoded from the first two bytes of each write.
    pub fn commands(&self) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(_, bytes)| bytes.len() >= 2)
            .map(|(_, bytes)| u16::from_be_bytes([bytes[0], bytes[1]]))
            .collect()
    }
}

impl ErrorType for ScriptedI2c {
    type Error = MockI2cError;
}

impl I2c for ScriptedI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let reads = operations
            .iter()
            .any(|op| matches!(op, Operation::Read(_)));
        let step = self
            .steps
            .pop_front()
            .unwrap_or(if reads { Step::Nack } else { Step::Ack });

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    if let Step::Read(data) = &step {
                        for (dst, src) in buf.iter_mut().zip(data.iter().chain(std::iter::repeat(&0))) {
                            *dst = *src;
                        }
                    }
                }
            }
        }

        match step {
            Step::Ack | Step::Read(_) => Ok(()),
            Step::Nack => Err(MockI2cError(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address,
            ))),
            Step::Fail(kind) => Err(MockI2cError(kind)),
        }
    }
}

/// Simulated time: delays advance the clock instantly and are recorded in milliseconds.
#[derive(Default)]
pub struct SimTimebase {
    now_ms: u64,
    delays_ms: Vec<u32>,
}

impl SimTimebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays_ms(&self) -> &[u32] {
        &self.delays_ms
    }

    /// How many recorded delays lasted exactly `ms`.
    pub fn count_delays(&self, ms: u32) -> usize {
        self.delays_ms.iter().filter(|&&d| d == ms).count()
    }

    fn advance(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.now_ms += u64::from(ms);
    }
}

impl DelayNs for SimTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        self.advance(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.advance(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

impl Clock for SimTimebase {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Wake,
    Read,
    Sleep,
}

/// Shared, ordered record of sensor calls across all sensors of a test.
pub type Journal = Rc<RefCell<Vec<(SensorId, Call)>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Sensor whose responses are scripted up front.
pub struct ScriptedSensor {
    id: SensorId,
    wake_result: Result<(), WakeError>,
    sleep_result: Result<(), SleepError>,
    reads: VecDeque<Result<Vec<f32>, ReadError>>,
    fallback: Result<Vec<f32>, ReadError>,
    journal: Journal,
}

impl ScriptedSensor {
    pub fn new(id: SensorId, journal: &Journal) -> Self {
        Self {
            id,
            wake_result: Ok(()),
            sleep_result: Ok(()),
            reads: VecDeque::new(),
            fallback: Err(ReadError::Bus),
            journal: Rc::clone(journal),
        }
    }

    pub fn with_reads<const N: usize>(mut self, reads: [Result<Vec<f32>, ReadError>; N]) -> Self {
        self.reads.extend(reads);
        self
    }

    /// Response once the scripted reads run out
    pub fn with_fallback(mut self, fallback: Result<Vec<f32>, ReadError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn failing_wake(mut self, error: WakeError) -> Self {
        self.wake_result = Err(error);
        self
    }

    pub fn failing_sleep(mut self, error: SleepError) -> Self {
        self.sleep_result = Err(error);
        self
    }

    /// Calls made to this sensor, in order
    pub fn calls(&self) -> Vec<Call> {
        self.journal
            .borrow()
            .iter()
            .filter(|(id, _)| *id == self.id)
            .map(|(_, call)| *call)
            .collect()
    }

    fn record(&self, call: Call) {
        self.journal.borrow_mut().push((self.id, call));
    }
}

impl Sensor for ScriptedSensor {
    fn id(&self) -> SensorId {
        self.id
    }

    async fn wake<I: I2c, D: DelayNs>(
        &mut self,
        _i2c: &mut I,
        _delay: &mut D,
    ) -> Result<(), WakeError> {
        self.record(Call::Wake);
        self.wake_result
    }

    async fn read<I: I2c, D: DelayNs>(
        &mut self,
        _i2c: &mut I,
        _delay: &mut D,
    ) -> Result<Channels, ReadError> {
        self.record(Call::Read);
        let response = self
            .reads
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        response.map(|values| {
            let mut channels = Channels::new();
            for value in values {
                let _ = channels.push(value);
            }
            channels
        })
    }

    async fn sleep<I: I2c, D: DelayNs>(
        &mut self,
        _i2c: &mut I,
        _delay: &mut D,
    ) -> Result<(), SleepError> {
        self.record(Call::Sleep);
        self.sleep_result
    }
}
