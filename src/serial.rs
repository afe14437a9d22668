use core::fmt::{self, Debug, Write as FmtWrite};
use core::mem;
use core::task::Poll;
use embedded_hal::serial::{Read, Write};
use heapless::{String, Vec};

use crate::actuators::MotionAxis;
use crate::config::LINE_CAPACITY;
use crate::error::{Error, ErrorCode};
use crate::robot::Robot;
use crate::sensors::DigitalIo;
use crate::timer::Monotonic;

/// The host terminates commands with `~`; terminals send `\r` and/or `\n`.
pub const LINE_TERMINATORS: [u8; 3] = [b'\n', b'\r', b'~'];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame<const N: usize> {
    Line(String<N>),
    /// Line overflowed the buffer or was not UTF-8.
    Discarded,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SerialError<RxError: Debug> {
    SerialRx(RxError),
    SerialTx,
}

impl<RxError: Debug> Error for SerialError<RxError> {}

/// Command lines in, response lines out, over a byte-oriented UART.
pub struct SerialLink<Serial, const N: usize = LINE_CAPACITY> {
    serial: Serial,
    buffer: Vec<u8, N>,
    overflowed: bool,
}

impl<Serial, const N: usize> SerialLink<Serial, N> {
    pub fn new(serial: Serial) -> Self {
        Self {
            serial,
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    pub fn serial_mut(&mut self) -> &mut Serial {
        &mut self.serial
    }

    pub fn release(self) -> Serial {
        self.serial
    }

    fn take_frame(&mut self) -> Option<Frame<N>> {
        if mem::replace(&mut self.overflowed, false) {
            self.buffer.clear();
            return Some(Frame::Discarded);
        }
        if self.buffer.is_empty() {
            return None;
        }

        let frame = match core::str::from_utf8(&self.buffer) {
            Ok(text) => {
                let mut line = String::new();
                // same capacity as the buffer
                let _ = line.push_str(text);
                Frame::Line(line)
            }
            Err(_) => {
                warn!("serial line is not utf-8");
                Frame::Discarded
            }
        };
        self.buffer.clear();

        Some(frame)
    }
}

impl<Serial, const N: usize> SerialLink<Serial, N>
where
    Serial: Read<u8>,
    <Serial as Read<u8>>::Error: Debug,
{
    /// Drains received bytes until a full line is framed or the port runs dry.
    pub fn poll_line(
        &mut self,
    ) -> Poll<Result<Frame<N>, SerialError<<Serial as Read<u8>>::Error>>> {
        loop {
            match self.serial.read() {
                Ok(byte) if LINE_TERMINATORS.contains(&byte) => {
                    if let Some(frame) = self.take_frame() {
                        return Poll::Ready(Ok(frame));
                    }
                }
                Ok(byte) => {
                    if !self.overflowed && self.buffer.push(byte).is_err() {
                        warn!("serial line longer than {} bytes dropped", N);
                        self.overflowed = true;
                    }
                }
                Err(nb::Error::WouldBlock) => return Poll::Pending,
                Err(nb::Error::Other(err)) => return Poll::Ready(Err(SerialError::SerialRx(err))),
            }
        }
    }
}

impl<Serial, const N: usize> SerialLink<Serial, N>
where
    Serial: Read<u8> + Write<u8>,
    <Serial as Read<u8>>::Error: Debug,
{
    /// Runs the next complete command line against `robot` and writes its
    /// responses back. Pending while no full line has arrived.
    pub fn serve<A, Io, Clock, const TIMER_HZ: u32>(
        &mut self,
        robot: &mut Robot<A, Io, Clock, TIMER_HZ>,
    ) -> Poll<Result<(), SerialError<<Serial as Read<u8>>::Error>>>
    where
        A: MotionAxis,
        Io: DigitalIo,
        Clock: Monotonic<TIMER_HZ>,
    {
        let frame = match self.poll_line() {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result?,
        };

        let written = match frame {
            Frame::Line(line) => robot.handle_line(&line, self),
            Frame::Discarded => writeln!(self, "{}", ErrorCode::CommandFormat),
        };
        written.map_err(|_| SerialError::SerialTx)?;
        nb::block!(self.serial.flush()).map_err(|_| SerialError::SerialTx)?;

        trace!("response sent");
        Poll::Ready(Ok(()))
    }
}

impl<Serial, const N: usize> FmtWrite for SerialLink<Serial, N>
where
    Serial: Write<u8>,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            nb::block!(self.serial.write(byte)).map_err(|_| fmt::Error)?;
        }

        Ok(())
    }
}
