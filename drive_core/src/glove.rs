//! What the glove sends and how it gets here.
//!
//! The radio bridge copies the glove's packed application record (pitch, direction,
//! throttle) straight onto the link UART, one KISS style frame per update:
//!
//! ```text
//! FEND | pitch lo | pitch hi | direction | throttle | FEND
//! ```
//!
//! Payload bytes equal to `FEND` or `FESC` are escaped as `FESC TFEND` / `FESC TFESC`.
use crate::motors::Direction;

pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

pub const PAYLOAD_LEN: usize = 4;
/// Worst case encoded frame: both delimiters and every payload byte escaped
pub const MAX_FRAME_LEN: usize = 2 + 2 * PAYLOAD_LEN;
const BUFFER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GloveSample {
    pub pitch_degrees: i16,
    pub throttle_percent: u8,
    pub direction: Direction,
}

impl GloveSample {
    pub const STOPPED: Self = Self {
        pitch_degrees: 0,
        throttle_percent: 0,
        direction: Direction::Forward,
    };

    pub fn sanitized(&self) -> Self {
        Self {
            pitch_degrees: self.pitch_degrees.clamp(-90, 90),
            throttle_percent: self.throttle_percent.min(100),
            direction: self.direction,
        }
    }

    pub fn from_frame(payload: &[u8; PAYLOAD_LEN]) -> Self {
        Self {
            pitch_degrees: i16::from_le_bytes([payload[0], payload[1]]),
            direction: Direction::from_bit(payload[2]),
            throttle_percent: payload[3],
        }
    }

    pub fn to_frame(&self) -> [u8; PAYLOAD_LEN] {
        let [lo, hi] = self.pitch_degrees.to_le_bytes();
        [lo, hi, self.direction.to_bit(), self.throttle_percent]
    }
}

impl Default for GloveSample {
    fn default() -> Self {
        Self::STOPPED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload had the wrong number of bytes
    Length(usize),
    /// `FESC` followed by something other than `TFEND`/`TFESC`
    Escape,
    /// Too many bytes without a delimiter
    Overflow,
}

/// Byte-at-a-time de-framer, fed from the UART receive interrupt.
#[derive(Debug, Clone)]
pub struct FrameReader {
    buf: [u8; BUFFER_LEN],
    len: usize,
    escaped: bool,
    /// Set after an error, everything up to the next `FEND` belongs to the broken frame
    discarding: bool,
}

impl FrameReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; BUFFER_LEN],
            len: 0,
            escaped: false,
            discarding: false,
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<Result<GloveSample, FrameError>> {
        if byte == FEND {
            let was_discarding = self.discarding;
            let len = self.len;
            self.reset();

            // Back to back delimiters are idle fill, not empty frames.
            if was_discarding || len == 0 {
                return None;
            }
            if len != PAYLOAD_LEN {
                return Some(Err(FrameError::Length(len)));
            }

            let mut payload = [0u8; PAYLOAD_LEN];
            payload.copy_from_slice(&self.buf[..PAYLOAD_LEN]);
            return Some(Ok(GloveSample::from_frame(&payload)));
        }

        if self.discarding {
            return None;
        }

        let byte = if self.escaped {
            self.escaped = false;
            match byte {
                TFEND => FEND,
                TFESC => FESC,
                _ => {
                    self.discarding = true;
                    return Some(Err(FrameError::Escape));
                }
            }
        } else if byte == FESC {
            self.escaped = true;
            return None;
        } else {
            byte
        };

        if self.len == BUFFER_LEN {
            self.reset();
            self.discarding = true;
            return Some(Err(FrameError::Overflow));
        }

        self.buf[self.len] = byte;
        self.len += 1;
        None
    }

    fn reset(&mut self) {
        self.len = 0;
        self.escaped = false;
        self.discarding = false;
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame a sample for the wire, returns how many bytes of `out` were used.
pub fn encode_frame(sample: &GloveSample, out: &mut [u8; MAX_FRAME_LEN]) -> usize {
    let mut n = 0;
    out[n] = FEND;
    n += 1;

    for byte in sample.to_frame() {
        match byte {
            FEND => {
                out[n] = FESC;
                out[n + 1] = TFEND;
                n += 2;
            }
            FESC => {
                out[n] = FESC;
                out[n + 1] = TFESC;
                n += 2;
            }
            b => {
                out[n] = b;
                n += 1;
            }
        }
    }

    out[n] = FEND;
    n + 1
}

/// Link freshness, aged once per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMonitor {
    timeout_ticks: u16,
    /// `None` until the first frame and after a disconnect
    silent_ticks: Option<u16>,
}

impl LinkMonitor {
    pub fn new(timeout_ticks: u16) -> Self {
        Self {
            timeout_ticks,
            silent_ticks: None,
        }
    }

    pub fn on_sample(&mut self) {
        if self.silent_ticks.is_none() {
            log::info!("glove link up");
        }
        self.silent_ticks = Some(0);
    }

    pub fn tick(&mut self) {
        if let Some(silent) = self.silent_ticks {
            let silent = silent.saturating_add(1);
            if silent >= self.timeout_ticks {
                log::warn!("glove link silent for {} ticks, dropping", silent);
                self.silent_ticks = None;
            } else {
                self.silent_ticks = Some(silent);
            }
        }
    }

    pub fn on_disconnect(&mut self) {
        if self.silent_ticks.is_some() {
            log::warn!("glove link lost");
        }
        self.silent_ticks = None;
    }

    pub fn is_connected(&self) -> bool {
        self.silent_ticks.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(reader: &mut FrameReader, bytes: &[u8]) -> Vec<Result<GloveSample, FrameError>> {
        bytes.iter().filter_map(|&b| reader.push(b)).collect()
    }

    #[test]
    fn packed_record_layout() {
        // pitch -30 (0xFFE2), forward, throttle 75
        let sample = GloveSample::from_frame(&[0xE2, 0xFF, 0x01, 75]);
        assert_eq!(
            sample,
            GloveSample {
                pitch_degrees: -30,
                throttle_percent: 75,
                direction: Direction::Forward,
            }
        );
        assert_eq!(sample.to_frame(), [0xE2, 0xFF, 0x01, 75]);
    }

    #[test]
    fn sanitize_clamps() {
        let wild = GloveSample {
            pitch_degrees: -400,
            throttle_percent: 180,
            direction: Direction::Backward,
        };
        let clean = wild.sanitized();
        assert_eq!(clean.pitch_degrees, -90);
        assert_eq!(clean.throttle_percent, 100);
        assert_eq!(clean.direction, Direction::Backward);
    }

    #[test]
    fn reads_frames_from_stream() {
        let mut reader = FrameReader::new();
        let out = feed(
            &mut reader,
            &[0x00, 0x42, FEND, FEND, 20, 0, 0, 50, FEND, FEND, 0xF6, 0xFF, 1, 10, FEND],
        );
        // leading junk is reported once, idle FENDs are not frames
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Err(FrameError::Length(2)));
        assert_eq!(out[1].unwrap().pitch_degrees, 20);
        assert_eq!(out[1].unwrap().direction, Direction::Backward);
        assert_eq!(out[2].unwrap().pitch_degrees, -10);
    }

    #[test]
    fn escapes_in_payload() {
        // throttle 0xC0 and direction 0xDB only happen on a broken glove, but must survive
        let sample = GloveSample {
            pitch_degrees: i16::from_le_bytes([FEND, FESC]),
            throttle_percent: FEND,
            direction: Direction::Forward,
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(&sample, &mut buf);
        assert_eq!(n, 9);
        assert_eq!(
            &buf[..n],
            &[FEND, FESC, TFEND, FESC, TFESC, 0x01, FESC, TFEND, FEND]
        );

        let mut reader = FrameReader::new();
        assert_eq!(feed(&mut reader, &buf[..n]), vec![Ok(sample)]);
    }

    #[test]
    fn bad_escape_drops_frame() {
        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &[FEND, 1, FESC, 0x00, 2, 3, FEND, 0, 0, 1, 9, FEND]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Err(FrameError::Escape));
        assert_eq!(out[1].unwrap().throttle_percent, 9);
    }

    #[test]
    fn overflow_resyncs_on_next_delimiter() {
        let mut reader = FrameReader::new();
        let mut bytes = vec![FEND];
        bytes.extend([7u8; 20]);
        bytes.extend([FEND, 0, 0, 1, 40, FEND]);

        let out = feed(&mut reader, &bytes);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Err(FrameError::Overflow));
        assert_eq!(out[1].unwrap().throttle_percent, 40);
    }

    #[test]
    fn link_monitor_ages_out() {
        let mut link = LinkMonitor::new(100);
        assert!(!link.is_connected());
        link.tick();
        assert!(!link.is_connected());

        link.on_sample();
        for _ in 0..99 {
            link.tick();
        }
        assert!(link.is_connected());
        link.tick();
        assert!(!link.is_connected());

        link.on_sample();
        assert!(link.is_connected());
        link.on_disconnect();
        assert!(!link.is_connected());
    }
}
