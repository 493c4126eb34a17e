//! Frame serialization and the transmitter seam.
//!
//! Each physical output channel carries a fixed number of wiring strings.
//! Every cycle the framer re-encodes the whole buffer into per-channel byte
//! payloads and hands them to a [`Transmitter`], one channel at a time.

use crate::buffer::LightBuffer;
use crate::color;
use crate::error::TransmitError;

/// Magic start-of-frame sequence. The byte value `0x01` is reserved for this
/// marker, so it never appears in a color payload.
pub const FRAME_START: [u8; 4] = [0x01, 0x01, 0x01, 0x01];

/// Fixed per-channel capacity of the output stage.
///
/// The downstream shift registers expect exactly this many bytes per frame
/// whatever the logical buffer holds; missing strings or positions are
/// zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub channels: usize,
    pub strings_per_channel: usize,
    pub lights_per_string: usize,
}

impl ChannelLayout {
    /// Split a buffer's strings evenly across `channels` channels.
    pub fn for_buffer(lights: &LightBuffer, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            strings_per_channel: lights.string_count().div_ceil(channels),
            lights_per_string: lights.string_len(),
        }
    }

    /// Exact payload size per channel: three bytes per light.
    pub fn channel_payload_len(&self) -> usize {
        3 * self.strings_per_channel * self.lights_per_string
    }
}

/// Output hardware seam.
///
/// A frame is delivered as two sends per channel: the start marker, then the
/// fixed-size color payload. Absence of real hardware is handled by not
/// attaching a transmitter at all (headless mode) or by [`NullTransmitter`].
pub trait Transmitter: Send {
    fn send(&mut self, channel: usize, bytes: &[u8]) -> Result<(), TransmitError>;
}

/// Discards every frame. Stands in for hardware on development machines.
#[derive(Debug, Default)]
pub struct NullTransmitter;

impl Transmitter for NullTransmitter {
    fn send(&mut self, _channel: usize, _bytes: &[u8]) -> Result<(), TransmitError> {
        Ok(())
    }
}

/// Serializes buffer state into per-channel byte streams.
#[derive(Debug)]
pub struct OutputFramer {
    layout: ChannelLayout,
    scratch: Vec<u8>,
}

impl OutputFramer {
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            layout,
            scratch: Vec::with_capacity(layout.channel_payload_len()),
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Encode one channel's payload into `out` (cleared first).
    ///
    /// Strings are emitted in wiring order, three bytes `(r, g, b)` per
    /// light; a light that is off is emitted as black regardless of its
    /// stored color. The output length is always
    /// [`channel_payload_len`](ChannelLayout::channel_payload_len).
    pub fn encode_channel(&self, lights: &LightBuffer, channel: usize, out: &mut Vec<u8>) {
        out.clear();
        let base = channel * self.layout.strings_per_channel;
        for s in 0..self.layout.strings_per_channel {
            let string = base + s;
            for position in 0..self.layout.lights_per_string {
                let color = if string < lights.string_count() && position < lights.string_len() {
                    let light = lights.string_light(string, position);
                    if light.on { light.color } else { color::BLACK }
                } else {
                    color::BLACK
                };
                out.push(one_to_zero(color.r));
                out.push(one_to_zero(color.g));
                out.push(one_to_zero(color.b));
            }
        }
    }

    /// Encode and transmit every channel, sequentially.
    ///
    /// Channels are independent: a failed channel does not stop the others.
    /// The first error is returned after all channels were attempted.
    pub fn write_lights(
        &mut self,
        lights: &LightBuffer,
        transmitter: &mut dyn Transmitter,
    ) -> Result<(), TransmitError> {
        let mut first_error = None;
        for channel in 0..self.layout.channels {
            let mut payload = std::mem::take(&mut self.scratch);
            self.encode_channel(lights, channel, &mut payload);
            let result = transmitter
                .send(channel, &FRAME_START)
                .and_then(|()| transmitter.send(channel, &payload));
            self.scratch = payload;
            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// Convert 0x01 to 0x00; 0x01 is reserved for the start marker so it is never
// sent as a color component. True 1 and 0 become indistinguishable, which is
// imperceptible at that brightness.
const fn one_to_zero(value: u8) -> u8 {
    if value == 0x01 { 0x00 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{GridId, Layout, LightBuffer};
    use crate::color::Rgb;

    struct Recording {
        sends: Vec<(usize, Vec<u8>)>,
    }

    impl Transmitter for Recording {
        fn send(&mut self, channel: usize, bytes: &[u8]) -> Result<(), TransmitError> {
            self.sends.push((channel, bytes.to_vec()));
            Ok(())
        }
    }

    fn tower_buffer() -> LightBuffer {
        LightBuffer::new(Layout::double_tower())
    }

    #[test]
    fn payload_length_is_fixed() {
        let lights = tower_buffer();
        let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 0, &mut payload);
        assert_eq!(payload.len(), 3 * 25 * 10);
        // Still fixed with everything lit.
        let mut lights = lights;
        lights.fill(Rgb::new(200, 200, 200), true);
        framer.encode_channel(&lights, 1, &mut payload);
        assert_eq!(payload.len(), 3 * 25 * 10);
    }

    #[test]
    fn off_lights_are_emitted_black() {
        let mut lights = tower_buffer();
        lights.string_light_mut(0, 0).set_state(Rgb::new(10, 20, 30), false);
        let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 0, &mut payload);
        assert_eq!(&payload[0..3], &[0, 0, 0]);
    }

    #[test]
    fn reserved_byte_is_rewritten() {
        let mut lights = tower_buffer();
        lights.string_light_mut(0, 0).set_state(Rgb::new(1, 2, 1), true);
        let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 0, &mut payload);
        assert_eq!(&payload[0..3], &[0, 2, 0]);
    }

    #[test]
    fn other_bytes_pass_through() {
        let mut lights = tower_buffer();
        lights.string_light_mut(0, 0).set_state(Rgb::new(0, 2, 255), true);
        let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 0, &mut payload);
        assert_eq!(&payload[0..3], &[0, 2, 255]);
    }

    #[test]
    fn positions_beyond_the_buffer_are_zero_filled() {
        let lights = tower_buffer();
        // A layout claiming more capacity than the buffer has.
        let framer = OutputFramer::new(ChannelLayout {
            channels: 1,
            strings_per_channel: 60,
            lights_per_string: 12,
        });
        let mut lights = lights;
        lights.fill(Rgb::new(200, 200, 200), true);
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 0, &mut payload);
        assert_eq!(payload.len(), 3 * 60 * 12);
        // The tail beyond 50 strings is all zero.
        assert!(payload[3 * 50 * 12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn channel_split_follows_wiring_order() {
        let mut lights = tower_buffer();
        // First light of the right half's first string: channel 1, offset 0.
        lights.light_mut(GridId::Right, 0, 9, 0).set_state(Rgb::new(50, 60, 70), true);
        let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut payload = Vec::new();
        framer.encode_channel(&lights, 1, &mut payload);
        assert_eq!(&payload[0..3], &[50, 60, 70]);
    }

    #[test]
    fn write_lights_sends_marker_then_payload_per_channel() {
        let mut lights = tower_buffer();
        lights.fill(Rgb::new(9, 9, 9), true);
        let mut framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut tx = Recording { sends: Vec::new() };
        framer.write_lights(&lights, &mut tx).unwrap();
        assert_eq!(tx.sends.len(), 4);
        assert_eq!(tx.sends[0], (0, FRAME_START.to_vec()));
        assert_eq!(tx.sends[1].0, 0);
        assert_eq!(tx.sends[1].1.len(), 3 * 25 * 10);
        assert_eq!(tx.sends[2], (1, FRAME_START.to_vec()));
        assert_eq!(tx.sends[3].0, 1);
    }

    #[test]
    fn null_transmitter_swallows_frames() {
        let lights = tower_buffer();
        let mut framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut tx = NullTransmitter;
        assert!(framer.write_lights(&lights, &mut tx).is_ok());
    }

    #[test]
    fn a_failing_channel_does_not_block_the_rest() {
        struct FailFirst {
            attempted: Vec<usize>,
        }
        impl Transmitter for FailFirst {
            fn send(&mut self, channel: usize, _bytes: &[u8]) -> Result<(), TransmitError> {
                self.attempted.push(channel);
                if channel == 0 {
                    Err(TransmitError::Channel {
                        channel,
                        reason: "wire fell out".into(),
                    })
                } else {
                    Ok(())
                }
            }
        }
        let lights = tower_buffer();
        let mut framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
        let mut tx = FailFirst { attempted: Vec::new() };
        assert!(framer.write_lights(&lights, &mut tx).is_err());
        assert!(tx.attempted.contains(&1));
    }
}
