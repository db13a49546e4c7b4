use sorter_traits::Rgb;

/// SPI clock used to bit-bang WS2812 timing: each data bit becomes three SPI
/// bits (`110` for one, `100` for zero), 417 ns per SPI bit.
pub const WS2812_SPI_HZ: u32 = 2_400_000;

/// Trailing low bytes that latch the frame (>280 us at 2.4 MHz).
pub const WS2812_RESET_BYTES: usize = 90;

/// Encode pixels (sent in GRB order) into the SPI byte stream for a WS2812 chain,
/// scaling each channel by `brightness / 255`. `out` is cleared first.
pub fn encode_ws2812(pixels: &[Rgb], brightness: u8, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(pixels.len() * 9 + WS2812_RESET_BYTES);

    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for px in pixels {
        for channel in [px.g, px.r, px.b] {
            let level = scale(channel, brightness);
            for i in (0..8).rev() {
                let symbol = if level & (1 << i) != 0 { 0b110 } else { 0b100 };
                acc = (acc << 3) | symbol;
                bits += 3;
                while bits >= 8 {
                    bits -= 8;
                    out.push((acc >> bits) as u8);
                }
            }
        }
    }
    // 24 data bits per pixel encode to exactly 72 SPI bits, so nothing is left over
    debug_assert_eq!(bits, 0);
    out.resize(out.len() + WS2812_RESET_BYTES, 0);
}

#[inline]
fn scale(channel: u8, brightness: u8) -> u8 {
    ((u16::from(channel) * u16::from(brightness) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_bytes_per_pixel_plus_latch() {
        let mut out = Vec::new();
        encode_ws2812(&[Rgb::OFF, Rgb::OFF], 255, &mut out);
        assert_eq!(out.len(), 18 + WS2812_RESET_BYTES);
        // all-zero data bits encode as repeating 100 100 100 ...
        assert_eq!(&out[..3], &[0b1001_0010, 0b0100_1001, 0b0010_0100]);
        assert!(out[18..].iter().all(|b| *b == 0));
    }

    #[test]
    fn full_green_is_sent_first() {
        let mut out = Vec::new();
        encode_ws2812(&[Rgb::new(0, 255, 0)], 255, &mut out);
        // green byte 0xFF -> eight `110` symbols
        assert_eq!(&out[..3], &[0b1101_1011, 0b0110_1101, 0b1011_0110]);
    }

    #[test]
    fn brightness_scales_channels() {
        assert_eq!(scale(255, 255), 255);
        assert_eq!(scale(255, 0), 0);
        assert_eq!(scale(200, 128), 100);
    }
}
