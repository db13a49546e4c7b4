//! WS2812/NeoPixel strip driven from the SPI MOSI line.
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use sorter_traits::{HwResult, PixelStrip, Rgb};

use crate::error::{HwError, Result};
use crate::util::{WS2812_SPI_HZ, encode_ws2812};

pub struct SpiStrip {
    spi: Spi,
    pixels: Vec<Rgb>,
    brightness: u8,
    buf: Vec<u8>,
}

impl SpiStrip {
    /// `bus` 0 is SPI0 (MOSI on BCM 10).
    pub fn open(bus: u8, len: usize, brightness: u8) -> Result<Self> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(HwError::Spi(format!("unsupported SPI bus {other}"))),
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, WS2812_SPI_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        tracing::info!(len, brightness, "ws2812 strip on SPI");
        Ok(Self {
            spi,
            pixels: vec![Rgb::OFF; len],
            brightness,
            buf: Vec::new(),
        })
    }
}

impl PixelStrip for SpiStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, colour: Rgb) {
        if let Some(px) = self.pixels.get_mut(index) {
            *px = colour;
        }
    }

    fn show(&mut self) -> HwResult<()> {
        encode_ws2812(&self.pixels, self.brightness, &mut self.buf);
        self.spi
            .write(&self.buf)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(())
    }
}
