//! Raspberry Pi GPIO backends (rppal).
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use sorter_traits::{EdgeInput, HwResult, OutputLine, PwmOutput};
use tracing::debug;

use crate::error::{HwError, Result};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Open the GPIO peripheral once; every line below borrows pins from it.
pub fn open() -> Result<Gpio> {
    Gpio::new().map_err(gpio_err)
}

pub struct GpioLine {
    pin: OutputPin,
}

impl GpioLine {
    pub fn open(gpio: &Gpio, bcm: u8) -> Result<Self> {
        let mut pin = gpio.get(bcm).map_err(gpio_err)?.into_output();
        pin.set_low();
        debug!(bcm, "output line ready");
        Ok(Self { pin })
    }
}

impl OutputLine for GpioLine {
    fn set_high(&mut self) -> HwResult<()> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> HwResult<()> {
        self.pin.set_low();
        Ok(())
    }
}

/// Software PWM on an ordinary output pin; the belt driver only needs a step
/// frequency, not precise duty.
pub struct GpioPwm {
    pin: OutputPin,
}

impl GpioPwm {
    pub fn open(gpio: &Gpio, bcm: u8) -> Result<Self> {
        let mut pin = gpio.get(bcm).map_err(gpio_err)?.into_output();
        pin.set_low();
        Ok(Self { pin })
    }
}

impl PwmOutput for GpioPwm {
    fn set_pwm(&mut self, frequency_hz: f64, duty_cycle: f64) -> HwResult<()> {
        self.pin
            .set_pwm_frequency(frequency_hz, duty_cycle)
            .map_err(|e| gpio_err(e).into())
    }

    fn clear(&mut self) -> HwResult<()> {
        self.pin.clear_pwm().map_err(gpio_err)?;
        self.pin.set_low();
        Ok(())
    }
}

/// Pulled-up input raising a callback on the configured edge.
pub struct GpioEdge {
    pin: InputPin,
    trigger: Trigger,
}

impl GpioEdge {
    /// `active_low` inputs (switch to ground) fire on the falling edge.
    pub fn open(gpio: &Gpio, bcm: u8, active_low: bool) -> Result<Self> {
        let pin = gpio.get(bcm).map_err(gpio_err)?.into_input_pullup();
        let trigger = if active_low {
            Trigger::FallingEdge
        } else {
            Trigger::RisingEdge
        };
        Ok(Self { pin, trigger })
    }
}

impl EdgeInput for GpioEdge {
    fn on_edge(&mut self, callback: Box<dyn FnMut() + Send>) -> HwResult<()> {
        let mut callback = callback;
        self.pin
            .set_async_interrupt(self.trigger, move |_level| callback())
            .map_err(|e| gpio_err(e).into())
    }
}
