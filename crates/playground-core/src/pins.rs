//! Pin binding table and digital-I/O-port observation bridge.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Widest port register the bridge can observe, in bits.
pub const MAX_PORT_WIDTH: u8 = 32;

/// Identity of one indicator widget on the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IndicatorId(pub usize);

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "indicator #{}", self.0)
    }
}

/// Pin-number window covered by one port register.
///
/// Bit `n` of the port value carries the level of pin `base_pin + n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortLayout {
    /// Pin number mapped to bit 0.
    pub base_pin: u8,
    /// Number of bits in the port register.
    pub width: u8,
}

impl Default for PortLayout {
    /// Arduino Uno `PORTB`: digital pins 8..=13 on bits 0..=5.
    fn default() -> Self {
        Self {
            base_pin: 8,
            width: 8,
        }
    }
}

impl PortLayout {
    /// Returns `true` when `pin` falls inside this port's window.
    #[must_use]
    pub fn contains(self, pin: u8) -> bool {
        pin >= self.base_pin && u16::from(pin) < self.end()
    }

    /// First pin number past the end of the window.
    #[must_use]
    pub fn end(self) -> u16 {
        u16::from(self.base_pin) + u16::from(self.width)
    }
}

/// One indicator bound to one port pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinBinding {
    /// Indicator receiving the pin level.
    pub indicator: IndicatorId,
    /// Absolute pin number.
    pub pin: u8,
}

/// Rejected binding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Port width is zero or wider than [`MAX_PORT_WIDTH`].
    #[error("port width {width} is outside 1..={MAX_PORT_WIDTH}")]
    InvalidWidth {
        /// Offending width.
        width: u8,
    },
    /// Pin sits below the port's base pin.
    #[error("{indicator}: pin {pin} is below port base pin {base_pin}")]
    PinBelowBase {
        /// Indicator that carried the pin.
        indicator: IndicatorId,
        /// Offending pin.
        pin: u8,
        /// Port base pin.
        base_pin: u8,
    },
    /// Pin sits at or past the end of the port window.
    #[error("{indicator}: pin {pin} is outside port pins {base_pin}..{end}")]
    PinPastEnd {
        /// Indicator that carried the pin.
        indicator: IndicatorId,
        /// Offending pin.
        pin: u8,
        /// Port base pin.
        base_pin: u8,
        /// First pin past the window.
        end: u16,
    },
    /// Indicator appears in more than one binding.
    #[error("{indicator} is bound more than once")]
    DuplicateIndicator {
        /// Repeated indicator.
        indicator: IndicatorId,
    },
    /// Textual pin attribute is not a pin number.
    #[error("{indicator}: pin attribute {text:?} is not a pin number")]
    UnparseablePin {
        /// Indicator that carried the attribute.
        indicator: IndicatorId,
        /// Raw attribute text.
        text: String,
    },
}

/// Validated, immutable set of pin bindings for one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinBindingTable {
    layout: PortLayout,
    bindings: Vec<PinBinding>,
}

impl PinBindingTable {
    /// Validates `bindings` against `layout`.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] for an invalid port width, for any pin
    /// outside the port window, or for a repeated indicator.
    pub fn new(
        layout: PortLayout,
        bindings: impl IntoIterator<Item = PinBinding>,
    ) -> Result<Self, BindingError> {
        if layout.width == 0 || layout.width > MAX_PORT_WIDTH {
            return Err(BindingError::InvalidWidth {
                width: layout.width,
            });
        }

        let mut seen = HashSet::new();
        let mut validated = Vec::new();
        for binding in bindings {
            if binding.pin < layout.base_pin {
                return Err(BindingError::PinBelowBase {
                    indicator: binding.indicator,
                    pin: binding.pin,
                    base_pin: layout.base_pin,
                });
            }
            if !layout.contains(binding.pin) {
                return Err(BindingError::PinPastEnd {
                    indicator: binding.indicator,
                    pin: binding.pin,
                    base_pin: layout.base_pin,
                    end: layout.end(),
                });
            }
            if !seen.insert(binding.indicator) {
                return Err(BindingError::DuplicateIndicator {
                    indicator: binding.indicator,
                });
            }
            validated.push(binding);
        }

        Ok(Self {
            layout,
            bindings: validated,
        })
    }

    /// Builds a table from textual pin attributes such as `pin="13"`.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnparseablePin`] when an attribute is not a
    /// decimal pin number, plus every error [`PinBindingTable::new`] reports.
    pub fn from_attributes<'a>(
        layout: PortLayout,
        attributes: impl IntoIterator<Item = (IndicatorId, &'a str)>,
    ) -> Result<Self, BindingError> {
        let bindings = attributes
            .into_iter()
            .map(|(indicator, text)| {
                text.trim()
                    .parse::<u8>()
                    .map(|pin| PinBinding { indicator, pin })
                    .map_err(|_| BindingError::UnparseablePin {
                        indicator,
                        text: text.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(layout, bindings)
    }

    /// Port window the table was validated against.
    #[must_use]
    pub const fn layout(&self) -> PortLayout {
        self.layout
    }

    /// Bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[PinBinding] {
        &self.bindings
    }

    /// Returns `true` when no indicator is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Indicator identities in declaration order.
    pub fn indicators(&self) -> impl Iterator<Item = IndicatorId> + '_ {
        self.bindings.iter().map(|binding| binding.indicator)
    }
}

/// Level of one bound pin after a port observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinState {
    /// Indicator bound to the pin.
    pub indicator: IndicatorId,
    /// Absolute pin number.
    pub pin: u8,
    /// `true` when the pin's bit is set.
    pub lit: bool,
}

/// Sink for indicator lit states.
pub trait Indicators {
    /// Sets the lit state of one indicator.
    fn set_lit(&mut self, indicator: IndicatorId, lit: bool);
}

/// Stateless translation of port values into indicator states.
#[derive(Debug, Clone, Copy)]
pub struct PeripheralBridge<'a> {
    table: &'a PinBindingTable,
}

impl<'a> PeripheralBridge<'a> {
    /// Creates a bridge over a validated table.
    #[must_use]
    pub const fn new(table: &'a PinBindingTable) -> Self {
        Self { table }
    }

    /// Computes the state of every bound pin for `port_value`.
    pub fn observe(self, port_value: u32) -> impl Iterator<Item = PinState> + 'a {
        let base_pin = self.table.layout.base_pin;
        self.table.bindings.iter().map(move |binding| {
            let bit = u32::from(binding.pin - base_pin);
            PinState {
                indicator: binding.indicator,
                pin: binding.pin,
                lit: port_value & (1 << bit) != 0,
            }
        })
    }

    /// Pushes the state of every bound pin for `port_value` to `indicators`.
    pub fn apply<I: Indicators + ?Sized>(self, port_value: u32, indicators: &mut I) {
        for state in self.observe(port_value) {
            indicators.set_lit(state.indicator, state.lit);
        }
    }

    /// Turns every bound indicator off.
    pub fn reset<I: Indicators + ?Sized>(self, indicators: &mut I) {
        for indicator in self.table.indicators() {
            indicators.set_lit(indicator, false);
        }
    }
}
