use std::{fmt, str::FromStr};

/// A monitored appliance. Each device owns a power, a current and a cost column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    #[cfg_attr(feature = "serde", serde(rename = "Table Fan"))]
    TableFan,
    #[cfg_attr(feature = "serde", serde(rename = "PC"))]
    Pc,
    #[cfg_attr(feature = "serde", serde(rename = "TV"))]
    Tv,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown device '{0}', expected one of: Table Fan, PC, TV")]
pub struct ParseDeviceError(pub String);

impl Device {
    pub const ALL: [Device; 3] = [Device::TableFan, Device::Pc, Device::Tv];

    pub const fn name(self) -> &'static str {
        match self {
            Device::TableFan => "Table Fan",
            Device::Pc => "PC",
            Device::Tv => "TV",
        }
    }

    /// Header of the power column (kWh).
    pub const fn power_column(self) -> &'static str {
        self.name()
    }

    /// Header of the current column (A).
    pub const fn current_column(self) -> &'static str {
        match self {
            Device::TableFan => "Table Fan Current",
            Device::Pc => "PC Current",
            Device::Tv => "TV Current",
        }
    }

    pub const fn cost_column(self) -> &'static str {
        match self {
            Device::TableFan => "Fan Cost",
            Device::Pc => "PC Cost",
            Device::Tv => "TV Cost",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Device {
    type Err = ParseDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Device::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseDeviceError(trimmed.to_string()))
    }
}
