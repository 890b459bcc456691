//! US915 channel mask and sub-band selection.
//!
//! The US915 plan has 72 uplink channels: 64 at 125 kHz (slots 0-63) and
//! 8 at 500 kHz (slots 64-71). A gateway listens on only a few of them, so
//! before joining, the module is told to use exactly one contiguous block
//! and to leave every other slot disabled. The mask is write-only: it is
//! pushed as one `mac set ch status` command per slot and never read back.

use std::fmt;

use loramote_core::error::{Error, Result};

use crate::commands;

/// Number of uplink channel slots in the US915 plan.
pub const CHANNEL_COUNT: usize = 72;

/// A contiguous, inclusive range of channel slots enabled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubBand {
    first: u8,
    last: u8,
}

impl SubBand {
    /// Create a sub-band spanning slots `first..=last`.
    pub fn new(first: u8, last: u8) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidParameter(format!(
                "sub-band start {first} is after its end {last}"
            )));
        }
        if usize::from(last) >= CHANNEL_COUNT {
            return Err(Error::InvalidParameter(format!(
                "sub-band end {last} is beyond channel {}",
                CHANNEL_COUNT - 1
            )));
        }
        Ok(SubBand { first, last })
    }

    /// Compile-time constructor for plan constants; bounds are the caller's
    /// responsibility.
    pub(crate) const fn from_bounds(first: u8, last: u8) -> Self {
        SubBand { first, last }
    }

    pub fn first(&self) -> u8 {
        self.first
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    /// Number of slots in the sub-band.
    pub fn len(&self) -> usize {
        usize::from(self.last - self.first) + 1
    }

    pub fn contains(&self, index: u8) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

impl fmt::Display for SubBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channels {}-{}", self.first, self.last)
    }
}

/// Enabled/disabled state of every uplink channel slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMask {
    enabled: [bool; CHANNEL_COUNT],
}

impl ChannelMask {
    /// A mask with every slot disabled.
    pub fn all_disabled() -> Self {
        ChannelMask {
            enabled: [false; CHANNEL_COUNT],
        }
    }

    /// A mask with only the slots of `sub_band` enabled.
    pub fn with_sub_band(sub_band: SubBand) -> Self {
        let mut mask = Self::all_disabled();
        for index in sub_band.first..=sub_band.last {
            mask.enabled[usize::from(index)] = true;
        }
        mask
    }

    /// Enable or disable a single slot.
    pub fn set(&mut self, index: u8, on: bool) -> Result<()> {
        let slot = self
            .enabled
            .get_mut(usize::from(index))
            .ok_or_else(|| Error::InvalidParameter(format!("no channel {index}")))?;
        *slot = on;
        Ok(())
    }

    /// Whether slot `index` is enabled. Out-of-range slots are disabled.
    pub fn is_enabled(&self, index: u8) -> bool {
        self.enabled
            .get(usize::from(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled.iter().filter(|&&on| on).count()
    }

    /// `(index, enabled)` for every slot, in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        // CHANNEL_COUNT fits in u8, so the cast cannot truncate.
        self.enabled
            .iter()
            .enumerate()
            .map(|(i, &on)| (i as u8, on))
    }

    /// The per-slot configuration commands, in ascending index order.
    pub fn commands(&self) -> impl Iterator<Item = String> + '_ {
        self.iter()
            .map(|(index, on)| commands::cmd_set_channel_status(index, on))
    }
}
