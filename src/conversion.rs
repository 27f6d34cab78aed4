//! ADC conversion bookkeeping: which channel is pending, what has been read
//! this cycle, and how long the device needs before a result is valid.

/// ADC input selected by a conversion command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// D1
    Pressure,
    /// D2
    Temperature,
}

impl Channel {
    /// Offset of this channel's conversion command from the base command.
    pub fn offset(&self) -> u8 {
        match self {
            Channel::Pressure => 0x00,
            Channel::Temperature => 0x10,
        }
    }
}

/// Minimum time the device needs after a command before the next bus access
/// returns valid data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettlingTime(u32);

impl SettlingTime {
    pub const fn from_micros(us: u32) -> Self {
        SettlingTime(us)
    }

    pub const fn as_micros(&self) -> u32 {
        self.0
    }

    /// Rounded up so a millisecond timer never undershoots.
    pub const fn as_millis_ceil(&self) -> u32 {
        self.0.div_ceil(1_000)
    }
}

/// Latest raw ADC words. Each channel only ever overwrites its own value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub d1: Option<u32>,
    pub d2: Option<u32>,
}

impl RawSample {
    pub fn get(&self, channel: Channel) -> Option<u32> {
        match channel {
            Channel::Pressure => self.d1,
            Channel::Temperature => self.d2,
        }
    }

    pub(crate) fn set(&mut self, channel: Channel, value: u32) {
        match channel {
            Channel::Pressure => self.d1 = Some(value),
            Channel::Temperature => self.d2 = Some(value),
        }
    }
}

/// Where the current reading cycle stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleState {
    #[default]
    Idle,
    /// A conversion command was accepted and the device is settling. This
    /// covers both the just-started and the settling phase; the result may
    /// be read once the returned settling time has elapsed.
    Converting {
        channel: Channel,
        pressure_ready: bool,
        temperature_ready: bool,
    },
    /// One or both channels were read this cycle and nothing is pending.
    Ready {
        pressure_ready: bool,
        temperature_ready: bool,
    },
    /// Both channels were read this cycle.
    BothChannelsReady,
    /// A reading was computed; the next conversion opens a new cycle.
    Compensated,
}

/// Sequencing violations caught before touching the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SequenceError {
    NotStarted(Channel),
    ChannelMismatch { started: Channel, requested: Channel },
}

impl CycleState {
    fn ready_flags(&self) -> (bool, bool) {
        match *self {
            CycleState::Idle | CycleState::Compensated => (false, false),
            CycleState::Converting {
                pressure_ready,
                temperature_ready,
                ..
            }
            | CycleState::Ready {
                pressure_ready,
                temperature_ready,
            } => (pressure_ready, temperature_ready),
            CycleState::BothChannelsReady => (true, true),
        }
    }

    /// Channel whose conversion is pending, if any.
    pub fn pending(&self) -> Option<Channel> {
        match *self {
            CycleState::Converting { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// A new conversion command was written. A previously pending one is
    /// abandoned, as the device does the same.
    pub(crate) fn start(self, channel: Channel) -> CycleState {
        let (pressure_ready, temperature_ready) = self.ready_flags();
        CycleState::Converting {
            channel,
            pressure_ready,
            temperature_ready,
        }
    }

    /// Checks that `channel` may be read now.
    pub(crate) fn check_read(&self, channel: Channel) -> Result<(), SequenceError> {
        match self.pending() {
            Some(started) if started == channel => Ok(()),
            Some(started) => Err(SequenceError::ChannelMismatch {
                started,
                requested: channel,
            }),
            None => Err(SequenceError::NotStarted(channel)),
        }
    }

    /// The pending conversion's result was read.
    pub(crate) fn finish(self, channel: Channel) -> CycleState {
        let (mut pressure_ready, mut temperature_ready) = self.ready_flags();
        match channel {
            Channel::Pressure => pressure_ready = true,
            Channel::Temperature => temperature_ready = true,
        }

        if pressure_ready && temperature_ready {
            CycleState::BothChannelsReady
        } else {
            CycleState::Ready {
                pressure_ready,
                temperature_ready,
            }
        }
    }

    /// The pending conversion was lost to a bus failure.
    pub(crate) fn abandon(self) -> CycleState {
        match self.ready_flags() {
            (false, false) => CycleState::Idle,
            (true, true) => CycleState::BothChannelsReady,
            (pressure_ready, temperature_ready) => CycleState::Ready {
                pressure_ready,
                temperature_ready,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle() {
        let state = CycleState::Idle.start(Channel::Pressure);
        assert_eq!(state.pending(), Some(Channel::Pressure));
        assert!(state.check_read(Channel::Pressure).is_ok());

        let state = state.finish(Channel::Pressure);
        assert_eq!(
            state,
            CycleState::Ready {
                pressure_ready: true,
                temperature_ready: false
            }
        );

        let state = state.start(Channel::Temperature).finish(Channel::Temperature);
        assert_eq!(state, CycleState::BothChannelsReady);

        // compensation closes the cycle, readiness does not carry over
        let state = CycleState::Compensated.start(Channel::Temperature);
        assert_eq!(
            state,
            CycleState::Converting {
                channel: Channel::Temperature,
                pressure_ready: false,
                temperature_ready: false
            }
        );
    }

    #[test]
    fn read_without_start() {
        assert_eq!(
            CycleState::Idle.check_read(Channel::Temperature),
            Err(SequenceError::NotStarted(Channel::Temperature))
        );
        let state = CycleState::Idle
            .start(Channel::Pressure)
            .finish(Channel::Pressure);
        assert_eq!(
            state.check_read(Channel::Pressure),
            Err(SequenceError::NotStarted(Channel::Pressure))
        );
    }

    #[test]
    fn read_wrong_channel() {
        let state = CycleState::Idle.start(Channel::Temperature);
        assert_eq!(
            state.check_read(Channel::Pressure),
            Err(SequenceError::ChannelMismatch {
                started: Channel::Temperature,
                requested: Channel::Pressure
            })
        );
    }

    #[test]
    fn restart_replaces_pending_conversion() {
        let state = CycleState::Idle
            .start(Channel::Pressure)
            .start(Channel::Temperature);
        assert_eq!(state.pending(), Some(Channel::Temperature));
        assert!(state.check_read(Channel::Pressure).is_err());
    }

    #[test]
    fn abandon_keeps_what_was_read() {
        let state = CycleState::Idle
            .start(Channel::Pressure)
            .finish(Channel::Pressure)
            .start(Channel::Temperature)
            .abandon();
        assert_eq!(
            state,
            CycleState::Ready {
                pressure_ready: true,
                temperature_ready: false
            }
        );
        assert_eq!(CycleState::Idle.start(Channel::Pressure).abandon(), CycleState::Idle);
    }

    #[test]
    fn raw_sample_channels_are_independent() {
        let mut sample = RawSample::default();
        sample.set(Channel::Pressure, 4_311_550);
        assert_eq!(sample.get(Channel::Pressure), Some(4_311_550));
        assert_eq!(sample.get(Channel::Temperature), None);
        sample.set(Channel::Temperature, 8_387_300);
        sample.set(Channel::Pressure, 1);
        assert_eq!(sample.d1, Some(1));
        assert_eq!(sample.d2, Some(8_387_300));
    }

    #[test]
    fn millis_round_up() {
        assert_eq!(SettlingTime::from_micros(9_040).as_millis_ceil(), 10);
        assert_eq!(SettlingTime::from_micros(2_000).as_millis_ceil(), 2);
    }
}
