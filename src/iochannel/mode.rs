//! Access-mode and channel-kind bit flags, mirroring §6.3 of the design.

use bitflags::bitflags;

bitflags! {
    /// Access + lifecycle bits accepted by [`crate::iochannel::IoChannel::open`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMode: u32 {
        const R_ONLY    = 0b0000_0001;
        const W_ONLY    = 0b0000_0010;
        const RW        = 0b0000_0100;
        const CREATE    = 0b0000_1000;
        const TRUNCATE  = 0b0001_0000;
        const APPEND    = 0b0010_0000;
        const CLOSE     = 0b0100_0000;
        const NOT_CLOSE = 0b1000_0000;
    }
}

impl ChannelMode {
    pub fn is_readable(self) -> bool {
        self.intersects(ChannelMode::R_ONLY | ChannelMode::RW)
    }

    pub fn is_writable(self) -> bool {
        self.intersects(ChannelMode::W_ONLY | ChannelMode::RW)
    }

    /// Exactly one of R_ONLY / W_ONLY / RW must be set.
    pub fn has_valid_access(self) -> bool {
        let access = self & (ChannelMode::R_ONLY | ChannelMode::W_ONLY | ChannelMode::RW);
        access.bits().count_ones() == 1
    }

    pub fn should_close_on_exit(self) -> bool {
        !self.contains(ChannelMode::NOT_CLOSE)
    }
}

/// Which concrete resource kind a channel wraps, for `getProperty`-style
/// introspection and for drivers that need to special-case behaviour (e.g.
/// sockets cannot seek).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Fd,
    Socket,
    MemPointer,
    AnsiFile,
    Generic,
    NotSet,
}
