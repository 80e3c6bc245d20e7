//! Serializer mode/direction bit flags (§3 Data Model).

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SerializeMode: u32 {
        const READ          = 0b0000_0001;
        const WRITE         = 0b0000_0010;
        const CALC          = 0b0000_0100;
        const NO_HEADER     = 0b0000_1000;
        const AUTO_CALC     = 0b0001_0000;
        const INIT_MODE     = 0b0010_0000;
        const STREAM_NORMAL = 0b0100_0000;
        const STREAM_LOOP   = 0b1000_0000;
    }
}

impl SerializeMode {
    /// Exactly one of Read/Write/Calc must be set.
    pub fn has_valid_direction(self) -> bool {
        let dir = self & (SerializeMode::READ | SerializeMode::WRITE | SerializeMode::CALC);
        dir.bits().count_ones() == 1
    }

    pub fn is_read(self) -> bool {
        self.contains(SerializeMode::READ)
    }

    pub fn is_write(self) -> bool {
        self.contains(SerializeMode::WRITE)
    }

    pub fn is_calc(self) -> bool {
        self.contains(SerializeMode::CALC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_direction_required() {
        assert!((SerializeMode::READ).has_valid_direction());
        assert!(!(SerializeMode::READ | SerializeMode::WRITE).has_valid_direction());
        assert!(!(SerializeMode::NO_HEADER).has_valid_direction());
    }
}
