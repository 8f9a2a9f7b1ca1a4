//! The 10-bit flags field shared by every frame header.

use bitflags::bitflags;

bitflags! {
    /// Header flag bits.
    ///
    /// Only the high five of the ten flag bits carry meaning in RSocket 1.0;
    /// decoding goes through [`FrameFlags::from_bits_truncate`], which drops
    /// everything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsocket_core::FrameFlags;
    ///
    /// let flags = FrameFlags::METADATA | FrameFlags::FOLLOWS;
    /// assert!(flags.contains(FrameFlags::FOLLOWS));
    /// assert!(!flags.contains(FrameFlags::COMPLETE));
    /// assert_eq!(flags.bits(), 0x180);
    /// ```
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u16 {
        /// `I`: the frame may be ignored if not understood.
        const IGNORE   = 0x200;
        /// `M`: metadata is present.
        const METADATA = 0x100;
        /// `F`: more fragments follow.
        const FOLLOWS  = 0x80;
        /// `C`: the stream is complete.
        const COMPLETE = 0x40;
        /// `N`: the frame carries a next payload.
        const NEXT     = 0x20;
    }
}

impl FrameFlags {
    /// Mask covering the ten flag bits of the type-and-flags field.
    pub const MASK: u16 = 0x03FF;
}
