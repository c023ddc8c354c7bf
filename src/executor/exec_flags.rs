use bitflags::bitflags;

bitflags! {
    /// Capabilities requested from a plan tree at init.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExecFlags: u32 {
        /// EXPLAIN, no execution will follow.
        const EXPLAIN_ONLY = 0x0001;
        /// Rescan will be called.
        const REWIND = 0x0002;
        /// Backward scan will be requested.
        const BACKWARD = 0x0004;
        /// Mark/restore will be requested.
        const MARK = 0x0008;
    }
}
