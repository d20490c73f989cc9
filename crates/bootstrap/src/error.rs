use snafu::{Location, Snafu};

/// Reasons the boot manifest cannot seed an allocator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BootstrapError {
    #[snafu(display("invalid empty slot region: {start}..{end}"))]
    InvalidSlotRegion {
        start: usize,
        end: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid untyped region: {start}..{end}"))]
    InvalidUntypedRegion {
        start: usize,
        end: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("untyped size list has {actual} entries, expected {expected}"))]
    SizeListLength {
        expected: usize,
        actual: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("too many usable untyped items: {count} (max {max})"))]
    TooManyUntypeds {
        count: usize,
        max: usize,
        #[snafu(implicit)]
        location: Location,
    },
}
