pub mod config;
pub mod decoder;
pub mod disasm;
pub mod header;
pub mod instructions;
pub mod listing;
pub mod pattern;

pub mod isa {
    pub mod i8086; // 8086/8088 real-mode encodings
}

pub use config::ListingConfig;
pub use decoder::{DecodeError, Decoded, Decoder};
pub use header::{ExecHeader, HeaderError};
pub use isa::i8086::I8086Decoder;
pub use listing::{write_listing, Line, Listing, ListingError};
