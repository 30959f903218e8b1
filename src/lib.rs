//! kicad-qr - overlay a QR code onto a textbox placeholder in a KiCad PCB
//!
//! A designer draws a `gr_text_box` whose text is an identifier such as `QR`.
//! This crate finds that textbox, encodes caller data as a QR symbol, scales
//! the symbol into the textbox and writes it back as filled board graphics on
//! the textbox's layer. Every byte of the board outside the edited items is
//! preserved.
//!
//! # Example
//!
//! ```no_run
//! use kicad_qr::{Board, InsertOptions, QrInserter};
//! use std::path::Path;
//!
//! fn main() -> kicad_qr::Result<()> {
//!     let board = Board::load(Path::new("board.kicad_pcb"))?;
//!     let insertion = QrInserter::new(InsertOptions::default())
//!         .prepare(&board, "QR", "https://example.com/sn/0001")?;
//!     board.save(&insertion.patches, Path::new("board.kicad_pcb"))?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod board;
pub mod config;
pub mod embed;
pub mod error;
pub mod geometry;
pub mod inserter;
pub mod logging;
pub mod output;
pub mod placement;
pub mod qr;
pub mod sexpr;

// Re-exports for convenience
pub use board::{Board, Textbox};
pub use config::{KicadQrConfig, LogRotation, LoggingOptions, PlacementOptions, QrOptions};
pub use embed::Embedder;
pub use error::{Error, Result};
pub use geometry::Point;
pub use inserter::{InsertOptions, Insertion, QrInserter};
pub use output::{InsertionReport, PlacedQr};
pub use placement::{FitMode, Placement};
pub use qr::{EccLevel, QrDecoder, QrEncoder, QrMatrix};
