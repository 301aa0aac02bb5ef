//! Unified error types for icy_tile_engine

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for icy_tile_engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File '{path}' does not exist")]
    FileNotFound { path: PathBuf },

    #[error("Read of {bits} bits at bit address {address} exceeds the data length of {length} bits")]
    ReadPastEnd { address: u64, bits: usize, length: u64 },

    #[error("Write of {bits} bits at bit address {address} exceeds the data length of {length} bits")]
    WritePastEnd { address: u64, bits: usize, length: u64 },

    // === Bit Stream Errors ===
    #[error("Bit count {count} is out of range (1..=32)")]
    InvalidBitCount { count: usize },

    #[error("Bit stream access of {requested} bits at cursor {cursor} exceeds the stream length of {length} bits")]
    BitStreamOutOfRange { cursor: usize, requested: usize, length: usize },

    #[error("Bit stream length {length} exceeds the buffer capacity of {capacity} bits")]
    BitStreamTooLong { length: usize, capacity: usize },

    // === Codec Errors ===
    #[error("Encoded buffer holds {actual} bits but codec '{codec}' requires {expected} bits")]
    EncodedSizeMismatch { codec: String, expected: usize, actual: usize },

    #[error("Native buffer has {actual} pixels but codec '{codec}' requires {width}x{height}")]
    NativeSizeMismatch { codec: String, width: usize, height: usize, actual: usize },

    #[error("Codec '{codec}' cannot be resized")]
    CodecNotResizable { codec: String },

    #[error("Codec '{codec}' cannot be resized to {width}x{height}: dimensions must be positive multiples of {width_increment}x{height_increment}")]
    InvalidCodecSize {
        codec: String,
        width: usize,
        height: usize,
        width_increment: usize,
        height_increment: usize,
    },

    #[error("Palette index {index} exceeds the {max} colors addressable by codec '{codec}'")]
    IndexOutOfCodecRange { codec: String, index: u8, max: usize },

    #[error("Codec '{codec}' has no data file to access")]
    NoDataFile { codec: String },

    #[error("Codec '{name}' is not registered")]
    UnknownCodec { name: String },

    // === Palette Errors ===
    #[error("Palette index {index} out of range (0..{entries}) for palette '{palette}'")]
    PaletteIndexOutOfRange { palette: String, index: usize, entries: usize },

    #[error("Palette '{palette}' does not contain the color {color}")]
    ColorNotInPalette { palette: String, color: String },

    #[error("Palette '{palette}' has no backing data file")]
    PaletteWithoutDataFile { palette: String },

    #[error("Palette '{palette}' supports at most 256 entries, got {entries}")]
    TooManyPaletteEntries { palette: String, entries: usize },

    // === Arranger / Image Errors ===
    #[error("Invalid dimensions {width}x{height}: {message}")]
    InvalidDimensions { width: usize, height: usize, message: String },

    #[error("Position ({x}, {y}) is outside the bounds ({width}, {height})")]
    OutOfBounds { x: usize, y: usize, width: usize, height: usize },

    #[error("Element color type {actual:?} does not match arranger color type {expected:?}")]
    ColorTypeMismatch {
        expected: crate::PixelColorType,
        actual: crate::PixelColorType,
    },

    #[error("Arranger '{arranger}' has invalid state: {message}")]
    InvalidArrangerState { arranger: String, message: String },

    #[error("No element is assigned at ({x}, {y})")]
    NoElement { x: usize, y: usize },

    #[error("No palette is available for the element at ({x}, {y})")]
    NoPalette { x: usize, y: usize },

    // === Project Tree Errors ===
    #[error("'{name}' is not contained within project '{project}'")]
    NodeNotInTree { name: String, project: String },

    #[error("'{parent}' already contains a child named '{name}'")]
    NameCollision { parent: String, name: String },

    #[error("'{parent}' cannot contain children")]
    CannotContainChildren { parent: String },

    #[error("'{name}' has no parent")]
    NoParent { name: String },

    #[error("Cannot move '{name}' onto itself")]
    MoveOntoSelf { name: String },

    #[error("'{parent}' cannot be moved underneath its child node '{name}'")]
    MoveUnderDescendant { name: String, parent: String },

    #[error("Cannot add a resource of kind '{kind}' to a project tree")]
    UnsupportedResource { kind: String },

    #[error("Resource name '{name}' is invalid")]
    InvalidResourceName { name: String },

    #[error("Could not find an unused name for '{name}'")]
    NoFreeName { name: String },

    #[error("Failed to relocate '{from}' to '{to}': {message}")]
    RelocationFailed { from: PathBuf, to: PathBuf, message: String },

    // === Resolution Errors ===
    #[error("{0}")]
    Resolution(String),
}

/// Result type alias for icy_tile_engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Create a resolution failure carrying a human-readable reason
    pub fn resolution(msg: impl std::fmt::Display) -> Self {
        Self::Resolution(msg.to_string())
    }

    pub fn invalid_dimensions(width: usize, height: usize, msg: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            message: msg.into(),
        }
    }
}
