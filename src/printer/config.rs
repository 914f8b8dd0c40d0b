//! # Printer Configuration
//!
//! This module defines hardware specifications for supported thermal label
//! printers.
//!
//! ## Supported Printers
//!
//! | Model | Head (dots) | Label height (dots) | Resolution |
//! |-------|-------------|---------------------|------------|
//! | LP384 | 384 | 96 | 203 DPI |
//! | LP255 | 255 | 96 | 203 DPI |
//!
//! ## Usage
//!
//! ```
//! use etiqueta::printer::PrinterConfig;
//!
//! let config = PrinterConfig::LP384;
//! println!("Label raster: {} bytes ({} columns of {} bytes)",
//!          config.bitmap_size(),
//!          config.width,
//!          config.bytes_per_column());
//! ```

/// # Printer Configuration
///
/// Defines the hardware characteristics and protocol constants of a thermal
/// label printer.
///
/// ## Physical Properties
///
/// - **width**: printable width in dots; one dot column per print head column
/// - **height**: label height in dots; must be a multiple of 8 so a column
///   packs into whole bytes
/// - **dpi**: resolution in dots per inch
///
/// ## Protocol Tuning
///
/// - **chunk_width**: columns compressed into one frame payload
/// - **command_id**: the fixed device/command id carried by every frame
///   header (model-specific, observed on the wire)
#[derive(Debug, Clone, Copy)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Printable width in dots (print head columns)
    pub width: u16,

    /// Label height in dots (multiple of 8)
    pub height: u16,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// Columns per compressed frame payload
    pub chunk_width: u16,

    /// Device/command id bytes in every frame header
    pub command_id: [u8; 8],
}

impl PrinterConfig {
    /// # LP384 Configuration
    ///
    /// 48mm-head BLE label printer, 384 dots across.
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Print width | 384 dots (48 bytes/row) |
    /// | Label height | 96 dots (12 bytes/column) |
    /// | Resolution | 203 DPI |
    /// | Interface | Bluetooth LE (GATT) |
    pub const LP384: Self = Self {
        name: "LP384",
        width: 384,
        height: 96,
        dpi: 203,
        chunk_width: 85,
        command_id: [0x1B, 0x2F, 0x03, 0x01, 0x00, 0x01, 0x00, 0x01],
    };

    /// # LP255 Configuration
    ///
    /// Compact 32mm-head variant, 255 dots across. Same protocol and label
    /// height as the LP384.
    pub const LP255: Self = Self {
        name: "LP255",
        width: 255,
        height: 96,
        dpi: 203,
        chunk_width: 85,
        command_id: [0x1B, 0x2F, 0x03, 0x01, 0x00, 0x01, 0x00, 0x01],
    };

    /// Bytes per print head column (`height / 8`).
    #[inline]
    pub const fn bytes_per_column(&self) -> usize {
        self.height as usize / 8
    }

    /// Size in bytes of one full label raster.
    #[inline]
    pub const fn bitmap_size(&self) -> usize {
        (self.width as usize * self.height as usize).div_ceil(8)
    }

    /// Number of column groups one job is split into.
    #[inline]
    pub const fn chunk_count(&self) -> usize {
        (self.width as usize).div_ceil(self.chunk_width as usize)
    }

    /// Calculate dots per millimeter
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width as f32 / self.dots_per_mm()
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::LP384
    }
}

// ============================================================================
// TESTS
// ============================================================================
