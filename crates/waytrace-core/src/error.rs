use thiserror::Error;

/// Failure while installing a compositor-provided keymap.
///
/// None of these are fatal. The tracer keeps logging key events; it only
/// loses the symbol/UTF-8 detail lines until the next keymap update
/// compiles successfully.
#[derive(Error, Debug)]
pub enum KeymapError {
    #[error("unsupported keymap format: {0}")]
    UnsupportedFormat(u32),

    #[error("keymap text is not valid UTF-8")]
    InvalidText,

    #[error("libxkbcommon rejected the keymap")]
    CompileFailed,
}
