/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the error codes reported by FRTS discovery and
    verification.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// FRTS Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrtsError(pub NonZeroU32);

/// Error class, encoded in the upper 16 bits of every error code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrtsErrorKind {
    /// Malformed caller input; a programming error.
    InvalidArgument,

    /// Untrusted VBIOS data failed a structural or self-consistency check.
    InvalidState,

    /// Secure-access policy refused the request.
    PermissionDenied,

    /// The FRTS window is not protected the way the policy requires.
    SecurityViolation,

    /// This build has no code path for the requested variant.
    NotSupported,

    /// Failure reported by the platform DMA or registry collaborators.
    Dma,

    Unknown,
}

impl FrtsErrorKind {
    const fn from_class(class: u32) -> Self {
        match class {
            0x0001 => Self::InvalidArgument,
            0x0002 => Self::InvalidState,
            0x0003 => Self::PermissionDenied,
            0x0004 => Self::SecurityViolation,
            0x0005 => Self::NotSupported,
            0x0006 => Self::Dma,
            _ => Self::Unknown,
        }
    }
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: FrtsError = FrtsError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl FrtsError {
    /// Create an FRTS error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get an FrtsError from a u32 is to
    /// use `FrtsError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("FrtsError cannot be 0"),
        }
    }

    /// Returns the error class of this code.
    pub const fn kind(&self) -> FrtsErrorKind {
        FrtsErrorKind::from_class(self.0.get() >> 16)
    }

    define_error_constants![
        // Invalid argument
        (
            FRTS_CONFIG_WINDOW_EMPTY,
            0x0001_0001,
            "Config Error: FRTS window size is zero"
        ),
        (
            FRTS_CONFIG_WINDOW_TOO_LARGE,
            0x0001_0002,
            "Config Error: FRTS window exceeds the platform maximum"
        ),
        (
            FRTS_CONFIG_WINDOW_MISALIGNED,
            0x0001_0003,
            "Config Error: FRTS window does not start on a DMA alignment boundary"
        ),
        (
            FRTS_CONFIG_WINDOW_OVERFLOW,
            0x0001_0004,
            "Config Error: FRTS window end overflows the address space"
        ),
        (
            FRTS_TABLE_LAYOUT_INVALID,
            0x0001_0005,
            "Driver Error: table buffer layout names an invalid or duplicate DIRT id"
        ),
        (
            FRTS_TABLE_LAYOUT_TOO_LARGE,
            0x0001_0006,
            "Driver Error: table buffer layout exceeds the arena"
        ),
        (
            FRTS_ACCESS_NOT_OPEN,
            0x0001_0007,
            "Driver Error: FRTS access used before the window was opened"
        ),
        (
            FRTS_ACCESS_BUFFER_TOO_SMALL,
            0x0001_0008,
            "Driver Error: requested transfer does not fit the backing buffer"
        ),
        // Invalid state
        (
            FRTS_CONFIG_MEDIA_TYPE_INVALID,
            0x0002_0001,
            "Config Error: unknown FRTS media type"
        ),
        (
            FRTS_DESC_IDENTIFIER_MISMATCH,
            0x0002_0002,
            "Descriptor Error: identifier does not match"
        ),
        (
            FRTS_DESC_VERSION_UNSUPPORTED,
            0x0002_0003,
            "Descriptor Error: unsupported descriptor version"
        ),
        (
            FRTS_DESC_SIZE_MISMATCH,
            0x0002_0004,
            "Descriptor Error: reported size does not match the version"
        ),
        (
            FRTS_DESC_COPY_INCOMPLETE,
            0x0002_0005,
            "Descriptor Error: FRTS copy did not complete"
        ),
        (
            FRTS_META_VDPA_OFFSET_MISMATCH,
            0x0002_0006,
            "Metadata Error: VDPA entry offset does not follow the descriptor"
        ),
        (
            FRTS_META_IMAGE_OFFSET_MISMATCH,
            0x0002_0007,
            "Metadata Error: image offset does not follow the VDPA entries"
        ),
        (
            FRTS_META_IMAGE_END_MISALIGNED,
            0x0002_0008,
            "Metadata Error: image end is not DMA aligned"
        ),
        (
            FRTS_META_IMAGE_TOO_LARGE,
            0x0002_0009,
            "Metadata Error: image end exceeds the FRTS window"
        ),
        (
            FRTS_META_ARITHMETIC_OVERFLOW,
            0x0002_000A,
            "Metadata Error: layout arithmetic overflow"
        ),
        (
            FRTS_VDPA_ENTRY_SIZE_MISMATCH,
            0x0002_000B,
            "VDPA Error: entry size does not match the CERT variant"
        ),
        (
            FRTS_VDPA_ENTRY_COUNT_EXCEEDED,
            0x0002_000C,
            "VDPA Error: entry count exceeds the CERT variant maximum"
        ),
        (
            FRTS_VDPA_ENTRY_TRUNCATED,
            0x0002_000D,
            "VDPA Error: entry lies outside the fetched array"
        ),
        (
            FRTS_TABLE_TOO_LARGE,
            0x0002_000E,
            "Table Error: table exceeds its reserved buffer"
        ),
        (
            FRTS_TABLE_OUT_OF_IMAGE,
            0x0002_000F,
            "Table Error: table lies outside the firmware image"
        ),
        (
            FRTS_DMA_OUT_OF_BOUNDS,
            0x0002_0010,
            "DMA Error: transfer lies outside the FRTS window"
        ),
        // Permission denied
        (
            FRTS_SECURE_MEDIA_TYPE_DENIED,
            0x0003_0001,
            "Secure Error: only frame-buffer FRTS is allowed under enforced security"
        ),
        (
            FRTS_SECURE_WPR_ID_UNPROTECTED,
            0x0003_0002,
            "Secure Error: FRTS references the unprotected WPR id"
        ),
        (
            FRTS_SECURE_WPR_ID_VPR,
            0x0003_0003,
            "Secure Error: FRTS references the VPR id"
        ),
        (
            FRTS_DMA_ACCESS_DENIED,
            0x0003_0004,
            "DMA Error: channel is not permitted to read the FRTS window"
        ),
        // Security violation
        (
            FRTS_SECURE_WINDOW_OUTSIDE_WPR,
            0x0004_0001,
            "Secure Error: FRTS window is not contained in the WPR"
        ),
        (
            FRTS_SECURE_WPR_NOT_SECURE,
            0x0004_0002,
            "Secure Error: WPR read access control is not secure"
        ),
        // Not supported
        (
            FRTS_CERT_VARIANT_NOT_SUPPORTED,
            0x0005_0001,
            "VDPA Error: no parser for the CERT variant in this build"
        ),
        // Platform collaborators
        (
            FRTS_DMA_TRANSFER_FAILED,
            0x0006_0001,
            "DMA Error: transfer failed"
        ),
        (
            FRTS_WPR_QUERY_FAILED,
            0x0006_0003,
            "Platform Error: WPR registry query failed"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::FrtsError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::FrtsError(val)
    }
}

impl From<FrtsError> for core::num::NonZeroU32 {
    fn from(val: FrtsError) -> Self {
        val.0
    }
}

impl From<FrtsError> for u32 {
    fn from(val: FrtsError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for FrtsError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(FrtsError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type FrtsResult<T> = Result<T, FrtsError>;
