//! Host-FPU plumbing for the floating-point executor.
//!
//! Arithmetic runs on the host FPU: the rounding mode is installed with
//! `fesetround` before each operation and the accrued exception flags are
//! harvested with `fetestexcept` afterwards, then folded into
//! `fcsr.fflags`. This relies on the host providing IEEE 754 binary32/
//! binary64 with correctly rounded add/sub/mul/div/sqrt (any platform with
//! the C99 `fenv` interface qualifies).
//!
//! Float-to-integer conversions are rounded in software instead, because
//! the RISC-V rules (NaN to positive max, NV suppressing NX, range checks
//! against the rounded value) do not map onto a plain host cast.

use crate::common::error::{ExceptionKind, Trap};

// Host FPU exception flag bits from <fenv.h>. These values are shared by
// x86_64 and aarch64 Linux.
const FE_INEXACT: i32 = 0x20;
const FE_UNDERFLOW: i32 = 0x10;
const FE_OVERFLOW: i32 = 0x08;
const FE_DIVBYZERO: i32 = 0x04;
const FE_INVALID: i32 = 0x01;
const FE_ALL_EXCEPT: i32 = FE_INEXACT | FE_UNDERFLOW | FE_OVERFLOW | FE_DIVBYZERO | FE_INVALID;

// Host rounding-mode words differ per architecture.
#[cfg(target_arch = "x86_64")]
mod host_round {
    pub const TO_NEAREST: i32 = 0x000;
    pub const DOWNWARD: i32 = 0x400;
    pub const UPWARD: i32 = 0x800;
    pub const TOWARD_ZERO: i32 = 0xC00;
}

#[cfg(target_arch = "aarch64")]
mod host_round {
    pub const TO_NEAREST: i32 = 0x00_0000;
    pub const UPWARD: i32 = 0x40_0000;
    pub const DOWNWARD: i32 = 0x80_0000;
    pub const TOWARD_ZERO: i32 = 0xC0_0000;
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod host_round {
    pub const TO_NEAREST: i32 = 0;
    pub const DOWNWARD: i32 = 0;
    pub const UPWARD: i32 = 0;
    pub const TOWARD_ZERO: i32 = 0;
}

extern "C" {
    fn feclearexcept(excepts: i32) -> i32;
    fn fetestexcept(excepts: i32) -> i32;
    fn fesetround(round: i32) -> i32;
}

/// Accrued-exception flag bits of `fcsr.fflags`.
pub mod fflags {
    /// Invalid operation.
    pub const NV: u32 = 1 << 4;
    /// Divide by zero.
    pub const DZ: u32 = 1 << 3;
    /// Overflow.
    pub const OF: u32 = 1 << 2;
    /// Underflow.
    pub const UF: u32 = 1 << 1;
    /// Inexact.
    pub const NX: u32 = 1 << 0;
}

/// RISC-V rounding modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    Rne,
    /// Round towards zero.
    Rtz,
    /// Round down (towards negative infinity).
    Rdn,
    /// Round up (towards positive infinity).
    Rup,
    /// Round to nearest, ties to max magnitude.
    Rmm,
}

impl RoundingMode {
    /// Decodes a 3-bit `rm` field; values 5 and 6 are reserved.
    pub fn from_bits(rm: u32) -> Option<Self> {
        match rm {
            0 => Some(Self::Rne),
            1 => Some(Self::Rtz),
            2 => Some(Self::Rdn),
            3 => Some(Self::Rup),
            4 => Some(Self::Rmm),
            _ => None,
        }
    }

    /// The host `fesetround` word. The host has no ties-to-max-magnitude
    /// mode, so RMM arithmetic rounds to nearest-even.
    fn host_word(self) -> i32 {
        match self {
            Self::Rne | Self::Rmm => host_round::TO_NEAREST,
            Self::Rtz => host_round::TOWARD_ZERO,
            Self::Rdn => host_round::DOWNWARD,
            Self::Rup => host_round::UPWARD,
        }
    }
}

/// Resolves the effective rounding mode of one FP instruction: the `rm`
/// field, or `fcsr.frm` when `rm` is the dynamic selector 0b111. Reserved
/// encodings in either place raise illegal-instruction.
pub fn resolve_rounding_mode(rm: u32, frm: u32, pc: u32, insn: u32) -> Result<RoundingMode, Trap> {
    let selector = if rm == 0b111 { frm } else { rm };
    RoundingMode::from_bits(selector).ok_or(Trap {
        kind: ExceptionKind::IllegalInstruction,
        pc,
        value: insn,
    })
}

/// Runs one arithmetic operation under the given host rounding mode and
/// returns its result together with the harvested `fflags` bits.
pub fn with_host_rounding<T>(rm: RoundingMode, operation: impl FnOnce() -> T) -> (T, u32) {
    // SAFETY: fenv calls only mutate the host thread's FP environment.
    unsafe {
        fesetround(rm.host_word());
        feclearexcept(FE_ALL_EXCEPT);
    }
    let result = operation();
    let host = unsafe {
        let flags = fetestexcept(FE_ALL_EXCEPT);
        fesetround(host_round::TO_NEAREST);
        flags
    };

    let mut flags = 0;
    if host & FE_INVALID != 0 {
        flags |= fflags::NV;
    }
    if host & FE_DIVBYZERO != 0 {
        flags |= fflags::DZ;
    }
    if host & FE_OVERFLOW != 0 {
        flags |= fflags::OF;
    }
    if host & FE_UNDERFLOW != 0 {
        flags |= fflags::UF;
    }
    if host & FE_INEXACT != 0 {
        flags |= fflags::NX;
    }
    (result, flags)
}

/// Rounds a value to an integer under a RISC-V rounding mode.
fn round_f64(value: f64, rm: RoundingMode) -> f64 {
    match rm {
        RoundingMode::Rne => value.round_ties_even(),
        RoundingMode::Rtz => value.trunc(),
        RoundingMode::Rdn => value.floor(),
        RoundingMode::Rup => value.ceil(),
        // Ties away from zero.
        RoundingMode::Rmm => value.round(),
    }
}

/// Converts to i32 with RISC-V semantics: NaN and +overflow saturate to
/// `i32::MAX`, -overflow to `i32::MIN`; NV suppresses NX.
pub fn f64_to_i32(value: f64, rm: RoundingMode) -> (i32, u32) {
    if value.is_nan() {
        return (i32::MAX, fflags::NV);
    }
    let rounded = round_f64(value, rm);
    if rounded < -2_147_483_648.0 {
        (i32::MIN, fflags::NV)
    } else if rounded >= 2_147_483_648.0 {
        (i32::MAX, fflags::NV)
    } else {
        let nx = if rounded == value { 0 } else { fflags::NX };
        (rounded as i32, nx)
    }
}

/// Converts to u32 with RISC-V semantics (NaN saturates to `u32::MAX`).
pub fn f64_to_u32(value: f64, rm: RoundingMode) -> (u32, u32) {
    if value.is_nan() {
        return (u32::MAX, fflags::NV);
    }
    let rounded = round_f64(value, rm);
    if rounded < 0.0 {
        (0, fflags::NV)
    } else if rounded >= 4_294_967_296.0 {
        (u32::MAX, fflags::NV)
    } else {
        let nx = if rounded == value { 0 } else { fflags::NX };
        (rounded as u32, nx)
    }
}

/// Whether an f32 is a signaling NaN.
pub fn is_snan_f32(bits: u32) -> bool {
    let exp = (bits >> 23) & 0xFF;
    let frac = bits & 0x007F_FFFF;
    exp == 0xFF && frac != 0 && frac & 0x0040_0000 == 0
}

/// Whether an f64 is a signaling NaN.
pub fn is_snan_f64(bits: u64) -> bool {
    let exp = (bits >> 52) & 0x7FF;
    let frac = bits & 0x000F_FFFF_FFFF_FFFF;
    exp == 0x7FF && frac != 0 && frac & 0x0008_0000_0000_0000 == 0
}

/// The 10-bit `fclass` mask for an f32.
pub fn classify_f32(bits: u32) -> u32 {
    let sign = bits >> 31;
    let exp = (bits >> 23) & 0xFF;
    let frac = bits & 0x007F_FFFF;

    if exp == 0xFF && frac != 0 {
        if frac & 0x0040_0000 != 0 {
            1 << 9 // quiet NaN
        } else {
            1 << 8 // signaling NaN
        }
    } else if exp == 0xFF {
        if sign != 0 { 1 << 0 } else { 1 << 7 } // ±infinity
    } else if exp == 0 && frac == 0 {
        if sign != 0 { 1 << 3 } else { 1 << 4 } // ±zero
    } else if exp == 0 {
        if sign != 0 { 1 << 2 } else { 1 << 5 } // ±subnormal
    } else if sign != 0 {
        1 << 1 // negative normal
    } else {
        1 << 6 // positive normal
    }
}

/// The 10-bit `fclass` mask for an f64.
pub fn classify_f64(bits: u64) -> u32 {
    let sign = bits >> 63;
    let exp = (bits >> 52) & 0x7FF;
    let frac = bits & 0x000F_FFFF_FFFF_FFFF;

    if exp == 0x7FF && frac != 0 {
        if frac & 0x0008_0000_0000_0000 != 0 {
            1 << 9
        } else {
            1 << 8
        }
    } else if exp == 0x7FF {
        if sign != 0 { 1 << 0 } else { 1 << 7 }
    } else if exp == 0 && frac == 0 {
        if sign != 0 { 1 << 3 } else { 1 << 4 }
    } else if exp == 0 {
        if sign != 0 { 1 << 2 } else { 1 << 5 }
    } else if sign != 0 {
        1 << 1
    } else {
        1 << 6
    }
}
