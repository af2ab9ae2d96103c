//! Target data models.
//!
//! Everything the layout engine needs to know about a target: the width
//! and alignment of each scalar, whether plain `char` is signed, and what
//! `__builtin_va_list` looks like. Only the architecture, OS and
//! environment parts of the triple matter.


use std::fmt;

use crate::TargetError;

/// Target CPU architecture.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Arch {
    X86_64,
    I386,
    Aarch64,
    Arm,
    Riscv64,
    Riscv32,
    Powerpc64,
    S390x,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X86_64 => "x86_64",
            Arch::I386 => "i386",
            Arch::Aarch64 => "aarch64",
            Arch::Arm => "arm",
            Arch::Riscv64 => "riscv64",
            Arch::Riscv32 => "riscv32",
            Arch::Powerpc64 => "powerpc64",
            Arch::S390x => "s390x",
        })
    }
}

/// Target operating system.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Os {
    Linux,
    Darwin,
    FreeBsd,
    Windows,
    /// Freestanding or unrecognized; laid out like Linux.
    Other,
}

/// Integer data model.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DataModel {
    /// 64-bit `long` and pointers.
    Lp64,
    /// 32-bit `int`, `long` and pointers.
    Ilp32,
    /// 64-bit pointers, 32-bit `long`.
    Llp64,
}

/// Scalar types whose layout depends on the target.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Scalar {
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Int128,
    Float16,
    Float,
    Double,
    LongDouble,
    Float128,
    Pointer,
    VaList,
}

/// Size and alignment of a scalar, in bytes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScalarLayout {
    pub size: u64,
    pub align: u64,
}

/// Target configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    triple: String,
    pub arch: Arch,
    pub os: Os,
    pub data_model: DataModel,
    /// Plain `char` is signed.
    pub char_signed: bool,
}

impl Default for Target {
    fn default() -> Self {
        Target {
            triple: Self::DEFAULT_TRIPLE.to_owned(),
            arch: Arch::X86_64,
            os: Os::Linux,
            data_model: DataModel::Lp64,
            char_signed: true,
        }
    }
}

impl Target {
    /// The triple used when none is given.
    pub const DEFAULT_TRIPLE: &'static str = "x86_64-unknown-linux-gnu";

    /// Parse a triple such as `x86_64-unknown-linux-gnu` or
    /// `aarch64-apple-darwin`.
    pub fn from_triple(triple: &str) -> Result<Self, TargetError> {
        let mut parts = triple.split('-');
        let arch_name = parts
            .next()
            .filter(|arch| !arch.is_empty())
            .ok_or_else(|| TargetError::Malformed(triple.to_owned()))?;
        let arch = match arch_name {
            "x86_64" | "amd64" => Arch::X86_64,
            "i386" | "i486" | "i586" | "i686" | "x86" => Arch::I386,
            "aarch64" | "arm64" | "aarch64_be" => Arch::Aarch64,
            "powerpc64" | "powerpc64le" | "ppc64" | "ppc64le" => Arch::Powerpc64,
            "s390x" => Arch::S390x,
            name if name.starts_with("riscv64") => Arch::Riscv64,
            name if name.starts_with("riscv32") => Arch::Riscv32,
            name if name.starts_with("arm") || name.starts_with("thumb") => Arch::Arm,
            name => {
                return Err(TargetError::UnknownArch {
                    arch: name.to_owned(),
                    triple: triple.to_owned(),
                })
            }
        };

        let rest: Vec<&str> = parts.collect();
        let has = |needle: &str| rest.iter().any(|part| part.starts_with(needle));
        let os = if has("linux") {
            Os::Linux
        } else if has("darwin") || has("macos") || has("ios") || has("apple") {
            Os::Darwin
        } else if has("freebsd") {
            Os::FreeBsd
        } else if has("windows") || has("win32") || has("mingw") {
            Os::Windows
        } else {
            Os::Other
        };

        let data_model = match (arch, os) {
            (Arch::I386 | Arch::Arm | Arch::Riscv32, _) => DataModel::Ilp32,
            (_, Os::Windows) => DataModel::Llp64,
            _ => DataModel::Lp64,
        };

        let char_signed = match (arch, os) {
            (Arch::Aarch64 | Arch::Arm, Os::Darwin | Os::Windows) => true,
            (Arch::Aarch64 | Arch::Arm | Arch::Riscv64 | Arch::Riscv32, _)
            | (Arch::Powerpc64 | Arch::S390x, _) => false,
            _ => true,
        };

        Ok(Target {
            triple: triple.to_owned(),
            arch,
            os,
            data_model,
            char_signed,
        })
    }

    /// The triple this target was parsed from.
    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn pointer_size(&self) -> u64 {
        match self.data_model {
            DataModel::Lp64 | DataModel::Llp64 => 8,
            DataModel::Ilp32 => 4,
        }
    }

    /// Largest alignment `__attribute__((aligned))` picks without an argument.
    pub fn max_align(&self) -> u64 {
        match self.arch {
            Arch::I386 | Arch::Arm | Arch::Riscv32 => 8,
            _ => 16,
        }
    }

    /// Layout of a scalar type on this target.
    pub fn scalar(&self, scalar: Scalar) -> ScalarLayout {
        let (size, align) = match scalar {
            Scalar::Bool | Scalar::Char => (1, 1),
            Scalar::Short | Scalar::Float16 => (2, 2),
            Scalar::Int | Scalar::Float => (4, 4),
            Scalar::Long => match self.data_model {
                DataModel::Lp64 => (8, 8),
                DataModel::Ilp32 | DataModel::Llp64 => (4, 4),
            },
            Scalar::LongLong | Scalar::Double => match self.arch {
                Arch::I386 if self.os != Os::Windows => (8, 4),
                _ => (8, 8),
            },
            Scalar::Int128 | Scalar::Float128 => (16, 16),
            Scalar::LongDouble => self.long_double(),
            Scalar::Pointer => (self.pointer_size(), self.pointer_size()),
            Scalar::VaList => self.va_list(),
        };
        ScalarLayout { size, align }
    }

    fn long_double(&self) -> (u64, u64) {
        match (self.arch, self.os) {
            (_, Os::Windows) | (Arch::Arm, _) | (Arch::Aarch64, Os::Darwin) => (8, 8),
            (Arch::I386, Os::Darwin) | (Arch::X86_64 | Arch::Aarch64, _) => (16, 16),
            (Arch::I386, _) => (12, 4),
            (Arch::Riscv64 | Arch::Riscv32 | Arch::Powerpc64 | Arch::S390x, _) => (16, 16),
        }
    }

    fn va_list(&self) -> (u64, u64) {
        match (self.arch, self.os) {
            (_, Os::Windows) | (Arch::Aarch64, Os::Darwin) => {
                (self.pointer_size(), self.pointer_size())
            }
            (Arch::X86_64, _) => (24, 8),
            (Arch::Aarch64, _) => (32, 8),
            (Arch::S390x, _) => (32, 8),
            (Arch::Powerpc64, _) => (8, 8),
            (Arch::I386 | Arch::Arm | Arch::Riscv32 | Arch::Riscv64, _) => {
                (self.pointer_size(), self.pointer_size())
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}
