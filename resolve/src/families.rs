use std::sync::OnceLock;

use regex::Regex;

/// An MPICH-lineage library family targeted by conservative SONAME aliasing.
///
/// Open MPI is deliberately excluded: its `libmpi.so.40*` SONAME overlaps
/// MPICH's `libmpi.so*` pattern, and its ABI is not interchangeable with
/// MPICH's, so the exclusion patterns below defend against aliasing the
/// wrong stack in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Family {
    /// `libmpi(_cray)?.so*`, excluding Open MPI's `libmpi.so.40*`.
    Mpi,
    /// `libmpifort(_cray)?.so*`, excluding the Fortran/C++ binding shims.
    MpiFort,
    /// `(libmpicxx|libmpi_cxx).so*`.
    MpiCxx,
}

struct Patterns {
    mpi: Regex,
    mpi_exclude: Regex,
    mpifort: Regex,
    mpifort_exclude: Regex,
    mpicxx: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        mpi: Regex::new(r"^libmpi(_cray)?\.so(\.\d+)*$").expect("valid regex"),
        mpi_exclude: Regex::new(r"^libmpi\.so\.4\d+").expect("valid regex"),
        mpifort: Regex::new(r"^libmpifort(_cray)?\.so(\.\d+)*$").expect("valid regex"),
        mpifort_exclude: Regex::new(r"^libmpi_(mpifh|usempi|usempif08)\.so").expect("valid regex"),
        mpicxx: Regex::new(r"^(libmpicxx|libmpi_cxx)\.so(\.\d+)*$").expect("valid regex"),
    })
}

/// Classify `name` (a SONAME, falling back to a bare filename) into a
/// family, if any.
pub fn classify(name: &str) -> Option<Family> {
    let p = patterns();
    if p.mpi.is_match(name) && !p.mpi_exclude.is_match(name) {
        return Some(Family::Mpi);
    }
    if p.mpifort.is_match(name) && !p.mpifort_exclude.is_match(name) {
        return Some(Family::MpiFort);
    }
    if p.mpicxx.is_match(name) {
        return Some(Family::MpiCxx);
    }
    None
}

/// Classify a library by SONAME first, falling back to its on-disk filename.
pub fn classify_library(soname: Option<&str>, filename: &str) -> Option<Family> {
    soname.and_then(classify).or_else(|| classify(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mpich_soname() {
        assert_eq!(Some(Family::Mpi), classify("libmpi.so.12"));
    }

    #[test]
    fn excludes_open_mpi_soname() {
        assert_eq!(None, classify("libmpi.so.40"));
        assert_eq!(None, classify("libmpi.so.40.30.0"));
    }

    #[test]
    fn classifies_cray_variant() {
        assert_eq!(Some(Family::Mpi), classify("libmpi_cray.so.12"));
    }

    #[test]
    fn classifies_mpifort_and_excludes_binding_shims() {
        assert_eq!(Some(Family::MpiFort), classify("libmpifort.so.12"));
        assert_eq!(None, classify("libmpi_mpifh.so.12"));
        assert_eq!(None, classify("libmpi_usempi.so.12"));
        assert_eq!(None, classify("libmpi_usempif08.so.12"));
    }

    #[test]
    fn classifies_mpicxx_both_spellings() {
        assert_eq!(Some(Family::MpiCxx), classify("libmpicxx.so.12"));
        assert_eq!(Some(Family::MpiCxx), classify("libmpi_cxx.so.12"));
    }

    #[test]
    fn falls_back_to_filename_when_soname_absent() {
        assert_eq!(Some(Family::Mpi), classify_library(None, "libmpi.so.12.1.1"));
    }

    #[test]
    fn unrelated_library_is_unclassified() {
        assert_eq!(None, classify("libc.so.6"));
    }
}
