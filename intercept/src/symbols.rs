//! Process symbol lookup.
//!
//! This is the opaque host symbol service behind the runtime's resolver:
//! given a name, return an address or nothing. On unix it queries the
//! dynamic loader's global scope.

/// Look up an exported symbol by name in the current process image.
#[cfg(unix)]
pub fn find_global_export_by_name(symbol: &str) -> Option<usize> {
    use std::ffi::CString;

    let name = CString::new(symbol).ok()?;
    let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    if addr.is_null() {
        None
    } else {
        Some(addr as usize)
    }
}

#[cfg(not(unix))]
pub fn find_global_export_by_name(_symbol: &str) -> Option<usize> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn finds_libc_malloc() {
        let addr = find_global_export_by_name("malloc");
        assert!(addr.is_some(), "malloc should be resolvable via the loader");
        assert_ne!(addr.unwrap(), 0);
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert_eq!(find_global_export_by_name("definitely_not_a_symbol_xq"), None);
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert_eq!(find_global_export_by_name("mal\0loc"), None);
    }
}
