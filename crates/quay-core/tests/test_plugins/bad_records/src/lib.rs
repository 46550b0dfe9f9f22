//! Symbols that look like registrations but are not usable ones.
//!
//! No `missing__plugin` symbol exists, so asking for plugin `missing` fails
//! at symbol lookup.

#[repr(C)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
}

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static garbage__plugin: Header = Header {
    magic: 0xdead_beef,
    version: 1,
};

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static future__plugin: Header = Header {
    magic: 0x504c_5547,
    version: 99,
};
