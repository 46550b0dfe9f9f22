mod common;

pub mod ffi_tests;
