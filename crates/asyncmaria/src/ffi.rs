//! Raw bindings to the libmariadb non-blocking client API.
//!
//! Only the entry points the driver uses are declared. The handle
//! types are opaque; every field the driver needs is reached through
//! accessor functions, except `MYSQL_FIELD`, whose layout is part of
//! the library's ABI.

#![allow(unsafe_code)]
#![allow(non_camel_case_types)]
#![allow(clippy::struct_field_names)]

use std::ffi::{c_char, c_int, c_uint, c_ulong, c_void};

/// Opaque connection handle.
#[repr(C)]
pub struct MYSQL {
    _private: [u8; 0],
}

/// Opaque result set handle.
#[repr(C)]
pub struct MYSQL_RES {
    _private: [u8; 0],
}

/// One fetched row: an array of `field_count` cell pointers, NULL for
/// NULL cells. Cell lengths come from `mysql_fetch_lengths`.
pub type MYSQL_ROW = *mut *mut c_char;

/// Column descriptor, mirroring the C struct layout.
#[repr(C)]
pub struct MYSQL_FIELD {
    pub name: *mut c_char,
    pub org_name: *mut c_char,
    pub table: *mut c_char,
    pub org_table: *mut c_char,
    pub db: *mut c_char,
    pub catalog: *mut c_char,
    pub def: *mut c_char,
    pub length: c_ulong,
    pub max_length: c_ulong,
    pub name_length: c_uint,
    pub org_name_length: c_uint,
    pub table_length: c_uint,
    pub org_table_length: c_uint,
    pub db_length: c_uint,
    pub catalog_length: c_uint,
    pub def_length: c_uint,
    pub flags: c_uint,
    pub decimals: c_uint,
    pub charsetnr: c_uint,
    pub field_type: c_int,
    pub extension: *mut c_void,
}

/// `mysql_options` option enabling the start/continue API.
pub const MYSQL_OPT_NONBLOCK: c_int = 6000;
/// `mysql_options` option selecting the connection character set.
pub const MYSQL_SET_CHARSET_NAME: c_int = 7;

pub const MYSQL_WAIT_READ: c_int = 1;
pub const MYSQL_WAIT_WRITE: c_int = 2;
pub const MYSQL_WAIT_EXCEPT: c_int = 4;
pub const MYSQL_WAIT_TIMEOUT: c_int = 8;

#[link(name = "mariadb")]
unsafe extern "C" {
    pub fn mysql_init(mysql: *mut MYSQL) -> *mut MYSQL;

    pub fn mysql_options(mysql: *mut MYSQL, option: c_int, arg: *const c_void) -> c_int;

    pub fn mysql_real_connect_start(
        ret: *mut *mut MYSQL,
        mysql: *mut MYSQL,
        host: *const c_char,
        user: *const c_char,
        passwd: *const c_char,
        db: *const c_char,
        port: c_uint,
        unix_socket: *const c_char,
        client_flag: c_ulong,
    ) -> c_int;

    pub fn mysql_real_connect_cont(
        ret: *mut *mut MYSQL,
        mysql: *mut MYSQL,
        ready_status: c_int,
    ) -> c_int;

    pub fn mysql_real_query_start(
        ret: *mut c_int,
        mysql: *mut MYSQL,
        stmt: *const c_char,
        length: c_ulong,
    ) -> c_int;

    pub fn mysql_real_query_cont(ret: *mut c_int, mysql: *mut MYSQL, ready_status: c_int)
        -> c_int;

    pub fn mysql_store_result(mysql: *mut MYSQL) -> *mut MYSQL_RES;

    pub fn mysql_use_result(mysql: *mut MYSQL) -> *mut MYSQL_RES;

    pub fn mysql_fetch_row_start(ret: *mut MYSQL_ROW, result: *mut MYSQL_RES) -> c_int;

    pub fn mysql_fetch_row_cont(
        ret: *mut MYSQL_ROW,
        result: *mut MYSQL_RES,
        ready_status: c_int,
    ) -> c_int;

    pub fn mysql_fetch_lengths(result: *mut MYSQL_RES) -> *mut c_ulong;

    pub fn mysql_num_fields(result: *mut MYSQL_RES) -> c_uint;

    pub fn mysql_fetch_fields(result: *mut MYSQL_RES) -> *mut MYSQL_FIELD;

    pub fn mysql_free_result_start(result: *mut MYSQL_RES) -> c_int;

    pub fn mysql_free_result_cont(result: *mut MYSQL_RES, ready_status: c_int) -> c_int;

    pub fn mysql_free_result(result: *mut MYSQL_RES);

    pub fn mysql_close_start(mysql: *mut MYSQL) -> c_int;

    pub fn mysql_close_cont(mysql: *mut MYSQL, ready_status: c_int) -> c_int;

    pub fn mysql_close(mysql: *mut MYSQL);

    pub fn mysql_error(mysql: *mut MYSQL) -> *const c_char;

    pub fn mysql_errno(mysql: *mut MYSQL) -> c_uint;

    pub fn mysql_field_count(mysql: *mut MYSQL) -> c_uint;

    pub fn mysql_get_socket(mysql: *const MYSQL) -> c_int;

    /// Timeout hint for the current wait, in seconds.
    pub fn mysql_get_timeout_value(mysql: *const MYSQL) -> c_uint;
}
