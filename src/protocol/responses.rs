//! Protocol responses
//!
//! Reply codes and line formatting. Every reply is `<code> <text>\r\n`;
//! listings are sent as `<code>-<row>` lines closed by `<code> <n> entries`.

pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATHNAME: u16 = 257;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const SYNTAX_ERROR: u16 = 500;

pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

pub fn format_listing<S: AsRef<str>>(code: u16, rows: &[S]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!("{}-{}\r\n", code, row.as_ref()));
    }
    out.push_str(&format_response(code, &format!("{} entries", rows.len())));
    out
}
