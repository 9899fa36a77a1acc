pub const MY_SQL_NATIVE_PASSWORD: &str = "mysql_native_password";

pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlugin {
    /// sha1 challenge/response, MySQL 5.x default.
    MySqlNativePassword,

    /// sha256 fast path + RSA full path, MySQL 8 default.
    CachingSha2Password,
}
