/// First byte of a server response.
pub struct ResponseType;

impl ResponseType {
    pub const OK: u8 = 0x00;

    /// Also the EOF marker inside result sets.
    pub const END_OF_FILE: u8 = 0xfe;

    /// During authentication 0xfe means an auth plugin switch request.
    pub const AUTH_PLUGIN_SWITCH: u8 = 0xfe;

    pub const ERROR: u8 = 0xff;
}
