/// Client command codes.
///
/// ref: https://dev.mysql.com/doc/internals/en/command-phase.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Quit = 1,
    Query = 3,
    BinlogDump = 18,
    RegisterSlave = 21,
}
