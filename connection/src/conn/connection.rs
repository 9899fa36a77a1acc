use openssl::rsa::{Padding, Rsa};
use tracing::debug;

use common::err::mirror_error::MirrorError;
use common::err::MResult;

use crate::bytes::xor;
use crate::commands::auth_plugin_switch_command::AuthPluginSwitchCommand;
use crate::commands::authenticate_command::AuthenticateCommand;
use crate::commands::query_command::QueryCommand;
use crate::conn::connection_options::ConnectionOptions;
use crate::conn::packet_channel::PacketChannel;
use crate::conn::query_result::{read_column_set, StreamQueryResult};
use crate::declar::auth_plugin_names::{self, AuthPlugin};
use crate::declar::capability_flags::{self, CapabilityFlags};
use crate::packet::auth_switch_packet::AuthPluginSwitchPacket;
use crate::packet::check_error_packet;
use crate::packet::handshake_packet::HandshakePacket;
use crate::packet::response_type::ResponseType;
use crate::packet::result_set_row_packet::ResultSetRowPacket;
use crate::{NULL_TERMINATOR, UTF8_MB4_GENERAL_CI};

/// One text row of a fully buffered result set.
pub type TextRow = Vec<Option<String>>;

/// Plain synchronous client connection.
#[derive(Debug)]
pub struct Connection {
    pub options: ConnectionOptions,

    channel: Option<PacketChannel>,

    is_closed: bool,

    session: Session,
}

#[derive(Debug)]
struct Session {
    capability_flags: CapabilityFlags,
    connection_id: u32,
    character_set: u8,
    server_version: String,
}

impl Session {
    fn default() -> Self {
        Session {
            capability_flags: CapabilityFlags::empty(),
            connection_id: 0,
            character_set: 0,
            server_version: String::default(),
        }
    }
}

impl Connection {
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            channel: None,
            is_closed: true,
            session: Session::default(),
        }
    }

    pub fn try_connect(&mut self) -> MResult<()> {
        if self.is_closed {
            let mut channel = PacketChannel::new(&self.options)?;
            self.do_handshake(&mut channel)?;
            self.channel = Some(channel);

            self.is_closed = false;
            debug!(
                "connected to {}:{} as connection {}",
                self.options.hostname, self.options.port, self.session.connection_id
            );
        }

        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            let _ = channel.shutdown();
        }
        self.channel = None;
        self.is_closed = true;
    }

    /// Runs a statement that produces no result set (DML/DDL/SET).
    pub fn execute(&mut self, sql: &str) -> MResult<()> {
        let command = QueryCommand::new(sql.to_string());
        self.write_packet(&command.serialize()?, 0)?;

        let (packet, _) = self.read_packet()?;
        check_error_packet(&packet, &format!("Execute error. sql: {}", sql))?;

        Ok(())
    }

    /// Runs a SELECT and buffers all rows as text.
    pub fn query(&mut self, sql: String) -> MResult<Vec<TextRow>> {
        let command = QueryCommand::new(sql);
        self.write_packet(&command.serialize()?, 0)?;

        let (packet, _) = self.read_packet()?;
        check_error_packet(&packet, "Reading result set error.")?;
        if packet[0] == ResponseType::OK {
            return Ok(Vec::new());
        }

        // Skip through metadata
        loop {
            let (packet, _) = self.read_packet()?;
            if packet[0] == ResponseType::END_OF_FILE {
                break;
            }
        }

        let mut result = Vec::new();
        loop {
            let (packet, _) = self.read_packet()?;
            check_error_packet(&packet, "Query result set error.")?;
            if packet[0] == ResponseType::END_OF_FILE {
                break;
            }
            result.push(ResultSetRowPacket::parse(&packet)?.cells);
        }

        Ok(result)
    }

    /// Runs a SELECT and exposes the rows as a typed streaming iterator.
    pub fn query_stream(&mut self, sql: String) -> MResult<StreamQueryResult> {
        let command = QueryCommand::new(sql);
        self.write_packet(&command.serialize()?, 0)?;

        let columns = read_column_set(self)?;
        Ok(StreamQueryResult::new(self, columns.into()))
    }

    /// Scalar convenience: first cell of the first row.
    pub fn query_scalar(&mut self, sql: String) -> MResult<Option<String>> {
        let rows = self.query(sql)?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()).flatten())
    }

    pub fn write_packet(&mut self, packet: &[u8], seq_num: u8) -> MResult<()> {
        match self.channel.as_mut() {
            None => Err(MirrorError::ConnectionError(String::from("channel not found"))),
            Some(channel) => channel.write_packet(packet, seq_num),
        }
    }

    pub fn read_packet(&mut self) -> MResult<(Vec<u8>, u8)> {
        match self.channel.as_mut() {
            None => Err(MirrorError::ConnectionError(String::from("channel not found"))),
            Some(channel) => channel.read_packet(),
        }
    }

    /// 读取一个mysql packet，并处理err包
    pub fn read_packet_with_check(&mut self, err_message: &str) -> MResult<(Vec<u8>, u8)> {
        let (packet, seq_num) = self.read_packet()?;
        check_error_packet(&packet, err_message)?;
        Ok((packet, seq_num))
    }

    pub fn has_capability(&self, capability_flag: u64) -> bool {
        self.session.capability_flags.contains(capability_flag)
    }

    pub fn server_version(&self) -> &str {
        &self.session.server_version
    }

    fn do_handshake(&mut self, channel: &mut PacketChannel) -> MResult<()> {
        let (packet, mut seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Initial handshake error.")?;
        let handshake = HandshakePacket::parse(&packet)?;

        // 协议版本号0x0A/10
        if handshake.protocol_version != 10u8 {
            return Err(MirrorError::ConnectionError(format!(
                "Unsupported protocol version. {}",
                handshake.protocol_version
            )));
        }

        let capability_flags = CapabilityFlags::new(handshake.server_capabilities);
        if !capability_flags.contains(capability_flags::CLIENT_PROTOCOL_41) {
            return Err(MirrorError::ConnectionError(
                "Protocol41 not set on server.".to_string(),
            ));
        }

        self.handle_handshake(&handshake);

        let auth_plugin = Connection::get_auth_plugin(&handshake.auth_plugin_name)?;
        let auth_command =
            AuthenticateCommand::new(&self.options, &handshake, auth_plugin, UTF8_MB4_GENERAL_CI);
        seq_num += 1;
        channel.write_packet(&auth_command.serialize()?, seq_num)?;

        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication error.")?;
        match packet[0] {
            ResponseType::OK => Ok(()),
            ResponseType::AUTH_PLUGIN_SWITCH => {
                let switch_packet = AuthPluginSwitchPacket::parse(&packet[1..])?;
                Connection::handle_auth_plugin_switch(
                    channel,
                    switch_packet,
                    &self.options,
                    seq_num + 1,
                )
            }
            _ => Connection::authenticate_sha_256(
                channel,
                &packet,
                &handshake.scramble,
                &self.options.password,
                seq_num + 1,
            ),
        }
    }

    fn handle_auth_plugin_switch(
        channel: &mut PacketChannel,
        switch_packet: AuthPluginSwitchPacket,
        options: &ConnectionOptions,
        seq_num: u8,
    ) -> MResult<()> {
        let auth_plugin = Connection::get_auth_plugin(&switch_packet.auth_plugin_name)?;
        let auth_switch_command = AuthPluginSwitchCommand::new(
            &options.password,
            &switch_packet.auth_plugin_data,
            &switch_packet.auth_plugin_name,
            auth_plugin,
        );
        channel.write_packet(&auth_switch_command.serialize()?, seq_num)?;
        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication switch error.")?;

        if switch_packet.auth_plugin_name == auth_plugin_names::CACHING_SHA2_PASSWORD {
            Connection::authenticate_sha_256(
                channel,
                &packet,
                &switch_packet.auth_plugin_data,
                &options.password,
                seq_num + 1,
            )?;
        }
        Ok(())
    }

    /// caching_sha2_password full authentication over a plain channel: ask
    /// for the server public key and send the password RSA encrypted.
    ///
    /// See https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/
    fn authenticate_sha_256(
        channel: &mut PacketChannel,
        packet: &[u8],
        scramble: &str,
        password: &str,
        seq_num: u8,
    ) -> MResult<()> {
        // Fast path succeeded.
        if packet.len() >= 2 && packet[0] == 0x01 && packet[1] == 0x03 {
            return Ok(());
        }

        let mut password = password.as_bytes().to_vec();
        password.push(NULL_TERMINATOR);

        // Request public key.
        channel.write_packet(&[0x02], seq_num)?;
        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Requesting caching_sha2_password public key.")?;

        let public_key = &packet[1..];
        let encrypted_password = xor(&password, scramble.as_bytes());

        let rsa = Rsa::public_key_from_pem(public_key).map_err(|e| {
            MirrorError::ConnectionError(format!("load caching_sha2 public key error: {}", e))
        })?;
        let mut encrypted_body = vec![0u8; rsa.size() as usize];
        rsa.public_encrypt(&encrypted_password, &mut encrypted_body, Padding::PKCS1_OAEP)
            .map_err(|e| MirrorError::ConnectionError(format!("public_encrypt error: {}", e)))?;

        channel.write_packet(&encrypted_body, seq_num + 1)?;

        let (packet, _seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication error.")?;
        Ok(())
    }

    fn get_auth_plugin(auth_plugin_name: &str) -> MResult<AuthPlugin> {
        if auth_plugin_name == auth_plugin_names::MY_SQL_NATIVE_PASSWORD {
            return Ok(AuthPlugin::MySqlNativePassword);
        }
        if auth_plugin_name == auth_plugin_names::CACHING_SHA2_PASSWORD {
            return Ok(AuthPlugin::CachingSha2Password);
        }

        Err(MirrorError::ConnectionError(format!(
            "{} auth plugin is not supported.",
            auth_plugin_name
        )))
    }

    fn handle_handshake(&mut self, hp: &HandshakePacket) {
        self.session.capability_flags =
            CapabilityFlags::new(hp.server_capabilities & self.get_client_flags());
        self.session.connection_id = hp.connection_id;
        self.session.character_set = hp.server_collation;
        self.session.server_version = hp.server_version.clone();
    }

    fn get_client_flags(&self) -> u64 {
        capability_flags::CLIENT_PROTOCOL_41
            | capability_flags::CLIENT_SECURE_CONNECTION
            | capability_flags::CLIENT_LONG_PASSWORD
            | capability_flags::CLIENT_TRANSACTIONS
            | capability_flags::CLIENT_LOCAL_FILES
            | capability_flags::CLIENT_MULTI_STATEMENTS
            | capability_flags::CLIENT_MULTI_RESULTS
            | capability_flags::CLIENT_PS_MULTI_RESULTS
            | capability_flags::CLIENT_PLUGIN_AUTH
            | capability_flags::CLIENT_LONG_FLAG
    }
}
